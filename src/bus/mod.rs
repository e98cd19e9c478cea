pub mod client;
pub mod opcode;

pub use client::{BusClient, TcpBusClient};
pub use opcode::{check_response, decode, encode, RequestFields, RequestType, ResponseFields, STATUS_FAILED};
