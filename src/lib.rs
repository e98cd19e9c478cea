#[macro_use]
extern crate log;

pub mod allocator;
pub mod bus;
pub mod cache;
pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod recovery;
pub mod tagline;
pub mod types;

pub use crate::bus::{BusClient, TcpBusClient};
pub use crate::cache::{Cache, CacheStats};
pub use crate::config::Config;
pub use crate::driver::Driver;
pub use crate::error::{BusError, DriverError, Result};
pub use crate::types::{PhysAddr, Placement};
