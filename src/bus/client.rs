//! Bus client: the synchronous request/response channel to the RAID
//! server. The wire transport itself (TCP socket, opcode framing) is an
//! external collaborator per spec.md §1 — this module supplies the
//! plainest rendition that satisfies §6 ("a blocking send-then-receive"),
//! plus an in-memory double used by tests and the `--simulate` CLI path.
use std::io::{Read as _, Write as _};
use std::net::TcpStream;

use crate::bus::opcode::{decode, encode, RequestFields, ResponseFields};
use crate::error::BusError;

/// One round trip to the bus: a request plus the block payload it
/// carries (WRITE only), yielding the decoded response plus the block
/// payload the response carries (READ only, when `status_ok`).
pub trait BusClient {
    fn call(
        &mut self,
        fields: RequestFields,
        payload: Option<&[u8]>,
    ) -> Result<(ResponseFields, Option<Vec<u8>>), BusError>;
}

/// Blocking TCP implementation: one opcode word, then an optional
/// `block_size`-byte payload, in each direction.
pub struct TcpBusClient {
    stream: TcpStream,
    block_size: usize,
}

impl TcpBusClient {
    pub fn connect(addr: impl std::net::ToSocketAddrs, block_size: usize) -> Result<Self, BusError> {
        let stream = TcpStream::connect(addr)?;
        Ok(TcpBusClient { stream, block_size })
    }
}

impl BusClient for TcpBusClient {
    fn call(
        &mut self,
        fields: RequestFields,
        payload: Option<&[u8]>,
    ) -> Result<(ResponseFields, Option<Vec<u8>>), BusError> {
        let word = encode(fields);
        self.stream.write_all(&word.to_be_bytes())?;
        if let Some(buf) = payload {
            debug_assert_eq!(buf.len(), self.block_size);
            self.stream.write_all(buf)?;
        }

        let mut resp_bytes = [0u8; 8];
        self.stream.read_exact(&mut resp_bytes)?;
        let response = decode(u64::from_be_bytes(resp_bytes));

        let recv_payload = if response.status_ok
            && matches!(fields.request_type, crate::bus::opcode::RequestType::Read)
        {
            let mut buf = vec![0u8; self.block_size];
            self.stream.read_exact(&mut buf)?;
            Some(buf)
        } else {
            None
        };

        Ok((response, recv_payload))
    }
}

pub mod mock {
    //! An in-memory bus used by unit/integration tests and the
    //! `--simulate` CLI path: a `DISKS x BLOCKS_PER_DISK` grid of
    //! `block_size`-byte buffers plus a settable per-disk health flag, so
    //! the disk-failure recovery protocol can be exercised without a real
    //! RAID server. Grounded in the fault-injecting fake device of
    //! `wilsonzlin-aero`'s block-cache eviction test.
    use super::*;
    use crate::bus::opcode::{RequestType, STATUS_FAILED};
    use std::collections::HashSet;

    pub struct MockBusClient {
        disks: Vec<Vec<Vec<u8>>>,
        block_size: usize,
        failed: HashSet<u8>,
        fail_write_at: Option<(u8, u32)>,
    }

    impl MockBusClient {
        pub fn new(num_disks: u8, blocks_per_disk: u32, block_size: usize) -> Self {
            MockBusClient {
                disks: vec![vec![vec![0u8; block_size]; blocks_per_disk as usize]; num_disks as usize],
                block_size,
                failed: HashSet::new(),
                fail_write_at: None,
            }
        }

        pub fn mark_failed(&mut self, disk: u8) {
            self.failed.insert(disk);
        }

        pub fn mark_healthy(&mut self, disk: u8) {
            self.failed.remove(&disk);
        }

        /// Inject a write failure at a specific `(disk, block)` address,
        /// to exercise the "eviction writeback fails" path.
        pub fn fail_next_write_to(&mut self, disk: u8, block: u32) {
            self.fail_write_at = Some((disk, block));
        }

        /// Peek at raw on-disk bytes without going through the bus
        /// protocol, for test assertions.
        pub fn peek(&self, disk: u8, block: u32) -> &[u8] {
            &self.disks[disk as usize][block as usize]
        }
    }

    impl BusClient for MockBusClient {
        fn call(
            &mut self,
            fields: RequestFields,
            payload: Option<&[u8]>,
        ) -> Result<(ResponseFields, Option<Vec<u8>>), BusError> {
            use crate::bus::opcode::ResponseFields;

            let echo = |status_ok: bool, block_id: u32| ResponseFields {
                request_type: Some(fields.request_type),
                number_of_blocks: fields.number_of_blocks,
                disk_number: fields.disk_number,
                status_ok,
                block_id,
            };

            match fields.request_type {
                RequestType::Init => Ok((echo(true, fields.block_id), None)),
                RequestType::Close => Ok((echo(true, fields.block_id), None)),
                RequestType::Format => {
                    for block in self.disks[fields.disk_number as usize].iter_mut() {
                        block.fill(0);
                    }
                    self.failed.remove(&fields.disk_number);
                    Ok((echo(true, fields.block_id), None))
                }
                RequestType::Status => {
                    let block_id = if self.failed.contains(&fields.disk_number) {
                        STATUS_FAILED
                    } else {
                        0
                    };
                    Ok((echo(true, block_id), None))
                }
                RequestType::Read => {
                    let buf = self.disks[fields.disk_number as usize][fields.block_id as usize].clone();
                    Ok((echo(true, fields.block_id), Some(buf)))
                }
                RequestType::Write => {
                    if self.fail_write_at == Some((fields.disk_number, fields.block_id)) {
                        self.fail_write_at = None;
                        return Ok((echo(false, fields.block_id), None));
                    }
                    let buf = payload.expect("WRITE must carry a payload");
                    debug_assert_eq!(buf.len(), self.block_size);
                    self.disks[fields.disk_number as usize][fields.block_id as usize]
                        .copy_from_slice(buf);
                    Ok((echo(true, fields.block_id), None))
                }
            }
        }
    }
}
