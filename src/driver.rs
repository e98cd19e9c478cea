//! The driver API: `init`, `read`, `write`, `close`, `disk_signal`.
//!
//! Per spec.md §9's design note on global mutable state, the allocator
//! cursor, cache, and tagline directory are one conceptual object; this
//! struct is the single explicit handle that owns all three plus the
//! bus connection, rather than a collection of singletons.
use log::info;

use crate::allocator::Allocator;
use crate::bus::{check_response, BusClient, RequestFields, RequestType};
use crate::cache::{Cache, CacheStats};
use crate::config::Config;
use crate::error::Result;
use crate::recovery;
use crate::tagline::TaglineDirectory;

pub struct Driver<B: BusClient> {
    config: Config,
    bus: B,
    cache: Cache,
    allocator: Allocator,
    directory: TaglineDirectory,
}

impl<B: BusClient> Driver<B> {
    /// Bus INIT, bus FORMAT for every disk, cache init, directory init.
    /// Fails if any bus call's status bit is non-zero.
    pub fn init(mut bus: B, config: Config, maxlines: u32) -> Result<Self> {
        config.validate()?;
        info!(
            "driver init: {} disks x {} blocks, block_size={}, maxlines={maxlines}",
            config.disks, config.blocks_per_disk, config.block_size
        );

        let init_request = RequestFields {
            request_type: RequestType::Init,
            number_of_blocks: 0,
            disk_number: 0,
            block_id: 0,
        };
        let (response, _) = bus.call(init_request, None)?;
        check_response(init_request, response)?;

        for disk in 0..config.disks {
            let format_request = RequestFields {
                request_type: RequestType::Format,
                number_of_blocks: 0,
                disk_number: disk,
                block_id: 0,
            };
            let (response, _) = bus.call(format_request, None)?;
            check_response(format_request, response)?;
        }

        Ok(Driver {
            cache: Cache::init(config.cache_capacity, config.block_size),
            allocator: Allocator::init(config.disks, config.blocks_per_disk),
            directory: TaglineDirectory::init(
                maxlines,
                config.block_size,
                config.max_logical_blocks_per_tagline,
            ),
            config,
            bus,
        })
    }

    /// Direct access to the underlying bus, for callers that need to
    /// drive the concrete transport directly (the `MockBusClient` fault
    /// injection used in tests, for instance).
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn read(&mut self, tag: u16, bnum: u32, nblocks: u8, buf: &mut [u8]) -> Result<()> {
        self.directory
            .read(tag, bnum, nblocks, buf, &mut self.cache, &mut self.bus)
    }

    pub fn write(&mut self, tag: u16, bnum: u32, nblocks: u8, buf: &[u8]) -> Result<()> {
        self.directory.write(
            tag,
            bnum,
            nblocks,
            buf,
            &mut self.cache,
            &mut self.allocator,
            &mut self.bus,
        )
    }

    /// Closes the cache (flushing and printing statistics), then issues
    /// bus CLOSE. The directory is dropped with `self`.
    pub fn close(mut self) -> Result<CacheStats> {
        let stats = self.cache.close(&mut self.bus)?;
        let close_request = RequestFields {
            request_type: RequestType::Close,
            number_of_blocks: 0,
            disk_number: 0,
            block_id: 0,
        };
        let (response, _) = self.bus.call(close_request, None)?;
        check_response(close_request, response)?;
        info!("driver closed");
        Ok(stats)
    }

    /// Triggered externally when some disk is suspected to have failed.
    /// Not concurrent with `read`/`write`; the caller quiesces the
    /// driver before signalling.
    pub fn disk_signal(&mut self) -> Result<()> {
        recovery::disk_signal(
            &self.directory,
            &mut self.cache,
            self.config.disks,
            self.config.block_size,
            &mut self.bus,
        )
    }
}
