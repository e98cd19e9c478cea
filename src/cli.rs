//! Command-line surface: connection settings, size tunables, and the
//! `--simulate` escape hatch that runs against `MockBusClient` instead
//! of a real bus, for trying the driver without a RAID server on hand.
use clap::{Parser, Subcommand};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Bus server host, ignored when `--simulate` is given.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Bus server port, ignored when `--simulate` is given.
    #[arg(long, default_value_t = 9000)]
    pub port: u16,

    /// Run against an in-memory bus instead of connecting over TCP.
    #[arg(long, default_value_t = false)]
    pub simulate: bool,

    #[arg(long, default_value_t = 9)]
    pub disks: u8,

    #[arg(long, default_value_t = 4096)]
    pub blocks_per_disk: u32,

    #[arg(long, default_value_t = 1024)]
    pub block_size: usize,

    #[arg(long, default_value_t = 256)]
    pub max_logical_blocks_per_tagline: u32,

    #[arg(long, default_value_t = 8192)]
    pub cache_capacity: usize,

    /// Number of taglines to allocate on init.
    #[arg(long, default_value_t = 16)]
    pub maxlines: u32,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a block of repeated `fill` bytes to a tagline.
    Write {
        tag: u16,
        bnum: u32,
        #[arg(default_value_t = 0)]
        fill: u8,
    },
    /// Read one block from a tagline and print it as hex.
    Read { tag: u16, bnum: u32 },
    /// Poll every disk's status and rebuild any that report failed.
    Recover,
}

impl Args {
    pub fn config(&self) -> Config {
        Config {
            disks: self.disks,
            blocks_per_disk: self.blocks_per_disk,
            block_size: self.block_size,
            max_logical_blocks_per_tagline: self.max_logical_blocks_per_tagline,
            cache_capacity: self.cache_capacity,
        }
    }
}
