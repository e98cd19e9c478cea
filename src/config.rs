//! The five size constants spec.md §3 calls "configurable but fixed for
//! a run". No environment variables are consumed; every value here is
//! either a CLI default or an explicit construction argument.
use crate::error::{DriverError, Result};

#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub disks: u8,
    pub blocks_per_disk: u32,
    pub block_size: usize,
    pub max_logical_blocks_per_tagline: u32,
    pub cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            disks: 9,
            blocks_per_disk: 4096,
            block_size: 1024,
            max_logical_blocks_per_tagline: 256,
            cache_capacity: 8192,
        }
    }
}

impl Config {
    /// Rejects the values that would otherwise panic or silently
    /// misbehave further down the stack: fewer than two disks leaves no
    /// room for a primary/mirror pair, zero blocks per disk leaves no
    /// physical slots to allocate, and a zero cache capacity can't back
    /// `NonZeroUsize`.
    pub fn validate(&self) -> Result<()> {
        if self.disks < 2 {
            return Err(DriverError::InvalidArgument(format!(
                "disks must be at least 2 to place a primary and a mirror, got {}",
                self.disks
            )));
        }
        if self.blocks_per_disk == 0 {
            return Err(DriverError::InvalidArgument(
                "blocks_per_disk must be nonzero".to_string(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(DriverError::InvalidArgument(
                "cache_capacity must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn fewer_than_two_disks_is_rejected() {
        let config = Config {
            disks: 1,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_blocks_per_disk_is_rejected() {
        let config = Config {
            blocks_per_disk: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_cache_capacity_is_rejected() {
        let config = Config {
            cache_capacity: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
