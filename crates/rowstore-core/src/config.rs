//! Configuration for the row store engine
//!
//! Provides durability presets and validation. A config is a plain value
//! handed to [`StoreEngine::open`](crate::StoreEngine::open).

use crate::error::{StoreError, StoreResult};

/// How WAL appends reach persistent storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// Every append is followed by a durable sync before RAM is touched
    Sync,
    /// Appends land in the OS page cache; call `sync_wal` to make a batch durable
    Buffered,
}

/// Row store configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Sync policy for WAL appends
    pub durability: Durability,
    /// WAL segment rotation threshold (bytes)
    pub wal_rotation_size_bytes: u64,
    /// Maximum key size in bytes
    pub max_key_size: usize,
    /// Maximum value size in bytes
    pub max_value_size: usize,
}

impl Config {
    /// Crash-safe preset: fsync on every write.
    pub fn durable() -> Self {
        Self {
            durability: Durability::Sync,
            wal_rotation_size_bytes: 64 * 1024 * 1024,
            max_key_size: 4 * 1024,
            max_value_size: 16 * 1024 * 1024,
        }
    }

    /// Bulk-load preset: buffered appends, one sync per batch.
    pub fn buffered() -> Self {
        Self {
            durability: Durability::Buffered,
            ..Self::durable()
        }
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> StoreResult<()> {
        if self.wal_rotation_size_bytes < 64 * 1024 {
            return Err(StoreError::InvalidConfig(
                "wal_rotation_size_bytes must be >= 64KB".into(),
            ));
        }
        if self.max_key_size == 0 || self.max_key_size > u16::MAX as usize {
            return Err(StoreError::InvalidConfig(
                "max_key_size must be in [1, 65535]".into(),
            ));
        }
        if self.max_value_size == 0 || self.max_value_size > 128 * 1024 * 1024 {
            return Err(StoreError::InvalidConfig(
                "max_value_size must be in [1, 128MB]".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::durable()
    }
}
