//! Codec configuration.
//!
//! The namespace tag, the descending ceiling and the digit width are plain
//! values handed to [`KeyCodec::new`](crate::KeyCodec::new). Nothing here is
//! read from the environment.

use crate::boundary::PAD_BYTE;
use crate::error::{PagingError, Result};

/// Widest decimal rendering of a `u64`.
pub const MAX_WIDTH: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Namespace tag prepended to every key, separator included (`"token:"`)
    pub tag: String,
    /// Exclusive upper bound on identifiers; encoded digits are `max_value - id`
    pub max_value: u64,
    /// Zero-padded digit count
    pub width: usize,
}

impl CodecConfig {
    pub fn new(tag: impl Into<String>, max_value: u64, width: usize) -> Self {
        Self { tag: tag.into(), max_value, width }
    }

    /// `token:` keys for ids below 10000, five digits wide.
    pub fn tokens() -> Self {
        Self::new("token:", 10_000, 5)
    }

    /// Width may be narrower than `max_value` needs; ids whose complement
    /// does not fit are rejected per call with `WidthOverflow`.
    pub fn validate(&self) -> Result<()> {
        if self.tag.is_empty() {
            return Err(PagingError::InvalidConfig("tag must not be empty".into()));
        }
        if self.tag.as_bytes().contains(&PAD_BYTE) {
            return Err(PagingError::InvalidConfig(
                "tag must not contain the reserved 0x00 byte".into(),
            ));
        }
        if self.max_value == 0 {
            return Err(PagingError::InvalidConfig("max_value must be >= 1".into()));
        }
        if self.width == 0 || self.width > MAX_WIDTH {
            return Err(PagingError::InvalidConfig(format!("width must be in [1, {MAX_WIDTH}]")));
        }
        Ok(())
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self::tokens()
    }
}
