//! Descending row-key encoding.
//!
//! Stores only scan forward in byte order. Encoding `max_value - id` as a
//! fixed-width, zero-padded decimal makes the largest id produce the
//! smallest key, so a plain ascending scan reads ids from high to low.
//! Fixed width matters: unpadded decimals do not sort numerically
//! (`"10" < "9"`).

use std::fmt;

use rowstore_core::KeyRange;

use crate::config::CodecConfig;
use crate::error::{PagingError, Result};

/// A key produced by [`KeyCodec::encode`]. Orders by raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EncodedKey(Vec<u8>);

impl EncodedKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for EncodedKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<EncodedKey> for Vec<u8> {
    fn from(key: EncodedKey) -> Self {
        key.0
    }
}

impl fmt::Display for EncodedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Number of decimal digits in `value`.
fn decimal_digits(value: u64) -> usize {
    value.checked_ilog10().map_or(1, |log| log as usize + 1)
}

/// Reversible id <-> key transform for one namespace.
#[derive(Debug, Clone)]
pub struct KeyCodec {
    config: CodecConfig,
}

impl KeyCodec {
    pub fn new(config: CodecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// `<tag>` followed by `max_value - id`, zero-padded to `width` digits.
    pub fn encode(&self, id: u64) -> Result<EncodedKey> {
        let CodecConfig { tag, max_value, width } = &self.config;
        if id >= *max_value {
            return Err(PagingError::InvalidIdentifier { id, max_value: *max_value });
        }

        let value = max_value - id;
        let digits = decimal_digits(value);
        if digits > *width {
            return Err(PagingError::WidthOverflow { value, digits, width: *width });
        }

        let mut key = Vec::with_capacity(tag.len() + width);
        key.extend_from_slice(tag.as_bytes());
        key.extend_from_slice(format!("{value:0width$}", width = *width).as_bytes());
        Ok(EncodedKey(key))
    }

    /// Inverse of [`encode`](Self::encode).
    ///
    /// Rejects anything that is not exactly `<tag><width ASCII digits>`,
    /// and digit runs no `encode` call could have produced.
    pub fn decode(&self, key: &[u8]) -> Result<u64> {
        let CodecConfig { tag, max_value, width } = &self.config;
        let digits = key
            .strip_prefix(tag.as_bytes())
            .ok_or_else(|| PagingError::malformed(key, format!("missing tag {tag:?}")))?;

        if digits.len() != *width {
            return Err(PagingError::malformed(
                key,
                format!("expected {width} digits, found {}", digits.len()),
            ));
        }
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(PagingError::malformed(key, "non-digit after tag"));
        }

        let value = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| PagingError::malformed(key, "digits overflow u64"))?;

        if value == 0 || value > *max_value {
            return Err(PagingError::malformed(
                key,
                format!("encoded value {value} outside [1, {max_value}]"),
            ));
        }
        Ok(max_value - value)
    }

    /// Encode an unpadded `<tag><id>` key such as `token:54`.
    pub fn encode_raw(&self, raw: &str) -> Result<EncodedKey> {
        let id = self.parse_raw(raw)?;
        self.encode(id)
    }

    /// Render an encoded key back in its unpadded `<tag><id>` form.
    pub fn decode_to_raw(&self, key: &[u8]) -> Result<String> {
        let id = self.decode(key)?;
        Ok(format!("{}{id}", self.config.tag))
    }

    /// Id carried by an unpadded `<tag><id>` key.
    pub fn parse_raw(&self, raw: &str) -> Result<u64> {
        let number = raw.strip_prefix(self.config.tag.as_str()).ok_or_else(|| {
            PagingError::malformed(raw.as_bytes(), format!("missing tag {:?}", self.config.tag))
        })?;
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PagingError::malformed(raw.as_bytes(), "expected a decimal id after tag"));
        }
        number
            .parse::<u64>()
            .map_err(|e| PagingError::malformed(raw.as_bytes(), e.to_string()))
    }

    /// Range covering every key in this codec's namespace.
    pub fn range(&self) -> KeyRange {
        KeyRange::prefix(self.config.tag.as_bytes().to_vec())
    }
}

/// Sort keys the way a store orders them: ascending by raw bytes.
pub fn sort_raw_keys<S: AsRef<str>>(keys: &mut [S]) {
    keys.sort_by(|a, b| a.as_ref().as_bytes().cmp(b.as_ref().as_bytes()));
}
