//! Byte-string key ranges for ascending scans.

use std::ops::Bound;

use crate::error::{StoreError, StoreResult};

/// Smallest byte string greater than every string that starts with `data`.
///
/// Increments the last byte below `0xFF` and drops everything after it.
/// Returns `None` when `data` is empty or all `0xFF`, in which case no
/// finite upper bound exists.
///
/// - `b"token:"` → `Some(b"token;")`
/// - `[0x61, 0xFF]` → `Some([0x62])`
/// - `[0xFF]` → `None`
pub fn lex_increment(data: &[u8]) -> Option<Vec<u8>> {
    let mut result = data.to_vec();
    while let Some(last) = result.last_mut() {
        if *last < 0xFF {
            *last += 1;
            return Some(result);
        }
        result.pop();
    }
    None
}

/// A scan range: `start` inclusive, `end` exclusive, `None` end meaning unbounded.
///
/// `new` rejects `start > end`, but `with_start` may move the start to or
/// past a bounded end. Such a range is empty: `is_empty` holds, `contains`
/// is false for every key and scans over it deliver nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    start: Vec<u8>,
    end: Option<Vec<u8>>,
}

impl KeyRange {
    /// `[start, end)`. Fails with `InvalidRange` when `start > end`.
    pub fn new(start: impl Into<Vec<u8>>, end: impl Into<Vec<u8>>) -> StoreResult<Self> {
        let start = start.into();
        let end = end.into();
        if start > end {
            return Err(StoreError::InvalidRange { start, end });
        }
        Ok(Self { start, end: Some(end) })
    }

    /// `[start, ∞)`.
    pub fn from_start(start: impl Into<Vec<u8>>) -> Self {
        Self { start: start.into(), end: None }
    }

    /// Every key that starts with `prefix`.
    pub fn prefix(prefix: impl Into<Vec<u8>>) -> Self {
        let start = prefix.into();
        let end = lex_increment(&start);
        Self { start, end }
    }

    /// The whole key space.
    pub fn full() -> Self {
        Self::from_start(Vec::new())
    }

    pub fn start(&self) -> &[u8] {
        &self.start
    }

    pub fn end(&self) -> Option<&[u8]> {
        self.end.as_deref()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice() && self.end.as_deref().map_or(true, |end| key < end)
    }

    /// Same end, new inclusive start.
    ///
    /// A start at or past a bounded end yields an empty range rather than
    /// an error, since a cursor may legitimately step off the end.
    pub fn with_start(&self, start: impl Into<Vec<u8>>) -> Self {
        Self { start: start.into(), end: self.end.clone() }
    }

    /// True when no key can fall inside the range.
    pub fn is_empty(&self) -> bool {
        self.end.as_deref().map_or(false, |end| self.start.as_slice() >= end)
    }

    /// Bounds for `BTreeMap::range`.
    pub fn bounds(&self) -> (Bound<&[u8]>, Bound<&[u8]>) {
        let end = match &self.end {
            Some(end) => Bound::Excluded(end.as_slice()),
            None => Bound::Unbounded,
        };
        (Bound::Included(self.start.as_slice()), end)
    }
}
