//! Descending keys and cursor paging for RowStore
//!
//! RowStore, like most sorted wide-column stores, only scans forward in
//! byte order. This crate layers two things on top of that:
//!
//! - **Descending order**: [`KeyCodec`] writes `max_value - id` as a
//!   fixed-width zero-padded decimal behind a namespace tag, so the highest
//!   id gets the lowest key and an ascending scan reads ids high to low.
//! - **Stateless paging**: [`Paginator`] walks a range one bounded scan at a
//!   time, restarting each scan at [`next_key`] of the last key seen. The
//!   last key is the whole cursor; persist it to resume later.
//!
//! ```ignore
//! let codec = KeyCodec::new(CodecConfig::tokens())?;
//! for id in [1, 101, 2000] {
//!     store.put(codec.encode(id)?.as_bytes(), b"test")?;
//! }
//! for row in Paginator::new(&store, codec.range(), 2)? {
//!     let id = codec.decode(&row?.key)?;   // 2000, 101, 1
//! }
//! ```

pub mod boundary;
pub mod codec;
pub mod config;
pub mod error;
pub mod paginator;
pub mod scanner;

pub use boundary::{next_key, PAD_BYTE};
pub use codec::{sort_raw_keys, EncodedKey, KeyCodec};
pub use config::CodecConfig;
pub use error::{PagingError, Result};
pub use paginator::{paginate, Page, PaginateSummary, Paginator};
pub use scanner::{RangeScanner, ScanOutcome};
