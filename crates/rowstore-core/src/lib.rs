//! RowStore Core — ordered RAM-first row store
//!
//! A sorted key-value store over raw byte-string keys. Rows live in an
//! ordered in-memory map; a write-ahead log makes every mutation survive
//! a crash.
//!
//! # Architecture
//!
//! - **Read path**: point reads and ascending range scans served from RAM
//! - **Write path**: WAL-first, then RAM (crash-safe)
//! - **Store trait**: the three-call contract (put, get, ascending scan)
//!   that higher layers such as key encoding and pagination build on
//!
//! Scans only run forward. Descending iteration and cursor paging are the
//! caller's job, done through key design rather than store features.

pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod platform_durability;
pub mod range;
pub mod store;
pub mod wal;

pub use config::{Config, Durability};
pub use engine::StoreEngine;
pub use error::{StoreError, StoreResult};
pub use format::Operation;
pub use range::{lex_increment, KeyRange};
pub use store::{CancelFlag, Row, ScanOptions, Store};
pub use wal::{WalReader, WalWriter};
