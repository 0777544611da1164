//! Error types for row store operations
//!
//! Every fallible store call returns [`StoreError`], which carries enough
//! context to tell a corrupt log apart from an unavailable store or an
//! aborted scan.

use std::path::PathBuf;

use thiserror::Error as ThisError;

/// Row store error types with detailed context
#[derive(Debug, Clone, ThisError)]
pub enum StoreError {
    /// I/O operation failed
    #[error("I/O error{}: {message} ({kind})", path_suffix(.path))]
    Io {
        /// The file path where the error occurred
        path: Option<PathBuf>,
        /// The underlying I/O error kind
        kind: std::io::ErrorKind,
        /// Human-readable description
        message: String,
    },

    /// WAL segment is corrupted and cannot be recovered
    #[error("WAL corrupted in {} at offset {offset}: {reason}", .path.display())]
    WalCorrupted {
        path: PathBuf,
        offset: u64,
        reason: String,
    },

    /// Checksum verification failed
    #[error(
        "checksum mismatch in {} at offset {offset}: expected 0x{expected:08x}, got 0x{actual:08x}",
        .path.display()
    )]
    ChecksumMismatch {
        path: PathBuf,
        expected: u32,
        actual: u32,
        offset: u64,
    },

    /// Partial write at the end of a WAL segment
    #[error(
        "torn write in {} at offset {offset}: expected {expected_size} bytes, \
         only {available_bytes} available",
        .path.display()
    )]
    TornWrite {
        path: PathBuf,
        expected_size: u32,
        available_bytes: u64,
        offset: u64,
    },

    /// Magic bytes not found at expected location
    #[error(
        "magic bytes not found in {} at offset {offset}: found {:02x}{:02x}{:02x}{:02x}",
        .path.display(), .found_bytes[0], .found_bytes[1], .found_bytes[2], .found_bytes[3]
    )]
    NoMagicFound {
        path: PathBuf,
        offset: u64,
        found_bytes: [u8; 4],
    },

    /// Key or value exceeds the configured maximum
    #[error("entry {component} too large: {entry_size} bytes exceeds limit of {max_size} bytes")]
    OversizedEntry {
        entry_size: u64,
        max_size: u64,
        /// "key" or "value"
        component: &'static str,
    },

    /// Range start sorts after its exclusive end
    #[error("invalid range: start {start:?} sorts after end {end:?}")]
    InvalidRange { start: Vec<u8>, end: Vec<u8> },

    /// Store has been shut down or cannot serve requests
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// Scan deadline passed before the scan completed
    #[error("scan timed out after delivering {delivered} rows")]
    ScanTimeout { delivered: usize },

    /// Caller raised the cancel flag during a scan
    #[error("scan cancelled after delivering {delivered} rows")]
    Cancelled { delivered: usize },

    /// Configuration rejected by `Config::validate`
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    /// Errors a caller may reasonably retry after backing off.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::ScanTimeout { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, err: &std::io::Error, what: &str) -> Self {
        Self::Io {
            path: Some(path.into()),
            kind: err.kind(),
            message: format!("{what}: {err}"),
        }
    }
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" in {}", path.display()),
        None => String::new(),
    }
}

/// Convert std::io::Error to StoreError::Io
impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for row store operations
pub type StoreResult<T> = Result<T, StoreError>;
