//! Error types for key encoding and pagination.

use rowstore_core::StoreError;
use thiserror::Error as ThisError;

#[derive(Debug, Clone, ThisError)]
pub enum PagingError {
    /// Identifier outside `[0, max_value)`
    #[error("identifier {id} outside [0, {max_value})")]
    InvalidIdentifier { id: u64, max_value: u64 },

    /// `max_value - id` needs more digits than the configured width
    #[error("value {value} needs {digits} digits, width is {width}")]
    WidthOverflow { value: u64, digits: usize, width: usize },

    /// Key is not `<tag><width digits>` or decodes outside the id range
    #[error("malformed key {key:?}: {reason}")]
    MalformedKey { key: String, reason: String },

    #[error("page size must be at least 1")]
    InvalidPageSize,

    #[error("invalid codec config: {0}")]
    InvalidConfig(String),

    /// Failure reported by the underlying store
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PagingError {
    pub(crate) fn malformed(key: &[u8], reason: impl Into<String>) -> Self {
        Self::MalformedKey {
            key: String::from_utf8_lossy(key).into_owned(),
            reason: reason.into(),
        }
    }

    /// True when the caller cancelled the scan.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Store(StoreError::Cancelled { .. }))
    }

    /// True for store failures worth retrying from the last persisted cursor.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_transient())
    }
}

pub type Result<T> = std::result::Result<T, PagingError>;
