//! One bounded ascending scan.

use rowstore_core::{KeyRange, Row, ScanOptions, Store};
use tracing::debug;

use crate::error::{PagingError, Result};

/// Result of a single [`RangeScanner::scan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Key of the last row handed to the visitor
    pub last_key: Option<Vec<u8>>,
    /// Rows handed to the visitor
    pub count: usize,
    /// The visitor asked to stop
    pub halted: bool,
}

/// Runs bounded scans against a store, one request per call.
///
/// The scanner never interprets row contents; decoding failures inside
/// the visitor are the visitor's business.
#[derive(Debug)]
pub struct RangeScanner<S> {
    store: S,
    options: ScanOptions,
}

impl<S: Store> RangeScanner<S> {
    pub fn new(store: S) -> Self {
        Self::with_options(store, ScanOptions::default())
    }

    pub fn with_options(store: S, options: ScanOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Visit up to `limit` rows of `range` in ascending key order.
    ///
    /// Stops at `limit`, when `visit` returns `false` (that row still
    /// counts as visited), or when the range runs out. Store failures
    /// abort the scan and are returned as-is.
    pub fn scan<F>(&self, range: &KeyRange, limit: usize, mut visit: F) -> Result<ScanOutcome>
    where
        F: FnMut(Row) -> bool,
    {
        if limit == 0 {
            return Err(PagingError::InvalidPageSize);
        }

        let mut outcome = ScanOutcome::default();
        self.store.scan_range(range, limit, &self.options, &mut |key, value| {
            outcome.count += 1;
            outcome.last_key = Some(key.to_vec());
            let keep_going = visit(Row::new(key, value));
            outcome.halted = !keep_going;
            keep_going
        })?;

        debug!(
            start = %String::from_utf8_lossy(range.start()),
            limit,
            count = outcome.count,
            halted = outcome.halted,
            "range scan finished"
        );
        Ok(outcome)
    }
}
