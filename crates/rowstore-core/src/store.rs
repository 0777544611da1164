//! The `Store` seam: point write, point read and ascending range scan.
//!
//! Anything that can serve these three calls over raw byte-string keys can
//! sit underneath the paging layer. [`StoreEngine`](crate::StoreEngine) is
//! the in-process implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{StoreError, StoreResult};
use crate::range::KeyRange;

/// One stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Row {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Per-scan limits supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Abort with `ScanTimeout` once this instant has passed
    pub deadline: Option<Instant>,
    /// Abort with `Cancelled` once raised
    pub cancel: Option<CancelFlag>,
}

impl ScanOptions {
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Called by stores before delivering each row.
    ///
    /// `delivered` is the number of rows already handed to the visitor.
    pub fn check(&self, delivered: usize) -> StoreResult<()> {
        if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
            return Err(StoreError::Cancelled { delivered });
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(StoreError::ScanTimeout { delivered });
        }
        Ok(())
    }
}

/// Minimal ordered key-value contract.
pub trait Store {
    /// Write `value` under `key`, overwriting any previous row.
    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Read the row under `key`; `None` when absent.
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Deliver rows inside `range` to `visit` in ascending byte order.
    ///
    /// Stops after `limit` rows, when `visit` returns `false`, or when the
    /// range is exhausted. Never calls `visit` again after it returned
    /// `false`. `options` is checked before each row.
    fn scan_range(
        &self,
        range: &KeyRange,
        limit: usize,
        options: &ScanOptions,
        visit: &mut dyn FnMut(&[u8], &[u8]) -> bool,
    ) -> StoreResult<()>;
}

impl<S: Store + ?Sized> Store for &S {
    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn scan_range(
        &self,
        range: &KeyRange,
        limit: usize,
        options: &ScanOptions,
        visit: &mut dyn FnMut(&[u8], &[u8]) -> bool,
    ) -> StoreResult<()> {
        (**self).scan_range(range, limit, options, visit)
    }
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn scan_range(
        &self,
        range: &KeyRange,
        limit: usize,
        options: &ScanOptions,
        visit: &mut dyn FnMut(&[u8], &[u8]) -> bool,
    ) -> StoreResult<()> {
        (**self).scan_range(range, limit, options, visit)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_default_options_never_abort() {
        assert!(ScanOptions::default().check(1_000).is_ok());
    }

    #[test]
    fn test_cancel_flag_shared_between_clones() {
        let flag = CancelFlag::new();
        let options = ScanOptions::default().with_cancel(flag.clone());
        assert!(options.check(0).is_ok());

        flag.cancel();
        assert!(matches!(options.check(2), Err(StoreError::Cancelled { delivered: 2 })));
    }

    #[test]
    fn test_expired_deadline_times_out() {
        let past = Instant::now() - Duration::from_millis(5);
        let options = ScanOptions::default().with_deadline(past);
        assert!(matches!(options.check(0), Err(StoreError::ScanTimeout { delivered: 0 })));

        let future = Instant::now() + Duration::from_secs(60);
        assert!(ScanOptions::default().with_deadline(future).check(0).is_ok());
    }
}
