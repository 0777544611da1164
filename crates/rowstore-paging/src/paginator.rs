//! Cursor pagination over an ascending-only store.
//!
//! Each page is one bounded scan. The next page starts at
//! [`next_key`](crate::next_key) of the previous page's last key, so pages
//! neither overlap nor skip rows, whatever the page size. The only state
//! carried between pages is that start key; persist [`Paginator::cursor`]
//! and hand it to [`Paginator::resume_after`] to continue after a restart.
//!
//! Pagination is not a snapshot: rows written past the cursor while paging
//! may or may not show up in later pages.

use std::collections::VecDeque;

use rowstore_core::{KeyRange, Row, ScanOptions, Store};
use tracing::debug;

use crate::boundary::next_key;
use crate::error::{PagingError, Result};
use crate::scanner::RangeScanner;

/// Page buffers never preallocate more rows than this.
const PREALLOC_LIMIT: usize = 1024;

/// Rows returned by one scan, plus the key to resume after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub rows: Vec<Row>,
    /// Key of the last row in `rows`
    pub cursor: Vec<u8>,
}

/// Lazy, finite, forward-only walk over a key range, fetched a page at a time.
///
/// Iterating yields rows; [`next_page`](Self::next_page) yields whole pages.
/// Dropping the paginator or simply not pulling further stops the walk.
/// After an error the paginator is exhausted.
#[derive(Debug)]
pub struct Paginator<S> {
    scanner: RangeScanner<S>,
    range: KeyRange,
    page_size: usize,
    /// Inclusive start of the next scan
    next_start: Vec<u8>,
    buffer: VecDeque<Row>,
    cursor: Option<Vec<u8>>,
    pages: usize,
    done: bool,
}

impl<S: Store> Paginator<S> {
    pub fn new(store: S, range: KeyRange, page_size: usize) -> Result<Self> {
        Self::with_options(store, range, page_size, ScanOptions::default())
    }

    /// `options` (deadline, cancel flag) apply to every page's scan.
    pub fn with_options(
        store: S,
        range: KeyRange,
        page_size: usize,
        options: ScanOptions,
    ) -> Result<Self> {
        if page_size == 0 {
            return Err(PagingError::InvalidPageSize);
        }
        Ok(Self {
            scanner: RangeScanner::with_options(store, options),
            next_start: range.start().to_vec(),
            range,
            page_size,
            buffer: VecDeque::new(),
            cursor: None,
            pages: 0,
            done: false,
        })
    }

    /// Continue strictly after `cursor`, a key a previous walk handed out.
    ///
    /// Discards any rows already buffered.
    pub fn resume_after(mut self, cursor: &[u8]) -> Self {
        let after = next_key(cursor);
        self.next_start = after.max(self.range.start().to_vec());
        self.cursor = Some(cursor.to_vec());
        self.buffer.clear();
        self.done = false;
        self
    }

    /// Key of the last row handed to the caller.
    pub fn cursor(&self) -> Option<&[u8]> {
        self.cursor.as_deref()
    }

    /// Scans issued that returned at least one row.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Scan the next page from the store. `None` once a scan comes back empty.
    fn fetch(&mut self) -> Result<Option<Vec<Row>>> {
        if self.done {
            return Ok(None);
        }

        let range = self.range.with_start(self.next_start.clone());
        let mut rows = Vec::with_capacity(self.page_size.min(PREALLOC_LIMIT));
        let outcome = self.scanner.scan(&range, self.page_size, |row| {
            rows.push(row);
            true
        });
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                // the partial page was never handed out; the cursor stays put
                self.done = true;
                return Err(err);
            }
        };

        let Some(last_key) = outcome.last_key else {
            debug!(pages = self.pages, "range exhausted");
            self.done = true;
            return Ok(None);
        };

        self.pages += 1;
        self.next_start = next_key(&last_key);
        debug!(
            page = self.pages,
            rows = rows.len(),
            last_key = %String::from_utf8_lossy(&last_key),
            "fetched page"
        );
        Ok(Some(rows))
    }

    /// The next page: rows still buffered from a partly iterated page, or
    /// a freshly scanned one.
    pub fn next_page(&mut self) -> Result<Option<Page>> {
        let rows = if self.buffer.is_empty() {
            match self.fetch()? {
                Some(rows) => rows,
                None => return Ok(None),
            }
        } else {
            self.buffer.drain(..).collect()
        };

        let cursor = match rows.last() {
            Some(row) => row.key.clone(),
            None => return Ok(None),
        };
        self.cursor = Some(cursor.clone());
        Ok(Some(Page { rows, cursor }))
    }
}

impl<S: Store> Iterator for Paginator<S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() {
            match self.fetch() {
                Ok(Some(rows)) => self.buffer.extend(rows),
                Ok(None) => return None,
                Err(err) => return Some(Err(err)),
            }
        }

        let row = self.buffer.pop_front()?;
        self.cursor = Some(row.key.clone());
        Some(Ok(row))
    }
}

/// Totals from a [`paginate`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginateSummary {
    /// Rows handed to the visitor
    pub rows: usize,
    /// Non-empty pages scanned
    pub pages: usize,
    /// Key of the last row handed to the visitor
    pub cursor: Option<Vec<u8>>,
    /// The visitor stopped the walk
    pub halted: bool,
}

/// Push-style walk: feed every row of `range` to `visit`, `page_size` rows
/// per scan, until the range is exhausted or `visit` returns `false`.
///
/// Store errors abort the walk and are returned without retry; rows the
/// visitor saw before the failure stay seen.
pub fn paginate<S, F>(
    store: S,
    range: &KeyRange,
    page_size: usize,
    options: ScanOptions,
    mut visit: F,
) -> Result<PaginateSummary>
where
    S: Store,
    F: FnMut(Row) -> bool,
{
    if page_size == 0 {
        return Err(PagingError::InvalidPageSize);
    }

    let scanner = RangeScanner::with_options(store, options);
    let mut summary = PaginateSummary::default();
    let mut start = range.start().to_vec();

    loop {
        let outcome = scanner.scan(&range.with_start(start), page_size, &mut visit)?;
        let Some(last_key) = outcome.last_key else {
            break;
        };

        summary.pages += 1;
        summary.rows += outcome.count;
        start = next_key(&last_key);
        summary.cursor = Some(last_key);

        if outcome.halted {
            summary.halted = true;
            break;
        }
    }

    debug!(
        rows = summary.rows,
        pages = summary.pages,
        halted = summary.halted,
        "pagination finished"
    );
    Ok(summary)
}
