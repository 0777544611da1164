//! Integration tests: descending token keys paged over a real StoreEngine.

use std::cell::{Cell, RefCell};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use proptest::prelude::*;
use rowstore_core::{
    CancelFlag, Config, KeyRange, Row, ScanOptions, Store, StoreEngine, StoreError, StoreResult,
};
use rowstore_paging::{next_key, paginate, CodecConfig, KeyCodec, Paginator, PagingError};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const TOKEN_IDS: [u64; 8] = [1, 101, 2000, 5, 54, 92, 8, 456];

fn tokens() -> KeyCodec {
    KeyCodec::new(CodecConfig::tokens()).unwrap()
}

fn token_store() -> (StoreEngine, TempDir) {
    let dir = TempDir::new().unwrap();
    let engine = StoreEngine::open(dir.path(), Config::buffered()).unwrap();
    let codec = tokens();
    for id in TOKEN_IDS {
        engine.put(codec.encode(id).unwrap().as_bytes(), b"test").unwrap();
    }
    // rows outside the namespace must never show up
    engine.put(b"row1", b"other").unwrap();
    engine.put(b"tokens", b"other").unwrap();
    (engine, dir)
}

fn ids(codec: &KeyCodec, rows: &[Row]) -> Vec<u64> {
    rows.iter().map(|r| codec.decode(&r.key).unwrap()).collect()
}

/// Store wrapper that records every scan start and can fail one scan call.
struct Recording<'a> {
    inner: &'a StoreEngine,
    starts: RefCell<Vec<Vec<u8>>>,
    calls: Cell<usize>,
    fail_call: Option<(usize, StoreError)>,
}

impl<'a> Recording<'a> {
    fn new(inner: &'a StoreEngine) -> Self {
        Self { inner, starts: RefCell::new(Vec::new()), calls: Cell::new(0), fail_call: None }
    }

    fn failing(inner: &'a StoreEngine, call: usize, err: StoreError) -> Self {
        Self { fail_call: Some((call, err)), ..Self::new(inner) }
    }
}

impl Store for Recording<'_> {
    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.inner.put(key, value)
    }

    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn scan_range(
        &self,
        range: &KeyRange,
        limit: usize,
        options: &ScanOptions,
        visit: &mut dyn FnMut(&[u8], &[u8]) -> bool,
    ) -> StoreResult<()> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        self.starts.borrow_mut().push(range.start().to_vec());
        if let Some((fail_at, err)) = &self.fail_call {
            if *fail_at == call {
                return Err(err.clone());
            }
        }
        self.inner.scan_range(range, limit, options, visit)
    }
}

// ---------------------------------------------------------------------------
// Key order
// ---------------------------------------------------------------------------

#[test]
fn test_single_scan_reads_ids_descending() {
    let (engine, _dir) = token_store();
    let codec = tokens();

    let rows: Vec<Row> = Paginator::new(&engine, codec.range(), 100)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(ids(&codec, &rows), vec![2000, 456, 101, 92, 54, 8, 5, 1]);
}

#[test]
fn test_point_reads_through_codec() {
    let (engine, _dir) = token_store();
    let codec = tokens();

    let key = codec.encode_raw("token:456").unwrap();
    assert_eq!(engine.get(key.as_bytes()).unwrap(), Some(b"test".to_vec()));
    let missing = codec.encode(457).unwrap();
    assert_eq!(engine.get(missing.as_bytes()).unwrap(), None);
}

// ---------------------------------------------------------------------------
// Paging
// ---------------------------------------------------------------------------

#[test]
fn test_pages_of_three_cover_all_tokens() {
    let (engine, _dir) = token_store();
    let codec = tokens();
    let store = Recording::new(&engine);
    let mut pager = Paginator::new(&store, codec.range(), 3).unwrap();

    let mut pages = Vec::new();
    while let Some(page) = pager.next_page().unwrap() {
        pages.push(page);
    }

    let sizes: Vec<usize> = pages.iter().map(|p| p.rows.len()).collect();
    assert_eq!(sizes, vec![3, 3, 2]);

    let all: Vec<Row> = pages.iter().flat_map(|p| p.rows.clone()).collect();
    assert_eq!(ids(&codec, &all), vec![2000, 456, 101, 92, 54, 8, 5, 1]);

    // page 2 starts just past the third row of page 1; a final scan comes back empty
    let starts = store.starts.borrow();
    assert_eq!(starts.len(), 4);
    assert_eq!(starts[0], b"token:".to_vec());
    assert_eq!(starts[1], next_key(&pages[0].rows[2].key));
    assert_eq!(starts[1], next_key(codec.encode(101).unwrap().as_bytes()));
    assert_eq!(starts[3], next_key(&pages[2].cursor));
}

#[test]
fn test_early_termination_delivers_exactly_k_rows() {
    let (engine, _dir) = token_store();
    let codec = tokens();

    // stop on the 2nd row of the 2nd page
    let mut seen = Vec::new();
    let summary = paginate(&engine, &codec.range(), 3, ScanOptions::default(), |row| {
        seen.push(row);
        seen.len() < 5
    })
    .unwrap();

    assert_eq!(ids(&codec, &seen), vec![2000, 456, 101, 92, 54]);
    assert_eq!(summary.rows, 5);
    assert_eq!(summary.pages, 2);
    assert!(summary.halted);
    assert_eq!(summary.cursor, Some(codec.encode(54).unwrap().into_bytes()));
}

#[test]
fn test_resume_after_restart() {
    let dir = TempDir::new().unwrap();
    let codec = tokens();

    let cursor = {
        let engine = StoreEngine::open(dir.path(), Config::default()).unwrap();
        for id in TOKEN_IDS {
            engine.put(codec.encode(id).unwrap().as_bytes(), b"test").unwrap();
        }
        let mut pager = Paginator::new(&engine, codec.range(), 3).unwrap();
        let first = pager.next_page().unwrap().unwrap();
        assert_eq!(ids(&codec, &first.rows), vec![2000, 456, 101]);
        first.cursor
    };

    let engine = StoreEngine::open(dir.path(), Config::default()).unwrap();
    let rest: Vec<Row> = Paginator::new(&engine, codec.range(), 3)
        .unwrap()
        .resume_after(&cursor)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(ids(&codec, &rest), vec![92, 54, 8, 5, 1]);
}

#[test]
fn test_rows_written_behind_cursor_are_not_revisited() {
    let (engine, _dir) = token_store();
    let codec = tokens();
    let mut pager = Paginator::new(&engine, codec.range(), 2).unwrap();

    let first = pager.next_page().unwrap().unwrap();
    assert_eq!(ids(&codec, &first.rows), vec![2000, 456]);

    // 3000 sorts before the cursor, 50 after it
    engine.put(codec.encode(3000).unwrap().as_bytes(), b"late").unwrap();
    engine.put(codec.encode(50).unwrap().as_bytes(), b"late").unwrap();

    let rest: Vec<Row> = pager.collect::<Result<_, _>>().unwrap();
    assert_eq!(ids(&codec, &rest), vec![101, 92, 54, 50, 8, 5, 1]);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn test_scan_timeout_propagates_and_cursor_resumes() {
    let (engine, _dir) = token_store();
    let codec = tokens();
    let store = Recording::failing(&engine, 2, StoreError::ScanTimeout { delivered: 0 });
    let mut pager = Paginator::new(&store, codec.range(), 3).unwrap();

    let mut seen = Vec::new();
    let err = loop {
        match pager.next() {
            Some(Ok(row)) => seen.push(row),
            Some(Err(err)) => break err,
            None => panic!("expected a timeout"),
        }
    };
    assert!(matches!(err, PagingError::Store(StoreError::ScanTimeout { .. })));
    assert!(err.is_transient());
    assert_eq!(ids(&codec, &seen), vec![2000, 456, 101]);
    assert!(pager.next().is_none());

    // caller-side retry from the last row it actually received
    let cursor = pager.cursor().unwrap().to_vec();
    let rest: Vec<Row> = Paginator::new(&engine, codec.range(), 3)
        .unwrap()
        .resume_after(&cursor)
        .collect::<Result<_, _>>()
        .unwrap();
    seen.extend(rest);
    assert_eq!(ids(&codec, &seen), vec![2000, 456, 101, 92, 54, 8, 5, 1]);
}

#[test]
fn test_unavailable_store_aborts_paginate() {
    let (engine, _dir) = token_store();
    let codec = tokens();
    let store = Recording::failing(
        &engine,
        3,
        StoreError::Unavailable { reason: "emulator restarted".into() },
    );

    let mut seen = 0;
    let err = paginate(&store, &codec.range(), 3, ScanOptions::default(), |_| {
        seen += 1;
        true
    })
    .unwrap_err();
    assert!(matches!(err, PagingError::Store(StoreError::Unavailable { .. })));
    assert_eq!(seen, 6);
    assert_eq!(store.calls.get(), 3);
}

#[test]
fn test_cancel_mid_walk() {
    let (engine, _dir) = token_store();
    let codec = tokens();
    let cancel = CancelFlag::new();
    let options = ScanOptions::default().with_cancel(cancel.clone());

    let mut seen = 0;
    let err = paginate(&engine, &codec.range(), 3, options, |_| {
        seen += 1;
        if seen == 4 {
            cancel.cancel();
        }
        true
    })
    .unwrap_err();

    assert!(err.is_cancelled());
    assert!(matches!(err, PagingError::Store(StoreError::Cancelled { delivered: 1 })));
    assert_eq!(seen, 4);
}

#[test]
fn test_visitor_marks_each_row_through_the_same_store() {
    let (engine, _dir) = token_store();
    let engine = Arc::new(engine);
    let (tx, rx) = mpsc::channel();

    let worker = Arc::clone(&engine);
    std::thread::spawn(move || {
        let codec = tokens();
        let result = paginate(&*worker, &codec.range(), 2, ScanOptions::default(), |row| {
            worker.append(&row.key, b"!").is_ok()
        });
        let _ = tx.send(result.map(|summary| summary.rows));
    });

    let rows = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("paginate with a writing visitor did not finish")
        .unwrap();
    assert_eq!(rows, TOKEN_IDS.len());

    let codec = tokens();
    for id in TOKEN_IDS {
        let key = codec.encode(id).unwrap();
        assert_eq!(engine.get(key.as_bytes()).unwrap(), Some(b"test!".to_vec()));
    }
    assert_eq!(engine.get(b"row1").unwrap(), Some(b"other".to_vec()));
}

#[test]
fn test_malformed_row_is_the_visitors_problem() {
    let (engine, _dir) = token_store();
    let codec = tokens();
    engine.put(b"token:oops!", b"junk").unwrap();

    let mut decoded = Vec::new();
    let mut rejected = Vec::new();
    paginate(&engine, &codec.range(), 4, ScanOptions::default(), |row| {
        match codec.decode(&row.key) {
            Ok(id) => decoded.push(id),
            Err(PagingError::MalformedKey { key, .. }) => rejected.push(key),
            Err(other) => panic!("unexpected {other}"),
        }
        true
    })
    .unwrap();

    assert_eq!(decoded, vec![2000, 456, 101, 92, 54, 8, 5, 1]);
    assert_eq!(rejected, vec!["token:oops!".to_string()]);
}

// ---------------------------------------------------------------------------
// Completeness
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn paging_matches_single_scan(
        id_set in proptest::collection::btree_set(0u64..10_000, 0..40),
        page_size in 1usize..12,
    ) {
        let dir = TempDir::new().unwrap();
        let engine = StoreEngine::open(dir.path(), Config::buffered()).unwrap();
        let codec = tokens();
        for id in &id_set {
            engine.put(codec.encode(*id).unwrap().as_bytes(), b"v").unwrap();
        }

        let mut single = Vec::new();
        engine
            .scan_range(&codec.range(), usize::MAX, &ScanOptions::default(), &mut |k, _| {
                single.push(k.to_vec());
                true
            })
            .unwrap();

        let paged: Vec<Vec<u8>> = Paginator::new(&engine, codec.range(), page_size)
            .unwrap()
            .map(|row| row.map(|r| r.key))
            .collect::<Result<_, _>>()
            .unwrap();

        prop_assert_eq!(&paged, &single);
        let expected: Vec<u64> = id_set.iter().rev().copied().collect();
        let got: Vec<u64> = paged.iter().map(|k| codec.decode(k).unwrap()).collect();
        prop_assert_eq!(got, expected);
    }
}
