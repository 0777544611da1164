//! Core storage engine.
//!
//! StoreEngine keeps every row in an ordered in-memory map and makes each
//! mutation crash-safe through the WAL before applying it.
//!
//! **Read path**: RAM only, under a shared `RwLock` read guard
//! **Write path**: WAL append (and sync, per config), then RAM
//! **Scans**: ascending `BTreeMap` range walk in chunks of at most
//! `SCAN_CHUNK` rows; each chunk is copied out and the read guard dropped
//! before the visitor runs, so visitors may write to the same store

use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, trace};

use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::format::Operation;
use crate::range::KeyRange;
use crate::store::{ScanOptions, Store};
use crate::wal::{WalReader, WalWriter};

/// Rows copied out of the map per read-lock acquisition during a scan.
const SCAN_CHUNK: usize = 256;

/// Ordered row store: RAM `BTreeMap` + WAL.
///
/// All methods take `&self`. Readers share the map; writers serialize on
/// the WAL mutex and then briefly take the map's write lock.
pub struct StoreEngine {
    rows: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    wal: Mutex<WalWriter>,
    closed: AtomicBool,
    path: PathBuf,
}

impl StoreEngine {
    /// Open or create a store at `path`, replaying its WAL.
    pub fn open<P: AsRef<Path>>(path: P, config: Config) -> StoreResult<Self> {
        config.validate()?;

        let path = path.as_ref().to_path_buf();
        let wal_dir = path.join("wal");
        std::fs::create_dir_all(&wal_dir)
            .map_err(|e| StoreError::io(&wal_dir, &e, "failed to create WAL directory"))?;

        let entries = WalReader::new(&wal_dir).recover_entries()?;
        let replayed = entries.len();
        let mut rows = BTreeMap::new();
        for entry in entries {
            apply(&mut rows, entry.operation, entry.key, entry.value);
        }

        if replayed > 0 {
            info!(
                entries = replayed,
                rows = rows.len(),
                wal = %wal_dir.display(),
                "recovered rows from WAL"
            );
        }

        let wal = WalWriter::new(&wal_dir, &config)?;

        Ok(Self {
            rows: RwLock::new(rows),
            wal: Mutex::new(wal),
            closed: AtomicBool::new(false),
            path,
        })
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable {
                reason: format!("store at {} has been shut down", self.path.display()),
            });
        }
        Ok(())
    }

    /// Log `op` and then apply it to RAM. RAM is untouched if the WAL fails.
    fn mutate(&self, key: &[u8], value: &[u8], op: Operation) -> StoreResult<()> {
        self.ensure_open()?;
        let mut wal = self.wal.lock();
        wal.append(key, value, op)?;
        let mut rows = self.rows.write();
        apply(&mut rows, op, key.to_vec(), value.to_vec());
        Ok(())
    }

    /// Write a row, overwriting any existing value.
    pub fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.mutate(key, value, Operation::Put)
    }

    /// Read a row.
    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        Ok(self.rows.read().get(key).cloned())
    }

    /// Delete a row. Deleting a missing key is a no-op but is still logged.
    pub fn delete(&self, key: &[u8]) -> StoreResult<()> {
        self.mutate(key, &[], Operation::Delete)
    }

    /// Read-modify-write: append `suffix` to the row's value, creating the
    /// row when missing. Returns the value after the append.
    ///
    /// The WAL mutex is held across the read and the write, so concurrent
    /// appends to one row never lose bytes.
    pub fn append(&self, key: &[u8], suffix: &[u8]) -> StoreResult<Vec<u8>> {
        self.ensure_open()?;
        let mut wal = self.wal.lock();
        wal.append(key, suffix, Operation::Append)?;
        let mut rows = self.rows.write();
        let value = rows.entry(key.to_vec()).or_default();
        value.extend_from_slice(suffix);
        Ok(value.clone())
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.rows.read().contains_key(key)
    }

    /// Number of rows in RAM.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Make every buffered append durable with a single sync.
    pub fn sync_wal(&self) -> StoreResult<()> {
        self.ensure_open()?;
        self.wal.lock().sync()
    }

    /// Store directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sync the WAL and refuse all further calls with `Unavailable`.
    pub fn shutdown(&self) -> StoreResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!(path = %self.path.display(), "shutting down store");
        self.wal.lock().sync()
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

fn apply(rows: &mut BTreeMap<Vec<u8>, Vec<u8>>, op: Operation, key: Vec<u8>, value: Vec<u8>) {
    match op {
        Operation::Put => {
            rows.insert(key, value);
        }
        Operation::Delete => {
            rows.remove(&key);
        }
        Operation::Append => {
            rows.entry(key).or_default().extend_from_slice(&value);
        }
    }
}

impl Store for StoreEngine {
    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        StoreEngine::put(self, key, value)
    }

    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        StoreEngine::get(self, key)
    }

    fn scan_range(
        &self,
        range: &KeyRange,
        limit: usize,
        options: &ScanOptions,
        visit: &mut dyn FnMut(&[u8], &[u8]) -> bool,
    ) -> StoreResult<()> {
        self.ensure_open()?;
        if limit == 0 || range.is_empty() {
            return Ok(());
        }

        let (start, end) = range.bounds();
        let mut after: Option<Vec<u8>> = None;
        let mut delivered = 0;
        loop {
            let want = (limit - delivered).min(SCAN_CHUNK);
            let lower = match after.as_deref() {
                Some(last) => Bound::Excluded(last),
                None => start,
            };
            let chunk: Vec<(Vec<u8>, Vec<u8>)> = self
                .rows
                .read()
                .range::<[u8], _>((lower, end))
                .take(want)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let exhausted = chunk.len() < want;

            for (key, value) in &chunk {
                options.check(delivered)?;
                trace!(key = ?String::from_utf8_lossy(key), "delivering row");
                delivered += 1;
                if !visit(key, value) || delivered == limit {
                    return Ok(());
                }
            }

            match chunk.into_iter().next_back() {
                Some((last, _)) if !exhausted => after = Some(last),
                _ => return Ok(()),
            }
        }
    }
}

impl Drop for StoreEngine {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Acquire) {
            let _ = self.wal.get_mut().sync();
        }
    }
}
