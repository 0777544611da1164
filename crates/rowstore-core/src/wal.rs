//! Write-ahead log for the row store
//!
//! The write path is WAL-first: an entry is serialized, appended to the
//! current segment and (under `Durability::Sync`) durably synced before the
//! engine touches its in-memory rows. Recovery replays every segment in
//! sequence order.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::{Config, Durability};
use crate::error::{StoreError, StoreResult};
use crate::format::{
    deserialize_entry, serialize_entry, EntryLimits, Operation, WalEntry, HEADER_SIZE, MAGIC_ARRAY,
};
use crate::platform_durability::durable_sync;

const SEGMENT_PREFIX: &str = "wal-";
const SEGMENT_SUFFIX: &str = ".rows";

fn segment_name(sequence: u64) -> String {
    format!("{SEGMENT_PREFIX}{sequence:016x}{SEGMENT_SUFFIX}")
}

fn parse_segment_name(name: &str) -> Option<u64> {
    let hex = name.strip_prefix(SEGMENT_PREFIX)?.strip_suffix(SEGMENT_SUFFIX)?;
    u64::from_str_radix(hex, 16).ok()
}

/// Appends entries to the current WAL segment.
///
/// `append` must return before the caller updates RAM.
pub struct WalWriter {
    file: File,
    path: PathBuf,
    size: u64,
    wal_dir: PathBuf,
    sequence: u64,
    rotation_size: u64,
    durability: Durability,
    limits: EntryLimits,
}

impl WalWriter {
    /// Open the newest segment in `wal_dir` for appending, creating one if
    /// the directory is empty.
    pub fn new<P: AsRef<Path>>(wal_dir: P, config: &Config) -> StoreResult<Self> {
        let wal_dir = wal_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&wal_dir)
            .map_err(|e| StoreError::io(&wal_dir, &e, "failed to create WAL directory"))?;

        let sequence = Self::find_max_sequence(&wal_dir)?;
        let path = wal_dir.join(segment_name(sequence));
        let file = open_segment(&path)?;
        let size = file
            .metadata()
            .map_err(|e| StoreError::io(&path, &e, "failed to stat WAL segment"))?
            .len();

        Ok(Self {
            file,
            path,
            size,
            wal_dir,
            sequence,
            rotation_size: config.wal_rotation_size_bytes,
            durability: config.durability,
            limits: EntryLimits {
                max_key_size: config.max_key_size,
                max_value_size: config.max_value_size,
            },
        })
    }

    fn find_max_sequence(wal_dir: &Path) -> StoreResult<u64> {
        let entries = std::fs::read_dir(wal_dir)
            .map_err(|e| StoreError::io(wal_dir, &e, "failed to read WAL directory"))?;
        Ok(entries
            .flatten()
            .filter_map(|entry| entry.file_name().to_str().and_then(parse_segment_name))
            .max()
            .unwrap_or(0))
    }

    /// Append one mutation.
    ///
    /// Ordering: serialize (with CRC32C), write, then durable sync when the
    /// writer runs under `Durability::Sync`. Only after this returns `Ok`
    /// may the caller apply the mutation to RAM.
    pub fn append(&mut self, key: &[u8], value: &[u8], op: Operation) -> StoreResult<()> {
        let entry_bytes = serialize_entry(key, value, op, self.limits)?;

        if self.size > 0 && self.size + entry_bytes.len() as u64 > self.rotation_size {
            self.rotate()?;
        }

        self.file
            .write_all(&entry_bytes)
            .map_err(|e| StoreError::io(&self.path, &e, "WAL write failed"))?;

        if self.durability == Durability::Sync {
            self.sync()?;
        }

        self.size += entry_bytes.len() as u64;
        Ok(())
    }

    fn rotate(&mut self) -> StoreResult<()> {
        self.sync()?;

        self.sequence += 1;
        let new_path = self.wal_dir.join(segment_name(self.sequence));
        self.file = open_segment(&new_path)?;
        debug!(segment = %new_path.display(), "rotated WAL segment");
        self.path = new_path;
        self.size = 0;
        Ok(())
    }

    /// Durably sync the current segment without writing an entry.
    pub fn sync(&self) -> StoreResult<()> {
        durable_sync(&self.file).map_err(|e| StoreError::io(&self.path, &e, "WAL sync failed"))
    }

    pub fn current_path(&self) -> &Path {
        &self.path
    }

    pub fn current_size(&self) -> u64 {
        self.size
    }
}

fn open_segment(path: &Path) -> StoreResult<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StoreError::io(path, &e, "failed to open WAL segment"))
}

/// Replays WAL segments for crash recovery.
pub struct WalReader {
    wal_dir: PathBuf,
}

impl WalReader {
    pub fn new<P: AsRef<Path>>(wal_dir: P) -> Self {
        Self { wal_dir: wal_dir.as_ref().to_path_buf() }
    }

    /// Recover all entries from every segment, oldest first.
    ///
    /// Per segment: a bad magic or checksum resyncs at the next magic; an
    /// entry running past end of file is the crash point and ends the segment.
    pub fn recover_entries(&self) -> StoreResult<Vec<WalEntry>> {
        let dir_entries = std::fs::read_dir(&self.wal_dir)
            .map_err(|e| StoreError::io(&self.wal_dir, &e, "failed to read WAL directory"))?;

        let mut segments: Vec<(u64, PathBuf)> = Vec::new();
        for entry in dir_entries {
            let entry = entry
                .map_err(|e| StoreError::io(&self.wal_dir, &e, "failed to read directory entry"))?;
            let path = entry.path();
            let seq = path.file_name().and_then(|n| n.to_str()).and_then(parse_segment_name);
            if let Some(seq) = seq {
                segments.push((seq, path));
            }
        }
        segments.sort();

        let mut all_entries = Vec::new();
        for (_, path) in &segments {
            all_entries.extend(self.recover_segment(path)?);
        }
        Ok(all_entries)
    }

    fn recover_segment(&self, path: &Path) -> StoreResult<Vec<WalEntry>> {
        let mut buffer = Vec::new();
        File::open(path)
            .and_then(|mut file| file.read_to_end(&mut buffer))
            .map_err(|e| StoreError::io(path, &e, "failed to read WAL segment"))?;

        let mut entries = Vec::new();
        let mut offset = 0;

        while offset + HEADER_SIZE <= buffer.len() {
            if buffer[offset..offset + 4] != MAGIC_ARRAY {
                warn!(segment = %path.display(), offset, "bad magic, scanning for next entry");
                match find_next_magic(&buffer, offset + 1) {
                    Some(next) => {
                        offset = next;
                        continue;
                    }
                    None => break,
                }
            }

            match deserialize_entry(&buffer[offset..], path, offset as u64) {
                Ok(entry) => {
                    offset += HEADER_SIZE + entry.header.length as usize;
                    entries.push(entry);
                }
                Err(StoreError::TornWrite { expected_size, available_bytes, .. }) => {
                    warn!(
                        segment = %path.display(),
                        offset,
                        expected_size,
                        available_bytes,
                        "torn write at segment tail, stopping replay"
                    );
                    break;
                }
                Err(err) => {
                    warn!(
                        segment = %path.display(),
                        offset,
                        error = %err,
                        "skipping corrupt WAL entry"
                    );
                    match find_next_magic(&buffer, offset + 1) {
                        Some(next) => offset = next,
                        None => break,
                    }
                }
            }
        }

        Ok(entries)
    }
}

/// Position of the next magic at or after `start`.
fn find_next_magic(buffer: &[u8], start: usize) -> Option<usize> {
    if start >= buffer.len() {
        return None;
    }
    buffer[start..]
        .windows(MAGIC_ARRAY.len())
        .position(|w| w == MAGIC_ARRAY)
        .map(|pos| start + pos)
}
