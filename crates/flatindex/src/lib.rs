//! # flatindex — sorted-array binary-search index
//!
//! The simple sibling of the `btree` crate: a **build-once, read-many**
//! index mapping fixed-width textual ids to `i64` payloads. Records are
//! buffered in memory, sorted once, and persisted as a packed array; every
//! lookup is a binary search over the file, reading one record per probe.
//!
//! ## File layout
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ record count (u64)                      │
//! ├─────────────────────────────────────────┤
//! │ record 0: id[64] | payload (i64)        │
//! │ record 1: id[64] | payload (i64)        │
//! │ ... sorted by id, packed, no padding ...│
//! └─────────────────────────────────────────┘
//! ```
//!
//! Ids follow C-string semantics: at most 63 significant bytes, zero
//! padded, compared up to the first NUL. All integers are **host-endian**
//! and the count prefix is a platform word — the format is not portable
//! across byte orders.
//!
//! ## Example
//! ```no_run
//! use flatindex::FlatIndex;
//!
//! let mut index = FlatIndex::new();
//! index.add_record(b"PROD-0042", 7);
//! index.add_record(b"PROD-0001", 3);
//! index.build("products.fidx")?; // sorts, persists, reopens for read
//! assert_eq!(index.lookup(b"PROD-0042"), Some(7));
//! # Ok::<(), flatindex::FlatIndexError>(())
//! ```

use std::cmp::Ordering;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

/// Maximum stored id width in bytes, terminator slot included.
pub const MAX_ID_LEN: usize = 64;

/// Packed on-disk record width: id bytes plus the `i64` payload.
pub const RECORD_BYTES: usize = MAX_ID_LEN + 8;

/// Width of the record-count prefix.
const HEADER_BYTES: u64 = 8;

#[derive(Debug, Error)]
pub enum FlatIndexError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("no records buffered to build")]
    NoRecords,
}

/// Significant bytes of an id buffer: everything before the first NUL.
fn id_str(buf: &[u8]) -> &[u8] {
    match buf.iter().position(|&b| b == 0) {
        Some(end) => &buf[..end],
        None => buf,
    }
}

/// Copies `input` into a zero-filled id buffer, keeping at most
/// `MAX_ID_LEN - 1` bytes. Input past an embedded NUL is ignored.
fn normalize_id(input: &[u8]) -> [u8; MAX_ID_LEN] {
    let mut id = [0u8; MAX_ID_LEN];
    let significant = id_str(input);
    let len = significant.len().min(MAX_ID_LEN - 1);
    id[..len].copy_from_slice(&significant[..len]);
    id
}

#[derive(Debug, Clone)]
struct IdRecord {
    id: [u8; MAX_ID_LEN],
    payload: i64,
}

/// A sorted-array index session.
///
/// Build phase: [`add_record`](FlatIndex::add_record) buffers entries in
/// memory, [`build`](FlatIndex::build) sorts and persists them and reopens
/// the file for reading. Read phase: [`lookup`](FlatIndex::lookup) binary
/// searches the file with one record read per probe.
pub struct FlatIndex {
    buffer: Vec<IdRecord>,
    file: Option<File>,
    record_count: usize,
}

impl FlatIndex {
    pub fn new() -> Self {
        FlatIndex {
            buffer: Vec::new(),
            file: None,
            record_count: 0,
        }
    }

    /// Buffers one record for a later [`build`](FlatIndex::build). The id
    /// is normalized like a B-tree key (truncated to fit, NUL-terminated).
    pub fn add_record(&mut self, id: &[u8], payload: i64) {
        self.buffer.push(IdRecord {
            id: normalize_id(id),
            payload,
        });
    }

    /// Sorts the buffered records by id and writes them to `path` as a
    /// count-prefixed packed array, then reopens the file for reading.
    /// The in-memory buffer is consumed.
    ///
    /// The sort is stable, so of two records sharing an id the one added
    /// first stays first.
    ///
    /// # Errors
    ///
    /// [`FlatIndexError::NoRecords`] when nothing was buffered, or an I/O
    /// error from writing or reopening.
    pub fn build<P: AsRef<Path>>(&mut self, path: P) -> Result<(), FlatIndexError> {
        if self.buffer.is_empty() {
            return Err(FlatIndexError::NoRecords);
        }

        self.buffer.sort_by(|a, b| id_str(&a.id).cmp(id_str(&b.id)));

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        let mut w = BufWriter::new(file);
        w.write_u64::<NativeEndian>(self.buffer.len() as u64)?;
        for rec in &self.buffer {
            w.write_all(&rec.id)?;
            w.write_i64::<NativeEndian>(rec.payload)?;
        }
        let file = w.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        self.buffer.clear();
        self.open(path)
    }

    /// Opens an existing index file for lookups. Any previous session is
    /// closed first; a failed open leaves the session fully closed.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<(), FlatIndexError> {
        self.close();

        let mut file = File::open(path)?;
        let count = file.read_u64::<NativeEndian>()?;
        self.record_count = count as usize;
        self.file = Some(file);
        Ok(())
    }

    /// Closes the session. A no-op when already closed.
    pub fn close(&mut self) {
        self.file = None;
        self.record_count = 0;
    }

    /// Returns the payload stored under `id`, or `None` when the id is
    /// absent, the session is closed, or the file misbehaves. Lookups
    /// never fail loudly.
    pub fn lookup(&mut self, id: &[u8]) -> Option<i64> {
        if self.record_count == 0 {
            return None;
        }
        let target = normalize_id(id);
        self.binary_search(&target)
    }

    /// Whether `id` is present. Same walk as [`lookup`](FlatIndex::lookup).
    pub fn contains(&mut self, id: &[u8]) -> bool {
        self.lookup(id).is_some()
    }

    /// Number of records in the open index file.
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Whether a session is currently open.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn binary_search(&mut self, target: &[u8; MAX_ID_LEN]) -> Option<i64> {
        let file = self.file.as_mut()?;
        let mut left = 0u64;
        let mut right = self.record_count as u64;
        let mut id = [0u8; MAX_ID_LEN];

        while left < right {
            let mid = left + (right - left) / 2;
            let pos = HEADER_BYTES + mid * RECORD_BYTES as u64;
            file.seek(SeekFrom::Start(pos)).ok()?;
            file.read_exact(&mut id).ok()?;

            match id_str(target).cmp(id_str(&id)) {
                Ordering::Equal => return file.read_i64::<NativeEndian>().ok(),
                Ordering::Less => right = mid,
                Ordering::Greater => left = mid + 1,
            }
        }
        None
    }
}

impl Default for FlatIndex {
    fn default() -> Self {
        Self::new()
    }
}
