//! The B-tree session: lifecycle, insertion, and lookup.
//!
//! A [`BTree`] owns one file handle and one working node buffer. Opening in
//! [`Mode::Write`] truncates the file and starts an empty tree; opening in
//! [`Mode::Read`] loads the counters from the header block. The header is
//! rewritten on close, so a tree is only readable after a clean close.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::geometry::{Geometry, DEFAULT_NODE_SIZE, NIL};
use crate::node::{self, Node, Record};
use crate::pager;

#[derive(Debug, Error)]
pub enum BTreeError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("tree is not open for writing")]
    NotWritable,
    #[error("duplicate key")]
    DuplicateKey,
    #[error("payload is {len} bytes but the tree stores {max}")]
    DataTooLarge { len: usize, max: usize },
}

/// Session mode, fixed at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
}

/// A file-backed B-tree index session.
///
/// The struct itself is cheap to create; no file is touched until
/// [`open`](BTree::open). One instance can serve many open/close cycles,
/// and an open session is closed on drop.
pub struct BTree {
    geom: Geometry,
    file: Option<File>,
    mode: Mode,
    root: i64,
    num_items: i64,
    num_nodes: i64,
    /// Working buffer shared by lookup and the insert recursion. Stale
    /// after any deeper call; reload before reading it again.
    current: Node,
}

impl BTree {
    /// A tree with `key_size`-byte keys, `data_size`-byte payloads, and the
    /// default node size.
    pub fn new(key_size: usize, data_size: usize) -> Self {
        Self::with_node_size(key_size, data_size, DEFAULT_NODE_SIZE)
    }

    /// Same as [`new`](BTree::new) with an explicit node size.
    pub fn with_node_size(key_size: usize, data_size: usize, node_size: usize) -> Self {
        let geom = Geometry::new(key_size, data_size, node_size);
        BTree {
            current: Node::new(&geom),
            geom,
            file: None,
            mode: Mode::Read,
            root: NIL,
            num_items: 0,
            num_nodes: 0,
        }
    }

    /// Opens a tree file. `Mode::Write` creates or truncates the file and
    /// initializes an empty tree; `Mode::Read` opens an existing file and
    /// loads its header. Any previously open session is closed first.
    ///
    /// A failed open leaves the session fully closed.
    pub fn open<P: AsRef<Path>>(&mut self, path: P, mode: Mode) -> Result<(), BTreeError> {
        self.close()?;
        self.mode = mode;

        match mode {
            Mode::Read => {
                self.file = Some(File::open(path)?);
                if let Err(err) = self.load_header() {
                    self.reset();
                    return Err(err.into());
                }
            }
            Mode::Write => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(path)?;
                self.file = Some(file);
                self.root = NIL;
                self.num_items = 0;
                self.num_nodes = 0;
                if let Err(err) = self.write_header() {
                    self.reset();
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }

    /// Closes the session, rewriting the header first when writing. A
    /// no-op when already closed; also runs on drop.
    pub fn close(&mut self) -> Result<(), BTreeError> {
        if self.file.is_none() {
            return Ok(());
        }
        let result = match self.mode {
            Mode::Write => self.write_header(),
            Mode::Read => Ok(()),
        };
        self.reset();
        result.map_err(BTreeError::Io)
    }

    /// Stores `data` under `key`.
    ///
    /// The key keeps at most `key_size - 1` bytes (excess input is
    /// truncated, and an embedded NUL ends the key); the payload is
    /// zero-padded to `data_size` bytes.
    ///
    /// # Errors
    ///
    /// [`BTreeError::NotWritable`] outside an open write session,
    /// [`BTreeError::DuplicateKey`] if the key is already present (detected
    /// before any node is touched), [`BTreeError::DataTooLarge`] if the
    /// payload exceeds `data_size`, or an I/O error.
    pub fn insert(&mut self, key: &[u8], data: &[u8]) -> Result<(), BTreeError> {
        if self.file.is_none() || self.mode != Mode::Write {
            return Err(BTreeError::NotWritable);
        }
        if data.len() > self.geom.data_size() {
            return Err(BTreeError::DataTooLarge {
                len: data.len(),
                max: self.geom.data_size(),
            });
        }

        let record = Record::new(&self.geom, key, data);

        if let Some((promoted, promoted_right)) = self.push_down(&record, self.root)? {
            // The promotion reached the top: grow a new root above the old
            // one (or above nothing, for the very first insert).
            let mut new_root = Node::new(&self.geom);
            new_root.count = 1;
            new_root.records[0] = promoted;
            new_root.branches[0] = self.root;
            new_root.branches[1] = promoted_right;

            self.num_nodes += 1;
            let id = self.num_nodes;
            let file = self.file.as_mut().ok_or_else(Self::not_open)?;
            pager::write_node(file, &self.geom, id, &new_root)?;
            self.root = id;
        }

        self.num_items += 1;
        Ok(())
    }

    /// Convenience wrapper storing an `i64` payload in host byte order.
    pub fn insert_i64(&mut self, key: &[u8], value: i64) -> Result<(), BTreeError> {
        self.insert(key, &value.to_ne_bytes())
    }

    /// Returns the payload stored under `key`, or `None` when the key is
    /// absent, the session is closed, or the file misbehaves. Lookups
    /// never fail loudly.
    pub fn retrieve(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        self.file.as_ref()?;
        let target = node::normalize_key(key, self.geom.key_size());

        let mut current = self.root;
        while current != NIL {
            if self.load(current).is_err() {
                return None;
            }
            let (found, location) = self.current.search(&target);
            if found {
                return Some(self.current.records[location as usize].data.clone());
            }
            current = self.current.branches[(location + 1) as usize];
        }
        None
    }

    /// Convenience wrapper decoding an `i64` payload in host byte order.
    pub fn retrieve_i64(&mut self, key: &[u8]) -> Option<i64> {
        let data = self.retrieve(key)?;
        let bytes: [u8; 8] = data.get(..8)?.try_into().ok()?;
        Some(i64::from_ne_bytes(bytes))
    }

    /// Whether `key` is present. Same walk as [`retrieve`](BTree::retrieve).
    pub fn contains(&mut self, key: &[u8]) -> bool {
        self.retrieve(key).is_some()
    }

    /// Number of records in the tree.
    pub fn size(&self) -> i64 {
        self.num_items
    }

    /// Whether the tree holds no records.
    pub fn is_empty(&self) -> bool {
        self.root == NIL
    }

    /// Whether a session is currently open.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Maximum number of children per node.
    pub fn order(&self) -> usize {
        self.geom.order()
    }

    /// Maximum number of records per node.
    pub fn max_keys(&self) -> usize {
        self.geom.max_keys()
    }

    /// Minimum number of records per non-root node.
    pub fn min_keys(&self) -> usize {
        self.geom.min_keys()
    }

    /// Key width in bytes.
    pub fn key_size(&self) -> usize {
        self.geom.key_size()
    }

    /// Payload width in bytes.
    pub fn data_size(&self) -> usize {
        self.geom.data_size()
    }

    /// Exact on-disk block size; the file holds `num_nodes + 1` such
    /// blocks after a clean close.
    pub fn node_size(&self) -> usize {
        self.geom.node_size()
    }

    fn reset(&mut self) {
        self.file = None;
        self.root = NIL;
        self.num_items = 0;
        self.num_nodes = 0;
    }

    fn not_open() -> io::Error {
        io::Error::new(io::ErrorKind::NotConnected, "index file is not open")
    }

    fn load(&mut self, id: i64) -> io::Result<()> {
        let file = self.file.as_mut().ok_or_else(Self::not_open)?;
        pager::read_node(file, &self.geom, id, &mut self.current)
    }

    fn store(&mut self, id: i64) -> io::Result<()> {
        let file = self.file.as_mut().ok_or_else(Self::not_open)?;
        pager::write_node(file, &self.geom, id, &self.current)
    }

    fn load_header(&mut self) -> io::Result<()> {
        self.load(0)?;
        self.num_items = self.current.branches[0];
        self.num_nodes = self.current.branches[1];
        self.root = self.current.branches[2];
        Ok(())
    }

    fn write_header(&mut self) -> io::Result<()> {
        let mut header = Node::new(&self.geom);
        header.branches[0] = self.num_items;
        header.branches[1] = self.num_nodes;
        header.branches[2] = self.root;
        let file = self.file.as_mut().ok_or_else(Self::not_open)?;
        pager::write_node(file, &self.geom, 0, &header)
    }

    /// Recursive insert. Descends to the leaf level, then propagates the
    /// record (or a split's promoted median) back up. Returns the
    /// `(record, right branch)` pair still looking for a home, or `None`
    /// once it has been absorbed.
    fn push_down(&mut self, record: &Record, node_id: i64) -> Result<Option<(Record, i64)>, BTreeError> {
        if node_id == NIL {
            // Fell off a leaf; the record moves up into the parent.
            return Ok(Some((record.clone(), NIL)));
        }

        self.load(node_id)?;
        let (found, location) = self.current.search(&record.key);
        if found {
            return Err(BTreeError::DuplicateKey);
        }

        let child = self.current.branches[(location + 1) as usize];
        let promoted = self.push_down(record, child)?;

        let Some((new_record, new_right)) = promoted else {
            return Ok(None);
        };

        // The recursion clobbered the working buffer; re-read this node
        // before touching it.
        self.load(node_id)?;
        if (self.current.count as usize) < self.geom.max_keys() {
            self.current
                .insert_at((location + 1) as usize, new_record, new_right);
            self.store(node_id)?;
            Ok(None)
        } else {
            self.split(new_record, new_right, node_id, location).map(Some)
        }
    }

    /// Splits the full node `node_id` while inserting `record` at gap
    /// `location`. Writes both halves and returns the promoted median and
    /// the new right node's identifier.
    fn split(
        &mut self,
        record: Record,
        right_branch: i64,
        node_id: i64,
        location: i32,
    ) -> Result<(Record, i64), BTreeError> {
        let max_keys = self.geom.max_keys();
        let min_keys = self.geom.min_keys() as i32;
        // Bias the median so the incoming record lands in the lighter
        // half; both halves end up meeting the minimum.
        let median = if location < min_keys {
            min_keys as usize
        } else {
            min_keys as usize + 1
        };

        self.load(node_id)?;
        let mut right = Node::new(&self.geom);

        for j in median..max_keys {
            std::mem::swap(&mut right.records[j - median], &mut self.current.records[j]);
            right.branches[j - median + 1] = self.current.branches[j + 1];
        }
        right.count = (max_keys - median) as i32;
        self.current.count = median as i32;

        if location < min_keys {
            self.current
                .insert_at((location + 1) as usize, record, right_branch);
        } else {
            right.insert_at(location as usize + 1 - median, record, right_branch);
        }

        // The left half's last record is the one that moves up.
        let last = self.current.count as usize - 1;
        let promoted = self.current.records[last].clone();
        right.branches[0] = self.current.branches[last + 1];
        self.current.count -= 1;

        self.store(node_id)?;

        self.num_nodes += 1;
        let new_id = self.num_nodes;
        let file = self.file.as_mut().ok_or_else(Self::not_open)?;
        pager::write_node(file, &self.geom, new_id, &right)?;
        Ok((promoted, new_id))
    }
}

impl Drop for BTree {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
