//! # btree — generic file-backed B-tree index
//!
//! Disk-resident ordered-key index for the Driftwood document engine. Maps
//! fixed-width textual keys to fixed-width payloads in a single
//! self-contained file; the key, payload, and node sizes are chosen when the
//! tree is constructed and the fan-out is derived from them.
//!
//! A tree is built in one **write session** (create, insert, close) and
//! served by any number of later **read sessions**. There is no deletion and
//! no in-place update — indexes are rebuilt, not edited.
//!
//! ## File layout
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │ NODE 0 (header)                                │
//! │                                                │
//! │ branch[0] = num_items   branch[1] = num_nodes  │
//! │ branch[2] = root        (other fields unused)  │
//! ├────────────────────────────────────────────────┤
//! │ NODE 1 ..= num_nodes (tree nodes)              │
//! │                                                │
//! │ count (i32) | record slots | branch slots(i64) │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! Every block is exactly [`Geometry::node_size`] bytes and node `n` lives
//! at byte offset `n * node_size`. A branch value of `-1` means "no child";
//! an empty tree has `root = -1`. All integers are **host-endian** — the
//! format is not portable across byte orders.
//!
//! ## Example
//! ```no_run
//! use btree::{BTree, Mode};
//!
//! let mut tree = BTree::new(32, 8);
//! tree.open("products.idx", Mode::Write)?;
//! tree.insert_i64(b"apple", 111)?;
//! tree.close()?;
//!
//! tree.open("products.idx", Mode::Read)?;
//! assert_eq!(tree.retrieve_i64(b"apple"), Some(111));
//! # Ok::<(), btree::BTreeError>(())
//! ```

mod geometry;
mod node;
mod pager;
mod tree;

pub use geometry::{Geometry, DEFAULT_NODE_SIZE};
pub use tree::{BTree, BTreeError, Mode};
