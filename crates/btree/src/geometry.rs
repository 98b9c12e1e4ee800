//! Node geometry: fan-out derivation and on-disk block sizing.
//!
//! A node block packs a record count, `max_keys` record slots, and `order`
//! branch slots back to back:
//!
//! ```text
//! [count: i32][record 0..max_keys][branch 0..order (i64 each)]
//! ```
//!
//! The fan-out is derived from the configured node size so that the block
//! fills one disk page as tightly as the record width allows:
//!
//! ```text
//! order = (node_size - 4 + record_size + 8) / (record_size + 8)
//! ```
//!
//! Geometries too coarse for that formula (fewer than three branches per
//! node) are clamped to order 3, in which case the actual block may exceed
//! the requested node size.

/// Width in bytes of one branch slot (a node identifier).
const BRANCH_BYTES: usize = 8;

/// Width in bytes of the per-node record count.
const COUNT_BYTES: usize = 4;

/// Sentinel node identifier: no child / no root.
pub(crate) const NIL: i64 = -1;

/// Default configured node size, aligned to a common disk block.
pub const DEFAULT_NODE_SIZE: usize = 4096;

/// Fixed sizing of one tree: key width, payload width, and the fan-out
/// derived from them. Chosen at construction and immutable afterwards; two
/// sessions can share a file only if they agree on all three inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    key_size: usize,
    data_size: usize,
    order: usize,
}

impl Geometry {
    /// Derives the geometry for `key_size`-byte keys and `data_size`-byte
    /// payloads in nodes of roughly `node_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `key_size` is zero (one byte is always reserved for the
    /// key terminator).
    pub fn new(key_size: usize, data_size: usize, node_size: usize) -> Self {
        assert!(key_size > 0, "key_size must be at least 1");

        let record_size = key_size + data_size;
        // Rearranged to avoid underflow on degenerate node sizes; the
        // result is identical whenever node_size >= 4.
        let calc = (node_size + record_size + BRANCH_BYTES).saturating_sub(COUNT_BYTES)
            / (record_size + BRANCH_BYTES);

        Self {
            key_size,
            data_size,
            order: calc.max(3),
        }
    }

    /// Key width in bytes, terminator slot included.
    pub fn key_size(&self) -> usize {
        self.key_size
    }

    /// Payload width in bytes.
    pub fn data_size(&self) -> usize {
        self.data_size
    }

    /// Width of one record slot: key plus payload.
    pub fn record_size(&self) -> usize {
        self.key_size + self.data_size
    }

    /// Maximum number of children per node.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Maximum number of records per node: `order - 1`.
    pub fn max_keys(&self) -> usize {
        self.order - 1
    }

    /// Minimum number of records per non-root node: `(order - 1) / 2`.
    pub fn min_keys(&self) -> usize {
        (self.order - 1) / 2
    }

    /// Exact size in bytes of one node block on disk. Node `n` lives at
    /// byte offset `n * node_size()`.
    pub fn node_size(&self) -> usize {
        COUNT_BYTES + self.max_keys() * self.record_size() + self.order * BRANCH_BYTES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_geometry() {
        let geom = Geometry::new(32, 8, DEFAULT_NODE_SIZE);
        // record = 40, branch = 8: (4096 - 4 + 40 + 8) / 48 = 86
        assert_eq!(geom.order(), 86);
        assert_eq!(geom.max_keys(), 85);
        assert_eq!(geom.min_keys(), 42);
        assert!(geom.node_size() <= DEFAULT_NODE_SIZE);
    }

    #[test]
    fn small_records_give_high_order() {
        let geom = Geometry::new(8, 8, DEFAULT_NODE_SIZE);
        assert!(geom.order() > 50);
    }

    #[test]
    fn large_records_still_meet_minimum_order() {
        let geom = Geometry::new(256, 256, DEFAULT_NODE_SIZE);
        assert!(geom.order() >= 3);
    }

    #[test]
    fn small_node_geometry() {
        let geom = Geometry::new(16, 8, 256);
        // record = 24: (256 - 4 + 24 + 8) / 32 = 8
        assert_eq!(geom.order(), 8);
        assert_eq!(geom.max_keys(), 7);
        assert_eq!(geom.min_keys(), 3);
        assert_eq!(geom.node_size(), 4 + 7 * 24 + 8 * 8);
    }

    #[test]
    fn degenerate_node_size_clamps_to_order_three() {
        let geom = Geometry::new(32, 8, 16);
        assert_eq!(geom.order(), 3);
        // The clamped block no longer fits the requested node size.
        assert!(geom.node_size() > 16);
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = Geometry::new(16, 8, 256);
        let b = Geometry::new(16, 8, 256);
        assert_eq!(a, b);
        assert_eq!(a.node_size(), b.node_size());
    }

    #[test]
    #[should_panic]
    fn zero_key_size_panics() {
        Geometry::new(0, 8, DEFAULT_NODE_SIZE);
    }
}
