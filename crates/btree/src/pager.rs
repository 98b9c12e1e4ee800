//! Slot-aligned whole-node file I/O.
//!
//! Node identifier `n` maps to byte offset `n * node_size`; every transfer
//! moves exactly one block. A short read or write surfaces as an I/O error.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::geometry::Geometry;
use crate::node::Node;

fn offset(geom: &Geometry, id: i64) -> u64 {
    id as u64 * geom.node_size() as u64
}

/// Reads the block at slot `id` into `node`, reusing its allocations.
pub(crate) fn read_node(
    file: &mut File,
    geom: &Geometry,
    id: i64,
    node: &mut Node,
) -> io::Result<()> {
    file.seek(SeekFrom::Start(offset(geom, id)))?;
    let mut block = vec![0u8; geom.node_size()];
    file.read_exact(&mut block)?;
    node.read_from(&mut block.as_slice())
}

/// Writes `node` as one block into slot `id`.
pub(crate) fn write_node(file: &mut File, geom: &Geometry, id: i64, node: &Node) -> io::Result<()> {
    let mut block = Vec::with_capacity(geom.node_size());
    node.write_to(&mut block)?;
    file.seek(SeekFrom::Start(offset(geom, id)))?;
    file.write_all(&block)
}
