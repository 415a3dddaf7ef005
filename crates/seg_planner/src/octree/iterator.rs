//! Lazy post-order traversal of the chunk octree.
//!
//! Children are yielded before their parent, so every chunk's mip-0
//! descendants appear before it and the top chunk comes last. Within one
//! parent, children follow octant order (x fastest, then y, then z).

use super::{Chunk, ChunkGrid};

/// Lazy, finite, restartable chunk sequence over one subtree.
///
/// Holds only an explicit stack; cloning it forks the traversal.
#[derive(Clone, Debug)]
pub struct ChunkIter<'a> {
  grid: &'a ChunkGrid,
  /// (chunk, children already pushed)
  stack: Vec<(Chunk, bool)>,
}

impl<'a> ChunkIter<'a> {
  pub(crate) fn new(grid: &'a ChunkGrid, root: Chunk) -> Self {
    let mut stack = Vec::with_capacity(8 * (root.mip_level() as usize + 1));
    stack.push((root, false));
    Self { grid, stack }
  }
}

impl Iterator for ChunkIter<'_> {
  type Item = Chunk;

  fn next(&mut self) -> Option<Chunk> {
    loop {
      let (chunk, expanded) = self.stack.pop()?;
      if expanded || chunk.mip_level() == 0 {
        return Some(chunk);
      }

      self.stack.push((chunk, true));
      // Reverse so the lowest octant pops first
      let children = self.grid.children(&chunk);
      self
        .stack
        .extend(children.into_iter().rev().map(|child| (child, false)));
    }
  }
}

#[cfg(test)]
#[path = "iterator_test.rs"]
mod iterator_test;
