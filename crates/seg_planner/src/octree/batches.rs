//! Batch partitioning for external per-batch jobs.
//!
//! Post-hoc jobs (segment size collection, evaluation) walk the tree in
//! independent batches. The tree is cut at a batch level: chunks above it are
//! handled together, and every chunk at the batch level roots one batch whose
//! subtree is re-iterated with [`ChunkGrid::chunks_from`].

use super::{Chunk, ChunkGrid};

/// Starting batch level for partitioning.
pub const DEFAULT_PARTITION_MIP: u32 = 3;

/// A level with more chunks than this pushes the cut below it.
pub const MAX_CHUNKS_ABOVE_CUT: usize = 50;

/// Result of cutting the tree into batches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchPartition {
  /// Level at which the tree was cut.
  pub batch_mip: u32,
  /// Chunks above the cut, coarsest level first.
  pub high_chunks: Vec<Chunk>,
  /// Roots of the batch subtrees, in grid order.
  pub batch_roots: Vec<Chunk>,
}

impl BatchPartition {
  /// Number of independent batches.
  pub fn len(&self) -> usize {
    self.batch_roots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.batch_roots.is_empty()
  }
}

/// Cut the tree so that no level above the cut is too wide.
///
/// Walking down from the top, the cut moves to the first level whose parent
/// level holds more than [`MAX_CHUNKS_ABOVE_CUT`] chunks, but never below
/// [`DEFAULT_PARTITION_MIP`]. Trees no taller than that form one batch rooted
/// at the top chunk.
pub fn partition_batches(grid: &ChunkGrid) -> BatchPartition {
  let top = grid.top_mip_level();
  if top <= DEFAULT_PARTITION_MIP {
    return BatchPartition {
      batch_mip: top,
      high_chunks: Vec::new(),
      batch_roots: vec![grid.top_chunk()],
    };
  }

  let batch_mip = (DEFAULT_PARTITION_MIP..top)
    .rev()
    .find(|&mip| grid.chunk_count(mip + 1) > MAX_CHUNKS_ABOVE_CUT)
    .unwrap_or(DEFAULT_PARTITION_MIP);

  let high_chunks = ((batch_mip + 1)..=top)
    .rev()
    .flat_map(|mip| level_chunks(grid, mip))
    .collect();

  BatchPartition {
    batch_mip,
    high_chunks,
    batch_roots: level_chunks(grid, batch_mip).collect(),
  }
}

/// All chunks of one level in grid order (x fastest).
pub fn level_chunks(grid: &ChunkGrid, mip: u32) -> impl Iterator<Item = Chunk> + '_ {
  let dims = grid.dims_at(mip);
  let count = if mip > grid.top_mip_level() { 0 } else { dims.z };
  (0..count).flat_map(move |z| {
    (0..dims.y).flat_map(move |y| (0..dims.x).map(move |x| Chunk::new(mip, x, y, z)))
  })
}

#[cfg(test)]
#[path = "batches_test.rs"]
mod batches_test;
