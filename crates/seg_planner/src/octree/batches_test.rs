use std::collections::HashSet;

use super::*;

/// Shallow trees form a single batch rooted at the top chunk.
#[test]
fn test_shallow_tree_is_one_batch() {
  let grid = ChunkGrid::from_arrays([0, 0, 0, 4 * 64, 4 * 64, 64], [64, 64, 64]).unwrap();
  let partition = partition_batches(&grid);

  assert_eq!(partition.batch_mip, 2);
  assert!(partition.high_chunks.is_empty());
  assert_eq!(partition.batch_roots, vec![grid.top_chunk()]);
}

/// Narrow upper levels keep the default cut at mip 3.
#[test]
fn test_default_cut() {
  // 32x32x1 base grid: top mip 5, mip 4 has 4 chunks, mip 5 has 1
  let grid = ChunkGrid::from_arrays([0, 0, 0, 32 * 64, 32 * 64, 64], [64, 64, 64]).unwrap();
  let partition = partition_batches(&grid);

  assert_eq!(partition.batch_mip, DEFAULT_PARTITION_MIP);
  assert_eq!(partition.len(), grid.chunk_count(3));
  assert_eq!(partition.high_chunks.len(), 4 + 1);
  assert_eq!(partition.high_chunks[0], grid.top_chunk(), "Coarsest level first");
}

/// A wide level above mip 3 moves the cut directly below it.
#[test]
fn test_wide_level_moves_cut_up() {
  // 256x256x1 base grid: mip 5 has 8x8 = 64 chunks (> 50), so cut at mip 4
  let grid = ChunkGrid::from_arrays([0, 0, 0, 256 * 8, 256 * 8, 8], [8, 8, 8]).unwrap();
  assert_eq!(grid.top_mip_level(), 8);
  assert_eq!(grid.chunk_count(5), 64);

  let partition = partition_batches(&grid);

  assert_eq!(partition.batch_mip, 4);
  assert_eq!(partition.len(), grid.chunk_count(4));
  let expected_high: usize = (5..=8).map(|m| grid.chunk_count(m)).sum();
  assert_eq!(partition.high_chunks.len(), expected_high);
  assert!(partition.high_chunks.iter().all(|c| c.mip_level() > 4));
}

/// Batches plus high chunks cover every chunk at or above the cut once.
#[test]
fn test_partition_covers_tree() {
  let grid = ChunkGrid::from_arrays([0, 0, 0, 40 * 32, 24 * 32, 3 * 32], [32, 32, 32]).unwrap();
  let partition = partition_batches(&grid);

  let mut seen: HashSet<Chunk> = partition.high_chunks.iter().copied().collect();
  for root in &partition.batch_roots {
    for chunk in grid.chunks_from(*root).unwrap() {
      assert!(seen.insert(chunk), "Chunk {chunk} appears in two batches");
    }
  }
  let total: usize = (0..=grid.top_mip_level()).map(|m| grid.chunk_count(m)).sum();
  assert_eq!(seen.len(), total);
}

#[test]
fn test_level_chunks_grid_order() {
  let grid = ChunkGrid::from_arrays([0, 0, 0, 2 * 64, 2 * 64, 64], [64, 64, 64]).unwrap();
  let level: Vec<Chunk> = level_chunks(&grid, 0).collect();

  assert_eq!(
    level,
    vec![
      Chunk::new(0, 0, 0, 0),
      Chunk::new(0, 1, 0, 0),
      Chunk::new(0, 0, 1, 0),
      Chunk::new(0, 1, 1, 0),
    ]
  );
  assert_eq!(level_chunks(&grid, 5).count(), 0);
}
