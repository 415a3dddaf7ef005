use std::collections::{HashMap, HashSet};

use glam::IVec3;

use super::*;

fn grid(bbox: [i32; 6], chunk: [i32; 3]) -> ChunkGrid {
  ChunkGrid::from_arrays(bbox, chunk).expect("valid geometry")
}

/// Every chunk at every level is visited exactly once.
#[test]
fn test_visits_every_chunk_once() {
  let g = grid([0, 0, 0, 5 * 64, 3 * 64, 2 * 64], [64, 64, 64]);

  let visited: Vec<Chunk> = g.iter().collect();
  let unique: HashSet<Chunk> = visited.iter().copied().collect();
  assert_eq!(visited.len(), unique.len(), "No chunk may repeat");

  let mut per_level: HashMap<u32, usize> = HashMap::new();
  for chunk in &visited {
    assert!(g.contains(chunk), "Iterator produced out-of-grid chunk {chunk}");
    *per_level.entry(chunk.mip_level()).or_default() += 1;
  }
  for mip in 0..=g.top_mip_level() {
    assert_eq!(
      per_level.get(&mip).copied().unwrap_or(0),
      g.chunk_count(mip),
      "Level {mip} count mismatch"
    );
  }
}

/// Children (and so all mip-0 descendants) come before their parent.
#[test]
fn test_children_before_parent() {
  let g = grid([0, 0, 0, 4 * 64, 4 * 64, 3 * 64], [64, 64, 64]);

  let position: HashMap<Chunk, usize> = g.iter().enumerate().map(|(i, c)| (c, i)).collect();
  for (chunk, &pos) in &position {
    if let Some(parent) = g.parent(chunk) {
      assert!(
        position[&parent] > pos,
        "Parent {parent} must follow child {chunk}"
      );
    }
  }
}

/// The top chunk is always last.
#[test]
fn test_top_chunk_last() {
  let g = grid([0, 0, 0, 1024, 1024, 128], [512, 512, 128]);
  let chunks: Vec<Chunk> = g.iter().collect();

  assert_eq!(chunks.len(), 5);
  assert_eq!(chunks.last(), Some(&g.top_chunk()));
  assert_eq!(
    chunks[..4],
    [
      Chunk::new(0, 0, 0, 0),
      Chunk::new(0, 1, 0, 0),
      Chunk::new(0, 0, 1, 0),
      Chunk::new(0, 1, 1, 0),
    ],
    "Children follow octant order"
  );
}

/// Parent coordinate is `coordinate >> 1` and the parent is reachable.
#[test]
fn test_parent_coordinate_is_reachable() {
  let g = grid([0, 0, 0, 6 * 64, 5 * 64, 64], [64, 64, 64]);
  let all: HashSet<Chunk> = g.iter().collect();

  for chunk in &all {
    if chunk.mip_level() < g.top_mip_level() {
      let expected = Chunk::at(chunk.mip_level() + 1, chunk.coordinate() / 2);
      assert_eq!(g.parent(chunk), Some(expected));
      assert!(all.contains(&expected), "Parent of {chunk} not reachable");
    }
  }
}

/// Restarting from a subtree yields exactly that subtree.
#[test]
fn test_chunks_from_subtree() {
  let g = grid([0, 0, 0, 4 * 64, 4 * 64, 64], [64, 64, 64]);

  let start = Chunk::new(1, 1, 0, 0);
  let subtree: Vec<Chunk> = g.chunks_from(start).unwrap().collect();

  assert_eq!(subtree.len(), 5, "4 children plus the root");
  assert_eq!(subtree.last(), Some(&start));
  for chunk in &subtree[..4] {
    assert_eq!(chunk.mip_level(), 0);
    assert_eq!(chunk.coordinate() / 2, IVec3::new(1, 0, 0));
  }
}

/// Iteration is restartable and deterministic.
#[test]
fn test_restartable() {
  let g = grid([0, 0, 0, 1100, 700, 300], [128, 128, 64]);

  let first: Vec<Chunk> = g.iter().collect();
  let second: Vec<Chunk> = g.iter().collect();
  assert_eq!(first, second);

  // A cloned iterator continues independently
  let mut it = g.iter();
  it.next();
  let forked: Vec<Chunk> = it.clone().collect();
  let rest: Vec<Chunk> = it.collect();
  assert_eq!(forked, rest);
  assert_eq!(rest.len(), first.len() - 1);
}

/// Starting at a mip-0 chunk yields just that chunk.
#[test]
fn test_chunks_from_leaf() {
  let g = grid([0, 0, 0, 1024, 1024, 128], [512, 512, 128]);
  let leaf = Chunk::new(0, 1, 1, 0);
  let chunks: Vec<Chunk> = g.chunks_from(leaf).unwrap().collect();
  assert_eq!(chunks, vec![leaf]);
}
