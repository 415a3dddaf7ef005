use std::collections::HashSet;

use super::*;

/// Chunks with the same mip and coordinate are the same key.
#[test]
fn test_chunk_equality_and_hash() {
  let a = Chunk::new(3, 1, 2, 0);
  let b = Chunk::at(3, IVec3::new(1, 2, 0));
  let c = Chunk::new(2, 1, 2, 0);

  assert_eq!(a, b);
  assert_ne!(a, c, "Different mip must be a different chunk");

  let set: HashSet<Chunk> = [a, b, c].into_iter().collect();
  assert_eq!(set.len(), 2, "Equal chunks must collapse in a set");
}

/// Parent coordinate is the componentwise shift by one.
#[test]
fn test_parent_is_shifted_coordinate() {
  let chunk = Chunk::new(0, 5, 4, 3);
  let parent = chunk.parent();

  assert_eq!(parent.mip_level(), 1);
  assert_eq!(parent.coordinate(), IVec3::new(2, 2, 1));
}

/// All 8 octants produce children whose parent is the original chunk.
#[test]
fn test_child_parent_roundtrip() {
  let original = Chunk::new(4, 3, 1, 2);

  for octant in 0u8..8 {
    let child = original
      .child(octant)
      .unwrap_or_else(|| panic!("Octant {} should have a child", octant));
    assert_eq!(child.mip_level(), 3, "Octant {} mip mismatch", octant);
    assert_eq!(child.parent(), original, "Roundtrip failed for octant {}", octant);
  }
}

/// Octant bits select +X, +Y, +Z offsets.
#[test]
fn test_child_octant_offsets() {
  let parent = Chunk::new(1, 0, 0, 0);

  assert_eq!(parent.child(0), Some(Chunk::new(0, 0, 0, 0)));
  assert_eq!(parent.child(1), Some(Chunk::new(0, 1, 0, 0)));
  assert_eq!(parent.child(2), Some(Chunk::new(0, 0, 1, 0)));
  assert_eq!(parent.child(4), Some(Chunk::new(0, 0, 0, 1)));
  assert_eq!(parent.child(7), Some(Chunk::new(0, 1, 1, 1)));
}

/// Mip 0 chunks cannot be subdivided.
#[test]
fn test_child_at_mip_0_is_none() {
  let chunk = Chunk::new(0, 7, 7, 7);
  assert!((0u8..8).all(|octant| chunk.child(octant).is_none()));
}

/// Display renders the legacy task tag.
#[test]
fn test_display_tag() {
  assert_eq!(Chunk::new(2, 10, 0, 3).to_string(), "2_10_0_3");
}
