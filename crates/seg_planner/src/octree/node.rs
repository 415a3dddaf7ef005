//! Chunk - immutable value type representing a position in the chunk octree.
//!
//! Chunks are identified by their grid coordinates at their mip level.
//! Mip 0 = finest chunks, higher mip = coarser.

use std::fmt;

use glam::IVec3;
use serde::{Deserialize, Serialize};

/// Octree chunk - immutable value type.
///
/// Grid coordinates are at the chunk's own mip level, not voxel offsets.
/// Parent/child relationships are pure coordinate math.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Chunk {
  /// Mip level (0 = finest, higher = coarser).
  pub mip: u32,
  /// Grid position at this chunk's mip level.
  pub coord: [i32; 3],
}

impl Chunk {
  /// Create a new chunk at the given mip level and grid position.
  pub fn new(mip: u32, x: i32, y: i32, z: i32) -> Self {
    Self {
      mip,
      coord: [x, y, z],
    }
  }

  /// Create a chunk from a grid vector.
  pub fn at(mip: u32, coord: IVec3) -> Self {
    Self {
      mip,
      coord: coord.to_array(),
    }
  }

  #[inline]
  pub fn mip_level(&self) -> u32 {
    self.mip
  }

  #[inline]
  pub fn coordinate(&self) -> IVec3 {
    IVec3::from_array(self.coord)
  }

  /// Parent chunk at `mip + 1`: every coordinate shifted right by one.
  ///
  /// Unbounded; the grid decides whether the parent exists.
  #[inline]
  pub fn parent(&self) -> Self {
    let [x, y, z] = self.coord;
    Self::new(self.mip + 1, x >> 1, y >> 1, z >> 1)
  }

  /// Child chunk at `mip - 1`.
  ///
  /// Octant: 0-7 where bits represent +X, +Y, +Z offsets:
  /// - bit 0: X offset (0 or 1)
  /// - bit 1: Y offset (0 or 1)
  /// - bit 2: Z offset (0 or 1)
  ///
  /// Returns None at mip 0. The child may still fall outside a grid whose
  /// dimension is odd at the finer level.
  pub fn child(&self, octant: u8) -> Option<Self> {
    if self.mip == 0 {
      return None;
    }
    let [x, y, z] = self.coord;
    Some(Self::new(
      self.mip - 1,
      x * 2 + (octant & 1) as i32,
      y * 2 + ((octant >> 1) & 1) as i32,
      z * 2 + ((octant >> 2) & 1) as i32,
    ))
  }
}

/// Legacy task tag: `{mip}_{x}_{y}_{z}`.
impl fmt::Display for Chunk {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let [x, y, z] = self.coord;
    write!(f, "{}_{}_{}_{}", self.mip, x, y, z)
  }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
