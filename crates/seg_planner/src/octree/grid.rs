//! ChunkGrid - geometry of the chunk octree over a bounding box.
//!
//! The mip-0 grid is the box extent divided by the chunk size, rounded up so
//! boundary voxels are never dropped. Every mip level halves the grid per
//! axis (again rounding up) until a single chunk remains: that level is
//! `top_mip`.
//!
//! ```text
//! mip 2:  [        0         ]
//! mip 1:  [   0    ][   1    ]
//! mip 0:  [ 0 ][ 1 ][ 2 ][ 3 ]   (last chunk may be partial)
//! ```

use glam::{I64Vec3, IVec3};
use smallvec::SmallVec;

use super::{BoundingBox, Chunk, ChunkIter, ChunkSize};
use crate::error::ConfigError;

/// Geometry of the chunk octree. Cheap to clone, immutable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkGrid {
  bbox: BoundingBox,
  chunk_size: ChunkSize,
  /// Grid dimensions indexed by mip level, `0..=top_mip`.
  dims: Vec<IVec3>,
}

impl ChunkGrid {
  /// Build the grid, covering partial boundary chunks.
  pub fn new(bbox: BoundingBox, chunk_size: ChunkSize) -> Self {
    // Ceiling division in i64; the quotient never exceeds the extent
    let size = chunk_size.get().as_i64vec3();
    let base = ((bbox.extent().as_i64vec3() + size - I64Vec3::ONE) / size).as_ivec3();

    let mut dims = vec![base];
    let mut current = base;
    while current.cmpgt(IVec3::ONE).any() {
      current = current / 2 + current % 2;
      dims.push(current);
    }

    Self {
      bbox,
      chunk_size,
      dims,
    }
  }

  /// Build the grid, rejecting a chunk size that does not tile the box.
  pub fn aligned(bbox: BoundingBox, chunk_size: ChunkSize) -> Result<Self, ConfigError> {
    chunk_size.check_aligned(&bbox)?;
    Ok(Self::new(bbox, chunk_size))
  }

  /// Build the grid from raw config arrays.
  pub fn from_arrays(bbox: [i32; 6], chunk_size: [i32; 3]) -> Result<Self, ConfigError> {
    Ok(Self::new(
      BoundingBox::from_array(bbox)?,
      ChunkSize::from_array(chunk_size)?,
    ))
  }

  #[inline]
  pub fn bbox(&self) -> &BoundingBox {
    &self.bbox
  }

  #[inline]
  pub fn chunk_size(&self) -> ChunkSize {
    self.chunk_size
  }

  /// Smallest mip at which one chunk covers the whole box.
  #[inline]
  pub fn top_mip_level(&self) -> u32 {
    (self.dims.len() - 1) as u32
  }

  /// The single chunk at `top_mip`.
  #[inline]
  pub fn top_chunk(&self) -> Chunk {
    Chunk::new(self.top_mip_level(), 0, 0, 0)
  }

  /// Grid dimensions at `mip`; above `top_mip` the grid stays a single chunk.
  #[inline]
  pub fn dims_at(&self, mip: u32) -> IVec3 {
    self
      .dims
      .get(mip as usize)
      .copied()
      .unwrap_or(IVec3::ONE)
  }

  /// Number of chunks at `mip`, zero above `top_mip`.
  pub fn chunk_count(&self, mip: u32) -> usize {
    if mip > self.top_mip_level() {
      return 0;
    }
    let d = self.dims_at(mip);
    (d.x as usize) * (d.y as usize) * (d.z as usize)
  }

  /// Check if a chunk lies inside the grid of its own mip level.
  pub fn contains(&self, chunk: &Chunk) -> bool {
    if chunk.mip_level() > self.top_mip_level() {
      return false;
    }
    let c = chunk.coordinate();
    c.cmpge(IVec3::ZERO).all() && c.cmplt(self.dims_at(chunk.mip_level())).all()
  }

  /// Parent at `mip + 1`, or None for the top chunk.
  pub fn parent(&self, chunk: &Chunk) -> Option<Chunk> {
    if chunk.mip_level() >= self.top_mip_level() {
      return None;
    }
    Some(chunk.parent())
  }

  /// In-grid children in octant order. Up to 8; fewer on odd boundaries.
  pub fn children(&self, chunk: &Chunk) -> SmallVec<[Chunk; 8]> {
    (0..8u8)
      .filter_map(|octant| chunk.child(octant))
      .filter(|child| self.contains(child))
      .collect()
  }

  /// Same-level chunks sharing a face, edge or corner with `chunk`.
  ///
  /// Out-of-grid positions are excluded; the chunk itself is not included.
  pub fn neighbours(&self, chunk: &Chunk) -> SmallVec<[Chunk; 26]> {
    let center = chunk.coordinate();
    let mut out = SmallVec::new();
    for dz in -1..=1 {
      for dy in -1..=1 {
        for dx in -1..=1 {
          if dx == 0 && dy == 0 && dz == 0 {
            continue;
          }
          let n = Chunk::at(chunk.mip_level(), center + IVec3::new(dx, dy, dz));
          if self.contains(&n) {
            out.push(n);
          }
        }
      }
    }
    out
  }

  /// Voxel region covered by a chunk, clipped to the bounding box.
  pub fn voxel_bounds(&self, chunk: &Chunk) -> Option<BoundingBox> {
    if !self.contains(chunk) {
      return None;
    }
    // High mips span more than i32 voxels before clipping
    let span = self.chunk_size.get().as_i64vec3() * (1i64 << chunk.mip_level());
    let min = self.bbox.min.as_i64vec3() + chunk.coordinate().as_i64vec3() * span;
    let max = min + span;

    let min = min.max(self.bbox.min.as_i64vec3());
    let max = max.min(self.bbox.max.as_i64vec3());
    if min.cmplt(max).all() {
      Some(BoundingBox {
        min: min.as_ivec3(),
        max: max.as_ivec3(),
      })
    } else {
      None
    }
  }

  /// Every chunk of every level, children before parents.
  pub fn iter(&self) -> ChunkIter<'_> {
    ChunkIter::new(self, self.top_chunk())
  }

  /// Restart iteration at the subtree rooted at `start`.
  ///
  /// Pure: external batch jobs call this fresh instead of sharing iterator
  /// state across processes.
  pub fn chunks_from(&self, start: Chunk) -> Result<ChunkIter<'_>, ConfigError> {
    if !self.contains(&start) {
      return Err(ConfigError::StartOutsideGrid {
        chunk: start,
        level: start.mip_level(),
        dims: self.dims_at(start.mip_level()).to_array(),
      });
    }
    Ok(ChunkIter::new(self, start))
  }
}

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;
