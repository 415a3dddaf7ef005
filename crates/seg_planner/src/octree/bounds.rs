//! Integer voxel bounds and base chunk size.

use glam::IVec3;

use crate::error::ConfigError;

const AXES: [char; 3] = ['x', 'y', 'z'];

/// Half-open, axis-aligned voxel box `[min, max)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
	/// Minimum corner (inclusive).
	pub min: IVec3,
	/// Maximum corner (exclusive).
	pub max: IVec3,
}

impl BoundingBox {
	/// Create a box from its corners, rejecting empty or inverted extents.
	pub fn new(min: IVec3, max: IVec3) -> Result<Self, ConfigError> {
		let bbox = Self { min, max };
		// i64 so corners near the i32 limits cannot overflow
		let extent = max.as_i64vec3() - min.as_i64vec3();
		for axis in 0..3 {
			if extent[axis] <= 0 {
				return Err(ConfigError::EmptyExtent {
					bbox: bbox.to_array(),
					axis: AXES[axis],
				});
			}
			if extent[axis] > i64::from(i32::MAX) {
				return Err(ConfigError::ExtentTooLarge {
					bbox: bbox.to_array(),
					axis: AXES[axis],
				});
			}
		}
		Ok(bbox)
	}

	/// Create a box from the `[x0, y0, z0, x1, y1, z1]` layout used in configs.
	pub fn from_array(bbox: [i32; 6]) -> Result<Self, ConfigError> {
		Self::new(
			IVec3::new(bbox[0], bbox[1], bbox[2]),
			IVec3::new(bbox[3], bbox[4], bbox[5]),
		)
	}

	#[inline]
	pub fn to_array(&self) -> [i32; 6] {
		[self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z]
	}

	/// Size of the box along each axis (max - min). Fits in i32 by construction.
	#[inline]
	pub fn extent(&self) -> IVec3 {
		self.max - self.min
	}
}

/// Finest-granularity unit of work, in voxels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkSize(IVec3);

impl ChunkSize {
	/// Create a chunk size, rejecting zero or negative components.
	pub fn new(size: IVec3) -> Result<Self, ConfigError> {
		if size.cmple(IVec3::ZERO).any() {
			return Err(ConfigError::NonPositiveChunkSize {
				size: size.to_array(),
			});
		}
		Ok(Self(size))
	}

	pub fn from_array(size: [i32; 3]) -> Result<Self, ConfigError> {
		Self::new(IVec3::from_array(size))
	}

	#[inline]
	pub fn get(&self) -> IVec3 {
		self.0
	}

	/// Check that the size tiles `bbox` exactly at mip 0.
	pub fn check_aligned(&self, bbox: &BoundingBox) -> Result<(), ConfigError> {
		let extent = bbox.extent();
		if (extent % self.0).cmpne(IVec3::ZERO).any() {
			return Err(ConfigError::Misaligned {
				size: self.0.to_array(),
				extent: extent.to_array(),
			});
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_from_array() {
		let bbox = BoundingBox::from_array([0, 10, 20, 100, 110, 120]).unwrap();
		assert_eq!(bbox.min, IVec3::new(0, 10, 20));
		assert_eq!(bbox.max, IVec3::new(100, 110, 120));
		assert_eq!(bbox.extent(), IVec3::splat(100));
		assert_eq!(bbox.to_array(), [0, 10, 20, 100, 110, 120]);
	}

	#[test]
	fn test_empty_extent_rejected() {
		let err = BoundingBox::from_array([0, 0, 5, 10, 10, 5]).unwrap_err();
		assert!(
			matches!(err, ConfigError::EmptyExtent { axis: 'z', .. }),
			"Zero z extent should be rejected, got {err:?}"
		);
	}

	#[test]
	fn test_inverted_extent_rejected() {
		let err = BoundingBox::from_array([10, 0, 0, 0, 10, 10]).unwrap_err();
		assert!(matches!(err, ConfigError::EmptyExtent { axis: 'x', .. }));
	}

	#[test]
	fn test_extent_beyond_i32_rejected() {
		let err = BoundingBox::from_array([-2_000_000_000, 0, 0, 2_000_000_000, 1, 1]).unwrap_err();
		assert!(
			matches!(err, ConfigError::ExtentTooLarge { axis: 'x', .. }),
			"Extent of 4e9 voxels should be rejected, got {err:?}"
		);
	}

	#[test]
	fn test_extent_at_i32_limit_accepted() {
		let bbox = BoundingBox::from_array([0, 0, 0, i32::MAX, 1, 1]).unwrap();
		assert_eq!(bbox.extent().x, i32::MAX);

		let shifted = BoundingBox::from_array([i32::MIN, 0, 0, -1, 1, 1]).unwrap();
		assert_eq!(shifted.extent().x, i32::MAX);
	}

	#[test]
	fn test_chunk_size_rejects_non_positive() {
		assert!(ChunkSize::from_array([512, 0, 128]).is_err());
		assert!(ChunkSize::from_array([512, 512, -1]).is_err());
		assert!(ChunkSize::from_array([1, 1, 1]).is_ok());
	}

	#[test]
	fn test_alignment() {
		let bbox = BoundingBox::from_array([0, 0, 0, 1024, 1024, 128]).unwrap();
		let aligned = ChunkSize::from_array([512, 512, 128]).unwrap();
		let misaligned = ChunkSize::from_array([500, 512, 128]).unwrap();

		assert!(aligned.check_aligned(&bbox).is_ok());
		assert!(matches!(
			misaligned.check_aligned(&bbox),
			Err(ConfigError::Misaligned { .. })
		));
	}
}
