//! Integer half-open box in voxel space.

use glam::IVec3;

/// Axis-aligned box `[min, max)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IAabb3 {
	/// Minimum corner (inclusive).
	pub min: IVec3,
	/// Maximum corner (exclusive).
	pub max: IVec3,
}

impl IAabb3 {
	pub fn new(min: IVec3, max: IVec3) -> Self {
		debug_assert!(min.cmple(max).all(), "AABB min must be <= max on all axes");
		Self { min, max }
	}

	/// Check if this box shares any voxel with another.
	#[inline]
	pub fn overlaps(&self, other: &IAabb3) -> bool {
		self.min.cmplt(other.max).all() && other.min.cmplt(self.max).all()
	}

	#[inline]
	pub fn contains(&self, point: IVec3) -> bool {
		self.min.cmple(point).all() && point.cmplt(self.max).all()
	}

	/// Grow by `amount` voxels on every side.
	pub fn expanded(&self, amount: i32) -> Self {
		Self {
			min: self.min - IVec3::splat(amount),
			max: self.max + IVec3::splat(amount),
		}
	}

	/// Clamp a point into the box.
	#[inline]
	pub fn clamp(&self, point: IVec3) -> IVec3 {
		point.clamp(self.min, self.max - IVec3::ONE)
	}

	pub fn size(&self) -> IVec3 {
		self.max - self.min
	}
}
