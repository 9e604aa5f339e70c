//! AddressNode - immutable value type locating one cube of an octree.
//!
//! A node is identified by its center and depth. Depth 0 = finest (16 voxels
//! wide), the root has the largest depth.
//!
//! # Path Ids
//!
//! The root id is `9^depth`. Descending into octant `k` (0..8) adds
//! `(k + 1) * 9^(depth - 1)`, so each level contributes one base-9 digit
//! (1..8, 0 = "stops above this level"):
//!
//! ```text
//! depth 2 root      id = 100₉
//!   octant 2        id = 130₉
//!     octant 7      id = 138₉
//! ```
//!
//! Any ancestor at depth `a` is recovered as `(id / 9^a) * 9^a`, and two
//! nodes share the subtree of a depth-`a` node iff `id / 9^a` is equal.

use glam::IVec3;

use super::bounds::IAabb3;
use crate::constants::{pow9, CHUNK_SIZE, MAX_DEPTH};

/// Position of a node in an octree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct AddressNode {
  /// Center in voxel space.
  pub center: IVec3,
  /// Distance to the finest level (0 = 16-voxel leaf).
  pub depth: u8,
  /// Base-9 path id.
  pub id: u64,
}

impl AddressNode {
  /// Root of an octree of the given depth, centered on the origin.
  ///
  /// # Panics
  ///
  /// Panics if `depth > MAX_DEPTH`.
  pub fn root(depth: u8) -> Self {
    assert!(
      depth <= MAX_DEPTH,
      "octree depth {} exceeds {}",
      depth,
      MAX_DEPTH
    );
    Self {
      center: IVec3::ZERO,
      depth,
      id: pow9(depth),
    }
  }

  /// Width in voxels (`16 << depth`).
  #[inline]
  pub fn width(&self) -> i32 {
    CHUNK_SIZE << self.depth
  }

  /// Voxels between two samples at this node's resolution.
  #[inline]
  pub fn step(&self) -> i32 {
    1 << self.depth
  }

  #[inline]
  pub fn min_corner(&self) -> IVec3 {
    self.center - IVec3::splat(self.width() / 2)
  }

  /// Exclusive upper corner.
  #[inline]
  pub fn max_corner(&self) -> IVec3 {
    self.center + IVec3::splat(self.width() / 2)
  }

  #[inline]
  pub fn bounds(&self) -> IAabb3 {
    IAabb3::new(self.min_corner(), self.max_corner())
  }

  /// Half-open containment test.
  #[inline]
  pub fn is_in(&self, pos: IVec3) -> bool {
    self.bounds().contains(pos)
  }

  #[inline]
  pub fn local_to_global(&self, local: IVec3) -> IVec3 {
    local + self.min_corner()
  }

  #[inline]
  pub fn global_to_local(&self, global: IVec3) -> IVec3 {
    global - self.min_corner()
  }

  /// Octant of `pos`: `(x >= cx) | (y >= cy) << 1 | (z >= cz) << 2`.
  #[inline]
  pub fn child_index(&self, pos: IVec3) -> usize {
    (pos.x >= self.center.x) as usize
      | ((pos.y >= self.center.y) as usize) << 1
      | ((pos.z >= self.center.z) as usize) << 2
  }

  /// Child in the given octant.
  ///
  /// # Panics
  ///
  /// Panics at depth 0 or if `octant >= 8`.
  pub fn child(&self, octant: usize) -> Self {
    assert!(self.depth > 0, "depth-0 nodes have no children");
    assert!(octant < 8, "octant {} out of range", octant);
    let d = self.width() / 4;
    let sign = |bit: usize| if octant & bit != 0 { d } else { -d };
    Self {
      center: self.center + IVec3::new(sign(1), sign(2), sign(4)),
      depth: self.depth - 1,
      id: self.id + (octant as u64 + 1) * pow9(self.depth - 1),
    }
  }

  /// All eight children in octant order.
  pub fn children(&self) -> [Self; 8] {
    std::array::from_fn(|octant| self.child(octant))
  }

  /// True if the node with path id `id` lies in this node's subtree.
  #[inline]
  pub fn contains_id(&self, id: u64) -> bool {
    let stride = pow9(self.depth);
    self.id / stride == id / stride
  }

  /// Id of the depth-`depth` ancestor of the node with path id `id`.
  #[inline]
  pub fn ancestor_id(id: u64, depth: u8) -> u64 {
    let stride = pow9(depth);
    id / stride * stride
  }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
