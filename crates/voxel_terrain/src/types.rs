//! Core value types shared by the data store, the mesher and the scheduler.

use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

/// Two palette indices blended by an 8-bit alpha.
///
/// `alpha < 128` means `index1` dominates. Serialized as three raw bytes
/// `[index1, index2, alpha]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Material {
  pub index1: u8,
  pub index2: u8,
  pub alpha: u8,
}

impl Material {
  pub const fn new(index1: u8, index2: u8, alpha: u8) -> Self {
    Self {
      index1,
      index2,
      alpha,
    }
  }

  /// Single palette entry, no blending.
  pub const fn solid(index: u8) -> Self {
    Self::new(index, index, 0)
  }

  /// Palette index that wins the blend.
  #[inline]
  pub fn dominant_index(&self) -> u8 {
    if self.alpha < 128 {
      self.index1
    } else {
      self.index2
    }
  }

  /// True when both materials blend the same pair of indices, in any order.
  #[inline]
  pub fn has_same_indexes_as(&self, other: &Material) -> bool {
    (self.index1 == other.index1 && self.index2 == other.index2)
      || (self.index1 == other.index2 && self.index2 == other.index1)
  }

  /// Vertex color encoding consumed by the renderer: `[index1, index2, alpha, 255]`.
  #[inline]
  pub fn to_color(self) -> [u8; 4] {
    [self.index1, self.index2, self.alpha, 255]
  }

  #[inline]
  pub fn from_color(color: [u8; 4]) -> Self {
    Self::new(color[0], color[1], color[2])
  }
}

impl From<[u8; 3]> for Material {
  fn from(bytes: [u8; 3]) -> Self {
    Self::new(bytes[0], bytes[1], bytes[2])
  }
}

impl From<Material> for [u8; 3] {
  fn from(material: Material) -> Self {
    [material.index1, material.index2, material.alpha]
  }
}

/// One of the six chunk faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
  XMin = 0,
  XMax = 1,
  YMin = 2,
  YMax = 3,
  ZMin = 4,
  ZMax = 5,
}

impl Direction {
  pub const ALL: [Direction; 6] = [
    Direction::XMin,
    Direction::XMax,
    Direction::YMin,
    Direction::YMax,
    Direction::ZMin,
    Direction::ZMax,
  ];

  #[inline]
  pub fn index(self) -> usize {
    self as usize
  }

  /// 0 = X, 1 = Y, 2 = Z.
  #[inline]
  pub fn axis(self) -> usize {
    self as usize / 2
  }

  #[inline]
  pub fn is_max(self) -> bool {
    self as usize % 2 == 1
  }

  /// The face on the other side of the boundary.
  pub fn invert(self) -> Direction {
    Direction::ALL[self.index() ^ 1]
  }

  /// Unit step pointing out of the face.
  pub fn offset(self) -> IVec3 {
    let mut offset = IVec3::ZERO;
    offset[self.axis()] = if self.is_max() { 1 } else { -1 };
    offset
  }
}

/// Per-face "neighbor renders at a higher resolution" flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TransitionMask(u8);

impl TransitionMask {
  pub const NONE: TransitionMask = TransitionMask(0);

  pub fn from_bits(bits: u8) -> Self {
    Self(bits & 0b11_1111)
  }

  pub fn bits(self) -> u8 {
    self.0
  }

  #[inline]
  pub fn contains(self, direction: Direction) -> bool {
    self.0 & (1 << direction.index()) != 0
  }

  pub fn set(&mut self, direction: Direction, value: bool) {
    if value {
      self.0 |= 1 << direction.index();
    } else {
      self.0 &= !(1 << direction.index());
    }
  }

  pub fn with(mut self, direction: Direction) -> Self {
    self.set(direction, true);
    self
  }

  pub fn is_empty(self) -> bool {
    self.0 == 0
  }

  pub fn iter(self) -> impl Iterator<Item = Direction> {
    Direction::ALL.into_iter().filter(move |d| self.contains(*d))
  }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMaxAABB {
  pub min: Vec3,
  pub max: Vec3,
}

impl MinMaxAABB {
  /// Create AABB with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: Vec3::splat(f32::INFINITY),
      max: Vec3::splat(f32::NEG_INFINITY),
    }
  }

  /// Expand AABB to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: Vec3) {
    self.min = self.min.min(point);
    self.max = self.max.max(point);
  }

  /// Check if AABB is valid (min <= max on all axes).
  pub fn is_valid(&self) -> bool {
    self.min.cmple(self.max).all()
  }
}

impl Default for MinMaxAABB {
  fn default() -> Self {
    Self::empty()
  }
}

/// Triangle mesh of one chunk, in chunk-local voxel units.
///
/// Positions lie in `[0, 16 << depth]` on each axis. Triangles are
/// counter-clockwise when seen from the empty (positive value) side.
#[derive(Clone, Debug, Default)]
pub struct ChunkMesh {
  pub positions: Vec<[f32; 3]>,
  pub normals: Vec<[f32; 3]>,
  /// Material of each vertex, encoded with [`Material::to_color`].
  pub colors: Vec<[u8; 4]>,
  /// Triangle indices (3 indices per triangle).
  pub indices: Vec<u32>,
  pub bounds: MinMaxAABB,
}

impl ChunkMesh {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns true if no geometry was generated.
  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  pub fn vertex_count(&self) -> usize {
    self.positions.len()
  }

  /// Number of triangles in the mesh.
  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  /// Approximate heap footprint of the buffers.
  pub fn memory_bytes(&self) -> usize {
    self.positions.len() * (12 + 12 + 4) + self.indices.len() * 4
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
