//! Layout constants for 16³ voxel leaves and chunks.
//!
//! Every leaf of the data octree and every chunk of the LOD octree spans 16
//! cells per axis at its own resolution. A chunk at depth `d` therefore covers
//! `16 << d` voxels per axis and samples the store every `1 << d` voxels.
//!
//! # Leaf Memory Layout
//!
//! ```text
//! index = x + 16 * y + 256 * z
//!       = x | y << 4 | z << 8
//!
//! Address:  0     1    ...  15    16   ...  255   256  ...
//! Content: [0,0,0][1,0,0]...[15,0,0][0,1,0]...[15,15,0][0,0,1]...
//!          └────── X ──────┘└────── X ──────┘
//! ```
//!
//! # Cell Corners
//!
//! ```text
//!        6─────────7
//!       /│        /│        +Z
//!      4─────────5 │         │  +Y
//!      │ │       │ │         │ /
//!      │ 2───────│─3         │/
//!      │/        │/          └───── +X
//!      0─────────1
//!
//! corner = x | y << 1 | z << 2
//! ```

/// Cells per axis in a leaf or chunk.
pub const CHUNK_SIZE: i32 = 16;

/// Cells in a leaf (16³).
pub const CHUNK_VOLUME: usize = (CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE) as usize;

/// Deepest supported octree. `2 * 9^19 - 1` still fits a `u64` id and
/// `16 << 19` fits an `i32` coordinate.
pub const MAX_DEPTH: u8 = 19;

/// Default number of entries in one diff packet.
pub const DIFF_PACKET_SIZE: usize = 2048;

/// Samples per axis in the mesher value cache (16 cells, +1 corner, +1 skirt).
pub const CACHE_SIZE: usize = 18;

/// Corner offsets of a unit cell, indexed by `x | y << 1 | z << 2`.
pub const CORNER_OFFSETS: [[i32; 3]; 8] = [
  [0, 0, 0],
  [1, 0, 0],
  [0, 1, 0],
  [1, 1, 0],
  [0, 0, 1],
  [1, 0, 1],
  [0, 1, 1],
  [1, 1, 1],
];

/// Linear index of a leaf-local coordinate.
#[inline(always)]
pub const fn coord_to_index(x: i32, y: i32, z: i32) -> usize {
  (x + CHUNK_SIZE * y + CHUNK_SIZE * CHUNK_SIZE * z) as usize
}

/// Inverse of [`coord_to_index`].
#[inline(always)]
pub const fn index_to_coord(index: usize) -> (i32, i32, i32) {
  let i = index as i32;
  (i & 15, (i >> 4) & 15, i >> 8)
}

/// `9^power`, the id stride of one octree level.
///
/// # Panics
///
/// Panics if `power > 20` (the result would not fit a `u64`).
#[inline]
pub const fn pow9(power: u8) -> u64 {
  assert!(power <= 20, "9^power overflows u64");
  let mut result = 1u64;
  let mut i = 0;
  while i < power {
    result *= 9;
    i += 1;
  }
  result
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
