//! Regular cells: marching cubes over the chunk lattice.

use glam::IVec3;

use super::edge::{edge_vertex, is_positive};
use super::tables::REGULAR_CASES;
use super::{Frame, Polygonizer, VoxelSampler, EMPTY_SLOT};
use crate::constants::{CACHE_SIZE, CHUNK_SIZE, CORNER_OFFSETS};

const SIDE: i32 = CACHE_SIZE as i32;

/// Slot of lattice point `p` (each coordinate in `-1..=16`).
#[inline]
fn cache_index(p: IVec3) -> usize {
  debug_assert!(p.cmpge(IVec3::NEG_ONE).all() && p.cmplt(IVec3::splat(SIDE - 1)).all());
  ((p.x + 1) + SIDE * ((p.y + 1) + SIDE * (p.z + 1))) as usize
}

impl Polygonizer {
  /// The only bulk read of the store: one sample per lattice point.
  pub(super) fn fill_value_cache<S: VoxelSampler + ?Sized>(&mut self, sampler: &S, frame: &Frame) {
    for z in -1..=CHUNK_SIZE {
      for y in -1..=CHUNK_SIZE {
        for x in -1..=CHUNK_SIZE {
          let p = IVec3::new(x, y, z);
          self.values[cache_index(p)] = sampler.sample(frame.world(p)).0;
        }
      }
    }
  }

  /// Cells `-1..16` on each axis. Cells with a `-1` coordinate lie outside
  /// the chunk and only contribute to normals.
  pub(super) fn regular_pass<S: VoxelSampler + ?Sized>(&mut self, sampler: &S, frame: &Frame) {
    for z in -1..CHUNK_SIZE {
      for y in -1..CHUNK_SIZE {
        for x in -1..CHUNK_SIZE {
          let cell = IVec3::new(x, y, z);
          let mut code = 0;
          for (k, offset) in CORNER_OFFSETS.iter().enumerate() {
            let value = self.values[cache_index(cell + IVec3::from_array(*offset))];
            code |= (is_positive(value) as usize) << k;
          }
          let case = &REGULAR_CASES[code];
          if case.is_empty() {
            continue;
          }

          let mut slots = [0u32; 12];
          for (slot, &(a, b)) in case.vertices.iter().enumerate() {
            let axis = (a ^ b).trailing_zeros() as usize;
            let lo = cell + IVec3::from_array(CORNER_OFFSETS[a as usize]);
            slots[slot] = self.regular_vertex(sampler, frame, lo, axis);
          }
          let kept = cell.cmpge(IVec3::ZERO).all();
          for triangle in &case.triangles {
            self.mesh.push_triangle(triangle.map(|s| slots[s as usize]), kept);
          }
        }
      }
    }
  }

  /// Vertex on the lattice edge from `lo` one step along `axis`, shared by
  /// every cell (regular or transition back face) that touches the edge.
  pub(super) fn regular_vertex<S: VoxelSampler + ?Sized>(
    &mut self,
    sampler: &S,
    frame: &Frame,
    lo: IVec3,
    axis: usize,
  ) -> u32 {
    let key = cache_index(lo) * 3 + axis;
    if self.edge_cache[key] != EMPTY_SLOT {
      return self.edge_cache[key];
    }

    let hi = lo + IVec3::AXES[axis];
    let (a, b) = (frame.world(lo), frame.world(hi));
    let vertex = edge_vertex(sampler, a, b);
    let position = frame.local(vertex.position);
    let index = match vertex.snapped {
      Some(p) if p == a || p == b => {
        let corner = cache_index(if p == a { lo } else { hi });
        if self.corner_cache[corner] == EMPTY_SLOT {
          self.corner_cache[corner] = self.mesh.push_vertex(position, vertex.material, true);
        }
        self.corner_cache[corner]
      }
      _ => self.mesh.push_vertex(position, vertex.material, true),
    };
    self.edge_cache[key] = index;
    index
  }
}
