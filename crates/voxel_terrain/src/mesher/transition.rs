//! Transition cells stitching a face to its higher-resolution neighbor.
//!
//! Each face is described in its own frame `(u, v, w)`: `u, v` span the
//! face, `w` points into the chunk. The six mappings below are rotations
//! (plus a flip of `w` on max faces), so triangle winding carries over.
//!
//! ```text
//!   face   chunk-local (x, y, z)
//!   XMin   (w,        u,        v)
//!   XMax   (S - w,    v,        u)
//!   YMin   (v,        w,        u)
//!   YMax   (u,        S - w,    v)
//!   ZMin   (u,        v,        w)
//!   ZMax   (v,        u,        S - w)
//! ```

use glam::{IVec2, IVec3};

use super::edge::{edge_vertex, is_positive};
use super::tables::{TRANSITION_BACK_SOURCE, TRANSITION_CASES};
use super::{Frame, Polygonizer, VoxelSampler, EMPTY_SLOT};
use crate::constants::CHUNK_SIZE;
use crate::types::Direction;

/// Half-step samples per side of a face.
pub(super) const FACE_SAMPLES: usize = 2 * CHUNK_SIZE as usize + 1;

/// Chunk-local position of face coordinates `(u, v, w)` in a chunk of width
/// `size`.
pub fn face_to_local(direction: Direction, u: i32, v: i32, w: i32, size: i32) -> IVec3 {
  match direction {
    Direction::XMin => IVec3::new(w, u, v),
    Direction::XMax => IVec3::new(size - w, v, u),
    Direction::YMin => IVec3::new(v, w, u),
    Direction::YMax => IVec3::new(u, size - w, v),
    Direction::ZMin => IVec3::new(u, v, w),
    Direction::ZMax => IVec3::new(v, u, size - w),
  }
}

#[inline]
fn face_index(g: IVec2) -> usize {
  g.x as usize + FACE_SAMPLES * g.y as usize
}

/// Front point `k` of the cell whose lower corner is half-step `base`.
#[inline]
fn front_point(base: IVec2, k: u8) -> IVec2 {
  base + IVec2::new((k % 3) as i32, (k / 3) as i32)
}

impl Polygonizer {
  pub(super) fn transition_pass<S: VoxelSampler + ?Sized>(
    &mut self,
    sampler: &S,
    frame: &Frame,
    direction: Direction,
  ) {
    let half = frame.step / 2;
    debug_assert!(half > 0, "depth-0 chunks have no transition faces");
    self.face_edges.fill(EMPTY_SLOT);
    self.face_corners.fill(EMPTY_SLOT);

    for gv in 0..FACE_SAMPLES as i32 {
      for gu in 0..FACE_SAMPLES as i32 {
        let local = face_to_local(direction, gu * half, gv * half, 0, frame.size);
        self.face_values[face_index(IVec2::new(gu, gv))] = sampler.sample(frame.min + local).0;
      }
    }

    for j in 0..CHUNK_SIZE {
      for i in 0..CHUNK_SIZE {
        let base = IVec2::new(2 * i, 2 * j);
        let mut code = 0;
        for k in 0..9u8 {
          let value = self.face_values[face_index(front_point(base, k))];
          code |= (is_positive(value) as usize) << k;
        }
        let case = &TRANSITION_CASES[code];
        if case.is_empty() {
          continue;
        }

        let mut slots = [0u32; 12];
        for (slot, &(a, b)) in case.vertices.iter().enumerate() {
          slots[slot] = if b < 9 {
            self.front_vertex(
              sampler,
              frame,
              direction,
              front_point(base, a),
              front_point(base, b),
            )
          } else {
            debug_assert!(a >= 9, "lateral edges never cross");
            let grid = |p: u8| {
              let g = front_point(base, TRANSITION_BACK_SOURCE[p as usize - 9]);
              face_to_local(direction, g.x * half, g.y * half, 0, frame.size) / frame.step
            };
            let (ga, gb) = (grid(a), grid(b));
            let axis = if ga.x != gb.x {
              0
            } else if ga.y != gb.y {
              1
            } else {
              2
            };
            self.regular_vertex(sampler, frame, ga.min(gb), axis)
          };
        }
        for triangle in &case.triangles {
          self.mesh.push_triangle(triangle.map(|s| slots[s as usize]), true);
        }
      }
    }
  }

  /// Vertex on the face between two adjacent half-step samples.
  fn front_vertex<S: VoxelSampler + ?Sized>(
    &mut self,
    sampler: &S,
    frame: &Frame,
    direction: Direction,
    ga: IVec2,
    gb: IVec2,
  ) -> u32 {
    let lo = ga.min(gb);
    let hi = ga.max(gb);
    let axis = if ga.x != gb.x { 0 } else { 1 };
    let key = face_index(lo) * 2 + axis;
    if self.face_edges[key] != EMPTY_SLOT {
      return self.face_edges[key];
    }

    let half = frame.step / 2;
    let world = |g: IVec2| frame.min + face_to_local(direction, g.x * half, g.y * half, 0, frame.size);
    let (a, b) = (world(lo), world(hi));
    let vertex = edge_vertex(sampler, a, b);
    let position = frame.local(vertex.position);
    let index = match vertex.snapped {
      Some(p) if p == a || p == b => {
        let corner = face_index(if p == a { lo } else { hi });
        if self.face_corners[corner] == EMPTY_SLOT {
          self.face_corners[corner] = self.mesh.push_vertex(position, vertex.material, false);
        }
        self.face_corners[corner]
      }
      _ => self.mesh.push_vertex(position, vertex.material, false),
    };
    self.face_edges[key] = index;
    index
  }
}
