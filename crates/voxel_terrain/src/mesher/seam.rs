//! Seam warp: pulls regular vertices away from faces that get transition
//! cells, leaving room for the transition strip.

use glam::Vec3;

use crate::constants::CHUNK_SIZE;
use crate::types::{Direction, TransitionMask};

const EPSILON: f32 = 1e-4;

/// Move a chunk-local vertex inward near transition faces.
///
/// Within one step of such a face the vertex moves by up to `step / 4`
/// toward the interior, projected onto its tangent plane so the surface
/// keeps its shape. Vertices lying on a face without a transition, or
/// outside the chunk, stay put.
pub fn warp_vertex(position: Vec3, normal: Vec3, transitions: TransitionMask, step: i32) -> Vec3 {
  let step = step as f32;
  let size = CHUNK_SIZE as f32 * step;

  for axis in 0..3 {
    let p = position[axis];
    if p < -EPSILON || p > size + EPSILON {
      return position;
    }
    let (min_face, max_face) = (Direction::ALL[axis * 2], Direction::ALL[axis * 2 + 1]);
    if (p < EPSILON && !transitions.contains(min_face))
      || (p > size - EPSILON && !transitions.contains(max_face))
    {
      return position;
    }
  }

  let width = step / 4.0;
  let mut delta = Vec3::ZERO;
  for axis in 0..3 {
    let p = position[axis] / step;
    if transitions.contains(Direction::ALL[axis * 2]) && p < 1.0 {
      delta[axis] = (1.0 - p) * width;
    }
    if transitions.contains(Direction::ALL[axis * 2 + 1]) && p > (CHUNK_SIZE - 1) as f32 {
      delta[axis] = ((CHUNK_SIZE - 1) as f32 - p) * width;
    }
  }

  position + delta - normal * normal.dot(delta)
}
