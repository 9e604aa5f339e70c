//! Surface crossing on a lattice edge.

use glam::{IVec3, Vec3};

use super::VoxelSampler;
use crate::types::Material;

/// Positive values are empty space.
#[inline]
pub fn is_positive(value: f32) -> bool {
  value > 0.0
}

/// Vertex on the edge between two samples of opposite sign.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeVertex {
  /// World position.
  pub position: Vec3,
  pub material: Material,
  /// Sample the vertex collapsed onto, when the surface passes exactly
  /// through it.
  pub snapped: Option<IVec3>,
}

/// Locate the surface between `a` and `b`, which differ along one axis by a
/// power of two and lie on opposite sides of the surface.
///
/// Long edges are narrowed by bisection on the full-resolution samples
/// until they span one voxel, then interpolated linearly. Endpoints are
/// ordered first, so both chunks sharing an edge get the same vertex.
pub fn edge_vertex<S: VoxelSampler + ?Sized>(sampler: &S, a: IVec3, b: IVec3) -> EdgeVertex {
  let (mut lo, mut hi) = if a.cmple(b).all() { (a, b) } else { (b, a) };
  let (mut v_lo, mut m_lo) = sampler.sample(lo);
  let (mut v_hi, mut m_hi) = sampler.sample(hi);
  debug_assert_ne!(
    is_positive(v_lo),
    is_positive(v_hi),
    "edge {lo} -> {hi} does not cross the surface"
  );

  let mut span = (hi - lo).max_element();
  while span > 1 {
    let mid = lo + (hi - lo) / 2;
    let (v_mid, m_mid) = sampler.sample(mid);
    if is_positive(v_mid) == is_positive(v_lo) {
      (lo, v_lo, m_lo) = (mid, v_mid, m_mid);
    } else {
      (hi, v_hi, m_hi) = (mid, v_mid, m_mid);
    }
    span /= 2;
  }

  let inside = if is_positive(v_lo) { m_hi } else { m_lo };
  if v_hi == 0.0 {
    return snapped(hi, m_hi);
  }
  if v_lo == 0.0 {
    return snapped(lo, m_lo);
  }

  let mut t = v_hi / (v_hi - v_lo);
  if !t.is_finite() {
    t = 0.5;
  }
  let position = lo.as_vec3() * t + hi.as_vec3() * (1.0 - t);

  let mut material = inside;
  if m_lo.index1 == m_hi.index1 && m_lo.index2 == m_hi.index2 {
    let alpha = t * m_lo.alpha as f32 + (1.0 - t) * m_hi.alpha as f32;
    material.alpha = alpha.round().clamp(0.0, 255.0) as u8;
  }

  EdgeVertex {
    position,
    material,
    snapped: None,
  }
}

fn snapped(pos: IVec3, material: Material) -> EdgeVertex {
  EdgeVertex {
    position: pos.as_vec3(),
    material,
    snapped: Some(pos),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Plane;

  impl VoxelSampler for Plane {
    fn sample(&self, pos: IVec3) -> (f32, Material) {
      (pos.x as f32 - 2.5, Material::new(1, 2, (pos.x * 10) as u8))
    }
  }

  #[test]
  fn test_unit_edge_interpolates() {
    let v = edge_vertex(&Plane, IVec3::new(2, 0, 0), IVec3::new(3, 0, 0));
    assert!((v.position - Vec3::new(2.5, 0.0, 0.0)).length() < 1e-6);
    assert_eq!(v.snapped, None);
    assert_eq!(v.material.alpha, 25);
  }

  #[test]
  fn test_long_edge_bisects_to_the_crossing() {
    let v = edge_vertex(&Plane, IVec3::new(0, 0, 0), IVec3::new(8, 0, 0));
    assert!((v.position.x - 2.5).abs() < 1e-6);
  }

  #[test]
  fn test_endpoint_order_does_not_matter() {
    let a = edge_vertex(&Plane, IVec3::new(0, 4, 4), IVec3::new(4, 4, 4));
    let b = edge_vertex(&Plane, IVec3::new(4, 4, 4), IVec3::new(0, 4, 4));
    assert_eq!(a, b);
  }

  #[test]
  fn test_zero_sample_snaps() {
    struct Step;
    impl VoxelSampler for Step {
      fn sample(&self, pos: IVec3) -> (f32, Material) {
        ((pos.y - 3) as f32, Material::solid(4))
      }
    }
    let v = edge_vertex(&Step, IVec3::new(0, 3, 0), IVec3::new(0, 4, 0));
    assert_eq!(v.snapped, Some(IVec3::new(0, 3, 0)));
    assert_eq!(v.position, Vec3::new(0.0, 3.0, 0.0));
  }
}
