//! Foliage scattering over finished chunk meshes.
//!
//! Scatter jobs only see an immutable [`ChunkMesh`]; they never touch the
//! voxel store. Placement is seeded from each triangle's world position, so
//! rebuilding a chunk (or meshing the same surface from another chunk)
//! yields the same instances.

use std::f32::consts::TAU;

use glam::{IVec3, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::types::{ChunkMesh, Material};

/// Blend weight below which a secondary material does not count as present.
const MATERIAL_TOLERANCE: f32 = 0.25;

/// One placed instance, in world voxel space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FoliageInstance {
  pub position: Vec3,
  /// Surface normal at the instance (unit length).
  pub normal: Vec3,
  pub scale: f32,
  /// Rotation around the normal, radians.
  pub yaw: f32,
}

/// Places instances on a chunk's surface. Runs on foliage worker threads.
pub trait FoliageScatter: Send + Sync {
  /// `origin` is the world position of the mesh's local origin and `depth`
  /// the chunk depth the mesh was built at.
  fn scatter(&self, mesh: &ChunkMesh, origin: IVec3, depth: u8) -> Vec<FoliageInstance>;
}

/// Uniform random scatter on every triangle showing one palette index.
#[derive(Clone, Debug)]
pub struct DensityScatter {
  /// Palette index the foliage grows on.
  pub material: u8,
  /// Mean instances per square voxel of matching surface.
  pub density: f32,
  pub seed: u64,
  /// Inclusive scale range.
  pub scale: (f32, f32),
}

impl DensityScatter {
  pub fn new(material: u8, density: f32) -> Self {
    Self {
      material,
      density,
      seed: 0,
      scale: (1.0, 1.0),
    }
  }

  pub fn with_seed(mut self, seed: u64) -> Self {
    self.seed = seed;
    self
  }

  pub fn with_scale(mut self, min: f32, max: f32) -> Self {
    self.scale = (min.min(max), min.max(max));
    self
  }

  /// True if `material` shows this scatter's palette index strongly enough.
  pub fn matches(&self, material: Material) -> bool {
    let alpha = material.alpha as f32 / 255.0;
    (material.index1 == self.material && alpha < 1.0 - MATERIAL_TOLERANCE)
      || (material.index2 == self.material
        && (alpha > MATERIAL_TOLERANCE || material.index1 == material.index2))
  }

  fn triangle_rng(&self, world_center: Vec3) -> SmallRng {
    // millivoxel grid, so nearly coincident centers still agree
    let mut hash = self.seed ^ 0x51_7c_c1_b7_27_22_0a_95;
    for component in world_center.to_array() {
      let quantized = (component as f64 * 1000.0).round() as i64;
      hash = (hash ^ quantized as u64)
        .wrapping_mul(0x9e37_79b9_7f4a_7c15)
        .rotate_left(29);
    }
    SmallRng::seed_from_u64(hash)
  }
}

impl FoliageScatter for DensityScatter {
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "foliage::scatter"))]
  fn scatter(&self, mesh: &ChunkMesh, origin: IVec3, _depth: u8) -> Vec<FoliageInstance> {
    let origin = origin.as_vec3();
    let mut instances = Vec::new();
    if self.density <= 0.0 {
      return instances;
    }

    for triangle in mesh.indices.chunks_exact(3) {
      let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|index| index as usize);
      if ![a, b, c]
        .into_iter()
        .any(|index| self.matches(Material::from_color(mesh.colors[index])))
      {
        continue;
      }

      let [pa, pb, pc] = [a, b, c].map(|index| Vec3::from_array(mesh.positions[index]));
      let (edge_x, edge_y) = (pb - pa, pc - pa);
      let face = edge_x.cross(edge_y);
      let area = face.length() / 2.0;
      if area <= f32::EPSILON {
        continue;
      }
      let normal = ([a, b, c]
        .into_iter()
        .map(|index| Vec3::from_array(mesh.normals[index]))
        .sum::<Vec3>())
      .try_normalize()
      .unwrap_or_else(|| face.normalize());

      let mut rng = self.triangle_rng(origin + (pa + pb + pc) / 3.0);
      let expected = self.density * area;
      let mut count = expected.floor() as usize;
      if rng.random::<f32>() < expected.fract() {
        count += 1;
      }

      for _ in 0..count {
        let (mut u, mut v) = (rng.random::<f32>(), rng.random::<f32>());
        if u + v > 1.0 {
          u = 1.0 - u;
          v = 1.0 - v;
        }
        instances.push(FoliageInstance {
          position: origin + pa + edge_x * u + edge_y * v,
          normal,
          scale: rng.random_range(self.scale.0..=self.scale.1),
          yaw: rng.random::<f32>() * TAU,
        });
      }
    }
    instances
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use std::sync::Arc;

  use crate::data::DataOctree;
  use crate::generator::FlatGenerator;
  use crate::mesher::{build_chunk_mesh, ChunkRequest};

  fn flat_mesh(min: IVec3) -> ChunkMesh {
    let world = DataOctree::new(
      3,
      Arc::new(FlatGenerator {
        height: 8.5,
        material: Material::solid(2),
      }),
      false,
    );
    build_chunk_mesh(&world, &ChunkRequest::new(min, 0))
  }

  #[test]
  fn test_material_tolerance() {
    let scatter = DensityScatter::new(4, 1.0);
    assert!(scatter.matches(Material::solid(4)));
    assert!(scatter.matches(Material::new(4, 9, 0)));
    assert!(!scatter.matches(Material::new(4, 9, 255)));
    assert!(scatter.matches(Material::new(9, 4, 200)));
    assert!(!scatter.matches(Material::new(9, 4, 10)));
    assert!(!scatter.matches(Material::solid(3)));
  }

  #[test]
  fn test_scatter_covers_matching_surface() {
    let mesh = flat_mesh(IVec3::ZERO);
    let origin = IVec3::new(0, 0, 0);
    let instances = DensityScatter::new(2, 0.5)
      .with_scale(0.5, 2.0)
      .scatter(&mesh, origin, 0);

    // 256 square voxels at 0.5 per voxel
    assert!((80..=180).contains(&instances.len()), "{} instances", instances.len());
    for instance in &instances {
      assert!((instance.position.z - 8.5).abs() < 1e-3);
      assert!((0.0..=16.0).contains(&instance.position.x));
      assert!((0.0..=16.0).contains(&instance.position.y));
      assert!(instance.normal.z > 0.99);
      assert!((0.5..=2.0).contains(&instance.scale));
    }
  }

  #[test]
  fn test_scatter_skips_other_materials() {
    let mesh = flat_mesh(IVec3::ZERO);
    assert!(DensityScatter::new(3, 10.0).scatter(&mesh, IVec3::ZERO, 0).is_empty());
    assert!(DensityScatter::new(2, 0.0).scatter(&mesh, IVec3::ZERO, 0).is_empty());
  }

  #[test]
  fn test_scatter_is_deterministic() {
    let mesh = flat_mesh(IVec3::ZERO);
    let scatter = DensityScatter::new(2, 0.3).with_seed(7);
    let first = scatter.scatter(&mesh, IVec3::ZERO, 0);
    let second = scatter.scatter(&mesh, IVec3::ZERO, 0);
    assert_eq!(first, second);

    let reseeded = DensityScatter::new(2, 0.3).with_seed(8).scatter(&mesh, IVec3::ZERO, 0);
    assert_ne!(first, reseeded);
  }

  #[test]
  fn test_scatter_is_placed_in_world_space() {
    let min = IVec3::new(-16, 16, 0);
    let mesh = flat_mesh(min);
    let instances = DensityScatter::new(2, 0.5).scatter(&mesh, min, 0);
    assert!(!instances.is_empty());
    for instance in &instances {
      assert!((-16.0..=0.0).contains(&instance.position.x));
      assert!((16.0..=32.0).contains(&instance.position.y));
    }
  }
}
