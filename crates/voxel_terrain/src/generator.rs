//! Procedural default content for space that was never edited.
//!
//! Sign convention: negative = solid, positive = empty, zero = surface.

use std::sync::Arc;

use glam::Vec3;

use crate::config::GeneratorConfig;
use crate::types::Material;

/// Supplies the value and material of every voxel the store has not
/// materialized. Called concurrently from mesh workers.
pub trait WorldGenerator: Send + Sync {
  fn default_value(&self, x: i32, y: i32, z: i32) -> f32;

  fn default_material(&self, x: i32, y: i32, z: i32) -> Material;

  #[inline]
  fn sample(&self, x: i32, y: i32, z: i32) -> (f32, Material) {
    (self.default_value(x, y, z), self.default_material(x, y, z))
  }
}

/// Wraps a closure `(x, y, z) -> (value, material)`.
pub struct FnGenerator<F>(pub F);

impl<F> WorldGenerator for FnGenerator<F>
where
  F: Fn(i32, i32, i32) -> (f32, Material) + Send + Sync,
{
  fn default_value(&self, x: i32, y: i32, z: i32) -> f32 {
    (self.0)(x, y, z).0
  }

  fn default_material(&self, x: i32, y: i32, z: i32) -> Material {
    (self.0)(x, y, z).1
  }

  fn sample(&self, x: i32, y: i32, z: i32) -> (f32, Material) {
    (self.0)(x, y, z)
  }
}

/// Ground plane at `z = height`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatGenerator {
  pub height: f32,
  pub material: Material,
}

impl WorldGenerator for FlatGenerator {
  fn default_value(&self, _x: i32, _y: i32, z: i32) -> f32 {
    z as f32 - self.height
  }

  fn default_material(&self, _x: i32, _y: i32, _z: i32) -> Material {
    self.material
  }
}

/// Solid ball, signed distance to its surface.
#[derive(Clone, Copy, Debug)]
pub struct SphereGenerator {
  pub center: Vec3,
  pub radius: f32,
  pub material: Material,
}

impl WorldGenerator for SphereGenerator {
  fn default_value(&self, x: i32, y: i32, z: i32) -> f32 {
    Vec3::new(x as f32, y as f32, z as f32).distance(self.center) - self.radius
  }

  fn default_material(&self, _x: i32, _y: i32, _z: i32) -> Material {
    self.material
  }
}

/// Air everywhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyGenerator;

impl WorldGenerator for EmptyGenerator {
  fn default_value(&self, _x: i32, _y: i32, _z: i32) -> f32 {
    1.0
  }

  fn default_material(&self, _x: i32, _y: i32, _z: i32) -> Material {
    Material::default()
  }
}

/// Build the generator named by a configuration.
///
/// Parameters that cannot produce a usable field (non-finite numbers, a
/// negative radius) are logged and replaced by [`EmptyGenerator`].
pub fn from_config(config: &GeneratorConfig) -> Arc<dyn WorldGenerator> {
  match *config {
    GeneratorConfig::Flat { height, material } if height.is_finite() => {
      Arc::new(FlatGenerator { height, material })
    }
    GeneratorConfig::Sphere { radius, material } if radius.is_finite() && radius >= 0.0 => {
      Arc::new(SphereGenerator {
        center: Vec3::ZERO,
        radius,
        material,
      })
    }
    GeneratorConfig::Empty => Arc::new(EmptyGenerator),
    ref invalid => {
      tracing::warn!(?invalid, "unusable generator configuration, falling back to empty world");
      Arc::new(EmptyGenerator)
    }
  }
}

/// Pick the explicit generator if there is one, otherwise the configured one.
pub fn resolve(
  explicit: Option<Arc<dyn WorldGenerator>>,
  config: &GeneratorConfig,
) -> Arc<dyn WorldGenerator> {
  match explicit {
    Some(generator) => generator,
    None => {
      tracing::debug!(?config, "no generator supplied, using configured one");
      from_config(config)
    }
  }
}

#[cfg(test)]
#[path = "generator_test.rs"]
mod generator_test;
