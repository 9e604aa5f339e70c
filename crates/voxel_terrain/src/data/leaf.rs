//! Dense 16³ storage of an edited leaf.

use std::collections::BTreeSet;

use glam::IVec3;

use crate::constants::{coord_to_index, CHUNK_SIZE, CHUNK_VOLUME};
use crate::generator::WorldGenerator;
use crate::types::Material;

/// Values and materials of one depth-0 leaf, plus the cells written since the
/// last diff extraction (multiplayer mode only).
#[derive(Clone, Debug)]
pub struct LeafData {
  pub(crate) values: Box<[f32]>,
  pub(crate) materials: Box<[Material]>,
  pub(crate) dirty_values: BTreeSet<u16>,
  pub(crate) dirty_materials: BTreeSet<u16>,
}

impl LeafData {
  /// Snapshot the generator over the leaf whose minimal corner is `min`.
  pub fn materialize(min: IVec3, generator: &dyn WorldGenerator) -> Self {
    let mut values = vec![0.0f32; CHUNK_VOLUME];
    let mut materials = vec![Material::default(); CHUNK_VOLUME];
    for z in 0..CHUNK_SIZE {
      for y in 0..CHUNK_SIZE {
        for x in 0..CHUNK_SIZE {
          let index = coord_to_index(x, y, z);
          let (value, material) = generator.sample(min.x + x, min.y + y, min.z + z);
          values[index] = value;
          materials[index] = material;
        }
      }
    }
    Self::from_parts(values, materials)
  }

  /// # Panics
  ///
  /// Panics unless both buffers hold exactly 4096 entries.
  pub fn from_parts(values: Vec<f32>, materials: Vec<Material>) -> Self {
    assert_eq!(values.len(), CHUNK_VOLUME, "leaf value count");
    assert_eq!(materials.len(), CHUNK_VOLUME, "leaf material count");
    Self {
      values: values.into_boxed_slice(),
      materials: materials.into_boxed_slice(),
      dirty_values: BTreeSet::new(),
      dirty_materials: BTreeSet::new(),
    }
  }

  #[inline]
  pub fn get(&self, index: usize) -> (f32, Material) {
    (self.values[index], self.materials[index])
  }

  #[inline]
  pub fn set_value(&mut self, index: usize, value: f32, track: bool) {
    self.values[index] = value;
    if track {
      self.dirty_values.insert(index as u16);
    }
  }

  #[inline]
  pub fn set_material(&mut self, index: usize, material: Material, track: bool) {
    self.materials[index] = material;
    if track {
      self.dirty_materials.insert(index as u16);
    }
  }

  pub fn values(&self) -> &[f32] {
    &self.values
  }

  pub fn materials(&self) -> &[Material] {
    &self.materials
  }

  /// True if cells were written since the last diff extraction.
  pub fn is_network_dirty(&self) -> bool {
    !self.dirty_values.is_empty() || !self.dirty_materials.is_empty()
  }
}
