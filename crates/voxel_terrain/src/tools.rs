//! Editing brushes.
//!
//! Each brush writes through a [`DataOctree`] (normally a write guard) and
//! returns the voxels it touched, so the caller can queue chunk updates.
//! Brushes only visit voxels inside the world; editing near the border
//! never reaches the out-of-world panic of the direct setters.

use glam::{IVec3, Vec3};

use crate::data::DataOctree;

const VOXEL_DIAGONAL: f32 = 1.732_050_8;

/// Offsets of a cube of half-width `extent` around `center`, limited to the
/// world.
fn cube_around(
  octree: &DataOctree,
  center: IVec3,
  extent: IVec3,
) -> impl Iterator<Item = (IVec3, IVec3)> {
  let bounds = octree.bounds();
  let min = (center - extent).max(bounds.min);
  let max = (center + extent).min(bounds.max - IVec3::ONE);
  (min.z..=max.z).flat_map(move |z| {
    (min.y..=max.y).flat_map(move |y| {
      (min.x..=max.x).map(move |x| {
        let pos = IVec3::new(x, y, z);
        (pos, pos - center)
      })
    })
  })
}

/// Add (`add = true`, makes solid) or dig a ball with a soft two-voxel shell.
///
/// Values inside are `±strength`, ramping through zero at `radius`. A voxel
/// is only overwritten when that moves it toward the brush's side of the
/// surface, so overlapping strokes do not undo each other.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "tools::set_value_sphere"))]
pub fn set_value_sphere(
  octree: &mut DataOctree,
  center: IVec3,
  radius: f32,
  add: bool,
  strength: f32,
) -> Vec<IVec3> {
  let reach = radius.ceil() as i32 + 2;
  let sign = if add { -1.0 } else { 1.0 };
  let cells: Vec<_> = cube_around(octree, center, IVec3::splat(reach)).collect();

  let mut touched = Vec::new();
  for (pos, offset) in cells {
    let distance = offset.as_vec3().length();
    if distance > radius + 3.0 {
      continue;
    }
    let value = (radius - distance).clamp(-2.0, 2.0) / 2.0 * strength * sign;
    let current = octree.get_value(pos);
    let accept = if add {
      value <= 0.0 || current * value >= 0.0
    } else {
      value > 0.0 || current * value > 0.0
    };
    if accept {
      octree.set_value(pos, value);
      touched.push(pos);
    }
  }
  touched
}

/// Fill (`add = true`) or clear an axis-aligned box of half extents
/// `extent` with `±strength`.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "tools::set_value_box"))]
pub fn set_value_box(
  octree: &mut DataOctree,
  center: IVec3,
  extent: Vec3,
  add: bool,
  strength: f32,
) -> Vec<IVec3> {
  let value = strength * if add { -1.0 } else { 1.0 };
  let cells: Vec<_> = cube_around(octree, center, extent.ceil().as_ivec3()).collect();

  let mut touched = Vec::new();
  for (pos, _) in cells {
    let accept = (add && value < 0.0) || (!add && value >= 0.0) || octree.get_value(pos) * value > 0.0;
    if accept {
      octree.set_value(pos, value);
      touched.push(pos);
    }
  }
  touched
}

/// Paint palette entry `index` into one blend layer of a ball.
///
/// Layer 2 (`use_layer1 = false`) is painted by raising alpha, layer 1 by
/// lowering it. Alpha fades linearly over `fade` voxels past `radius`; a
/// thin ring beyond that is reset to the other layer so old paint does not
/// bleed through the new edge.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "tools::set_material_sphere"))]
pub fn set_material_sphere(
  octree: &mut DataOctree,
  center: IVec3,
  radius: f32,
  index: u8,
  use_layer1: bool,
  fade: f32,
) -> Vec<IVec3> {
  let fade = fade.max(0.0);
  let inner = radius + fade + VOXEL_DIAGONAL;
  let outer = radius + fade + 2.0 * VOXEL_DIAGONAL;
  let cells: Vec<_> = cube_around(octree, center, IVec3::splat(outer.ceil() as i32)).collect();

  let mut touched = Vec::new();
  for (pos, offset) in cells {
    let distance = offset.as_vec3().length();
    let mut material = octree.get_material(pos);
    let layer_index = if use_layer1 { material.index1 } else { material.index2 };

    if distance < inner {
      let coverage = if fade > 0.0 {
        ((radius + fade - distance) / fade).clamp(0.0, 1.0)
      } else if distance <= radius {
        1.0
      } else {
        0.0
      };
      let mut alpha = (255.0 * coverage) as u8;
      if use_layer1 {
        alpha = 255 - alpha;
      }
      if layer_index == index {
        alpha = if use_layer1 {
          alpha.min(material.alpha)
        } else {
          alpha.max(material.alpha)
        };
      }
      material.alpha = alpha;
      if use_layer1 {
        material.index1 = index;
      } else {
        material.index2 = index;
      }
    } else if distance < outer && layer_index != index {
      material.alpha = if use_layer1 { 255 } else { 0 };
    } else {
      continue;
    }

    octree.set_material(pos, material);
    touched.push(pos);
  }
  touched
}

#[cfg(test)]
#[path = "tools_test.rs"]
mod tools_test;
