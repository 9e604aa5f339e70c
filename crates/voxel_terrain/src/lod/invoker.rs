//! Viewpoints that drive LOD decisions.

use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec3;

/// An external viewpoint, in voxel space.
///
/// The owner keeps the `Arc<Invoker>` and moves it freely; the scheduler only
/// holds a weak reference and forgets the invoker once it is dropped.
/// Components are stored independently, so a reader racing a move may see a
/// mix of old and new coordinates for one pass.
#[derive(Debug)]
pub struct Invoker {
  position: [AtomicU32; 3],
  distance_offset: f32,
}

impl Invoker {
  pub fn new(position: Vec3) -> Self {
    Self::with_offset(position, 0.0)
  }

  /// `distance_offset` is subtracted from every distance this invoker
  /// measures, pulling higher detail further out.
  pub fn with_offset(position: Vec3, distance_offset: f32) -> Self {
    let invoker = Self {
      position: Default::default(),
      distance_offset,
    };
    invoker.set_position(position);
    invoker
  }

  pub fn position(&self) -> Vec3 {
    let [x, y, z] = &self.position;
    Vec3::new(
      f32::from_bits(x.load(Ordering::Relaxed)),
      f32::from_bits(y.load(Ordering::Relaxed)),
      f32::from_bits(z.load(Ordering::Relaxed)),
    )
  }

  pub fn set_position(&self, position: Vec3) {
    for (slot, value) in self.position.iter().zip(position.to_array()) {
      slot.store(value.to_bits(), Ordering::Relaxed);
    }
  }

  pub fn distance_offset(&self) -> f32 {
    self.distance_offset
  }

  /// Plain copy used during one LOD pass.
  pub fn sample(&self) -> InvokerSample {
    InvokerSample {
      position: self.position(),
      distance_offset: self.distance_offset,
    }
  }
}

/// Frozen invoker state for one LOD pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InvokerSample {
  pub position: Vec3,
  pub distance_offset: f32,
}

impl InvokerSample {
  pub fn new(position: Vec3) -> Self {
    Self {
      position,
      distance_offset: 0.0,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_position_round_trip() {
    let invoker = Invoker::with_offset(Vec3::new(1.5, -2.0, 300.25), 4.0);
    assert_eq!(invoker.position(), Vec3::new(1.5, -2.0, 300.25));

    invoker.set_position(Vec3::new(-7.0, 0.0, 1e6));
    let sample = invoker.sample();
    assert_eq!(sample.position, Vec3::new(-7.0, 0.0, 1e6));
    assert_eq!(sample.distance_offset, 4.0);
  }
}
