//! World configuration, loadable from TOML.
//!
//! ```toml
//! depth = 8
//! multiplayer = false
//! deletion_delay_secs = 0.1
//!
//! [generator]
//! kind = "flat"
//! height = 0.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DIFF_PACKET_SIZE, MAX_DEPTH};
use crate::error::{Result, VoxelError};
use crate::types::Material;

/// Root configuration for a voxel world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
  /// Depth of both octrees. The world spans `16 << depth` voxels per axis,
  /// centered on the origin.
  pub depth: u8,
  /// Track written cells per leaf for diff extraction.
  pub multiplayer: bool,
  /// Build transition cells toward higher-resolution neighbors.
  pub compute_transitions: bool,
  /// Seconds an unloaded chunk stays alive before it is freed.
  pub deletion_delay_secs: f32,
  /// Mesh worker threads (0 = one per core).
  pub mesh_threads: usize,
  /// Foliage worker threads (0 = one per core).
  pub foliage_threads: usize,
  /// Entries per diff packet.
  pub diff_packet_size: usize,
  /// Upper bound on neighbor balancing rounds per LOD pass.
  pub max_balance_iterations: usize,
  /// Deepest chunk depth that still receives foliage.
  pub foliage_max_depth: u8,
  /// Generator used when none is supplied in code.
  pub generator: GeneratorConfig,
}

/// Built-in generators selectable from configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorConfig {
  /// Horizontal ground plane: `value = z - height`.
  Flat {
    #[serde(default)]
    height: f32,
    #[serde(default)]
    material: Material,
  },
  /// Solid ball centered on the origin.
  Sphere {
    radius: f32,
    #[serde(default)]
    material: Material,
  },
  /// Nothing but air.
  Empty,
}

impl Default for GeneratorConfig {
  fn default() -> Self {
    GeneratorConfig::Flat {
      height: 0.0,
      material: Material::default(),
    }
  }
}

impl Default for WorldConfig {
  fn default() -> Self {
    Self {
      depth: 6,
      multiplayer: false,
      compute_transitions: true,
      deletion_delay_secs: 0.1,
      mesh_threads: 0,
      foliage_threads: 1,
      diff_packet_size: DIFF_PACKET_SIZE,
      max_balance_iterations: 8,
      foliage_max_depth: 1,
      generator: GeneratorConfig::default(),
    }
  }
}

impl WorldConfig {
  pub fn with_depth(mut self, depth: u8) -> Self {
    self.depth = depth;
    self
  }

  pub fn with_multiplayer(mut self, multiplayer: bool) -> Self {
    self.multiplayer = multiplayer;
    self
  }

  pub fn with_transitions(mut self, compute_transitions: bool) -> Self {
    self.compute_transitions = compute_transitions;
    self
  }

  pub fn with_deletion_delay(mut self, seconds: f32) -> Self {
    self.deletion_delay_secs = seconds;
    self
  }

  pub fn with_mesh_threads(mut self, threads: usize) -> Self {
    self.mesh_threads = threads;
    self
  }

  pub fn with_generator(mut self, generator: GeneratorConfig) -> Self {
    self.generator = generator;
    self
  }

  /// World width in voxels.
  pub fn world_size(&self) -> i32 {
    16 << self.depth
  }

  /// Parse and validate a TOML document.
  pub fn from_toml_str(content: &str) -> Result<Self> {
    let config: WorldConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Load and validate a TOML file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let content = std::fs::read_to_string(path)?;
    Self::from_toml_str(&content)
  }

  pub fn validate(&self) -> Result<()> {
    if self.depth > MAX_DEPTH {
      return Err(VoxelError::InvalidDepth {
        depth: self.depth,
        max: MAX_DEPTH,
      });
    }
    if self.diff_packet_size == 0 {
      return Err(VoxelError::InvalidConfig(
        "diff_packet_size must be positive".into(),
      ));
    }
    if !self.deletion_delay_secs.is_finite() || self.deletion_delay_secs < 0.0 {
      return Err(VoxelError::InvalidConfig(format!(
        "deletion_delay_secs must be a non-negative number, got {}",
        self.deletion_delay_secs
      )));
    }
    Ok(())
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
