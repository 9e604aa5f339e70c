//! Crate error type.
//!
//! Only recoverable conditions are errors. Broken caller contracts (voxel
//! coordinates outside the world on a direct write, re-entrant store access,
//! stale octree handles) panic instead.

use thiserror::Error;

/// Errors produced while configuring a world or moving data in and out of it.
#[derive(Debug, Error)]
pub enum VoxelError {
  #[error("octree depth {depth} exceeds the maximum of {max}")]
  InvalidDepth { depth: u8, max: u8 },

  #[error("invalid world configuration: {0}")]
  InvalidConfig(String),

  #[error("failed to parse world configuration: {0}")]
  ConfigParse(#[from] toml::de::Error),

  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),

  #[error("save encoding error: {0}")]
  Codec(#[from] bincode::Error),

  #[error("malformed save: {0}")]
  MalformedSave(String),

  #[error("failed to build worker pool: {0}")]
  ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, VoxelError>;
