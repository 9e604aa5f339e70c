//! Persisted and wire formats of the data store.
//!
//! A [`WorldSave`] lists every edited leaf with its full contents. Diff
//! packets carry only cells written since the previous extraction, grouped
//! into fixed-size arrays sorted by leaf id.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{pow9, CHUNK_VOLUME};
use crate::error::{Result, VoxelError};
use crate::types::Material;

/// Snapshot of every edited leaf of a world.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSave {
  pub depth: i32,
  pub chunks: Vec<ChunkSave>,
}

/// Full contents of one edited leaf.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkSave {
  pub id: u64,
  pub values: Vec<f32>,
  pub materials: Vec<Material>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueDiff {
  pub id: u64,
  pub index: u16,
  pub value: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialDiff {
  pub id: u64,
  pub index: u16,
  pub material: Material,
}

/// Diff entries split into bounded packets, each sorted by leaf id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffPackets {
  pub values: Vec<Vec<ValueDiff>>,
  pub materials: Vec<Vec<MaterialDiff>>,
}

impl DiffPackets {
  pub fn is_empty(&self) -> bool {
    self.values.is_empty() && self.materials.is_empty()
  }

  pub fn value_count(&self) -> usize {
    self.values.iter().map(Vec::len).sum()
  }

  pub fn material_count(&self) -> usize {
    self.materials.iter().map(Vec::len).sum()
  }
}

/// Split `entries` into consecutive packets of at most `packet_size`.
pub fn packetize<T>(entries: Vec<T>, packet_size: usize) -> Vec<Vec<T>> {
  let packet_size = packet_size.max(1);
  let mut packets = Vec::with_capacity(entries.len().div_ceil(packet_size));
  let mut current = Vec::with_capacity(packet_size.min(entries.len()));
  for entry in entries {
    current.push(entry);
    if current.len() == packet_size {
      packets.push(std::mem::replace(&mut current, Vec::with_capacity(packet_size)));
    }
  }
  if !current.is_empty() {
    packets.push(current);
  }
  packets
}

/// True if `id` addresses a depth-0 leaf of an octree of `depth` levels:
/// the root digit followed by `depth` octant digits in 1..=8.
pub fn is_leaf_id(id: u64, depth: u8) -> bool {
  let root = pow9(depth);
  if id < root || id >= 2 * root {
    return false;
  }
  let mut rest = id - root;
  for _ in 0..depth {
    if rest % 9 == 0 {
      return false;
    }
    rest /= 9;
  }
  true
}

impl WorldSave {
  pub fn is_empty(&self) -> bool {
    self.chunks.is_empty()
  }

  /// Check that the save fits an octree of `depth` levels.
  pub fn validate(&self, depth: u8) -> Result<()> {
    if self.depth != depth as i32 {
      return Err(VoxelError::MalformedSave(format!(
        "save depth {} does not match world depth {}",
        self.depth, depth
      )));
    }
    for chunk in &self.chunks {
      if !is_leaf_id(chunk.id, depth) {
        return Err(VoxelError::MalformedSave(format!(
          "chunk id {} is not a leaf id at depth {}",
          chunk.id, depth
        )));
      }
      if chunk.values.len() != CHUNK_VOLUME || chunk.materials.len() != CHUNK_VOLUME {
        return Err(VoxelError::MalformedSave(format!(
          "chunk {} holds {} values and {} materials, expected {}",
          chunk.id,
          chunk.values.len(),
          chunk.materials.len(),
          CHUNK_VOLUME
        )));
      }
    }
    Ok(())
  }

  pub fn to_bytes(&self) -> Result<Vec<u8>> {
    Ok(bincode::serialize(self)?)
  }

  pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
    Ok(bincode::deserialize(bytes)?)
  }

  pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, self)?;
    writer.flush()?;
    Ok(())
  }

  pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
  }
}

#[cfg(test)]
#[path = "save_test.rs"]
mod save_test;
