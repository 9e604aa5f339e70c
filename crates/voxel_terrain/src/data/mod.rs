//! Voxel data store.
//!
//! # Module Structure
//!
//! - [`octree`]: `DataOctree` - sparse copy-on-write value tree
//! - [`leaf`]: `LeafData` - dense 16³ arrays of an edited leaf
//! - [`save`]: `WorldSave` / diff packets - persisted and wire formats
//!
//! # Locking
//!
//! [`VoxelData`] wraps the octree in a reader/writer lock. Readers overlap
//! freely; a writer excludes readers and other writers. The lock is **not
//! reentrant**: a thread holding a guard must not take another one on the
//! same store. Debug builds track holder threads and panic on misuse.

pub mod leaf;
pub mod octree;
pub mod save;

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[cfg(debug_assertions)]
use std::collections::HashSet;
#[cfg(debug_assertions)]
use std::sync::{Mutex, PoisonError};
#[cfg(debug_assertions)]
use std::thread::ThreadId;

use glam::IVec3;

pub use leaf::LeafData;
pub use octree::DataOctree;
pub use save::{ChunkSave, DiffPackets, MaterialDiff, ValueDiff, WorldSave};

use crate::generator::WorldGenerator;
use crate::types::Material;

/// Shared, lock-protected voxel store.
pub struct VoxelData {
  octree: RwLock<DataOctree>,
  #[cfg(debug_assertions)]
  holders: Mutex<HashSet<ThreadId>>,
}

/// Shared access, released on drop.
pub struct ReadGuard<'a> {
  inner: RwLockReadGuard<'a, DataOctree>,
  _holder: HolderToken<'a>,
}

/// Exclusive access, released on drop.
pub struct WriteGuard<'a> {
  inner: RwLockWriteGuard<'a, DataOctree>,
  _holder: HolderToken<'a>,
}

impl VoxelData {
  pub fn new(depth: u8, generator: Arc<dyn WorldGenerator>, multiplayer: bool) -> Self {
    Self::from_octree(DataOctree::new(depth, generator, multiplayer))
  }

  pub fn from_octree(octree: DataOctree) -> Self {
    Self {
      octree: RwLock::new(octree),
      #[cfg(debug_assertions)]
      holders: Mutex::new(HashSet::new()),
    }
  }

  /// Take the read lock. Blocks while a writer holds the store.
  ///
  /// # Panics
  ///
  /// In debug builds, panics if this thread already holds a guard.
  pub fn begin_get(&self) -> ReadGuard<'_> {
    let holder = self.enter();
    // A panicking writer leaves the tree structurally valid; keep serving it.
    let inner = self.octree.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    ReadGuard {
      inner,
      _holder: holder,
    }
  }

  /// Take the write lock. Blocks new readers, then waits for current readers
  /// and writers to finish.
  ///
  /// # Panics
  ///
  /// In debug builds, panics if this thread already holds a guard.
  pub fn begin_set(&self) -> WriteGuard<'_> {
    let holder = self.enter();
    let inner = self.octree.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    WriteGuard {
      inner,
      _holder: holder,
    }
  }

  #[cfg(debug_assertions)]
  fn enter(&self) -> HolderToken<'_> {
    let thread = std::thread::current().id();
    let fresh = self
      .holders
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(thread);
    assert!(fresh, "voxel data lock is not reentrant");
    HolderToken {
      holders: &self.holders,
      thread,
    }
  }

  #[cfg(not(debug_assertions))]
  #[inline]
  fn enter(&self) -> HolderToken<'_> {
    HolderToken {
      _marker: std::marker::PhantomData,
    }
  }

  pub fn depth(&self) -> u8 {
    self.begin_get().depth()
  }

  pub fn size(&self) -> i32 {
    self.begin_get().size()
  }

  pub fn get(&self, pos: IVec3) -> (f32, Material) {
    self.begin_get().get(pos)
  }

  pub fn get_value(&self, pos: IVec3) -> f32 {
    self.begin_get().get_value(pos)
  }

  pub fn get_material(&self, pos: IVec3) -> Material {
    self.begin_get().get_material(pos)
  }

  pub fn set_value(&self, pos: IVec3, value: f32) {
    self.begin_set().set_value(pos, value);
  }

  pub fn set_material(&self, pos: IVec3, material: Material) {
    self.begin_set().set_material(pos, material);
  }

  pub fn save(&self) -> WorldSave {
    self.begin_get().save()
  }

  pub fn load(&self, save: &WorldSave, reset: bool) -> Vec<IVec3> {
    self.begin_set().load(save, reset)
  }

  pub fn diff(&self, packet_size: usize) -> DiffPackets {
    self.begin_set().diff(packet_size)
  }

  pub fn apply_diff(&self, values: &[ValueDiff], materials: &[MaterialDiff]) -> Vec<IVec3> {
    self.begin_set().apply_diff(values, materials)
  }
}

/// Marks the current thread as a lock holder until dropped.
struct HolderToken<'a> {
  #[cfg(debug_assertions)]
  holders: &'a Mutex<HashSet<ThreadId>>,
  #[cfg(debug_assertions)]
  thread: ThreadId,
  #[cfg(not(debug_assertions))]
  _marker: std::marker::PhantomData<&'a ()>,
}

#[cfg(debug_assertions)]
impl Drop for HolderToken<'_> {
  fn drop(&mut self) {
    self
      .holders
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(&self.thread);
  }
}

impl Deref for ReadGuard<'_> {
  type Target = DataOctree;

  fn deref(&self) -> &DataOctree {
    &self.inner
  }
}

impl Deref for WriteGuard<'_> {
  type Target = DataOctree;

  fn deref(&self) -> &DataOctree {
    &self.inner
  }
}

impl DerefMut for WriteGuard<'_> {
  fn deref_mut(&mut self) -> &mut DataOctree {
    &mut self.inner
  }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
