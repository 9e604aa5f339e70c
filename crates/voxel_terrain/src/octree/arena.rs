//! Flat node storage with generation-checked handles.
//!
//! Both octrees keep their nodes in an [`Arena`] and link children by
//! [`NodeHandle`]. Removing a node bumps its slot generation, so a handle
//! kept past removal never aliases a newer node.

use std::ops::{Index, IndexMut};

/// Index into an [`Arena`], valid until the slot is removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle {
  index: u32,
  generation: u32,
}

impl NodeHandle {
  pub fn index(&self) -> usize {
    self.index as usize
  }
}

struct Slot<T> {
  generation: u32,
  value: Option<T>,
}

pub struct Arena<T> {
  slots: Vec<Slot<T>>,
  free: Vec<u32>,
  len: usize,
}

impl<T> Default for Arena<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Arena<T> {
  pub fn new() -> Self {
    Self {
      slots: Vec::new(),
      free: Vec::new(),
      len: 0,
    }
  }

  pub fn insert(&mut self, value: T) -> NodeHandle {
    self.len += 1;
    if let Some(index) = self.free.pop() {
      let slot = &mut self.slots[index as usize];
      slot.value = Some(value);
      return NodeHandle {
        index,
        generation: slot.generation,
      };
    }
    let index = self.slots.len() as u32;
    self.slots.push(Slot {
      generation: 0,
      value: Some(value),
    });
    NodeHandle {
      index,
      generation: 0,
    }
  }

  pub fn remove(&mut self, handle: NodeHandle) -> Option<T> {
    let slot = self.slots.get_mut(handle.index as usize)?;
    if slot.generation != handle.generation {
      return None;
    }
    let value = slot.value.take()?;
    slot.generation = slot.generation.wrapping_add(1);
    self.free.push(handle.index);
    self.len -= 1;
    Some(value)
  }

  pub fn get(&self, handle: NodeHandle) -> Option<&T> {
    self
      .slots
      .get(handle.index as usize)
      .filter(|slot| slot.generation == handle.generation)
      .and_then(|slot| slot.value.as_ref())
  }

  pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut T> {
    self
      .slots
      .get_mut(handle.index as usize)
      .filter(|slot| slot.generation == handle.generation)
      .and_then(|slot| slot.value.as_mut())
  }

  pub fn contains(&self, handle: NodeHandle) -> bool {
    self.get(handle).is_some()
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Live entries with their handles.
  pub fn iter(&self) -> impl Iterator<Item = (NodeHandle, &T)> {
    self.slots.iter().enumerate().filter_map(|(index, slot)| {
      slot.value.as_ref().map(|value| {
        (
          NodeHandle {
            index: index as u32,
            generation: slot.generation,
          },
          value,
        )
      })
    })
  }

  pub fn clear(&mut self) {
    self.slots.clear();
    self.free.clear();
    self.len = 0;
  }
}

/// Panics on a stale handle: a live tree never holds one.
impl<T> Index<NodeHandle> for Arena<T> {
  type Output = T;

  fn index(&self, handle: NodeHandle) -> &T {
    match self.get(handle) {
      Some(value) => value,
      None => panic!("stale arena handle {:?}", handle),
    }
  }
}

impl<T> IndexMut<NodeHandle> for Arena<T> {
  fn index_mut(&mut self, handle: NodeHandle) -> &mut T {
    match self.get_mut(handle) {
      Some(value) => value,
      None => panic!("stale arena handle {:?}", handle),
    }
  }
}

#[cfg(test)]
#[path = "arena_test.rs"]
mod arena_test;
