//! Sparse value octree: copy-on-write over a procedural generator.
//!
//! ```text
//!            root (depth D)
//!           /   ...        \
//!      internal           leaf (no data) ──► generator
//!       /    \
//!   leaf      leaf (data) ──► dense 16³ arrays
//! ```
//!
//! Nodes are created on the first write below them and never collapse;
//! only [`DataOctree::reset`] frees them.

use std::iter::Peekable;
use std::sync::Arc;

use glam::IVec3;

use super::leaf::LeafData;
use super::save::{
  is_leaf_id, packetize, ChunkSave, DiffPackets, MaterialDiff, ValueDiff, WorldSave,
};
use crate::constants::{coord_to_index, index_to_coord, CHUNK_SIZE, CHUNK_VOLUME};
use crate::generator::WorldGenerator;
use crate::octree::{AddressNode, Arena, IAabb3, NodeHandle};
use crate::types::Material;

enum NodeState {
  /// Depth-0 leaves hold data once written; deeper leaves never do.
  Leaf(Option<Box<LeafData>>),
  Internal([NodeHandle; 8]),
}

struct DataNode {
  address: AddressNode,
  state: NodeState,
}

/// Voxel values and materials of a whole world.
pub struct DataOctree {
  nodes: Arena<DataNode>,
  root: NodeHandle,
  depth: u8,
  multiplayer: bool,
  generator: Arc<dyn WorldGenerator>,
}

impl DataOctree {
  /// # Panics
  ///
  /// Panics if `depth` exceeds [`crate::constants::MAX_DEPTH`].
  pub fn new(depth: u8, generator: Arc<dyn WorldGenerator>, multiplayer: bool) -> Self {
    let mut nodes = Arena::new();
    let root = nodes.insert(DataNode {
      address: AddressNode::root(depth),
      state: NodeState::Leaf(None),
    });
    Self {
      nodes,
      root,
      depth,
      multiplayer,
      generator,
    }
  }

  pub fn depth(&self) -> u8 {
    self.depth
  }

  /// World width in voxels.
  pub fn size(&self) -> i32 {
    CHUNK_SIZE << self.depth
  }

  pub fn is_multiplayer(&self) -> bool {
    self.multiplayer
  }

  pub fn generator(&self) -> &Arc<dyn WorldGenerator> {
    &self.generator
  }

  /// `[-size/2, size/2)` on each axis.
  pub fn bounds(&self) -> IAabb3 {
    self.nodes[self.root].address.bounds()
  }

  pub fn is_in_world(&self, pos: IVec3) -> bool {
    self.bounds().contains(pos)
  }

  pub fn clamp_to_world(&self, pos: IVec3) -> IVec3 {
    self.bounds().clamp(pos)
  }

  /// Value and material at `pos`, clamped to the world.
  pub fn get(&self, pos: IVec3) -> (f32, Material) {
    let pos = self.clamp_to_world(pos);
    let mut handle = self.root;
    loop {
      let node = &self.nodes[handle];
      match &node.state {
        NodeState::Internal(children) => handle = children[node.address.child_index(pos)],
        NodeState::Leaf(Some(data)) => {
          let local = node.address.global_to_local(pos);
          return data.get(coord_to_index(local.x, local.y, local.z));
        }
        NodeState::Leaf(None) => return self.generator.sample(pos.x, pos.y, pos.z),
      }
    }
  }

  pub fn get_value(&self, pos: IVec3) -> f32 {
    self.get(pos).0
  }

  pub fn get_material(&self, pos: IVec3) -> Material {
    self.get(pos).1
  }

  /// # Panics
  ///
  /// Panics if `pos` is outside the world.
  pub fn set_value(&mut self, pos: IVec3, value: f32) {
    let track = self.multiplayer;
    let (leaf, index) = self.leaf_for_write(pos);
    leaf.set_value(index, value, track);
  }

  /// # Panics
  ///
  /// Panics if `pos` is outside the world.
  pub fn set_material(&mut self, pos: IVec3, material: Material) {
    let track = self.multiplayer;
    let (leaf, index) = self.leaf_for_write(pos);
    leaf.set_material(index, material, track);
  }

  /// # Panics
  ///
  /// Panics if `pos` is outside the world.
  pub fn set_both(&mut self, pos: IVec3, value: f32, material: Material) {
    let track = self.multiplayer;
    let (leaf, index) = self.leaf_for_write(pos);
    leaf.set_value(index, value, track);
    leaf.set_material(index, material, track);
  }

  /// Walk to the depth-0 leaf containing `pos`, splitting and materializing
  /// on the way.
  fn leaf_for_write(&mut self, pos: IVec3) -> (&mut LeafData, usize) {
    assert!(
      self.is_in_world(pos),
      "voxel {} is outside the world {:?}",
      pos,
      self.bounds()
    );
    let handle = self.descend(|node| node.child_index(pos));
    let address = self.nodes[handle].address;
    let local = address.global_to_local(pos);
    (
      self.materialize(handle),
      coord_to_index(local.x, local.y, local.z),
    )
  }

  /// Walk down to depth 0, creating children where needed. `pick` selects the
  /// octant at each internal node.
  fn descend(&mut self, pick: impl Fn(&AddressNode) -> usize) -> NodeHandle {
    let mut handle = self.root;
    loop {
      let node = &self.nodes[handle];
      let next = match &node.state {
        NodeState::Internal(children) => Some(children[pick(&node.address)]),
        NodeState::Leaf(_) if node.address.depth > 0 => None,
        NodeState::Leaf(_) => return handle,
      };
      match next {
        Some(child) => handle = child,
        None => self.create_children(handle),
      }
    }
  }

  fn create_children(&mut self, handle: NodeHandle) {
    let address = self.nodes[handle].address;
    debug_assert!(
      matches!(self.nodes[handle].state, NodeState::Leaf(None)),
      "only empty leaves split"
    );
    let children = address.children().map(|child| {
      self.nodes.insert(DataNode {
        address: child,
        state: NodeState::Leaf(None),
      })
    });
    self.nodes[handle].state = NodeState::Internal(children);
  }

  fn materialize(&mut self, handle: NodeHandle) -> &mut LeafData {
    let generator = &self.generator;
    let node = &mut self.nodes[handle];
    let min = node.address.min_corner();
    match &mut node.state {
      NodeState::Leaf(data) => {
        &mut **data.get_or_insert_with(|| Box::new(LeafData::materialize(min, generator.as_ref())))
      }
      NodeState::Internal(_) => unreachable!("descend stops at leaves"),
    }
  }

  /// Drop every node and start over from the generator.
  pub fn reset(&mut self) {
    self.nodes.clear();
    self.root = self.nodes.insert(DataNode {
      address: AddressNode::root(self.depth),
      state: NodeState::Leaf(None),
    });
  }

  /// Edited leaves in depth-first (ascending id) order.
  fn dirty_leaves(&self) -> Vec<NodeHandle> {
    let mut out = Vec::new();
    let mut stack = vec![self.root];
    while let Some(handle) = stack.pop() {
      match &self.nodes[handle].state {
        NodeState::Internal(children) => stack.extend(children.iter().rev()),
        NodeState::Leaf(Some(_)) => out.push(handle),
        NodeState::Leaf(None) => {}
      }
    }
    out
  }

  pub fn dirty_leaf_count(&self) -> usize {
    self.dirty_leaves().len()
  }

  /// Points whose containing chunks must be remeshed when the leaf centered
  /// at `center` changes: the leaf itself and all 26 neighbors. Lower
  /// neighbors read its first layer as their far corner, upper ones as the
  /// skirt below their minimum corner.
  fn leaf_anchors(&self, center: IVec3, out: &mut Vec<IVec3>) {
    for k in 0..27 {
      let offset = IVec3::new(k % 3 - 1, (k / 3) % 3 - 1, k / 9 - 1) * CHUNK_SIZE;
      let anchor = center + offset;
      if self.is_in_world(anchor) {
        out.push(anchor);
      }
    }
  }

  /// Anchors of every edited leaf.
  pub fn dirty_chunk_positions(&self) -> Vec<IVec3> {
    let mut out = Vec::new();
    for handle in self.dirty_leaves() {
      self.leaf_anchors(self.nodes[handle].address.center, &mut out);
    }
    out
  }

  pub fn save(&self) -> WorldSave {
    #[cfg(feature = "profiling")]
    let _span = tracing::info_span!("data::save").entered();

    let chunks = self
      .dirty_leaves()
      .into_iter()
      .filter_map(|handle| {
        let node = &self.nodes[handle];
        match &node.state {
          NodeState::Leaf(Some(data)) => Some(ChunkSave {
            id: node.address.id,
            values: data.values().to_vec(),
            materials: data.materials().to_vec(),
          }),
          _ => None,
        }
      })
      .collect();
    WorldSave {
      depth: self.depth as i32,
      chunks,
    }
  }

  /// Overwrite leaves from a save. Returns the anchors to remesh.
  ///
  /// With `reset`, existing edits are discarded first and their anchors are
  /// reported too. A malformed save is logged and loads nothing.
  pub fn load(&mut self, save: &WorldSave, reset: bool) -> Vec<IVec3> {
    #[cfg(feature = "profiling")]
    let _span = tracing::info_span!("data::load", chunks = save.chunks.len()).entered();

    let mut modified = Vec::new();
    if reset {
      modified = self.dirty_chunk_positions();
      self.reset();
    }
    if let Err(err) = save.validate(self.depth) {
      tracing::warn!(%err, "ignoring save");
      return modified;
    }

    let mut chunks: Vec<&ChunkSave> = save.chunks.iter().collect();
    chunks.sort_by_key(|chunk| chunk.id);
    chunks.dedup_by_key(|chunk| chunk.id);
    let mut queue = chunks.into_iter().peekable();
    self.load_node(self.root, &mut queue, &mut modified);
    debug_assert!(queue.peek().is_none(), "validated leaf ids always match");
    modified
  }

  fn load_node<'a>(
    &mut self,
    handle: NodeHandle,
    queue: &mut Peekable<impl Iterator<Item = &'a ChunkSave>>,
    modified: &mut Vec<IVec3>,
  ) {
    let address = self.nodes[handle].address;
    if address.depth == 0 {
      if let Some(chunk) = queue.next_if(|chunk| chunk.id == address.id) {
        let data = LeafData::from_parts(chunk.values.clone(), chunk.materials.clone());
        self.nodes[handle].state = NodeState::Leaf(Some(Box::new(data)));
        self.leaf_anchors(address.center, modified);
      }
      return;
    }
    if !queue.peek().is_some_and(|chunk| address.contains_id(chunk.id)) {
      return;
    }
    if matches!(self.nodes[handle].state, NodeState::Leaf(_)) {
      self.create_children(handle);
    }
    if let NodeState::Internal(children) = self.nodes[handle].state {
      for child in children {
        self.load_node(child, queue, modified);
      }
    }
  }

  /// Collect and clear the cells written since the previous call.
  pub fn diff(&mut self, packet_size: usize) -> DiffPackets {
    #[cfg(feature = "profiling")]
    let _span = tracing::info_span!("data::diff").entered();

    let mut values = Vec::new();
    let mut materials = Vec::new();
    for handle in self.dirty_leaves() {
      let node = &mut self.nodes[handle];
      let id = node.address.id;
      if let NodeState::Leaf(Some(data)) = &mut node.state {
        for index in std::mem::take(&mut data.dirty_values) {
          values.push(ValueDiff {
            id,
            index,
            value: data.values[index as usize],
          });
        }
        for index in std::mem::take(&mut data.dirty_materials) {
          materials.push(MaterialDiff {
            id,
            index,
            material: data.materials[index as usize],
          });
        }
      }
    }
    DiffPackets {
      values: packetize(values, packet_size),
      materials: packetize(materials, packet_size),
    }
  }

  /// Apply received diff entries. Returns the world position of every
  /// applied cell. Entries with an invalid id or index are logged and skipped.
  pub fn apply_diff(&mut self, values: &[ValueDiff], materials: &[MaterialDiff]) -> Vec<IVec3> {
    #[cfg(feature = "profiling")]
    let _span = tracing::info_span!("data::apply_diff").entered();

    let mut modified = Vec::with_capacity(values.len() + materials.len());
    for entry in values {
      if let Some((leaf, pos)) = self.diff_target(entry.id, entry.index) {
        leaf.set_value(entry.index as usize, entry.value, false);
        modified.push(pos);
      }
    }
    for entry in materials {
      if let Some((leaf, pos)) = self.diff_target(entry.id, entry.index) {
        leaf.set_material(entry.index as usize, entry.material, false);
        modified.push(pos);
      }
    }
    modified
  }

  fn diff_target(&mut self, id: u64, index: u16) -> Option<(&mut LeafData, IVec3)> {
    if !is_leaf_id(id, self.depth) || index as usize >= CHUNK_VOLUME {
      tracing::warn!(id, index, "skipping diff entry outside the octree");
      return None;
    }
    let handle = self.descend(|node| {
      (0..8)
        .find(|&octant| node.child(octant).contains_id(id))
        .unwrap_or_default()
    });
    let address = self.nodes[handle].address;
    debug_assert_eq!(address.id, id);
    let (x, y, z) = index_to_coord(index as usize);
    let pos = address.local_to_global(IVec3::new(x, y, z));
    Some((self.materialize(handle), pos))
  }

  /// Structural check used by tests: internal nodes own eight live children
  /// and only depth-0 leaves hold data.
  pub fn check_invariants(&self) -> bool {
    let mut stack = vec![self.root];
    while let Some(handle) = stack.pop() {
      let Some(node) = self.nodes.get(handle) else {
        return false;
      };
      match &node.state {
        NodeState::Internal(children) => {
          if node.address.depth == 0 {
            return false;
          }
          for child in children {
            match self.nodes.get(*child) {
              Some(c) if c.address.depth + 1 == node.address.depth => stack.push(*child),
              _ => return false,
            }
          }
        }
        NodeState::Leaf(Some(_)) if node.address.depth != 0 => return false,
        NodeState::Leaf(_) => {}
      }
    }
    true
  }

  /// Number of allocated nodes.
  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }
}

#[cfg(test)]
#[path = "octree_test.rs"]
mod octree_test;
