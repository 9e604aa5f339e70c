//! Chunk octree: which regions are rendered, and at which depth.
//!
//! Every node is in exactly one state:
//!
//! ```text
//!            load                    split
//! Empty ──────────────► Loaded ─────────────────► Children([8])
//!   ▲                     ▲                            │
//!   └─────────────────────┴────────── collapse ────────┘
//! ```
//!
//! # Hysteresis
//!
//! For a node at depth `d`, the distance to the nearest invoker (minus the
//! invoker offset and the node's half diagonal, at least 1) gives
//! `min_lod = log2(distance / 16)`. Adding half a chunk of the LOD just
//! chosen gives `max_lod`:
//!
//! ```text
//! max_lod = log2((distance + (16 << floor(min_lod)) / 2) / 16)
//!
//!   min_lod < d < max_lod   keep the current state
//!   max_lod < d             too coarse: split
//!   otherwise               too fine: collapse into one chunk
//! ```
//!
//! A node sitting inside the band keeps whatever it had, so an invoker
//! resting on a threshold does not flip it every pass.
//!
//! # Gradation
//!
//! After the distance pass, a balancing pass splits any chunk that is more
//! than one level coarser than a face neighbor. Collapses that would break
//! that bound are refused, which keeps balancing splits stable.

use glam::IVec3;

use super::invoker::InvokerSample;
use crate::constants::{CHUNK_SIZE, MAX_DEPTH};
use crate::octree::{AddressNode, Arena, IAabb3, NodeHandle};
use crate::types::{Direction, TransitionMask};

const SQRT_3: f32 = 1.732_050_8;

/// Receives chunk creation and removal decisions made by [`ChunkOctree`].
pub trait ChunkLifecycle {
  fn load(&mut self, node: &AddressNode);
  fn unload(&mut self, node: &AddressNode);
}

/// What the distance test wants for one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LodDecision {
  Keep,
  Split,
  Collapse,
}

/// Counters for one LOD pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LodStats {
  pub loads: usize,
  pub unloads: usize,
  pub splits: usize,
  pub collapses: usize,
  pub refused_collapses: usize,
  pub balance_splits: usize,
}

impl LodStats {
  pub fn is_unchanged(&self) -> bool {
    self.loads == 0 && self.unloads == 0
  }
}

#[derive(Clone, Copy, Debug)]
enum ChunkState {
  Empty,
  Loaded,
  Children([NodeHandle; 8]),
}

struct ChunkNode {
  address: AddressNode,
  state: ChunkState,
}

/// Hysteresis band `(min_lod, max_lod)` of `node` for the given invokers.
/// Without invokers both bounds are infinite.
pub fn lod_band(node: &AddressNode, invokers: &[InvokerSample]) -> (f32, f32) {
  let center = node.center.as_vec3();
  let half_diagonal = node.width() as f32 / 2.0 * SQRT_3;
  let min_distance = invokers
    .iter()
    .map(|invoker| {
      (center.distance(invoker.position) - invoker.distance_offset - half_diagonal).max(0.0)
    })
    .fold(f32::INFINITY, f32::min)
    .max(1.0);

  let chunk = CHUNK_SIZE as f32;
  let min_lod = (min_distance / chunk).log2();
  let chosen = (min_lod as i32).clamp(0, MAX_DEPTH as i32);
  let max_distance = min_distance + (CHUNK_SIZE << chosen) as f32 / 2.0;
  let max_lod = (max_distance / chunk).log2();
  (min_lod, max_lod)
}

pub fn lod_decision(node: &AddressNode, invokers: &[InvokerSample]) -> LodDecision {
  let (min_lod, max_lod) = lod_band(node, invokers);
  let depth = node.depth as f32;
  if min_lod < depth && depth < max_lod {
    LodDecision::Keep
  } else if max_lod < depth {
    LodDecision::Split
  } else {
    LodDecision::Collapse
  }
}

/// Face slab of thickness one voxel just outside `bounds`.
fn face_slab(bounds: &IAabb3, direction: Direction) -> IAabb3 {
  let axis = direction.axis();
  let (mut min, mut max) = (bounds.min, bounds.max);
  if direction.is_max() {
    min[axis] = bounds.max[axis];
    max[axis] = bounds.max[axis] + 1;
  } else {
    min[axis] = bounds.min[axis] - 1;
    max[axis] = bounds.min[axis];
  }
  IAabb3::new(min, max)
}

pub struct ChunkOctree {
  nodes: Arena<ChunkNode>,
  root: NodeHandle,
  max_balance_iterations: usize,
}

impl ChunkOctree {
  pub fn new(depth: u8) -> Self {
    let mut nodes = Arena::new();
    let root = nodes.insert(ChunkNode {
      address: AddressNode::root(depth),
      state: ChunkState::Empty,
    });
    Self {
      nodes,
      root,
      max_balance_iterations: 8,
    }
  }

  pub fn with_max_balance_iterations(mut self, iterations: usize) -> Self {
    self.max_balance_iterations = iterations;
    self
  }

  pub fn depth(&self) -> u8 {
    self.nodes[self.root].address.depth
  }

  pub fn root(&self) -> AddressNode {
    self.nodes[self.root].address
  }

  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }

  /// Run one LOD pass for the given invokers, reporting every chunk that
  /// must appear or disappear to `lifecycle`.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "lod::update"))]
  pub fn update_lod<L: ChunkLifecycle>(
    &mut self,
    invokers: &[InvokerSample],
    lifecycle: &mut L,
  ) -> LodStats {
    let mut stats = LodStats::default();
    self.update_node(self.root, invokers, lifecycle, &mut stats);
    self.balance(lifecycle, &mut stats);
    stats
  }

  fn update_node<L: ChunkLifecycle>(
    &mut self,
    handle: NodeHandle,
    invokers: &[InvokerSample],
    lifecycle: &mut L,
    stats: &mut LodStats,
  ) {
    let node = self.nodes[handle].address;
    if node.depth == 0 {
      self.load(handle, lifecycle, stats);
      return;
    }

    let state = self.nodes[handle].state;
    match lod_decision(&node, invokers) {
      LodDecision::Keep => match state {
        ChunkState::Children(children) => {
          for child in children {
            self.update_node(child, invokers, lifecycle, stats);
          }
        }
        ChunkState::Empty | ChunkState::Loaded => self.load(handle, lifecycle, stats),
      },
      LodDecision::Split => {
        for child in self.split(handle, lifecycle, stats) {
          self.update_node(child, invokers, lifecycle, stats);
        }
      }
      LodDecision::Collapse => {
        if let ChunkState::Children(children) = state {
          if self.has_finer_neighbor(&node, node.depth.saturating_sub(1)) {
            stats.refused_collapses += 1;
            for child in children {
              self.update_node(child, invokers, lifecycle, stats);
            }
            return;
          }
          self.remove_children(handle, lifecycle, stats);
          stats.collapses += 1;
        }
        self.load(handle, lifecycle, stats);
      }
    }
  }

  fn load<L: ChunkLifecycle>(&mut self, handle: NodeHandle, lifecycle: &mut L, stats: &mut LodStats) {
    let state = self.nodes[handle].state;
    match state {
      ChunkState::Loaded => {}
      ChunkState::Empty => {
        let node = &mut self.nodes[handle];
        node.state = ChunkState::Loaded;
        lifecycle.load(&node.address);
        stats.loads += 1;
      }
      ChunkState::Children(_) => {
        self.remove_children(handle, lifecycle, stats);
        self.load(handle, lifecycle, stats);
      }
    }
  }

  /// Give `handle` children (unloading its chunk first) and return them.
  fn split<L: ChunkLifecycle>(
    &mut self,
    handle: NodeHandle,
    lifecycle: &mut L,
    stats: &mut LodStats,
  ) -> [NodeHandle; 8] {
    let node = &mut self.nodes[handle];
    match node.state {
      ChunkState::Children(children) => return children,
      ChunkState::Loaded => {
        node.state = ChunkState::Empty;
        lifecycle.unload(&node.address);
        stats.unloads += 1;
      }
      ChunkState::Empty => {}
    }

    let address = self.nodes[handle].address;
    let children = address.children().map(|child| {
      self.nodes.insert(ChunkNode {
        address: child,
        state: ChunkState::Empty,
      })
    });
    self.nodes[handle].state = ChunkState::Children(children);
    stats.splits += 1;
    children
  }

  /// Remove every descendant of `handle`, unloading their chunks.
  fn remove_children<L: ChunkLifecycle>(
    &mut self,
    handle: NodeHandle,
    lifecycle: &mut L,
    stats: &mut LodStats,
  ) {
    let ChunkState::Children(children) = self.nodes[handle].state else {
      return;
    };
    self.nodes[handle].state = ChunkState::Empty;

    let mut stack: Vec<NodeHandle> = children.to_vec();
    while let Some(current) = stack.pop() {
      let Some(node) = self.nodes.remove(current) else {
        continue;
      };
      match node.state {
        ChunkState::Children(grandchildren) => stack.extend(grandchildren),
        ChunkState::Loaded => {
          lifecycle.unload(&node.address);
          stats.unloads += 1;
        }
        ChunkState::Empty => {}
      }
    }
  }

  /// Split every chunk that is more than one level coarser than a face
  /// neighbor, round by round.
  fn balance<L: ChunkLifecycle>(&mut self, lifecycle: &mut L, stats: &mut LodStats) {
    for _ in 0..self.max_balance_iterations {
      let mut coarse: Vec<NodeHandle> = Vec::new();
      for (_, leaf) in self.leaf_nodes() {
        for direction in Direction::ALL {
          let probe = leaf.center + direction.offset() * leaf.width();
          if let Some(neighbor) = self.leaf_handle_at(probe) {
            if self.nodes[neighbor].address.depth > leaf.depth + 1 {
              coarse.push(neighbor);
            }
          }
        }
      }
      if coarse.is_empty() {
        return;
      }

      coarse.sort_unstable();
      coarse.dedup();
      for handle in coarse {
        if matches!(self.nodes[handle].state, ChunkState::Children(_)) {
          continue;
        }
        for child in self.split(handle, lifecycle, stats) {
          self.load(child, lifecycle, stats);
        }
        stats.balance_splits += 1;
      }
    }
    tracing::debug!(
      iterations = self.max_balance_iterations,
      "chunk gradation not settled after the iteration limit"
    );
  }

  /// True if a chunk touching a face of `node` is finer than `min_depth`.
  fn has_finer_neighbor(&self, node: &AddressNode, min_depth: u8) -> bool {
    let bounds = node.bounds();
    Direction::ALL.into_iter().any(|direction| {
      self
        .leaf_handles_in(&face_slab(&bounds, direction))
        .into_iter()
        .any(|handle| self.nodes[handle].address.depth < min_depth)
    })
  }

  fn leaf_handle_at(&self, pos: IVec3) -> Option<NodeHandle> {
    let mut current = self.root;
    if !self.nodes[current].address.is_in(pos) {
      return None;
    }
    loop {
      let node = &self.nodes[current];
      match node.state {
        ChunkState::Children(children) => current = children[node.address.child_index(pos)],
        ChunkState::Empty | ChunkState::Loaded => return Some(current),
      }
    }
  }

  /// Nodes without children overlapping `aabb`, loaded or not.
  fn leaf_handles_in(&self, aabb: &IAabb3) -> Vec<NodeHandle> {
    let mut found = Vec::new();
    let mut stack = vec![self.root];
    while let Some(current) = stack.pop() {
      let node = &self.nodes[current];
      if !node.address.bounds().overlaps(aabb) {
        continue;
      }
      match node.state {
        ChunkState::Children(children) => stack.extend(children),
        ChunkState::Empty | ChunkState::Loaded => found.push(current),
      }
    }
    found
  }

  fn leaf_nodes(&self) -> Vec<(NodeHandle, AddressNode)> {
    self
      .nodes
      .iter()
      .filter(|(_, node)| matches!(node.state, ChunkState::Loaded))
      .map(|(handle, node)| (handle, node.address))
      .collect()
  }

  /// Node without children containing `pos`, and whether it is loaded.
  pub fn leaf_at(&self, pos: IVec3) -> Option<(AddressNode, bool)> {
    self.leaf_handle_at(pos).map(|handle| {
      let node = &self.nodes[handle];
      (node.address, matches!(node.state, ChunkState::Loaded))
    })
  }

  pub fn is_loaded(&self, node: &AddressNode) -> bool {
    self
      .leaf_at(node.center)
      .is_some_and(|(leaf, loaded)| loaded && leaf.id == node.id)
  }

  /// Every loaded chunk, in ascending id order.
  pub fn loaded_leaves(&self) -> Vec<AddressNode> {
    let mut leaves: Vec<AddressNode> = self.leaf_nodes().into_iter().map(|(_, node)| node).collect();
    leaves.sort_unstable_by_key(|node| node.id);
    leaves
  }

  /// Loaded chunks overlapping `aabb`.
  pub fn loaded_leaves_in(&self, aabb: &IAabb3) -> Vec<AddressNode> {
    self
      .leaf_handles_in(aabb)
      .into_iter()
      .filter(|&handle| matches!(self.nodes[handle].state, ChunkState::Loaded))
      .map(|handle| self.nodes[handle].address)
      .collect()
  }

  /// Loaded chunks whose sampled region (their bounds grown by one sample
  /// step) contains `pos`: every chunk whose mesh can change when the voxel
  /// at `pos` is edited.
  pub fn leaves_sampling(&self, pos: IVec3) -> Vec<AddressNode> {
    let mut found = Vec::new();
    let mut stack = vec![self.root];
    while let Some(current) = stack.pop() {
      let node = &self.nodes[current];
      if !node.address.bounds().expanded(node.address.step()).contains(pos) {
        continue;
      }
      match node.state {
        ChunkState::Children(children) => stack.extend(children),
        ChunkState::Loaded => found.push(node.address),
        ChunkState::Empty => {}
      }
    }
    found
  }

  /// Faces of `node` whose neighbor is rendered at a finer depth.
  pub fn higher_resolution_mask(&self, node: &AddressNode) -> TransitionMask {
    let mut mask = TransitionMask::NONE;
    for direction in Direction::ALL {
      let probe = node.center + direction.offset() * node.width();
      if let Some((neighbor, _)) = self.leaf_at(probe) {
        mask.set(direction, neighbor.depth < node.depth);
      }
    }
    mask
  }

  /// Verify the tree shape: every reachable node is either a leaf or has
  /// eight correctly addressed children, and nothing else lives in the arena.
  ///
  /// # Panics
  ///
  /// Panics on the first violation.
  pub fn check_invariants(&self) {
    let mut reachable = 0;
    let mut stack = vec![self.root];
    while let Some(current) = stack.pop() {
      reachable += 1;
      let node = &self.nodes[current];
      if let ChunkState::Children(children) = node.state {
        assert!(node.address.depth > 0, "depth-0 chunk node {:?} has children", node.address);
        for (octant, child) in children.into_iter().enumerate() {
          assert_eq!(self.nodes[child].address, node.address.child(octant));
          stack.push(child);
        }
      }
    }
    assert_eq!(reachable, self.nodes.len(), "unreachable chunk nodes in the arena");
  }
}

#[cfg(test)]
#[path = "octree_test.rs"]
mod octree_test;
