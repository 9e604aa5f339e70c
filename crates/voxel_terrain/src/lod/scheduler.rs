//! Chunk scheduler: turns LOD decisions and edits into mesh and foliage jobs.
//!
//! ```text
//!  owner thread                                          worker pools
//! ┌──────────────────────────────────────────────┐
//! │ update_lod()  ── ChunkOctree ── load/unload  │
//! │                                     │        │
//! │ apply_queued_updates() ─────────────┤        │
//! │                                     ▼        │  spawn   ┌──────────┐
//! │                          request_update() ───┼────────► │ mesh     │
//! │                                              │          └────┬─────┘
//! │ tick() ◄──── completions ─────────────────────┼───────────────┘
//! │   1. apply meshes, spawn foliage ────────────┼────────► ┌──────────┐
//! │   2. apply foliage ◄─────────────────────────┼───────── │ foliage  │
//! │   3. transition checks queued before tick    │          └──────────┘
//! │   4. retry refused updates                   │
//! │   5. free chunks past their deletion delay   │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Only the owner thread mutates chunks. A result is applied only if the
//! chunk still waits for that exact job; anything else is dropped.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::mem;
use std::sync::{Arc, Weak};
use std::time::Duration;

use glam::IVec3;
use web_time::Instant;

use super::chunk::Chunk;
use super::invoker::{Invoker, InvokerSample};
use super::octree::{ChunkLifecycle, ChunkOctree, LodStats};
use crate::config::WorldConfig;
use crate::data::VoxelData;
use crate::error::Result;
use crate::foliage::{FoliageInstance, FoliageScatter};
use crate::mesher::{ChunkRequest, Polygonizer};
use crate::metrics::TerrainMetrics;
use crate::octree::{AddressNode, IAabb3};
use crate::threading::{Completed, WorkerPool};
use crate::types::{ChunkMesh, TransitionMask};

thread_local! {
  static POLYGONIZER: RefCell<Polygonizer> = RefCell::new(Polygonizer::new());
}

/// Notifications for the rendering side, drained with
/// [`Scheduler::drain_events`].
#[derive(Clone, Debug)]
pub enum ChunkEvent {
  /// A chunk has a new mesh. Positions are relative to `node.min_corner()`.
  MeshReady {
    id: u64,
    node: AddressNode,
    mesh: Arc<ChunkMesh>,
  },
  /// Foliage layer `layer` of a chunk was (re)scattered.
  FoliageReady {
    id: u64,
    layer: usize,
    instances: Arc<Vec<FoliageInstance>>,
  },
  /// The chunk was freed; drop everything shown for it.
  Removed { id: u64 },
}

struct MeshOutput {
  chunk: u64,
  mesh: ChunkMesh,
  elapsed_us: u64,
}

struct FoliageOutput {
  chunk: u64,
  layer: usize,
  instances: Vec<FoliageInstance>,
  elapsed_us: u64,
}

/// Final load state per node after one LOD pass.
#[derive(Default)]
struct LodChanges {
  nodes: BTreeMap<u64, (AddressNode, bool)>,
}

impl ChunkLifecycle for LodChanges {
  fn load(&mut self, node: &AddressNode) {
    self.nodes.insert(node.id, (*node, true));
  }

  fn unload(&mut self, node: &AddressNode) {
    self.nodes.insert(node.id, (*node, false));
  }
}

fn build_mesh(data: &VoxelData, chunk: u64, request: &ChunkRequest) -> MeshOutput {
  let start = Instant::now();
  let mesh = POLYGONIZER.with(|polygonizer| {
    let octree = data.begin_get();
    polygonizer.borrow_mut().build(&*octree, request)
  });
  MeshOutput {
    chunk,
    mesh,
    elapsed_us: start.elapsed().as_micros() as u64,
  }
}

pub struct Scheduler {
  data: Arc<VoxelData>,
  octree: ChunkOctree,
  chunks: HashMap<u64, Chunk>,
  invokers: Vec<Weak<Invoker>>,
  mesh_pool: WorkerPool<MeshOutput>,
  foliage_pool: WorkerPool<FoliageOutput>,
  scatters: Vec<Arc<dyn FoliageScatter>>,
  metrics: Arc<TerrainMetrics>,
  events: Vec<ChunkEvent>,
  queued: HashSet<IVec3>,
  retry: BTreeSet<u64>,
  transition_checks: Vec<IAabb3>,
  compute_transitions: bool,
  deletion_delay: Duration,
  foliage_max_depth: u8,
}

impl Scheduler {
  /// Scheduler over `data`, with a chunk octree of the same depth.
  pub fn new(data: Arc<VoxelData>, config: &WorldConfig, metrics: Arc<TerrainMetrics>) -> Result<Self> {
    let octree =
      ChunkOctree::new(data.depth()).with_max_balance_iterations(config.max_balance_iterations);
    Ok(Self {
      data,
      octree,
      chunks: HashMap::new(),
      invokers: Vec::new(),
      mesh_pool: WorkerPool::new("voxel-mesh", config.mesh_threads)?,
      foliage_pool: WorkerPool::new("voxel-foliage", config.foliage_threads)?,
      scatters: Vec::new(),
      metrics,
      events: Vec::new(),
      queued: HashSet::new(),
      retry: BTreeSet::new(),
      transition_checks: Vec::new(),
      compute_transitions: config.compute_transitions,
      deletion_delay: Duration::from_secs_f32(config.deletion_delay_secs.max(0.0)),
      foliage_max_depth: config.foliage_max_depth,
    })
  }

  /// Register a foliage layer; returns its layer index.
  pub fn add_foliage(&mut self, scatter: Arc<dyn FoliageScatter>) -> usize {
    self.scatters.push(scatter);
    self.scatters.len() - 1
  }

  /// Track `invoker` until its last `Arc` is dropped.
  pub fn add_invoker(&mut self, invoker: &Arc<Invoker>) {
    self.invokers.push(Arc::downgrade(invoker));
  }

  /// Live invokers.
  pub fn invoker_count(&mut self) -> usize {
    self.invokers.retain(|invoker| invoker.strong_count() > 0);
    self.invokers.len()
  }

  pub fn octree(&self) -> &ChunkOctree {
    &self.octree
  }

  pub fn metrics(&self) -> &Arc<TerrainMetrics> {
    &self.metrics
  }

  pub fn chunk(&self, id: u64) -> Option<&Chunk> {
    self.chunks.get(&id)
  }

  /// Current mesh of a chunk, if it has been built.
  pub fn chunk_mesh(&self, id: u64) -> Option<Arc<ChunkMesh>> {
    self.chunks.get(&id).and_then(|chunk| chunk.mesh.clone())
  }

  /// Live chunks, including those waiting for delayed deletion.
  pub fn chunk_count(&self) -> usize {
    self.chunks.len()
  }

  pub fn pending_retries(&self) -> usize {
    self.retry.len()
  }

  /// True when no job, check, retry or queued edit is outstanding.
  pub fn is_idle(&self) -> bool {
    self.mesh_pool.is_idle()
      && self.foliage_pool.is_idle()
      && self.transition_checks.is_empty()
      && self.retry.is_empty()
      && self.queued.is_empty()
  }

  pub fn drain_events(&mut self) -> Vec<ChunkEvent> {
    mem::take(&mut self.events)
  }

  /// Run one LOD pass for the live invokers and start or stop chunks.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "scheduler::update_lod"))]
  pub fn update_lod(&mut self) -> LodStats {
    let start = Instant::now();
    let samples: Vec<InvokerSample> = self
      .invokers
      .iter()
      .filter_map(Weak::upgrade)
      .map(|invoker| invoker.sample())
      .collect();
    self.invokers.retain(|invoker| invoker.strong_count() > 0);

    let mut changes = LodChanges::default();
    let stats = self.octree.update_lod(&samples, &mut changes);

    let now = Instant::now();
    for (id, (node, loaded)) in changes.nodes {
      if loaded {
        self.load_chunk(node);
      } else {
        self.unload_chunk(id, now);
      }
    }

    self.metrics.record_lod_timing(start.elapsed().as_micros() as u64);
    if !stats.is_unchanged() {
      tracing::debug!(
        invokers = samples.len(),
        loads = stats.loads,
        unloads = stats.unloads,
        splits = stats.splits,
        collapses = stats.collapses,
        balance_splits = stats.balance_splits,
        "lod pass"
      );
    }
    stats
  }

  fn load_chunk(&mut self, node: AddressNode) {
    match self.chunks.get_mut(&node.id) {
      Some(chunk) if chunk.is_pending_delete() => {
        tracing::trace!(id = node.id, "reviving chunk");
        chunk.unloaded_at = None;
      }
      Some(_) => return,
      None => {
        self.chunks.insert(node.id, Chunk::new(node));
      }
    }
    if !self.request_update(node.id, true) {
      self.retry.insert(node.id);
    }
    self.transition_checks.push(node.bounds());
  }

  fn unload_chunk(&mut self, id: u64, now: Instant) {
    let Some(chunk) = self.chunks.get_mut(&id) else {
      return;
    };
    chunk.cancel_jobs();
    chunk.unloaded_at = Some(now);
    self.transition_checks.push(chunk.node.bounds());
    self.retry.remove(&id);
    tracing::trace!(id, "chunk unloaded, deletion pending");
  }

  /// Rebuild one chunk's mesh. Returns false, without doing anything, if
  /// the chunk already has a mesh job in flight.
  pub fn request_update(&mut self, id: u64, run_async: bool) -> bool {
    let Some(chunk) = self.chunks.get_mut(&id) else {
      return true;
    };
    if chunk.has_pending_mesh() {
      return false;
    }

    chunk.transitions = if self.compute_transitions {
      self.octree.higher_resolution_mask(&chunk.node)
    } else {
      TransitionMask::NONE
    };
    let request = ChunkRequest::for_node(&chunk.node).with_transitions(chunk.transitions);

    if run_async {
      let data = Arc::clone(&self.data);
      let job = self.mesh_pool.spawn(move |_| Some(build_mesh(&data, id, &request)));
      tracing::trace!(id, task = ?job.id(), "mesh job queued");
      chunk.mesh_job = Some(job);
    } else {
      let output = build_mesh(&self.data, id, &request);
      self.metrics.record_mesh_timing(output.elapsed_us);
      self.apply_mesh(output);
    }
    true
  }

  /// Remember that the voxel at `pos` changed.
  pub fn queue_update(&mut self, pos: IVec3) {
    self.queued.insert(pos);
  }

  /// Remesh every loaded chunk whose sampled region holds a queued position,
  /// once per chunk. Returns the number of chunks touched.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "scheduler::apply_queued_updates"))]
  pub fn apply_queued_updates(&mut self, run_async: bool) -> usize {
    let mut ids = BTreeSet::new();
    for pos in mem::take(&mut self.queued) {
      ids.extend(self.octree.leaves_sampling(pos).into_iter().map(|node| node.id));
    }
    for &id in &ids {
      if !self.request_update(id, run_async) {
        self.retry.insert(id);
      }
    }
    ids.len()
  }

  /// Apply finished work and advance timers.
  pub fn tick(&mut self) {
    self.tick_at(Instant::now());
  }

  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "scheduler::tick"))]
  pub fn tick_at(&mut self, now: Instant) {
    self.drain_completions();
    let checks = mem::take(&mut self.transition_checks);
    self.run_transition_checks(checks);
    self.run_retries();
    self.free_expired(now);
  }

  /// Block until every job has finished and its follow-up work (foliage,
  /// transition checks, retries) has run too.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "scheduler::flush"))]
  pub fn flush(&mut self) {
    loop {
      while let Some(done) = self.mesh_pool.recv_blocking() {
        self.on_mesh_completed(done);
      }
      while let Some(done) = self.foliage_pool.recv_blocking() {
        self.on_foliage_completed(done);
      }
      let checks = mem::take(&mut self.transition_checks);
      self.run_transition_checks(checks);
      self.run_retries();

      if self.mesh_pool.is_idle()
        && self.foliage_pool.is_idle()
        && self.transition_checks.is_empty()
        && self.retry.is_empty()
      {
        return;
      }
    }
  }

  fn drain_completions(&mut self) {
    while let Some(done) = self.mesh_pool.try_recv() {
      self.on_mesh_completed(done);
    }
    while let Some(done) = self.foliage_pool.try_recv() {
      self.on_foliage_completed(done);
    }
  }

  fn on_mesh_completed(&mut self, done: Completed<MeshOutput>) {
    let Some(output) = done.output else {
      self.metrics.record_discarded();
      return;
    };
    self.metrics.record_mesh_timing(output.elapsed_us);

    match self.chunks.get_mut(&output.chunk) {
      Some(chunk) if chunk.owns_mesh_job(done.id) => chunk.mesh_job = None,
      _ => {
        tracing::trace!(id = output.chunk, task = ?done.id, "stale mesh discarded");
        self.metrics.record_discarded();
        return;
      }
    }
    self.apply_mesh(output);
  }

  fn apply_mesh(&mut self, output: MeshOutput) {
    let Some(chunk) = self.chunks.get_mut(&output.chunk) else {
      return;
    };
    let mesh = Arc::new(output.mesh);
    if let Some(previous) = chunk.mesh.replace(Arc::clone(&mesh)) {
      self.metrics.remove_chunk(chunk.node.depth, &previous);
    }
    self.metrics.record_chunk(chunk.node.depth, &mesh);
    let node = chunk.node;
    self.events.push(ChunkEvent::MeshReady {
      id: output.chunk,
      node,
      mesh: Arc::clone(&mesh),
    });
    self.spawn_foliage(output.chunk, node, mesh);
  }

  fn spawn_foliage(&mut self, id: u64, node: AddressNode, mesh: Arc<ChunkMesh>) {
    if self.scatters.is_empty() || node.depth > self.foliage_max_depth {
      return;
    }
    let Some(chunk) = self.chunks.get_mut(&id) else {
      return;
    };
    chunk.cancel_foliage();

    let origin = node.min_corner();
    for (layer, scatter) in self.scatters.iter().enumerate() {
      let scatter = Arc::clone(scatter);
      let mesh = Arc::clone(&mesh);
      let job = self.foliage_pool.spawn(move |_| {
        let start = Instant::now();
        let instances = scatter.scatter(&mesh, origin, node.depth);
        Some(FoliageOutput {
          chunk: id,
          layer,
          instances,
          elapsed_us: start.elapsed().as_micros() as u64,
        })
      });
      chunk.foliage_jobs.push(job);
    }
  }

  fn on_foliage_completed(&mut self, done: Completed<FoliageOutput>) {
    let Some(output) = done.output else {
      self.metrics.record_discarded();
      return;
    };
    self.metrics.record_foliage_timing(output.elapsed_us);

    let owned = self
      .chunks
      .get_mut(&output.chunk)
      .is_some_and(|chunk| chunk.finish_foliage_job(done.id));
    if !owned {
      self.metrics.record_discarded();
      return;
    }
    self.events.push(ChunkEvent::FoliageReady {
      id: output.chunk,
      layer: output.layer,
      instances: Arc::new(output.instances),
    });
  }

  /// Remesh loaded chunks around `regions` whose neighbor resolution no
  /// longer matches the faces their mesh stitches.
  fn run_transition_checks(&mut self, regions: Vec<IAabb3>) {
    if regions.is_empty() {
      return;
    }
    let mut ids = BTreeSet::new();
    for region in regions {
      let around = region.expanded(1);
      ids.extend(self.octree.loaded_leaves_in(&around).into_iter().map(|node| node.id));
    }

    for id in ids {
      let Some(chunk) = self.chunks.get(&id) else {
        continue;
      };
      let wanted = if self.compute_transitions {
        self.octree.higher_resolution_mask(&chunk.node)
      } else {
        TransitionMask::NONE
      };
      if wanted != chunk.transitions && !self.request_update(id, true) {
        self.retry.insert(id);
      }
    }
  }

  fn run_retries(&mut self) {
    for id in mem::take(&mut self.retry) {
      let live = self
        .chunks
        .get(&id)
        .is_some_and(|chunk| !chunk.is_pending_delete());
      if live && !self.request_update(id, true) {
        self.retry.insert(id);
      }
    }
  }

  fn free_expired(&mut self, now: Instant) {
    let expired: Vec<u64> = self
      .chunks
      .iter()
      .filter(|(_, chunk)| chunk.is_expired(now, self.deletion_delay))
      .map(|(&id, _)| id)
      .collect();

    for id in expired {
      let Some(mut chunk) = self.chunks.remove(&id) else {
        continue;
      };
      chunk.cancel_jobs();
      if let Some(mesh) = &chunk.mesh {
        self.metrics.remove_chunk(chunk.node.depth, mesh);
      }
      self.events.push(ChunkEvent::Removed { id });
      tracing::trace!(id, "chunk freed");
    }
  }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod scheduler_test;
