//! VoxelWorld - one terrain instance.
//!
//! Owns the voxel store, the chunk scheduler and the metrics of a single
//! world. Multiple worlds can exist side by side; nothing here is global.
//!
//! Every edit goes through the store first and is then queued as a chunk
//! update; brush edits flush their queue immediately as async mesh jobs.
//! Coordinates are voxel coordinates, world-space conversion is up to the
//! caller.

use std::path::Path;
use std::sync::Arc;

use glam::{IVec3, Vec3};

use crate::config::WorldConfig;
use crate::data::{DataOctree, DiffPackets, MaterialDiff, ValueDiff, VoxelData, WorldSave};
use crate::error::Result;
use crate::foliage::FoliageScatter;
use crate::generator::{self, WorldGenerator};
use crate::lod::{ChunkEvent, Invoker, LodStats, Scheduler};
use crate::metrics::TerrainMetrics;
use crate::tools;
use crate::types::{ChunkMesh, Material};

pub struct VoxelWorld {
  config: WorldConfig,
  data: Arc<VoxelData>,
  scheduler: Scheduler,
  metrics: Arc<TerrainMetrics>,
}

impl VoxelWorld {
  /// World using the generator named in `config`.
  pub fn new(config: WorldConfig) -> Result<Self> {
    Self::build(config, None)
  }

  /// World using `generator` regardless of the configured one.
  pub fn with_generator(config: WorldConfig, generator: Arc<dyn WorldGenerator>) -> Result<Self> {
    Self::build(config, Some(generator))
  }

  fn build(config: WorldConfig, explicit: Option<Arc<dyn WorldGenerator>>) -> Result<Self> {
    config.validate()?;
    let generator = generator::resolve(explicit, &config.generator);
    let data = Arc::new(VoxelData::new(config.depth, generator, config.multiplayer));
    let metrics = Arc::new(TerrainMetrics::new());
    let scheduler = Scheduler::new(Arc::clone(&data), &config, Arc::clone(&metrics))?;
    tracing::debug!(
      depth = config.depth,
      size = config.world_size(),
      multiplayer = config.multiplayer,
      "voxel world created"
    );
    Ok(Self {
      config,
      data,
      scheduler,
      metrics,
    })
  }

  pub fn config(&self) -> &WorldConfig {
    &self.config
  }

  /// Shared store, for callers that batch reads under one guard.
  pub fn data(&self) -> &Arc<VoxelData> {
    &self.data
  }

  pub fn scheduler(&self) -> &Scheduler {
    &self.scheduler
  }

  pub fn scheduler_mut(&mut self) -> &mut Scheduler {
    &mut self.scheduler
  }

  pub fn metrics(&self) -> &Arc<TerrainMetrics> {
    &self.metrics
  }

  pub fn size(&self) -> i32 {
    self.data.size()
  }

  // ---------------------------------------------------------------------------
  // Voxel access
  // ---------------------------------------------------------------------------

  pub fn get_value(&self, pos: IVec3) -> f32 {
    self.data.get_value(pos)
  }

  pub fn get_material(&self, pos: IVec3) -> Material {
    self.data.get_material(pos)
  }

  /// Write one value and queue the chunks that read it.
  ///
  /// # Panics
  ///
  /// If `pos` is outside the world.
  pub fn set_value(&mut self, pos: IVec3, value: f32) {
    self.data.set_value(pos, value);
    self.scheduler.queue_update(pos);
  }

  /// Write one material and queue the chunks that read it.
  ///
  /// # Panics
  ///
  /// If `pos` is outside the world.
  pub fn set_material(&mut self, pos: IVec3, material: Material) {
    self.data.set_material(pos, material);
    self.scheduler.queue_update(pos);
  }

  pub fn queue_update(&mut self, pos: IVec3) {
    self.scheduler.queue_update(pos);
  }

  /// Turn queued edits into chunk updates. Returns the number of chunks
  /// requested.
  pub fn apply_queued_updates(&mut self, run_async: bool) -> usize {
    self.scheduler.apply_queued_updates(run_async)
  }

  // ---------------------------------------------------------------------------
  // Brushes
  // ---------------------------------------------------------------------------

  /// See [`tools::set_value_sphere`]. Returns the number of voxels written.
  pub fn set_value_sphere(&mut self, center: IVec3, radius: f32, add: bool, strength: f32) -> usize {
    self.edit(|octree| tools::set_value_sphere(octree, center, radius, add, strength))
  }

  /// See [`tools::set_value_box`]. Returns the number of voxels written.
  pub fn set_value_box(&mut self, center: IVec3, extent: Vec3, add: bool, strength: f32) -> usize {
    self.edit(|octree| tools::set_value_box(octree, center, extent, add, strength))
  }

  /// See [`tools::set_material_sphere`]. Returns the number of voxels written.
  pub fn set_material_sphere(
    &mut self,
    center: IVec3,
    radius: f32,
    index: u8,
    use_layer1: bool,
    fade: f32,
  ) -> usize {
    self.edit(|octree| tools::set_material_sphere(octree, center, radius, index, use_layer1, fade))
  }

  fn edit(&mut self, brush: impl FnOnce(&mut DataOctree) -> Vec<IVec3>) -> usize {
    let touched = {
      let mut octree = self.data.begin_set();
      brush(&mut octree)
    };
    self.queue_all(&touched);
    self.scheduler.apply_queued_updates(true);
    touched.len()
  }

  fn queue_all(&mut self, positions: &[IVec3]) {
    for &pos in positions {
      self.scheduler.queue_update(pos);
    }
  }

  // ---------------------------------------------------------------------------
  // Persistence and sync
  // ---------------------------------------------------------------------------

  pub fn get_save(&self) -> WorldSave {
    self.data.save()
  }

  /// Load edited leaves from `save` and remesh what changed. A malformed
  /// save is logged and loads nothing. Returns the number of chunks
  /// requested.
  pub fn load_from_save(&mut self, save: &WorldSave, reset: bool) -> usize {
    let anchors = self.data.load(save, reset);
    self.queue_all(&anchors);
    self.scheduler.apply_queued_updates(true)
  }

  pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let save = self.get_save();
    save.write_to(path)?;
    tracing::debug!(path = %path.display(), chunks = save.chunks.len(), "world saved");
    Ok(())
  }

  /// Like [`load_from_save`](Self::load_from_save), reading the save from
  /// disk. An unreadable file is logged and treated as an empty save.
  pub fn load_from_file(&mut self, path: impl AsRef<Path>, reset: bool) -> usize {
    let path = path.as_ref();
    let save = match WorldSave::read_from(path) {
      Ok(save) => save,
      Err(err) => {
        tracing::warn!(path = %path.display(), %err, "could not read save, loading nothing");
        WorldSave {
          depth: self.config.depth as i32,
          chunks: Vec::new(),
        }
      }
    };
    self.load_from_save(&save, reset)
  }

  /// Cells written since the previous call, packetized by
  /// `config.diff_packet_size`. Only tracked in multiplayer worlds.
  pub fn diff(&self) -> DiffPackets {
    self.data.diff(self.config.diff_packet_size)
  }

  /// Apply a peer's diff entries and remesh the touched chunks. Returns the
  /// number of chunks requested.
  pub fn apply_diff(&mut self, values: &[ValueDiff], materials: &[MaterialDiff]) -> usize {
    let touched = self.data.apply_diff(values, materials);
    self.queue_all(&touched);
    self.scheduler.apply_queued_updates(true)
  }

  // ---------------------------------------------------------------------------
  // Scheduling
  // ---------------------------------------------------------------------------

  pub fn add_invoker(&mut self, invoker: &Arc<Invoker>) {
    self.scheduler.add_invoker(invoker);
  }

  /// Register a foliage layer; returns its layer index.
  pub fn add_foliage(&mut self, scatter: Arc<dyn FoliageScatter>) -> usize {
    self.scheduler.add_foliage(scatter)
  }

  pub fn update_lod(&mut self) -> LodStats {
    self.scheduler.update_lod()
  }

  pub fn tick(&mut self) {
    self.scheduler.tick();
  }

  /// Block until every in-flight job has been applied.
  pub fn flush(&mut self) {
    self.scheduler.flush();
  }

  pub fn drain_events(&mut self) -> Vec<ChunkEvent> {
    self.scheduler.drain_events()
  }

  pub fn chunk_mesh(&self, id: u64) -> Option<Arc<ChunkMesh>> {
    self.scheduler.chunk_mesh(id)
  }
}

#[cfg(test)]
#[path = "world_test.rs"]
mod world_test;
