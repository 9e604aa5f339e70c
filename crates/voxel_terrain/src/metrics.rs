//! Per-world statistics: chunk counts per depth, mesh memory, job timings.
//!
//! A [`TerrainMetrics`] is created by the world and shared by `Arc` with the
//! scheduler, so several worlds in one process never mix their numbers.
//!
//! # Usage
//!
//! ```ignore
//! let metrics = Arc::new(TerrainMetrics::new());
//! let scheduler = Scheduler::new(data, &config, Arc::clone(&metrics))?;
//!
//! // ... tick the world ...
//! let snapshot = metrics.snapshot();
//! println!("{} chunks, {:.1} us/mesh", snapshot.total_chunks(), snapshot.avg_mesh_timing_us());
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::constants::MAX_DEPTH;
use crate::types::ChunkMesh;

const DEPTHS: usize = MAX_DEPTH as usize + 1;

/// Rolling window for storing recent values (e.g., timing history).
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a new value, evicting the oldest if at capacity.
    pub fn push(&mut self, value: T) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    pub fn last(&self) -> Option<&T> {
        self.buffer.back()
    }
}

impl<T: Copy + Default + std::ops::Add<Output = T>> RollingWindow<T> {
    pub fn sum(&self) -> T {
        self.buffer.iter().copied().fold(T::default(), |acc, x| acc + x)
    }
}

impl RollingWindow<u64> {
    pub fn average(&self) -> f64 {
        if self.buffer.is_empty() {
            0.0
        } else {
            self.sum() as f64 / self.buffer.len() as f64
        }
    }

    pub fn min_max(&self) -> Option<(u64, u64)> {
        let min = self.buffer.iter().min()?;
        let max = self.buffer.iter().max()?;
        Some((*min, *max))
    }
}

impl Default for RollingWindow<u64> {
    fn default() -> Self {
        Self::new(128) // ~2 seconds at 60 ticks per second
    }
}

/// Point-in-time copy of a world's statistics.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Chunks holding a mesh, per chunk depth.
    pub chunks_per_depth: [u32; DEPTHS],
    pub vertices_per_depth: [u64; DEPTHS],
    pub triangles_per_depth: [u64; DEPTHS],
    /// Approximate size of all live mesh buffers.
    pub mesh_memory_bytes: u64,

    /// Mesh build times in microseconds.
    pub mesh_timings: RollingWindow<u64>,
    /// LOD pass times in microseconds.
    pub lod_timings: RollingWindow<u64>,
    /// Foliage scatter times in microseconds.
    pub foliage_timings: RollingWindow<u64>,

    pub last_mesh_us: u64,
    pub last_lod_us: u64,

    /// Meshes built since the world was created, including discarded ones.
    pub total_meshes_built: u64,
    pub total_foliage_built: u64,
    /// Job results dropped because their chunk was unloaded or re-queued.
    pub discarded_results: u64,
}

impl MetricsSnapshot {
    pub fn total_chunks(&self) -> u32 {
        self.chunks_per_depth.iter().sum()
    }

    pub fn total_vertices(&self) -> u64 {
        self.vertices_per_depth.iter().sum()
    }

    pub fn total_triangles(&self) -> u64 {
        self.triangles_per_depth.iter().sum()
    }

    pub fn avg_mesh_timing_us(&self) -> f64 {
        self.mesh_timings.average()
    }

    pub fn avg_lod_timing_us(&self) -> f64 {
        self.lod_timings.average()
    }

    pub fn mesh_memory_mb(&self) -> f64 {
        self.mesh_memory_bytes as f64 / 1_048_576.0
    }
}

/// Shared, thread-safe statistics sink for one world.
#[derive(Debug, Default)]
pub struct TerrainMetrics {
    state: Mutex<MetricsSnapshot>,
}

impl TerrainMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MetricsSnapshot> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.lock().clone()
    }

    /// Clear everything except the cumulative totals.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.chunks_per_depth.fill(0);
        state.vertices_per_depth.fill(0);
        state.triangles_per_depth.fill(0);
        state.mesh_memory_bytes = 0;
        state.mesh_timings.clear();
        state.lod_timings.clear();
        state.foliage_timings.clear();
        state.last_mesh_us = 0;
        state.last_lod_us = 0;
    }

    /// A chunk at `depth` started showing `mesh`.
    pub fn record_chunk(&self, depth: u8, mesh: &ChunkMesh) {
        let slot = (depth as usize).min(DEPTHS - 1);
        let mut state = self.lock();
        state.chunks_per_depth[slot] += 1;
        state.vertices_per_depth[slot] += mesh.vertex_count() as u64;
        state.triangles_per_depth[slot] += mesh.triangle_count() as u64;
        state.mesh_memory_bytes += mesh.memory_bytes() as u64;
    }

    /// A chunk at `depth` stopped showing `mesh`.
    pub fn remove_chunk(&self, depth: u8, mesh: &ChunkMesh) {
        let slot = (depth as usize).min(DEPTHS - 1);
        let mut state = self.lock();
        state.chunks_per_depth[slot] = state.chunks_per_depth[slot].saturating_sub(1);
        state.vertices_per_depth[slot] =
            state.vertices_per_depth[slot].saturating_sub(mesh.vertex_count() as u64);
        state.triangles_per_depth[slot] =
            state.triangles_per_depth[slot].saturating_sub(mesh.triangle_count() as u64);
        state.mesh_memory_bytes = state
            .mesh_memory_bytes
            .saturating_sub(mesh.memory_bytes() as u64);
    }

    pub fn record_mesh_timing(&self, timing_us: u64) {
        let mut state = self.lock();
        state.mesh_timings.push(timing_us);
        state.last_mesh_us = timing_us;
        state.total_meshes_built += 1;
    }

    pub fn record_lod_timing(&self, timing_us: u64) {
        let mut state = self.lock();
        state.lod_timings.push(timing_us);
        state.last_lod_us = timing_us;
    }

    pub fn record_foliage_timing(&self, timing_us: u64) {
        let mut state = self.lock();
        state.foliage_timings.push(timing_us);
        state.total_foliage_built += 1;
    }

    pub fn record_discarded(&self) {
        self.lock().discarded_results += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn triangle_mesh() -> ChunkMesh {
        let mut mesh = ChunkMesh::new();
        mesh.positions = vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        mesh.normals = vec![Vec3::Z.to_array(); 3];
        mesh.colors = vec![[0, 0, 0, 255]; 3];
        mesh.indices = vec![0, 1, 2];
        mesh
    }

    #[test]
    fn test_rolling_window() {
        let mut window = RollingWindow::new(3);
        assert!(window.is_empty());

        window.push(10u64);
        window.push(20);
        window.push(30);
        assert_eq!(window.len(), 3);
        assert_eq!(window.sum(), 60);
        assert_eq!(window.average(), 20.0);

        // oldest is evicted
        window.push(40);
        assert_eq!(window.len(), 3);
        assert_eq!(window.sum(), 90);
        assert_eq!(window.min_max(), Some((20, 40)));
        assert_eq!(window.last(), Some(&40));
    }

    #[test]
    fn test_chunk_counts() {
        let metrics = TerrainMetrics::new();
        let mesh = triangle_mesh();

        metrics.record_chunk(0, &mesh);
        metrics.record_chunk(1, &mesh);
        metrics.record_chunk(0, &mesh);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.chunks_per_depth[0], 2);
        assert_eq!(snapshot.chunks_per_depth[1], 1);
        assert_eq!(snapshot.total_chunks(), 3);
        assert_eq!(snapshot.total_triangles(), 3);
        assert_eq!(snapshot.mesh_memory_bytes, 3 * mesh.memory_bytes() as u64);

        metrics.remove_chunk(0, &mesh);
        metrics.remove_chunk(5, &mesh);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.chunks_per_depth[0], 1);
        assert_eq!(snapshot.chunks_per_depth[5], 0);
        assert_eq!(snapshot.total_vertices(), 6);
    }

    #[test]
    fn test_timings_and_reset() {
        let metrics = TerrainMetrics::new();
        metrics.record_mesh_timing(1000);
        metrics.record_mesh_timing(2000);
        metrics.record_mesh_timing(3000);
        metrics.record_lod_timing(50);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.avg_mesh_timing_us(), 2000.0);
        assert_eq!(snapshot.last_mesh_us, 3000);
        assert_eq!(snapshot.last_lod_us, 50);
        assert_eq!(snapshot.total_meshes_built, 3);

        metrics.reset();
        let snapshot = metrics.snapshot();
        assert!(snapshot.mesh_timings.is_empty());
        assert_eq!(snapshot.total_meshes_built, 3);
    }
}
