//! Transvoxel chunk mesher.
//!
//! Turns the voxel values of one chunk into a triangle mesh. Chunks at
//! depth `d` sample every `2^d` voxels; faces whose neighbor renders finer
//! get transition cells so the two meshes meet without cracks.
//!
//! # Passes
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ 1. Value cache: 18³ samples (16 cells + far corner + skirt)     │
//! │ 2. Regular cells: 17³ cells, the extra layer feeds normals only │
//! │ 3. Transition cells: 16² per face with a finer neighbor         │
//! │ 4. Normals, then seam warp of regular vertices near those faces │
//! │ 5. Normals again, drop skirt and degenerate triangles, compact  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Seams
//!
//! ```text
//!   fine chunk      │ coarse chunk
//!                   │
//!   ·─·─·─·─·       ├┄┄╮ transition cell: full resolution on the face,
//!   ·─·─·─·─·       │  ╰─o regular resolution on its back
//!                   │    ↑
//!                   │    regular vertices pushed inward by step / 4
//! ```
//!
//! Edge vertices are computed in world space from ordered endpoints, so
//! the fine chunk and the coarse chunk's transition cells produce identical
//! positions on the shared face.

mod edge;
mod regular;
mod seam;
pub mod tables;
mod transition;

pub use edge::{edge_vertex, is_positive, EdgeVertex};
pub use seam::warp_vertex;
pub use transition::face_to_local;

use glam::{IVec3, Vec3};

use crate::constants::{CACHE_SIZE, CHUNK_SIZE};
use crate::data::DataOctree;
use crate::generator::WorldGenerator;
use crate::octree::AddressNode;
use crate::types::{ChunkMesh, Material, TransitionMask};

/// Read access to voxel values, in world coordinates.
pub trait VoxelSampler {
  fn sample(&self, pos: IVec3) -> (f32, Material);
}

impl VoxelSampler for DataOctree {
  #[inline]
  fn sample(&self, pos: IVec3) -> (f32, Material) {
    self.get(pos)
  }
}

impl VoxelSampler for dyn WorldGenerator + '_ {
  #[inline]
  fn sample(&self, pos: IVec3) -> (f32, Material) {
    WorldGenerator::sample(self, pos.x, pos.y, pos.z)
  }
}

/// Which chunk to mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkRequest {
  /// Minimal corner in world voxels.
  pub min: IVec3,
  pub depth: u8,
  /// Faces whose neighbor renders at a higher resolution.
  pub transitions: TransitionMask,
}

impl ChunkRequest {
  pub fn new(min: IVec3, depth: u8) -> Self {
    Self {
      min,
      depth,
      transitions: TransitionMask::NONE,
    }
  }

  pub fn for_node(node: &AddressNode) -> Self {
    Self::new(node.min_corner(), node.depth)
  }

  pub fn with_transitions(mut self, transitions: TransitionMask) -> Self {
    self.transitions = transitions;
    self
  }

  /// Voxels between samples.
  pub fn step(&self) -> i32 {
    1 << self.depth
  }

  /// Chunk width in voxels.
  pub fn size(&self) -> i32 {
    CHUNK_SIZE << self.depth
  }
}

/// Lattice of the chunk being built.
#[derive(Clone, Copy, Debug)]
struct Frame {
  min: IVec3,
  step: i32,
  size: i32,
}

impl Frame {
  fn new(request: &ChunkRequest) -> Self {
    Self {
      min: request.min,
      step: request.step(),
      size: request.size(),
    }
  }

  /// World position of a cache lattice point.
  #[inline]
  fn world(&self, grid: IVec3) -> IVec3 {
    self.min + grid * self.step
  }

  #[inline]
  fn local(&self, world: Vec3) -> Vec3 {
    world - self.min.as_vec3()
  }
}

const EMPTY_SLOT: u32 = u32::MAX;

/// Mesh under construction.
#[derive(Default)]
struct WorkingMesh {
  positions: Vec<Vec3>,
  materials: Vec<Material>,
  /// Regular vertices follow the seam warp; transition front vertices stay
  /// on the face.
  warped: Vec<bool>,
  triangles: Vec<[u32; 3]>,
  /// False for triangles of the skirt layer.
  kept: Vec<bool>,
}

impl WorkingMesh {
  fn clear(&mut self) {
    self.positions.clear();
    self.materials.clear();
    self.warped.clear();
    self.triangles.clear();
    self.kept.clear();
  }

  fn push_vertex(&mut self, position: Vec3, material: Material, warped: bool) -> u32 {
    self.positions.push(position);
    self.materials.push(material);
    self.warped.push(warped);
    (self.positions.len() - 1) as u32
  }

  fn push_triangle(&mut self, triangle: [u32; 3], kept: bool) {
    self.triangles.push(triangle);
    self.kept.push(kept);
  }

  /// Area-weighted vertex normals.
  fn normals(&self) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; self.positions.len()];
    for &[a, b, c] in &self.triangles {
      let pa = self.positions[a as usize];
      let face = (self.positions[b as usize] - pa).cross(self.positions[c as usize] - pa);
      normals[a as usize] += face;
      normals[b as usize] += face;
      normals[c as usize] += face;
    }
    for normal in &mut normals {
      *normal = normal.normalize_or_zero();
    }
    normals
  }

  fn finish(&self, normals: &[Vec3]) -> ChunkMesh {
    let mut mesh = ChunkMesh::new();
    let mut remap = vec![EMPTY_SLOT; self.positions.len()];
    for (triangle, &kept) in self.triangles.iter().zip(&self.kept) {
      let [a, b, c] = *triangle;
      if !kept || a == b || b == c || a == c {
        continue;
      }
      for index in [a, b, c] {
        let slot = &mut remap[index as usize];
        if *slot == EMPTY_SLOT {
          let position = self.positions[index as usize];
          *slot = mesh.positions.len() as u32;
          mesh.positions.push(position.to_array());
          mesh.normals.push(normals[index as usize].to_array());
          mesh.colors.push(self.materials[index as usize].to_color());
          mesh.bounds.encapsulate(position);
        }
        mesh.indices.push(*slot);
      }
    }
    mesh
  }
}

/// Reusable mesher state. One per worker thread avoids reallocating the
/// caches for every chunk.
pub struct Polygonizer {
  /// Values at the 18³ lattice points `-1..=16`.
  values: Vec<f32>,
  /// Regular vertex per lattice edge (lower endpoint, axis).
  edge_cache: Vec<u32>,
  /// Regular vertex collapsed onto a lattice point.
  corner_cache: Vec<u32>,
  /// Half-step samples of the face being stitched.
  face_values: Vec<f32>,
  face_edges: Vec<u32>,
  face_corners: Vec<u32>,
  mesh: WorkingMesh,
}

impl Default for Polygonizer {
  fn default() -> Self {
    Self::new()
  }
}

impl Polygonizer {
  pub fn new() -> Self {
    let cache = CACHE_SIZE * CACHE_SIZE * CACHE_SIZE;
    let face = transition::FACE_SAMPLES * transition::FACE_SAMPLES;
    Self {
      values: vec![0.0; cache],
      edge_cache: vec![EMPTY_SLOT; cache * 3],
      corner_cache: vec![EMPTY_SLOT; cache],
      face_values: vec![0.0; face],
      face_edges: vec![EMPTY_SLOT; face * 2],
      face_corners: vec![EMPTY_SLOT; face],
      mesh: WorkingMesh::default(),
    }
  }

  /// Mesh one chunk. Positions are relative to `request.min`.
  ///
  /// Transitions are ignored at depth 0, which has no finer neighbor.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "mesher::build"))]
  pub fn build<S: VoxelSampler + ?Sized>(&mut self, sampler: &S, request: &ChunkRequest) -> ChunkMesh {
    let frame = Frame::new(request);
    self.edge_cache.fill(EMPTY_SLOT);
    self.corner_cache.fill(EMPTY_SLOT);
    self.mesh.clear();

    {
      #[cfg(feature = "profiling")]
      let _span = tracing::info_span!("regular_cells").entered();
      self.fill_value_cache(sampler, &frame);
      self.regular_pass(sampler, &frame);
    }

    let transitions = if request.depth > 0 {
      request.transitions
    } else {
      TransitionMask::NONE
    };
    if !transitions.is_empty() {
      #[cfg(feature = "profiling")]
      let _span = tracing::info_span!("transition_cells").entered();
      for direction in transitions.iter() {
        self.transition_pass(sampler, &frame, direction);
      }
      let normals = self.mesh.normals();
      for (index, position) in self.mesh.positions.iter_mut().enumerate() {
        if self.mesh.warped[index] {
          *position = warp_vertex(*position, normals[index], transitions, frame.step);
        }
      }
    }

    let normals = self.mesh.normals();
    self.mesh.finish(&normals)
  }
}

/// Mesh one chunk with a throwaway [`Polygonizer`].
pub fn build_chunk_mesh<S: VoxelSampler + ?Sized>(sampler: &S, request: &ChunkRequest) -> ChunkMesh {
  Polygonizer::new().build(sampler, request)
}
