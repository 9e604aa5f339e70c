//! voxel_terrain - sparse voxel terrain with Transvoxel LOD meshing
//!
//! This crate stores an editable signed-distance voxel world in a sparse
//! copy-on-write octree and turns it into seamless level-of-detail meshes.
//! It is framework independent: rendering, physics and input live in the
//! host application, which talks to a [`VoxelWorld`] and drains
//! [`ChunkEvent`]s.
//!
//! # Features
//!
//! - **Sparse data store**: unedited space is answered by a [`WorldGenerator`];
//!   only edited 16³ leaves hold their own arrays
//! - **Save / sync**: full-world saves plus compact diff packets for
//!   multiplayer replication
//! - **Transvoxel meshing**: regular and transition cells with seam warp, so
//!   chunks of neighboring LODs meet without cracks
//! - **LOD scheduling**: distance-driven chunk octree with hysteresis,
//!   async mesh and foliage worker pools and delayed chunk deletion
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use glam::{IVec3, Vec3};
//! use voxel_terrain::{Invoker, VoxelWorld, WorldConfig};
//!
//! let mut world = VoxelWorld::new(WorldConfig::default())?;
//! let camera = Arc::new(Invoker::new(Vec3::ZERO));
//! world.add_invoker(&camera);
//!
//! world.set_value_sphere(IVec3::new(0, 0, -4), 6.0, false, 1.0);
//! loop {
//!     camera.set_position(/* ... */ Vec3::ZERO);
//!     world.update_lod();
//!     world.tick();
//!     for event in world.drain_events() {
//!         // upload / drop meshes
//!     }
//! }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod generator;
pub mod types;

// Re-export commonly used items
pub use config::{GeneratorConfig, WorldConfig};
pub use constants::{CHUNK_SIZE, CHUNK_VOLUME, MAX_DEPTH};
pub use error::{Result, VoxelError};
pub use generator::{EmptyGenerator, FlatGenerator, FnGenerator, SphereGenerator, WorldGenerator};
pub use types::{ChunkMesh, Direction, Material, TransitionMask};

// Addressing octree shared by data and LOD
pub mod octree;
pub use octree::{AddressNode, IAabb3};

// Voxel data store
pub mod data;
pub use data::{DataOctree, DiffPackets, MaterialDiff, ValueDiff, VoxelData, WorldSave};

// Transvoxel mesher
pub mod mesher;
pub use mesher::{build_chunk_mesh, ChunkRequest, Polygonizer, VoxelSampler};

// Worker pools for mesh and foliage jobs
pub mod threading;
pub use threading::{TaskHandle, TaskId, WorkerPool};

// LOD octree and chunk scheduling
pub mod lod;
pub use lod::{ChunkEvent, Invoker, LodStats, Scheduler};

pub mod foliage;
pub use foliage::{DensityScatter, FoliageInstance, FoliageScatter};

pub mod metrics;
pub use metrics::{MetricsSnapshot, TerrainMetrics};

pub mod tools;

pub mod world;
pub use world::VoxelWorld;
