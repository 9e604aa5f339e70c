//! Level of detail: which chunks exist, at which depth, and their jobs.
//!
//! # Module Structure
//!
//! - [`invoker`]: `Invoker` - viewpoints driving the LOD decisions
//! - [`octree`]: `ChunkOctree` - hysteresis LOD pass and neighbor gradation
//! - [`chunk`]: `Chunk` - mesh, transition and job state of one chunk
//! - [`scheduler`]: `Scheduler` - worker pools, updates, delayed deletion

pub mod chunk;
pub mod invoker;
pub mod octree;
pub mod scheduler;

pub use chunk::Chunk;
pub use invoker::{Invoker, InvokerSample};
pub use octree::{lod_band, lod_decision, ChunkLifecycle, ChunkOctree, LodDecision, LodStats};
pub use scheduler::{ChunkEvent, Scheduler};
