//! Addressing octree shared by the voxel data store and the LOD scheduler.
//!
//! # Module Structure
//!
//! - [`node`]: `AddressNode` - center/depth/path-id math
//! - [`bounds`]: `IAabb3` - integer half-open boxes
//! - [`arena`]: `Arena` / `NodeHandle` - flat node storage for both trees

pub mod arena;
pub mod bounds;
pub mod node;

// Re-exports
pub use arena::{Arena, NodeHandle};
pub use bounds::IAabb3;
pub use node::AddressNode;
