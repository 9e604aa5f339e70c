//! Per-chunk render and job state owned by the scheduler.

use std::sync::Arc;
use std::time::Duration;

use smallvec::SmallVec;
use web_time::Instant;

use crate::octree::AddressNode;
use crate::threading::{TaskHandle, TaskId};
use crate::types::{ChunkMesh, TransitionMask};

/// One loaded (or recently unloaded) chunk.
///
/// At most one mesh job is in flight per chunk; a second update while it
/// runs is refused and retried later.
#[derive(Debug)]
pub struct Chunk {
  pub(crate) node: AddressNode,
  /// Faces stitched by the current mesh, or by the pending one.
  pub(crate) transitions: TransitionMask,
  pub(crate) mesh: Option<Arc<ChunkMesh>>,
  pub(crate) mesh_job: Option<TaskHandle>,
  pub(crate) foliage_jobs: SmallVec<[TaskHandle; 2]>,
  /// Set when the chunk left the octree; it is freed once the deletion
  /// delay has passed unless it is loaded again first.
  pub(crate) unloaded_at: Option<Instant>,
}

impl Chunk {
  pub(crate) fn new(node: AddressNode) -> Self {
    Self {
      node,
      transitions: TransitionMask::NONE,
      mesh: None,
      mesh_job: None,
      foliage_jobs: SmallVec::new(),
      unloaded_at: None,
    }
  }

  pub fn node(&self) -> &AddressNode {
    &self.node
  }

  pub fn mesh(&self) -> Option<&Arc<ChunkMesh>> {
    self.mesh.as_ref()
  }

  pub fn transitions(&self) -> TransitionMask {
    self.transitions
  }

  pub fn has_pending_mesh(&self) -> bool {
    self.mesh_job.is_some()
  }

  pub fn is_pending_delete(&self) -> bool {
    self.unloaded_at.is_some()
  }

  pub(crate) fn owns_mesh_job(&self, id: TaskId) -> bool {
    self.mesh_job.as_ref().is_some_and(|job| job.id() == id)
  }

  /// Forget a finished foliage job. False if the chunk no longer waits for it.
  pub(crate) fn finish_foliage_job(&mut self, id: TaskId) -> bool {
    match self.foliage_jobs.iter().position(|job| job.id() == id) {
      Some(index) => {
        self.foliage_jobs.swap_remove(index);
        true
      }
      None => false,
    }
  }

  pub(crate) fn cancel_foliage(&mut self) {
    for job in self.foliage_jobs.drain(..) {
      job.cancel();
    }
  }

  /// Cancel every job; results still in flight are discarded on arrival.
  pub(crate) fn cancel_jobs(&mut self) {
    if let Some(job) = self.mesh_job.take() {
      job.cancel();
    }
    self.cancel_foliage();
  }

  pub(crate) fn is_expired(&self, now: Instant, delay: Duration) -> bool {
    self.unloaded_at.is_some_and(|at| now >= at + delay)
  }
}
