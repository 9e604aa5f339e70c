//! Worker pools for mesh and foliage jobs.
//!
//! Each pool owns a dedicated `rayon::ThreadPool`. Jobs run there and send
//! their output back over a crossbeam channel; only the owning thread drains
//! it, so scheduler state is never touched by workers.
//!
//! ```text
//! owner thread                     pool threads
//! ┌──────────────┐   spawn()
//! │ Scheduler    │ ───────────────► job(cancel flag)
//! │              │                     │
//! │ try_recv()   │ ◄────── channel ────┘ Completed { id, output }
//! └──────────────┘
//! ```
//!
//! Cancelling a job sets its flag. A job that has not started yet is
//! skipped; a running job may finish, and the owner discards the output.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{self as channel, Receiver, Sender, TryRecvError};

use crate::error::Result;

/// Unique identifier for a spawned job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
  fn next() -> Self {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    Self(COUNTER.fetch_add(1, Ordering::Relaxed))
  }
}

/// Owner-side handle of a queued or running job.
#[derive(Clone, Debug)]
pub struct TaskHandle {
  id: TaskId,
  cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
  pub fn id(&self) -> TaskId {
    self.id
  }

  /// Ask the job not to run. Has no effect once it has finished.
  pub fn cancel(&self) {
    self.cancelled.store(true, Ordering::Release);
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::Acquire)
  }
}

/// Result of one job. `output` is `None` when the job was cancelled before
/// it produced anything.
#[derive(Debug)]
pub struct Completed<T> {
  pub id: TaskId,
  pub output: Option<T>,
}

/// Fixed-size pool returning `T` from every job.
pub struct WorkerPool<T: Send + 'static> {
  pool: rayon::ThreadPool,
  sender: Sender<Completed<T>>,
  receiver: Receiver<Completed<T>>,
  in_flight: Arc<AtomicUsize>,
}

impl<T: Send + 'static> WorkerPool<T> {
  /// `threads == 0` lets rayon pick one thread per core.
  pub fn new(name: &str, threads: usize) -> Result<Self> {
    let prefix = name.to_owned();
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(threads)
      .thread_name(move |index| format!("{prefix}-{index}"))
      .build()?;
    let (sender, receiver) = channel::unbounded();
    Ok(Self {
      pool,
      sender,
      receiver,
      in_flight: Arc::new(AtomicUsize::new(0)),
    })
  }

  /// Queue a job (non-blocking). The job receives its cancel flag and may
  /// poll it to stop early.
  pub fn spawn<F>(&self, work: F) -> TaskHandle
  where
    F: FnOnce(&AtomicBool) -> Option<T> + Send + 'static,
  {
    let handle = TaskHandle {
      id: TaskId::next(),
      cancelled: Arc::new(AtomicBool::new(false)),
    };
    let id = handle.id;
    let cancelled = Arc::clone(&handle.cancelled);
    let sender = self.sender.clone();
    let in_flight = Arc::clone(&self.in_flight);
    in_flight.fetch_add(1, Ordering::AcqRel);

    self.pool.spawn(move || {
      let output = if cancelled.load(Ordering::Acquire) {
        None
      } else {
        work(&cancelled)
      };
      // The pool owns a receiver for its whole life, so this cannot fail
      // before the pool itself is dropped.
      let _ = sender.send(Completed { id, output });
      in_flight.fetch_sub(1, Ordering::AcqRel);
    });

    handle
  }

  /// Next finished job, if any (non-blocking).
  pub fn try_recv(&self) -> Option<Completed<T>> {
    match self.receiver.try_recv() {
      Ok(completed) => Some(completed),
      Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
    }
  }

  /// Block until the next job finishes. Returns `None` if nothing is queued
  /// or running.
  pub fn recv_blocking(&self) -> Option<Completed<T>> {
    if let Some(completed) = self.try_recv() {
      return Some(completed);
    }
    if self.in_flight.load(Ordering::Acquire) == 0 {
      // every job sends before it leaves the count
      return self.try_recv();
    }
    self.receiver.recv().ok()
  }

  /// No job queued or running, and no result waiting.
  pub fn is_idle(&self) -> bool {
    self.in_flight.load(Ordering::Acquire) == 0 && self.receiver.is_empty()
  }

  /// Jobs queued or running.
  pub fn in_flight(&self) -> usize {
    self.in_flight.load(Ordering::Acquire)
  }

  pub fn num_threads(&self) -> usize {
    self.pool.current_num_threads()
  }
}

#[cfg(test)]
#[path = "threading_test.rs"]
mod threading_test;
