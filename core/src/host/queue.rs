// catena/src/host/queue.rs

//! The worker pool backing worker steps and split fan-outs.

use super::Work;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{event, Level};

/// An unbounded-growth worker pool: each submitted job runs on its own named
/// thread, with in-flight accounting so shutdown can wait for running work.
///
/// Cloning the handle shares the pool.
pub struct AsyncQueue {
  inner: Arc<QueueInner>,
}

struct QueueInner {
  accepting: AtomicBool,
  in_flight: Mutex<usize>,
  idle: Condvar,
}

impl AsyncQueue {
  pub fn new() -> Self {
    AsyncQueue {
      inner: Arc::new(QueueInner {
        accepting: AtomicBool::new(true),
        in_flight: Mutex::new(0),
        idle: Condvar::new(),
      }),
    }
  }

  /// Submits a job to the pool. Returns `false` (dropping the job) once the
  /// pool has been shut down.
  pub fn submit(&self, work: Work) -> bool {
    if !self.inner.accepting.load(Ordering::Acquire) {
      event!(Level::WARN, "worker queue is shut down; job dropped");
      return false;
    }
    *self.inner.in_flight.lock() += 1;
    let inner = Arc::clone(&self.inner);
    let spawned = thread::Builder::new()
      .name("catena-worker".to_string())
      .spawn(move || {
        // Decrements in-flight even if the job panics.
        let _guard = InFlightGuard(inner);
        work();
      });
    match spawned {
      Ok(_) => true,
      Err(err) => {
        event!(Level::ERROR, error = %err, "failed to spawn worker thread");
        self.decrement();
        false
      }
    }
  }

  /// Stops accepting new jobs and waits up to `timeout` for in-flight work
  /// to finish. Returns `false` if work was still running when the timeout
  /// elapsed; such work is detached, not killed, and its effects on the
  /// engine are discarded.
  pub fn shutdown(&self, timeout: Duration) -> bool {
    self.inner.accepting.store(false, Ordering::Release);
    let deadline = Instant::now() + timeout;
    let mut in_flight = self.inner.in_flight.lock();
    while *in_flight > 0 {
      if self.inner.idle.wait_until(&mut in_flight, deadline).timed_out() {
        if *in_flight == 0 {
          break;
        }
        event!(
          Level::WARN,
          remaining = *in_flight,
          "worker queue shutdown timed out; abandoning remaining jobs"
        );
        return false;
      }
    }
    true
  }

  /// Number of jobs currently running.
  pub fn in_flight(&self) -> usize {
    *self.inner.in_flight.lock()
  }

  fn decrement(&self) {
    let mut in_flight = self.inner.in_flight.lock();
    *in_flight -= 1;
    if *in_flight == 0 {
      self.inner.idle.notify_all();
    }
  }
}

struct InFlightGuard(Arc<QueueInner>);

impl Drop for InFlightGuard {
  fn drop(&mut self) {
    let mut in_flight = self.0.in_flight.lock();
    *in_flight -= 1;
    if *in_flight == 0 {
      self.0.idle.notify_all();
    }
  }
}

impl Clone for AsyncQueue {
  fn clone(&self) -> Self {
    AsyncQueue {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl Default for AsyncQueue {
  fn default() -> Self {
    Self::new()
  }
}
