// catena/src/factory.rs

//! Defines `ChainFactory`: constructs chains bound to one host scheduler and
//! owns the process-wide lifecycle (in-flight accounting, coordinated
//! shutdown).

use crate::chain::definition::TaskChain;
use crate::error::{ChainError, ChainResult};
use crate::host::HostScheduler;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{event, instrument, Level};

/// Constructs task chains bound to one [`HostScheduler`] implementation.
///
/// The factory tracks only a count of executing chains (incremented when a
/// chain starts, decremented when it finishes), so it can drain them on
/// shutdown without ever keeping a chain alive past its natural completion.
/// Handles are cheap clones of the same factory.
pub struct ChainFactory {
  shared: Arc<FactoryShared>,
}

pub(crate) struct FactoryShared {
  scheduler: Arc<dyn HostScheduler>,
  shutting_down: AtomicBool,
  live: Mutex<usize>,
  idle: Condvar,
}

impl ChainFactory {
  /// Binds a new factory to `scheduler` and registers it with the host's
  /// shutdown hook.
  pub fn new(scheduler: Arc<dyn HostScheduler>) -> Self {
    let factory = ChainFactory {
      shared: Arc::new(FactoryShared {
        scheduler,
        shutting_down: AtomicBool::new(false),
        live: Mutex::new(0),
        idle: Condvar::new(),
      }),
    };
    factory.shared.scheduler.register_shutdown_handler(factory.clone());
    factory
  }

  /// Creates a new empty chain. Fails with [`ChainError::ShuttingDown`] once
  /// shutdown has begun.
  pub fn create(&self) -> ChainResult<TaskChain<()>> {
    if self.shared.shutting_down.load(Ordering::Acquire) {
      return Err(ChainError::ShuttingDown);
    }
    Ok(TaskChain::new(
      Arc::clone(&self.shared.scheduler),
      Arc::downgrade(&self.shared),
    ))
  }

  /// Coordinated shutdown: stops accepting new chains and executions, waits
  /// up to `timeout` for executing chains to finish, then shuts the host's
  /// worker queue down with whatever budget remains. Returns `true` iff both
  /// drains were clean; on `false`, still-running work is abandoned and its
  /// results discarded.
  #[instrument(name = "ChainFactory::shutdown", skip_all, fields(timeout_ms = timeout.as_millis() as u64))]
  pub fn shutdown(&self, timeout: Duration) -> bool {
    {
      // Raising the flag under the live lock closes the window where an
      // execute() could slip past the flag check without being counted.
      let _live = self.shared.live.lock();
      self.shared.shutting_down.store(true, Ordering::Release);
    }
    event!(Level::INFO, "factory shutdown starting");
    let deadline = Instant::now() + timeout;

    let chains_clean = {
      let mut live = self.shared.live.lock();
      loop {
        if *live == 0 {
          break true;
        }
        if Instant::now() >= deadline {
          event!(Level::WARN, live = *live, "chains still executing at shutdown timeout");
          break false;
        }
        if self.shared.idle.wait_until(&mut live, deadline).timed_out() {
          if *live == 0 {
            break true;
          }
          event!(Level::WARN, live = *live, "chains still executing at shutdown timeout");
          break false;
        }
      }
    };

    let remaining = deadline.saturating_duration_since(Instant::now());
    let pool_clean = self.shared.scheduler.async_queue().shutdown(remaining);
    event!(Level::INFO, chains_clean, pool_clean, "factory shutdown finished");
    chains_clean && pool_clean
  }
}

impl FactoryShared {
  /// Counts a chain as executing. Refuses (without counting) once shutdown
  /// has begun; the flag check and the increment share the live lock, so a
  /// refused chain can never be missed by the shutdown drain.
  pub(crate) fn chain_started(&self) -> bool {
    let mut live = self.live.lock();
    if self.shutting_down.load(Ordering::Acquire) {
      return false;
    }
    *live += 1;
    true
  }

  pub(crate) fn chain_finished(&self) {
    let mut live = self.live.lock();
    *live = live.saturating_sub(1);
    if *live == 0 {
      self.idle.notify_all();
    }
  }
}

impl Clone for ChainFactory {
  fn clone(&self) -> Self {
    ChainFactory {
      shared: Arc::clone(&self.shared),
    }
  }
}
