// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use catena::{ChainFactory, HostScheduler, ThreadHost};
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Host + factory under test ---

pub struct TestRig {
  pub host: Arc<ThreadHost>,
  pub factory: ChainFactory,
}

pub fn rig() -> TestRig {
  let host = Arc::new(ThreadHost::new());
  let factory = ChainFactory::new(host.clone());
  TestRig { host, factory }
}

// --- Completion signalling ---

/// A done callback plus the receiver that observes it. The callback reports
/// whether the chain finished without a step failure.
pub fn done_channel() -> (impl FnOnce(bool) + Send + 'static, Receiver<bool>) {
  let (tx, rx) = crossbeam_channel::bounded::<bool>(1);
  (move |ok| {
    let _ = tx.send(ok);
  }, rx)
}

pub fn wait_done(rx: &Receiver<bool>) -> bool {
  rx.recv_timeout(Duration::from_secs(5))
    .expect("chain did not finish in time")
}

// --- Shared recorders for asserting step behavior ---

/// Ordered record of strings pushed from inside steps.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
  pub fn push(&self, entry: impl Into<String>) {
    self.0.lock().push(entry.into());
  }

  pub fn snapshot(&self) -> Vec<String> {
    self.0.lock().clone()
  }
}

/// Record of error-handler invocations: (failing step index, error kind tag).
#[derive(Clone, Default)]
pub struct ErrorLog(Arc<Mutex<Vec<(usize, &'static str)>>>);

impl ErrorLog {
  /// An `on_error` handler that records into this log.
  pub fn handler(&self) -> impl Fn(&catena::ChainError, &catena::TaskHolder) + Send + Sync + 'static {
    let log = self.clone();
    move |err, holder| {
      let kind = match err {
        catena::ChainError::StepFailure { .. } => "step_failure",
        catena::ChainError::TypeMismatch { .. } => "type_mismatch",
        _ => "other",
      };
      log.0.lock().push((holder.index(), kind));
    }
  }

  pub fn snapshot(&self) -> Vec<(usize, &'static str)> {
    self.0.lock().clone()
  }

  pub fn len(&self) -> usize {
    self.0.lock().len()
  }
}

/// Tags the calling thread's context for context-affinity assertions.
pub fn context_tag(host: &ThreadHost) -> &'static str {
  if host.is_main_context() {
    "main"
  } else {
    "off"
  }
}
