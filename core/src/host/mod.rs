// catena/src/host/mod.rs

//! The host scheduling interface: the capability set the chain engine needs
//! from the surrounding runtime, plus the worker pool and a reference host
//! implementation for environments without their own main loop.

pub mod queue;
pub mod thread_host;

pub use queue::AsyncQueue;
pub use thread_host::ThreadHost;

use crate::factory::ChainFactory;
use std::time::Duration;

/// A unit of work handed to the host for dispatch.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Abstraction over the host runtime's thread-affinity and scheduling
/// primitives. The engine consumes this; hosts implement it once and inject
/// it at [`ChainFactory::new`].
///
/// No inheritance hierarchy is involved: a host is any type providing this
/// capability set (main-context query, post-to-main, delayed scheduling,
/// worker-queue access, shutdown-hook registration).
pub trait HostScheduler: Send + Sync + 'static {
  /// Whether the calling thread is the host's designated main context.
  fn is_main_context(&self) -> bool;

  /// Schedules `work` to run on the main context at the next opportunity.
  /// Fire-and-forget; the chain resumes when `work` itself runs.
  fn post_to_main(&self, work: Work);

  /// Schedules `work` to run on the main context after `delay`.
  fn schedule_delayed(&self, delay: Duration, work: Work);

  /// The pool used for dispatching worker steps.
  fn async_queue(&self) -> &AsyncQueue;

  /// Lets the factory learn when the host is stopping so it can begin
  /// coordinated shutdown. Hosts without a stop event keep the default
  /// no-op.
  fn register_shutdown_handler(&self, factory: ChainFactory) {
    let _ = factory;
  }
}
