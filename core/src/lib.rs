// src/lib.rs

//! Catena: a one-shot task-chain execution engine for hosted runtimes.
//!
//! Catena lets a caller describe an ordered sequence of work items, some of
//! which must run on the host's designated "main" context and some of which
//! may run on a worker pool, and executes them one at a time with features
//! like:
//!  - Typed step-to-step handoff: each append re-types the chain to the new
//!    step's output, so step *i+1* receives exactly what step *i* returned.
//!  - A shared per-chain task-data store visible to every step.
//!  - Centralized error handling: step failures are routed to one registered
//!    handler together with the failing step, never thrown out of execution.
//!  - Delayed steps through the host's scheduling primitive.
//!  - Split regions: a batch of worker-only steps fanned out concurrently on
//!    a dedicated pool and joined before the parent chain resumes.
//!  - A factory owning coordinated shutdown across all executing chains.
//!
//! The engine is callback-driven: step actions are plain closures, and a
//! "worker" step simply runs off the main context. Context switches between
//! consecutive steps and delays are the only suspension points. The host
//! runtime is abstracted behind the [`HostScheduler`] trait; a reference
//! [`ThreadHost`] is provided for environments without their own main loop.

// Declare modules according to the planned structure
pub mod core;
pub mod chain;
pub mod host;
pub mod factory;
pub mod error;

// --- Re-exports for the Public API ---

// Core types that users will interact with frequently
pub use crate::core::control::{ChainControl, ExecutionMode};
pub use crate::core::holder::TaskHolder;
pub use crate::core::task_data::TaskData;

// The chain handles and the error-handler alias
pub use crate::chain::definition::{ErrorHandler, TaskChain};
pub use crate::chain::split::SplitTaskChain;

// The host surface
pub use crate::host::{AsyncQueue, HostScheduler, ThreadHost, Work};

pub use crate::factory::ChainFactory;

pub use crate::error::{ChainError, ChainResult};

/*
    Core Workflow:
    1. Implement `HostScheduler` for your runtime (or use `ThreadHost`).
    2. Create a `ChainFactory` bound to it.
    3. Build a chain: `factory.create()?` then `.on_main(..)`, `.on_worker(..)`,
       `.delay(..)`, `.split()? ... .collect()?`; each append re-types the
       chain to the step's output.
    4. Register `.on_error(..)` and `.on_done(..)`.
    5. Call `.execute()`. The chain runs exactly once; observe completion via
       the done callback.
    6. On host stop, call `factory.shutdown(timeout)` to drain executing
       chains and the worker pool.
*/
