// catena/src/error.rs

use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
  /// Structural misuse: the chain has left its building phase, so it can no
  /// longer be appended to, reconfigured, or executed again.
  #[error("chain is already executing; it can no longer be modified or re-run")]
  AlreadyExecuting,

  /// The operation is invalid for a split chain (delay, direct execution, or
  /// appending a step that is not a worker step).
  #[error("operation '{operation}' is not supported on a split chain")]
  Unsupported { operation: &'static str },

  /// A user-supplied step action failed. Routed to the chain's error handler,
  /// never propagated out of `execute()`.
  #[error("step {step_index} failed. Source: {source}")]
  StepFailure {
    step_index: usize,
    #[source]
    source: AnyhowError,
  },

  /// The value handed to a step did not have the input type the step was
  /// built with. Only reachable by appending through a stale clone of an
  /// already re-typed chain handle.
  #[error("step {step_index} received a value of an unexpected type (expected {expected_type})")]
  TypeMismatch {
    step_index: usize,
    expected_type: &'static str,
  },

  /// The owning factory has begun coordinated shutdown and refuses new
  /// chains and new executions.
  #[error("factory is shutting down; no new chains or executions are accepted")]
  ShuttingDown,
}

pub type ChainResult<T, E = ChainError> = std::result::Result<T, E>;
