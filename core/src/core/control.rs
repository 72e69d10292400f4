// catena/src/core/control.rs

//! Signals returned by step actions and the execution-context tag carried by
//! every step.

/// Value returned by a successful step action.
#[derive(Debug)]
pub enum ChainControl<T> {
  /// Thread `T` into the next step of the chain.
  Continue(T),
  /// Stop the chain voluntarily. Later steps never run and the chain
  /// finishes successfully; this is not an error.
  Done,
}

/// The execution context a step requires.
///
/// Dispatch only ever switches contexts when the required context differs
/// from the one the chain currently occupies; those switches (and delays)
/// are the chain's only suspension points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
  /// Must run on the host's single designated main context.
  Main,
  /// Must run off the main context, on the worker pool.
  Worker,
  /// Runs inline on whichever context the chain currently occupies.
  Current,
}
