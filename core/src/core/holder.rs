// catena/src/core/holder.rs

//! The per-step record: one unit of work plus its execution-context tag and a
//! single-use guard. The chain engine only inspects the tag for dispatch and
//! treats the action itself as an opaque callable over type-erased values.

use crate::core::control::{ChainControl, ExecutionMode};
use anyhow::anyhow;
use std::any::Any;
use std::fmt;

/// The type-erased value threaded from one step to the next.
pub(crate) type BoxedValue = Box<dyn Any + Send>;

/// A step action after type erasure. Consumes the previous step's value and
/// reports what the chain should do next.
pub(crate) type ErasedAction = Box<dyn FnOnce(BoxedValue) -> StepOutcome + Send + 'static>;

/// Result of invoking one holder.
pub(crate) enum StepOutcome {
  /// Carry the boxed value into the next step.
  Continue(BoxedValue),
  /// The action asked the chain to stop; not an error.
  Done,
  /// The action failed.
  Failed(anyhow::Error),
  /// The boxed input was not of the type the action was built with.
  InputMismatch { expected_type: &'static str },
}

/// One unit of work appended to a chain.
///
/// Owned exclusively by its chain, invoked at most once, discarded when the
/// chain finishes. The error handler receives a reference to the failing
/// holder, so its position and tag are exposed read-only.
pub struct TaskHolder {
  index: usize,
  mode: ExecutionMode,
  has_run: bool,
  action: Option<ErasedAction>,
}

impl TaskHolder {
  pub(crate) fn new(index: usize, mode: ExecutionMode, action: ErasedAction) -> Self {
    Self {
      index,
      mode,
      has_run: false,
      action: Some(action),
    }
  }

  /// Append position of this step. For a split chain this is the branch's
  /// position within the split batch.
  pub fn index(&self) -> usize {
    self.index
  }

  /// The execution context this step was declared with.
  pub fn mode(&self) -> ExecutionMode {
    self.mode
  }

  /// Whether the step's action has already been consumed.
  pub fn has_run(&self) -> bool {
    self.has_run
  }

  /// Runs the action exactly once. A second invocation attempt is reported
  /// as a failure instead of re-running user code.
  pub(crate) fn invoke(mut self, input: BoxedValue) -> (Self, StepOutcome) {
    let action = match self.action.take() {
      Some(action) if !self.has_run => action,
      _ => {
        return (
          self,
          StepOutcome::Failed(anyhow!("step was already invoked")),
        )
      }
    };
    self.has_run = true;
    let outcome = action(input);
    (self, outcome)
  }
}

impl fmt::Debug for TaskHolder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TaskHolder")
      .field("index", &self.index)
      .field("mode", &self.mode)
      .field("has_run", &self.has_run)
      .field("action_present", &self.action.is_some())
      .finish()
  }
}

/// Wraps a typed step action into an [`ErasedAction`], downcasting the boxed
/// handoff value back to the input type the action expects.
pub(crate) fn erase<In, Out, F>(action: F) -> ErasedAction
where
  In: 'static,
  Out: Send + 'static,
  F: FnOnce(In) -> Result<ChainControl<Out>, anyhow::Error> + Send + 'static,
{
  Box::new(move |value: BoxedValue| {
    let input = match value.downcast::<In>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        return StepOutcome::InputMismatch {
          expected_type: std::any::type_name::<In>(),
        }
      }
    };
    match action(input) {
      Ok(ChainControl::Continue(next)) => StepOutcome::Continue(Box::new(next)),
      Ok(ChainControl::Done) => StepOutcome::Done,
      Err(source) => StepOutcome::Failed(source),
    }
  })
}
