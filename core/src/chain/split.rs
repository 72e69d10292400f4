// catena/src/chain/split.rs

//! The split region: a batch of worker-only steps that run concurrently on a
//! dedicated pool and rejoin the parent chain as a single step.

use crate::chain::definition::TaskChain;
use crate::core::control::{ChainControl, ExecutionMode};
use crate::core::holder::{BoxedValue, ErasedAction, StepOutcome, TaskHolder};
use crate::core::task_data::TaskData;
use crate::error::{ChainError, ChainResult};
use crate::host::AsyncQueue;
use crossbeam_channel::unbounded;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tracing::{event, span, Level};

/// A split region of a [`TaskChain`].
///
/// Holds the parent handle by value: `split()` consumes the parent and
/// `collect()` returns it, so the region can neither outlive its parent
/// relationship nor extend the chain's lifetime. Branches are worker-only,
/// accumulate in a private list, and run with no input and no handoff value;
/// shared state flows through the parent's task data, which the accessors
/// here delegate to.
pub struct SplitTaskChain<T> {
  parent: TaskChain<T>,
  shared: Arc<SplitShared>,
}

struct SplitShared {
  holders: Mutex<Vec<TaskHolder>>,
  /// Dedicated pool for this region's branches; shut down after the join.
  pool: AsyncQueue,
}

impl<T: Send + 'static> SplitTaskChain<T> {
  pub(crate) fn new(parent: TaskChain<T>) -> ChainResult<Self> {
    if !parent.core.is_building() {
      return Err(ChainError::AlreadyExecuting);
    }
    Ok(SplitTaskChain {
      parent,
      shared: Arc::new(SplitShared {
        holders: Mutex::new(Vec::new()),
        pool: AsyncQueue::new(),
      }),
    })
  }

  /// Appends a branch. Branches receive no input, return no handoff value,
  /// and run concurrently with every other branch of this region.
  pub fn on_worker<F>(self, action: F) -> ChainResult<Self>
  where
    F: FnOnce() -> Result<(), anyhow::Error> + Send + 'static,
  {
    {
      let mut holders = self.shared.holders.lock();
      if !self.parent.core.is_building() {
        return Err(ChainError::AlreadyExecuting);
      }
      let index = holders.len();
      let erased: ErasedAction = Box::new(move |_: BoxedValue| match action() {
        Ok(()) => StepOutcome::Continue(Box::new(())),
        Err(source) => StepOutcome::Failed(source),
      });
      holders.push(TaskHolder::new(index, ExecutionMode::Worker, erased));
    }
    Ok(self)
  }

  /// Main-context steps are invalid inside a split region.
  pub fn on_main<R, F>(self, _action: F) -> ChainResult<Self>
  where
    R: Send + 'static,
    F: FnOnce(T) -> Result<ChainControl<R>, anyhow::Error> + Send + 'static,
  {
    Err(ChainError::Unsupported { operation: "on_main" })
  }

  /// Current-context steps are invalid inside a split region.
  pub fn on_current<R, F>(self, _action: F) -> ChainResult<Self>
  where
    R: Send + 'static,
    F: FnOnce(T) -> Result<ChainControl<R>, anyhow::Error> + Send + 'static,
  {
    Err(ChainError::Unsupported { operation: "on_current" })
  }

  /// A split region cannot pause: there is no single current position to
  /// delay from while N branches run simultaneously.
  pub fn delay(self, _delay: Duration) -> ChainResult<Self> {
    Err(ChainError::Unsupported { operation: "delay" })
  }

  /// A split region is resumed through [`collect`](Self::collect), never run
  /// directly.
  pub fn execute(self) -> ChainResult<()> {
    Err(ChainError::Unsupported { operation: "execute" })
  }

  // --- Task data: a split region shares its parent's store ---

  pub fn task_data(&self) -> TaskData {
    self.parent.task_data()
  }

  pub fn set_task_data<V: Any + Send>(&self, key: impl Into<String>, value: V) {
    self.parent.set_task_data(key, value);
  }

  pub fn get_task_data<V: Any + Clone>(&self, key: &str) -> Option<V> {
    self.parent.get_task_data(key)
  }

  pub fn has_task_data(&self, key: &str) -> bool {
    self.parent.has_task_data(key)
  }

  pub fn remove_task_data<V: Any>(&self, key: &str) -> Option<V> {
    self.parent.remove_task_data(key)
  }

  /// Closes the region: appends onto the parent one worker step that fans
  /// every accumulated branch out on the dedicated pool, then drains the
  /// join channel until every launched branch has reported, failures
  /// included, each routed individually to the parent's error handler with
  /// its branch holder. Branch failures do not stop the other branches and
  /// do not stop the parent: the parent's in-flight value passes through the
  /// join unchanged and its next step runs once the batch is drained.
  pub fn collect(self) -> ChainResult<TaskChain<T>> {
    let SplitTaskChain { parent, shared } = self;
    // The join lives inside the parent's own entry list, so it must hold the
    // parent weakly or a collected-but-never-executed chain could never drop.
    let parent_core = Arc::downgrade(&parent.core);

    let join: ErasedAction = Box::new(move |input: BoxedValue| {
      let Some(parent_core) = parent_core.upgrade() else {
        return StepOutcome::Continue(input);
      };
      let holders: Vec<TaskHolder> = {
        let mut guard = shared.holders.lock();
        guard.drain(..).collect()
      };
      let join_span = span!(Level::DEBUG, "split_join", branches = holders.len());
      let _guard = join_span.enter();

      let (report, reports) = unbounded::<(TaskHolder, StepOutcome)>();
      let mut launched = 0usize;
      for holder in holders {
        let report = report.clone();
        let accepted = shared.pool.submit(Box::new(move || {
          let (holder, outcome) = holder.invoke(Box::new(()));
          let _ = report.send((holder, outcome));
        }));
        if accepted {
          launched += 1;
        } else {
          event!(Level::WARN, "split pool rejected a branch; branch dropped");
        }
      }
      drop(report);

      // One receive per launch: the join structurally drains every branch
      // before the parent resumes, regardless of individual failures. A
      // pool torn down mid-drain drops its senders, ending the loop with
      // the remaining branches abandoned.
      for _ in 0..launched {
        match reports.recv() {
          Ok((holder, outcome)) => match outcome {
            StepOutcome::Continue(_) | StepOutcome::Done => {}
            StepOutcome::Failed(source) => {
              let err = ChainError::StepFailure {
                step_index: holder.index(),
                source,
              };
              parent_core.report_step_error(&err, &holder);
            }
            StepOutcome::InputMismatch { expected_type } => {
              let err = ChainError::TypeMismatch {
                step_index: holder.index(),
                expected_type,
              };
              parent_core.report_step_error(&err, &holder);
            }
          },
          Err(_) => {
            event!(Level::WARN, "split pool stopped mid-join; remaining branches abandoned");
            break;
          }
        }
      }
      // Every branch has reported (or been abandoned); the grace only
      // covers threads tearing down after their send.
      shared.pool.shutdown(Duration::from_secs(1));
      StepOutcome::Continue(input)
    });

    parent.core.push_step(ExecutionMode::Worker, join)?;
    Ok(parent)
  }
}
