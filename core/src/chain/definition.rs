// catena/src/chain/definition.rs

//! Contains the `TaskChain<T>` handle, the shared chain internals, and the
//! builder surface used during the chain's building phase.

use crate::chain::split::SplitTaskChain;
use crate::core::control::{ChainControl, ExecutionMode};
use crate::core::holder::{erase, BoxedValue, ErasedAction, TaskHolder};
use crate::core::task_data::TaskData;
use crate::error::{ChainError, ChainResult};
use crate::factory::FactoryShared;
use crate::host::HostScheduler;
use anyhow::anyhow;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Handler invoked with a failed step's error and the failing holder.
pub type ErrorHandler = Arc<dyn Fn(&ChainError, &TaskHolder) + Send + Sync + 'static>;

pub(crate) type DoneCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// Where the chain is in its one-shot lifecycle.
pub(crate) enum ChainPhase {
  Building,
  Executing,
  Done,
}

pub(crate) enum ChainEntry {
  Step(TaskHolder),
  Delay(Duration),
}

/// Everything a chain's clones share. The single mutex guards the one-shot
/// phase transition and the entry list together, which is what prevents both
/// double execution and append-during-run races.
pub(crate) struct ChainCore {
  pub(crate) scheduler: Arc<dyn HostScheduler>,
  pub(crate) factory: Weak<FactoryShared>,
  pub(crate) state: Mutex<ChainInner>,
  pub(crate) task_data: TaskData,
}

pub(crate) struct ChainInner {
  pub(crate) phase: ChainPhase,
  pub(crate) entries: VecDeque<ChainEntry>,
  pub(crate) next_index: usize,
  pub(crate) current_value: Option<BoxedValue>,
  pub(crate) error_handler: Option<ErrorHandler>,
  pub(crate) done_callback: Option<DoneCallback>,
}

impl ChainCore {
  pub(crate) fn is_building(&self) -> bool {
    matches!(self.state.lock().phase, ChainPhase::Building)
  }

  pub(crate) fn push_step(&self, mode: ExecutionMode, action: ErasedAction) -> ChainResult<()> {
    let mut inner = self.state.lock();
    if !matches!(inner.phase, ChainPhase::Building) {
      return Err(ChainError::AlreadyExecuting);
    }
    let index = inner.next_index;
    inner.next_index += 1;
    inner
      .entries
      .push_back(ChainEntry::Step(TaskHolder::new(index, mode, action)));
    Ok(())
  }

  pub(crate) fn push_delay(&self, delay: Duration) -> ChainResult<()> {
    let mut inner = self.state.lock();
    if !matches!(inner.phase, ChainPhase::Building) {
      return Err(ChainError::AlreadyExecuting);
    }
    inner.entries.push_back(ChainEntry::Delay(delay));
    Ok(())
  }
}

/// The sequential task chain. `T` is the type of the value currently at the
/// end of the chain: a fresh chain is `TaskChain<()>`, and every append
/// consumes the handle and returns it re-typed to the new step's output, so
/// the step-to-step handoff is checked while the chain is built.
///
/// Handles are cheap clones of the same underlying chain. The phase guard
/// makes misuse through a clone (double execution, appending after
/// execution) fail with [`ChainError::AlreadyExecuting`]; a wrongly-typed
/// append through a stale clone surfaces at run time as
/// [`ChainError::TypeMismatch`] through the error handler.
pub struct TaskChain<T> {
  pub(crate) core: Arc<ChainCore>,
  pub(crate) _marker: PhantomData<fn() -> T>,
}

impl TaskChain<()> {
  pub(crate) fn new(scheduler: Arc<dyn HostScheduler>, factory: Weak<FactoryShared>) -> Self {
    TaskChain {
      core: Arc::new(ChainCore {
        scheduler,
        factory,
        state: Mutex::new(ChainInner {
          phase: ChainPhase::Building,
          entries: VecDeque::new(),
          next_index: 0,
          // Seed for the first step, which takes `()`.
          current_value: Some(Box::new(())),
          error_handler: None,
          done_callback: None,
        }),
        task_data: TaskData::new(),
      }),
      _marker: PhantomData,
    }
  }
}

impl<T: Send + 'static> TaskChain<T> {
  pub(crate) fn rebrand<R>(self) -> TaskChain<R> {
    TaskChain {
      core: self.core,
      _marker: PhantomData,
    }
  }

  /// Appends a step with an explicit execution-context tag.
  ///
  /// The action receives the previous step's value and returns
  /// [`ChainControl::Continue`] with the next value, [`ChainControl::Done`]
  /// to stop the chain voluntarily, or an error to abort it.
  pub fn append<R, F>(self, mode: ExecutionMode, action: F) -> ChainResult<TaskChain<R>>
  where
    R: Send + 'static,
    F: FnOnce(T) -> Result<ChainControl<R>, anyhow::Error> + Send + 'static,
  {
    self.core.push_step(mode, erase::<T, R, F>(action))?;
    Ok(self.rebrand())
  }

  /// Appends a step that must run on the host's main context.
  pub fn on_main<R, F>(self, action: F) -> ChainResult<TaskChain<R>>
  where
    R: Send + 'static,
    F: FnOnce(T) -> Result<ChainControl<R>, anyhow::Error> + Send + 'static,
  {
    self.append(ExecutionMode::Main, action)
  }

  /// Appends a step that must run off the main context, on the worker pool.
  pub fn on_worker<R, F>(self, action: F) -> ChainResult<TaskChain<R>>
  where
    R: Send + 'static,
    F: FnOnce(T) -> Result<ChainControl<R>, anyhow::Error> + Send + 'static,
  {
    self.append(ExecutionMode::Worker, action)
  }

  /// Appends a step that runs inline on whichever context the chain occupies
  /// when it is reached; never forces a context switch.
  pub fn on_current<R, F>(self, action: F) -> ChainResult<TaskChain<R>>
  where
    R: Send + 'static,
    F: FnOnce(T) -> Result<ChainControl<R>, anyhow::Error> + Send + 'static,
  {
    self.append(ExecutionMode::Current, action)
  }

  /// Appends a scheduling pause. When the walk reaches it, the next step is
  /// dispatched through the host's delayed-scheduling primitive.
  pub fn delay(self, delay: Duration) -> ChainResult<Self> {
    self.core.push_delay(delay)?;
    Ok(self)
  }

  /// Registers the chain's error handler. Step failures are routed here
  /// together with the failing holder; they never propagate out of
  /// `execute()`. Last registration wins.
  pub fn on_error<H>(self, handler: H) -> ChainResult<Self>
  where
    H: Fn(&ChainError, &TaskHolder) + Send + Sync + 'static,
  {
    {
      let mut inner = self.core.state.lock();
      if !matches!(inner.phase, ChainPhase::Building) {
        return Err(ChainError::AlreadyExecuting);
      }
      inner.error_handler = Some(Arc::new(handler));
    }
    Ok(self)
  }

  /// Registers a callback invoked exactly once when the chain terminates:
  /// `true` on completion or a voluntary [`ChainControl::Done`], `false` if
  /// a step failed or the chain was abandoned. Last registration wins.
  pub fn on_done<F>(self, callback: F) -> ChainResult<Self>
  where
    F: FnOnce(bool) + Send + 'static,
  {
    {
      let mut inner = self.core.state.lock();
      if !matches!(inner.phase, ChainPhase::Building) {
        return Err(ChainError::AlreadyExecuting);
      }
      inner.done_callback = Some(Box::new(callback));
    }
    Ok(self)
  }

  /// Opens a split region: a batch of worker-only steps that will run
  /// concurrently and rejoin this chain through
  /// [`SplitTaskChain::collect`].
  pub fn split(self) -> ChainResult<SplitTaskChain<T>> {
    SplitTaskChain::new(self)
  }

  // --- Shared task data ---

  /// A cloneable handle to this chain's shared task data, for capture inside
  /// step closures.
  pub fn task_data(&self) -> TaskData {
    self.core.task_data.clone()
  }

  pub fn set_task_data<V: Any + Send>(&self, key: impl Into<String>, value: V) {
    self.core.task_data.set(key, value);
  }

  pub fn get_task_data<V: Any + Clone>(&self, key: &str) -> Option<V> {
    self.core.task_data.get(key)
  }

  pub fn has_task_data(&self, key: &str) -> bool {
    self.core.task_data.has(key)
  }

  pub fn remove_task_data<V: Any>(&self, key: &str) -> Option<V> {
    self.core.task_data.remove(key)
  }

  // --- Data-helper steps ---

  /// Stores the in-flight value into task data under `key` and passes it
  /// through to the next step unchanged.
  pub fn store_as_data(self, key: impl Into<String>) -> ChainResult<Self>
  where
    T: Clone + Any,
  {
    let key = key.into();
    let data = self.core.task_data.clone();
    self.append(ExecutionMode::Current, move |value: T| {
      data.set(key, value.clone());
      Ok(ChainControl::Continue(value))
    })
  }

  /// Discards the in-flight value and loads the next step's input from task
  /// data. A missing or wrongly-typed entry is a step failure.
  pub fn return_data<R>(self, key: impl Into<String>) -> ChainResult<TaskChain<R>>
  where
    R: Any + Clone + Send + 'static,
  {
    let key = key.into();
    let data = self.core.task_data.clone();
    self.append(ExecutionMode::Current, move |_: T| match data.get::<R>(&key) {
      Some(value) => Ok(ChainControl::Continue(value)),
      None => Err(anyhow!("no task data of the expected type under key '{key}'")),
    })
  }

  /// Ends the chain (as [`ChainControl::Done`], not an error) when the
  /// predicate holds for the in-flight value, which otherwise passes
  /// through.
  pub fn abort_if<P>(self, predicate: P) -> ChainResult<Self>
  where
    P: FnOnce(&T) -> bool + Send + 'static,
  {
    self.append(ExecutionMode::Current, move |value: T| {
      if predicate(&value) {
        Ok(ChainControl::Done)
      } else {
        Ok(ChainControl::Continue(value))
      }
    })
  }
}

impl<T> Clone for TaskChain<T> {
  fn clone(&self) -> Self {
    TaskChain {
      core: Arc::clone(&self.core),
      _marker: PhantomData,
    }
  }
}
