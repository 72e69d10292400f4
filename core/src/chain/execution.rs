// catena/src/chain/execution.rs

//! Contains `TaskChain::execute()` and the step-dispatch walk: the one-shot
//! phase transition, inline-vs-context-switch decisions, delay scheduling,
//! step invocation, and error-handler routing.

use crate::chain::definition::{ChainCore, ChainEntry, ChainPhase, TaskChain};
use crate::core::control::ExecutionMode;
use crate::core::holder::{StepOutcome, TaskHolder};
use crate::error::{ChainError, ChainResult};
use std::sync::Arc;
use tracing::{event, instrument, span, Level};

impl<T: Send + 'static> TaskChain<T> {
  /// Transitions the chain from building to executing, exactly once, and
  /// begins walking the step list. Fire-and-forget: completion is observed
  /// through the `on_done` callback, and step failures through the error
  /// handler; neither propagates out of this call.
  ///
  /// Fails with [`ChainError::AlreadyExecuting`] on a second call and with
  /// [`ChainError::ShuttingDown`] once the owning factory has begun
  /// shutdown.
  #[instrument(
    name = "TaskChain::execute",
    skip_all,
    fields(handoff_type = %std::any::type_name::<T>()),
    err(Display)
  )]
  pub fn execute(self) -> ChainResult<()> {
    {
      let mut inner = self.core.state.lock();
      if !matches!(inner.phase, ChainPhase::Building) {
        return Err(ChainError::AlreadyExecuting);
      }
      // Registering with the factory and transitioning the phase happen in
      // one critical section: a refused registration leaves the chain in
      // `Building`, uncounted, and the shutdown drain has nothing to wait
      // on.
      if let Some(factory) = self.core.factory.upgrade() {
        if !factory.chain_started() {
          return Err(ChainError::ShuttingDown);
        }
      }
      inner.phase = ChainPhase::Executing;
    }
    event!(Level::DEBUG, "chain execution starting");
    ChainCore::advance(Arc::clone(&self.core));
    Ok(())
  }
}

impl ChainCore {
  /// Walks entries until the list is exhausted, the chain halts, or a
  /// context switch or delay hands the continuation to the host.
  pub(crate) fn advance(core: Arc<ChainCore>) {
    loop {
      let entry = {
        let mut inner = core.state.lock();
        if !matches!(inner.phase, ChainPhase::Executing) {
          return;
        }
        inner.entries.pop_front()
      };
      let Some(entry) = entry else {
        event!(Level::DEBUG, "chain execution completed");
        ChainCore::finish(&core, true);
        return;
      };
      match entry {
        ChainEntry::Delay(delay) => {
          event!(Level::DEBUG, delay_ms = delay.as_millis() as u64, "deferring next step");
          let continuation = Arc::clone(&core);
          core.scheduler.schedule_delayed(
            delay,
            Box::new(move || ChainCore::advance(continuation)),
          );
          return;
        }
        ChainEntry::Step(holder) => {
          let on_main = core.scheduler.is_main_context();
          let inline = match holder.mode() {
            ExecutionMode::Current => true,
            ExecutionMode::Main => on_main,
            ExecutionMode::Worker => !on_main,
          };
          if inline {
            if !ChainCore::run_step(&core, holder) {
              return;
            }
          } else if holder.mode() == ExecutionMode::Main {
            let continuation = Arc::clone(&core);
            core.scheduler.post_to_main(Box::new(move || {
              if ChainCore::run_step(&continuation, holder) {
                ChainCore::advance(continuation);
              }
            }));
            return;
          } else {
            let continuation = Arc::clone(&core);
            let accepted = core.scheduler.async_queue().submit(Box::new(move || {
              if ChainCore::run_step(&continuation, holder) {
                ChainCore::advance(continuation);
              }
            }));
            if !accepted {
              event!(Level::WARN, "worker queue rejected step; abandoning chain");
              ChainCore::finish(&core, false);
            }
            return;
          }
        }
      }
    }
  }

  /// Invokes one holder with the in-flight value. Returns `true` when the
  /// walk should continue; on halt or failure the chain is finished here.
  fn run_step(core: &Arc<ChainCore>, holder: TaskHolder) -> bool {
    let step_span = span!(
      Level::DEBUG,
      "chain_step",
      step_index = holder.index(),
      mode = ?holder.mode()
    );
    let _guard = step_span.enter();

    let input = {
      core
        .state
        .lock()
        .current_value
        .take()
        .unwrap_or_else(|| Box::new(()))
    };
    let (holder, outcome) = holder.invoke(input);
    match outcome {
      StepOutcome::Continue(value) => {
        core.state.lock().current_value = Some(value);
        true
      }
      StepOutcome::Done => {
        event!(Level::INFO, step_index = holder.index(), "chain stopped by step");
        ChainCore::finish(core, true);
        false
      }
      StepOutcome::Failed(source) => {
        let err = ChainError::StepFailure {
          step_index: holder.index(),
          source,
        };
        core.report_step_error(&err, &holder);
        ChainCore::finish(core, false);
        false
      }
      StepOutcome::InputMismatch { expected_type } => {
        let err = ChainError::TypeMismatch {
          step_index: holder.index(),
          expected_type,
        };
        core.report_step_error(&err, &holder);
        ChainCore::finish(core, false);
        false
      }
    }
  }

  /// Hands a step error to the registered handler, or logs it when none is
  /// registered. The handler decision is terminal; there is no retry.
  pub(crate) fn report_step_error(&self, err: &ChainError, holder: &TaskHolder) {
    let handler = self.state.lock().error_handler.clone();
    match handler {
      Some(handler) => {
        event!(Level::DEBUG, step_index = holder.index(), "routing step error to handler");
        handler(err, holder);
      }
      None => {
        event!(
          Level::ERROR,
          step_index = holder.index(),
          error = %err,
          "step failed and no error handler is registered"
        );
      }
    }
  }

  /// Terminal transition: marks the chain done, releases its entries,
  /// notifies the factory, and fires the done callback.
  pub(crate) fn finish(core: &Arc<ChainCore>, success: bool) {
    let done_callback = {
      let mut inner = core.state.lock();
      if matches!(inner.phase, ChainPhase::Done) {
        return;
      }
      inner.phase = ChainPhase::Done;
      inner.entries.clear();
      inner.current_value = None;
      inner.done_callback.take()
    };
    event!(Level::DEBUG, success, "chain finished");
    if let Some(factory) = core.factory.upgrade() {
      factory.chain_finished();
    }
    if let Some(callback) = done_callback {
      callback(success);
    }
  }
}
