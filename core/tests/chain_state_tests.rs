// tests/chain_state_tests.rs
mod common;

use common::*;
use catena::{ChainControl, ChainError};
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
#[serial]
fn second_execute_fails_and_no_step_runs_twice() {
  setup_tracing();
  let rig = rig();
  let runs = Arc::new(AtomicUsize::new(0));
  let (done, done_rx) = done_channel();

  let runs_in_step = runs.clone();
  let chain = rig
    .factory
    .create()
    .unwrap()
    .on_main(move |_: ()| {
      runs_in_step.fetch_add(1, Ordering::SeqCst);
      Ok(ChainControl::Continue(()))
    })
    .unwrap()
    .on_done(done)
    .unwrap();

  let duplicate = chain.clone();
  chain.execute().unwrap();

  assert!(matches!(duplicate.execute(), Err(ChainError::AlreadyExecuting)));
  assert!(wait_done(&done_rx));
  assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
#[serial]
fn append_after_execute_fails() {
  setup_tracing();
  let rig = rig();
  let (done, done_rx) = done_channel();

  let chain = rig
    .factory
    .create()
    .unwrap()
    .on_main(|_: ()| Ok(ChainControl::Continue(())))
    .unwrap()
    .on_done(done)
    .unwrap();

  let stale = chain.clone();
  chain.execute().unwrap();

  assert!(matches!(
    stale.on_main(|_: ()| Ok(ChainControl::Continue(()))),
    Err(ChainError::AlreadyExecuting)
  ));
  assert!(wait_done(&done_rx));
}

#[test]
#[serial]
fn configuration_after_execute_fails() {
  setup_tracing();
  let rig = rig();
  let (done, done_rx) = done_channel();

  let chain = rig
    .factory
    .create()
    .unwrap()
    .on_main(|_: ()| Ok(ChainControl::Continue(())))
    .unwrap()
    .on_done(done)
    .unwrap();

  let stale = chain.clone();
  chain.execute().unwrap();
  assert!(wait_done(&done_rx));

  assert!(matches!(
    stale.clone().delay(Duration::from_millis(1)),
    Err(ChainError::AlreadyExecuting)
  ));
  assert!(matches!(
    stale.clone().on_error(|_, _| {}),
    Err(ChainError::AlreadyExecuting)
  ));
  assert!(matches!(
    stale.clone().on_done(|_| {}),
    Err(ChainError::AlreadyExecuting)
  ));
  assert!(matches!(stale.split(), Err(ChainError::AlreadyExecuting)));
}

#[test]
#[serial]
fn wrongly_typed_append_through_stale_clone_surfaces_as_type_mismatch() {
  setup_tracing();
  let rig = rig();
  let errors = ErrorLog::default();
  let (done, done_rx) = done_channel();

  let fresh = rig.factory.create().unwrap();
  let stale = fresh.clone();

  // The honest handle re-types the chain to i32...
  let chain = fresh
    .on_current(|_: ()| Ok(ChainControl::Continue(42i32)))
    .unwrap();
  // ...while the stale clone appends a step still expecting `()`.
  let _ = stale
    .on_current(|_: ()| Ok(ChainControl::Continue("nope")))
    .unwrap();

  chain
    .on_error(errors.handler())
    .unwrap()
    .on_done(done)
    .unwrap()
    .execute()
    .unwrap();

  assert!(!wait_done(&done_rx));
  assert_eq!(errors.snapshot(), vec![(1, "type_mismatch")]);
}
