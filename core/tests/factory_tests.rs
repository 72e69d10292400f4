// tests/factory_tests.rs
mod common;

use common::*;
use catena::{ChainControl, ChainError, HostScheduler};
use serial_test::serial;
use std::time::Duration;

#[test]
#[serial]
fn idle_factory_shuts_down_cleanly() {
  setup_tracing();
  let rig = rig();
  assert!(rig.factory.shutdown(Duration::from_millis(100)));
}

#[test]
#[serial]
fn shutdown_waits_for_executing_chains() {
  setup_tracing();
  let rig = rig();
  let (done, done_rx) = done_channel();

  rig
    .factory
    .create()
    .unwrap()
    .on_main(|_: ()| Ok(ChainControl::Continue(())))
    .unwrap()
    .on_worker(|_: ()| {
      std::thread::sleep(Duration::from_millis(60));
      Ok(ChainControl::Continue(()))
    })
    .unwrap()
    .on_done(done)
    .unwrap()
    .execute()
    .unwrap();

  assert!(rig.factory.shutdown(Duration::from_secs(5)));
  assert!(wait_done(&done_rx));
}

#[test]
#[serial]
fn shutdown_reports_forced_when_chains_outlive_the_timeout() {
  setup_tracing();
  let rig = rig();

  rig
    .factory
    .create()
    .unwrap()
    .delay(Duration::from_millis(300))
    .unwrap()
    .on_main(|_: ()| Ok(ChainControl::Continue(())))
    .unwrap()
    .execute()
    .unwrap();

  assert!(!rig.factory.shutdown(Duration::from_millis(10)));
}

#[test]
#[serial]
fn create_and_execute_fail_once_shutdown_has_begun() {
  setup_tracing();
  let rig = rig();

  let chain = rig.factory.create().unwrap();
  assert!(rig.factory.shutdown(Duration::ZERO));

  assert!(matches!(rig.factory.create(), Err(ChainError::ShuttingDown)));
  assert!(matches!(chain.execute(), Err(ChainError::ShuttingDown)));
}

#[test]
#[serial]
fn refused_execute_is_never_counted_as_live() {
  setup_tracing();
  let rig = rig();

  let chain = rig
    .factory
    .create()
    .unwrap()
    .on_worker(|_: ()| Ok(ChainControl::Continue(())))
    .unwrap();
  assert!(rig.factory.shutdown(Duration::ZERO));

  assert!(matches!(chain.execute(), Err(ChainError::ShuttingDown)));
  // The refusal left no live-count residue: a further drain with no budget
  // is still clean.
  assert!(rig.factory.shutdown(Duration::ZERO));
}

#[test]
#[serial]
fn worker_queue_rejects_jobs_after_shutdown() {
  setup_tracing();
  let rig = rig();
  assert!(rig.factory.shutdown(Duration::ZERO));
  assert!(!rig.host.async_queue().submit(Box::new(|| {})));
}
