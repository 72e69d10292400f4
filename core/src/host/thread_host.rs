// catena/src/host/thread_host.rs

//! A reference [`HostScheduler`] for environments without their own main
//! loop: owns a dedicated main-context thread fed by a channel mailbox.
//! Embedding hosts (a game loop, a UI thread) implement the trait against
//! their native scheduler instead.

use super::{AsyncQueue, HostScheduler, Work};
use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use tracing::{event, Level};

enum MainMsg {
  Run(Work),
  Stop,
}

pub struct ThreadHost {
  mailbox: Sender<MainMsg>,
  main_thread: Mutex<Option<JoinHandle<()>>>,
  main_thread_id: ThreadId,
  queue: AsyncQueue,
}

impl ThreadHost {
  pub fn new() -> Self {
    let (mailbox, inbox) = unbounded::<MainMsg>();
    let handle = thread::spawn(move || {
      for msg in inbox {
        match msg {
          MainMsg::Run(work) => work(),
          MainMsg::Stop => break,
        }
      }
    });
    let main_thread_id = handle.thread().id();
    ThreadHost {
      mailbox,
      main_thread: Mutex::new(Some(handle)),
      main_thread_id,
      queue: AsyncQueue::new(),
    }
  }

  /// Stops the main loop and joins its thread. Must not be called from the
  /// main context itself. Work posted after this point is dropped.
  pub fn stop(&self) {
    let _ = self.mailbox.send(MainMsg::Stop);
    if let Some(handle) = self.main_thread.lock().take() {
      let _ = handle.join();
    }
  }
}

impl HostScheduler for ThreadHost {
  fn is_main_context(&self) -> bool {
    thread::current().id() == self.main_thread_id
  }

  fn post_to_main(&self, work: Work) {
    if self.mailbox.send(MainMsg::Run(work)).is_err() {
      event!(Level::WARN, "main loop has stopped; posted work dropped");
    }
  }

  fn schedule_delayed(&self, delay: Duration, work: Work) {
    let mailbox = self.mailbox.clone();
    thread::spawn(move || {
      thread::sleep(delay);
      if mailbox.send(MainMsg::Run(work)).is_err() {
        event!(Level::WARN, "main loop has stopped; delayed work dropped");
      }
    });
  }

  fn async_queue(&self) -> &AsyncQueue {
    &self.queue
  }
}

impl Default for ThreadHost {
  fn default() -> Self {
    Self::new()
  }
}

impl Drop for ThreadHost {
  fn drop(&mut self) {
    if thread::current().id() != self.main_thread_id {
      self.stop();
    }
  }
}
