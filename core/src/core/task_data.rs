// catena/src/core/task_data.rs

use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The per-chain shared key-value store, visible to every step of a chain
/// including the branches of a split region (which delegate to their parent's
/// store rather than forking it).
///
/// Every operation takes the lock for its own duration only. The engine
/// guarantees that a value written by one step is visible to the next step of
/// the same chain; it does NOT make multi-call sequences atomic. Concurrent
/// split branches doing read-modify-write against the same key must bring
/// their own coordination.
pub struct TaskData(Arc<Mutex<HashMap<String, Box<dyn Any + Send>>>>);

impl TaskData {
  pub(crate) fn new() -> Self {
    TaskData(Arc::new(Mutex::new(HashMap::new())))
  }

  /// Stores `value` under `key`, replacing any previous value.
  pub fn set<V: Any + Send>(&self, key: impl Into<String>, value: V) {
    self.0.lock().insert(key.into(), Box::new(value));
  }

  /// Returns a clone of the value under `key`, or `None` if the key is
  /// absent or holds a value of a different type.
  pub fn get<V: Any + Clone>(&self, key: &str) -> Option<V> {
    self
      .0
      .lock()
      .get(key)
      .and_then(|value| value.downcast_ref::<V>())
      .cloned()
  }

  pub fn has(&self, key: &str) -> bool {
    self.0.lock().contains_key(key)
  }

  /// Removes the entry under `key` and returns its value. The entry is
  /// removed even when the stored type is not `V`; in that case the value is
  /// dropped and `None` is returned.
  pub fn remove<V: Any>(&self, key: &str) -> Option<V> {
    self
      .0
      .lock()
      .remove(key)
      .and_then(|value| value.downcast::<V>().ok())
      .map(|boxed| *boxed)
  }

  pub fn len(&self) -> usize {
    self.0.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.lock().is_empty()
  }
}

impl Clone for TaskData {
  fn clone(&self) -> Self {
    TaskData(Arc::clone(&self.0))
  }
}

impl Default for TaskData {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for TaskData {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let guard = self.0.lock();
    f.debug_struct("TaskData").field("keys", &guard.keys().collect::<Vec<_>>()).finish()
  }
}
