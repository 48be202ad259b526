use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::TaskError;

/// Identity of a task within one [`TaskRuntime`](crate::TaskRuntime).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub(crate) u64);

impl fmt::Display for TaskId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "task#{}", self.0)
  }
}

pub(crate) type ResultSlot<T> = Option<Result<T, TaskError>>;

/// Handle to a spawned task. Cheap to clone; every clone observes the same
/// terminal result.
pub struct TaskHandle<T> {
  pub(crate) id: TaskId,
  pub(crate) name: Arc<str>,
  pub(crate) result: watch::Receiver<ResultSlot<T>>,
}

impl<T> Clone for TaskHandle<T> {
  fn clone(&self) -> Self {
    Self {
      id: self.id,
      name: self.name.clone(),
      result: self.result.clone(),
    }
  }
}

impl<T> fmt::Debug for TaskHandle<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TaskHandle")
      .field("id", &self.id)
      .field("name", &self.name)
      .finish()
  }
}

impl<T> TaskHandle<T> {
  /// Identity of the task, unique within its runtime.
  pub fn id(&self) -> TaskId {
    self.id
  }

  /// The name the task was spawned with.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Whether the task has reached a terminal state.
  pub fn is_finished(&self) -> bool {
    // A closed channel without a value means the task was dropped.
    self.result.borrow().is_some() || self.result.has_changed().is_err()
  }
}

impl<T: Clone> TaskHandle<T> {
  /// The terminal result, if the task has finished. Never suspends.
  pub fn try_result(&self) -> Option<Result<T, TaskError>> {
    self.result.borrow().clone()
  }
}
