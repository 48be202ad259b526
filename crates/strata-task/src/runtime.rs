use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::context::{Shared, TaskContext, run_guarded};
use crate::error::TaskError;

/// Entry point of the task runtime.
///
/// One runtime drives one run. The run completes when its root task
/// completes; tasks spawned but never awaited are left running.
#[derive(Debug)]
pub struct TaskRuntime {
  shared: Arc<Shared>,
}

impl TaskRuntime {
  /// Create a runtime whose awaits are released by `cancel`.
  pub fn new(cancel: CancellationToken) -> Self {
    Self {
      shared: Arc::new(Shared::new(cancel)),
    }
  }

  /// Run `work` as the root task and return its result.
  ///
  /// The root body runs on the calling task rather than being spawned, so it
  /// may borrow from the caller.
  #[instrument(name = "main_task", skip_all, fields(task = %name))]
  pub async fn main_task<T, F, Fut>(&self, name: &str, work: F) -> Result<T, TaskError>
  where
    F: FnOnce(TaskContext) -> Fut,
    Fut: Future<Output = Result<T, TaskError>>,
  {
    let id = self.shared.next_id();
    let ctx = TaskContext::new(id, Arc::from(name), self.shared.clone());

    let result = run_guarded(name, work(ctx)).await;
    info!(task_id = %id, ok = result.is_ok(), "main_task_completed");
    result
  }

  /// The token that releases this runtime's suspended awaits.
  pub fn cancellation(&self) -> &CancellationToken {
    &self.shared.cancel
  }
}
