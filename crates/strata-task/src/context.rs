use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::TaskError;
use crate::handle::{ResultSlot, TaskHandle, TaskId};
use crate::waits::WaitGraph;

/// State shared by every task of one runtime.
#[derive(Debug)]
pub(crate) struct Shared {
  next_id: AtomicU64,
  pub(crate) cancel: CancellationToken,
  waits: WaitGraph,
}

impl Shared {
  pub(crate) fn new(cancel: CancellationToken) -> Self {
    Self {
      next_id: AtomicU64::new(0),
      cancel,
      waits: WaitGraph::default(),
    }
  }

  pub(crate) fn next_id(&self) -> TaskId {
    TaskId(self.next_id.fetch_add(1, Ordering::Relaxed))
  }
}

/// The view a running task has of the runtime.
///
/// Passed to every task body. Use it to spawn further tasks and to await
/// other tasks' results.
#[derive(Debug, Clone)]
pub struct TaskContext {
  id: TaskId,
  name: Arc<str>,
  shared: Arc<Shared>,
}

impl TaskContext {
  pub(crate) fn new(id: TaskId, name: Arc<str>, shared: Arc<Shared>) -> Self {
    Self { id, name, shared }
  }

  pub fn id(&self) -> TaskId {
    self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// The run's cancellation token.
  pub fn cancellation(&self) -> &CancellationToken {
    &self.shared.cancel
  }

  pub fn is_cancelled(&self) -> bool {
    self.shared.cancel.is_cancelled()
  }

  /// Spawn `work` as a concurrent task.
  ///
  /// The task starts immediately on the tokio runtime. If nobody awaits the
  /// returned handle the task still runs to completion.
  pub fn spawn<T, F, Fut>(&self, name: impl Into<String>, work: F) -> TaskHandle<T>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce(TaskContext) -> Fut,
    Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
  {
    let id = self.shared.next_id();
    let name: Arc<str> = Arc::from(name.into());
    let (sender, receiver) = watch::channel::<ResultSlot<T>>(None);

    debug!(task_id = %id, task = %name, parent = %self.name, "task_spawned");

    let body = work(TaskContext::new(id, name.clone(), self.shared.clone()));
    let task_name = name.clone();
    tokio::spawn(async move {
      let result = run_guarded(&task_name, body).await;
      sender.send_replace(Some(result));
    });

    TaskHandle {
      id,
      name,
      result: receiver,
    }
  }

  /// Suspend until `handle`'s task is terminal and return its result.
  ///
  /// Fails fast with [`TaskError::SelfDependency`] when the target is, directly
  /// or transitively, waiting on this task. Fails with
  /// [`TaskError::Cancelled`] when the run is cancelled before the target
  /// finishes.
  pub async fn await_task<T>(&self, handle: &TaskHandle<T>) -> Result<T, TaskError>
  where
    T: Clone + Send + Sync,
  {
    self.wait_for(handle, true).await
  }

  /// Like [`await_task`](Self::await_task), but not released by cancellation.
  ///
  /// For a supervising task that must see every task it spawned reach a
  /// terminal state before it returns.
  pub async fn join<T>(&self, handle: &TaskHandle<T>) -> Result<T, TaskError>
  where
    T: Clone + Send + Sync,
  {
    self.wait_for(handle, false).await
  }

  async fn wait_for<T>(&self, handle: &TaskHandle<T>, cancellable: bool) -> Result<T, TaskError>
  where
    T: Clone + Send + Sync,
  {
    let token = self
      .shared
      .waits
      .begin(self.id, &self.name, handle.id, &handle.name)
      .inspect_err(|e| {
        error!(task = %self.name, target = %handle.name, error = %e, "self_dependency");
      })?;
    let _guard = WaitGuard {
      shared: &self.shared,
      waiter: self.id,
      token,
    };

    let mut receiver = handle.result.clone();
    loop {
      let current = receiver.borrow_and_update().clone();
      if let Some(result) = current {
        return result;
      }

      tokio::select! {
        changed = receiver.changed() => {
          if changed.is_err() {
            let last = receiver.borrow().clone();
            return last.unwrap_or_else(|| {
              Err(TaskError::Abandoned {
                task: handle.name.to_string(),
              })
            });
          }
        }
        _ = self.shared.cancel.cancelled(), if cancellable => {
          debug!(task = %self.name, target = %handle.name, "await_cancelled");
          return Err(TaskError::Cancelled);
        }
      }
    }
  }
}

/// Removes a wait edge when the await completes or its future is dropped.
struct WaitGuard<'a> {
  shared: &'a Shared,
  waiter: TaskId,
  token: u64,
}

impl Drop for WaitGuard<'_> {
  fn drop(&mut self) {
    self.shared.waits.end(self.waiter, self.token);
  }
}

/// Run a task body, turning a panic into a [`TaskError::Panicked`].
pub(crate) async fn run_guarded<T, Fut>(name: &str, body: Fut) -> Result<T, TaskError>
where
  Fut: Future<Output = Result<T, TaskError>>,
{
  match AssertUnwindSafe(body).catch_unwind().await {
    Ok(result) => result,
    Err(panic) => {
      let message = panic_message(panic.as_ref());
      error!(task = %name, panic = %message, "task_panicked");
      Err(TaskError::Panicked {
        task: name.to_string(),
        message,
      })
    }
  }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  if let Some(s) = panic.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = panic.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic payload".to_string()
  }
}
