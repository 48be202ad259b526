//! Integration tests for the task runtime.

use std::sync::Arc;
use std::time::Duration;

use strata_task::{TaskError, TaskHandle, TaskRuntime};
use tokio::sync::{Barrier, oneshot};
use tokio_util::sync::CancellationToken;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_spawn_and_await() {
  let runtime = TaskRuntime::new(CancellationToken::new());

  let total = runtime
    .main_task("root", |ctx| async move {
      let a = ctx.spawn("a", |_| async { Ok(20) });
      let b = ctx.spawn("b", |_| async { Ok(22) });
      Ok(ctx.await_task(&a).await? + ctx.await_task(&b).await?)
    })
    .await;

  assert_eq!(total, Ok(42));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failure_propagates_to_awaiter() {
  let runtime = TaskRuntime::new(CancellationToken::new());

  let result: Result<u32, TaskError> = runtime
    .main_task("root", |ctx| async move {
      let failing = ctx.spawn("failing", |_| async {
        Err::<u32, _>(TaskError::failed("boom"))
      });
      let middle = ctx.spawn("middle", {
        let failing = failing.clone();
        move |ctx| async move { ctx.await_task(&failing).await.map(|v| v + 1) }
      });
      ctx.await_task(&middle).await
    })
    .await;

  assert_eq!(result, Err(TaskError::failed("boom")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_await_finished_task_repeatedly() {
  let runtime = TaskRuntime::new(CancellationToken::new());

  let result = runtime
    .main_task("root", |ctx| async move {
      let value = ctx.spawn("value", |_| async { Ok("done".to_string()) });
      let first = ctx.await_task(&value).await?;
      let second = ctx.await_task(&value.clone()).await?;
      assert!(value.is_finished());
      assert_eq!(value.try_result(), Some(Ok("done".to_string())));
      Ok(format!("{first}/{second}"))
    })
    .await;

  assert_eq!(result, Ok("done/done".to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_direct_self_await_fails_fast() {
  let runtime = TaskRuntime::new(CancellationToken::new());

  let result = tokio::time::timeout(
    TEST_TIMEOUT,
    runtime.main_task("root", |ctx| async move {
      let (tx, rx) = oneshot::channel::<TaskHandle<()>>();
      let selfish = ctx.spawn("selfish", |ctx| async move {
        let me = rx.await.map_err(|_| TaskError::failed("handle not delivered"))?;
        ctx.await_task(&me).await
      });
      let _ = tx.send(selfish.clone());
      ctx.await_task(&selfish).await
    }),
  )
  .await
  .expect("self await must not hang");

  assert_eq!(
    result,
    Err(TaskError::SelfDependency {
      chain: vec!["selfish".to_string(), "selfish".to_string()]
    })
  );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mutual_await_fails_fast() {
  let runtime = TaskRuntime::new(CancellationToken::new());

  let (first, second) = tokio::time::timeout(
    TEST_TIMEOUT,
    runtime.main_task("root", |ctx| async move {
      let (tx_a, rx_a) = oneshot::channel::<TaskHandle<()>>();
      let (tx_b, rx_b) = oneshot::channel::<TaskHandle<()>>();

      let a = ctx.spawn("a", |ctx| async move {
        let b = rx_a.await.map_err(|_| TaskError::failed("handle not delivered"))?;
        ctx.await_task(&b).await
      });
      let b = ctx.spawn("b", |ctx| async move {
        let a = rx_b.await.map_err(|_| TaskError::failed("handle not delivered"))?;
        ctx.await_task(&a).await
      });
      let _ = tx_a.send(b.clone());
      let _ = tx_b.send(a.clone());

      let first = ctx.await_task(&a).await;
      let second = ctx.await_task(&b).await;
      Ok((first, second))
    }),
  )
  .await
  .expect("mutual await must not hang")
  .expect("root should complete");

  // Whichever task closed the cycle detected it; the other one inherited the
  // failure through its own await.
  assert!(first.unwrap_err().is_self_dependency());
  assert!(second.unwrap_err().is_self_dependency());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancellation_releases_suspended_awaits() {
  let cancel = CancellationToken::new();
  let runtime = TaskRuntime::new(cancel.clone());

  let canceller = {
    let cancel = cancel.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(50)).await;
      cancel.cancel();
    })
  };

  let result: Result<(), TaskError> = tokio::time::timeout(
    TEST_TIMEOUT,
    runtime.main_task("root", |ctx| async move {
      let (_never_tx, never_rx) = oneshot::channel::<()>();
      let stuck = ctx.spawn("stuck", |_| async move {
        let _ = never_rx.await;
        Ok(())
      });
      ctx.await_task(&stuck).await
    }),
  )
  .await
  .expect("cancellation must release the await");

  canceller.await.unwrap();
  assert_eq!(result, Err(TaskError::Cancelled));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancellation_does_not_interrupt_running_work() {
  let cancel = CancellationToken::new();
  let runtime = TaskRuntime::new(cancel.clone());
  let (done_tx, done_rx) = oneshot::channel::<()>();

  let result = runtime
    .main_task("root", |ctx| async move {
      let worker = ctx.spawn("worker", |_| async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        let _ = done_tx.send(());
        Ok(7)
      });
      cancel.cancel();
      // Already cancelled before the result exists.
      let awaited = ctx.await_task(&worker).await;
      Ok((awaited, worker))
    })
    .await
    .expect("root should complete");

  assert_eq!(result.0, Err(TaskError::Cancelled));

  // The worker keeps running and still publishes its result.
  tokio::time::timeout(TEST_TIMEOUT, done_rx)
    .await
    .expect("worker should finish")
    .expect("worker should signal");
  tokio::time::timeout(TEST_TIMEOUT, async {
    while !result.1.is_finished() {
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
  })
  .await
  .expect("worker result should be published");
  assert_eq!(result.1.try_result(), Some(Ok(7)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_panic_becomes_task_error() {
  let runtime = TaskRuntime::new(CancellationToken::new());

  let result: Result<(), TaskError> = runtime
    .main_task("root", |ctx| async move {
      let bad = ctx.spawn("bad", |_| async {
        if true {
          panic!("kaboom");
        }
        Ok(())
      });
      ctx.await_task(&bad).await
    })
    .await;

  assert_eq!(
    result,
    Err(TaskError::Panicked {
      task: "bad".to_string(),
      message: "kaboom".to_string(),
    })
  );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_tasks_run_concurrently() {
  let runtime = TaskRuntime::new(CancellationToken::new());
  let barrier = Arc::new(Barrier::new(2));

  // Each task blocks on the barrier until the other one reaches it, so this
  // only completes if both are in flight at the same time.
  let result = tokio::time::timeout(
    TEST_TIMEOUT,
    runtime.main_task("root", |ctx| async move {
      let left = ctx.spawn("left", {
        let barrier = barrier.clone();
        move |_| async move {
          barrier.wait().await;
          Ok(1)
        }
      });
      let right = ctx.spawn("right", {
        let barrier = barrier.clone();
        move |_| async move {
          barrier.wait().await;
          Ok(2)
        }
      });
      Ok(ctx.await_task(&left).await? + ctx.await_task(&right).await?)
    }),
  )
  .await
  .expect("independent tasks should not serialize");

  assert_eq!(result, Ok(3));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unawaited_tasks_are_not_cancelled() {
  let runtime = TaskRuntime::new(CancellationToken::new());
  let (tx, rx) = oneshot::channel::<&'static str>();

  let result = runtime
    .main_task("root", |ctx| async move {
      ctx.spawn("background", |_| async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = tx.send("finished");
        Ok(())
      });
      Ok("root done")
    })
    .await;

  assert_eq!(result, Ok("root done"));
  let message = tokio::time::timeout(TEST_TIMEOUT, rx)
    .await
    .expect("background task should keep running")
    .expect("background task should report");
  assert_eq!(message, "finished");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_join_outlives_cancellation() {
  let cancel = CancellationToken::new();
  let runtime = TaskRuntime::new(cancel.clone());

  let result = tokio::time::timeout(
    TEST_TIMEOUT,
    runtime.main_task("root", |ctx| async move {
      let worker = ctx.spawn("worker", |_| async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        Ok(11)
      });
      cancel.cancel();
      ctx.join(&worker).await
    }),
  )
  .await
  .expect("join should return once the worker finishes");

  assert_eq!(result, Ok(11));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_handles_expose_identity() {
  let runtime = TaskRuntime::new(CancellationToken::new());
  assert!(!runtime.cancellation().is_cancelled());

  let (first, second) = runtime
    .main_task("root", |ctx| async move {
      let first = ctx.spawn("first", |_| async { Ok(()) });
      let second = ctx.spawn("second", |_| async { Ok(()) });
      ctx.await_task(&first).await?;
      ctx.await_task(&second).await?;
      Ok((first, second))
    })
    .await
    .expect("root should complete");

  assert_eq!(first.name(), "first");
  assert_eq!(second.name(), "second");
  assert_ne!(first.id(), second.id());
  assert_eq!(first.clone().id(), first.id());
}
