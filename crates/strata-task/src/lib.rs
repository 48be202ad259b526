//! Strata Task
//!
//! A small cooperative task runtime on top of tokio. Work is spawned as tasks
//! that can suspend on each other's results:
//!
//! - [`TaskRuntime::main_task`] drives a run with one distinguished root task
//! - [`TaskContext::spawn`] starts a concurrent task and returns a [`TaskHandle`]
//! - [`TaskContext::await_task`] suspends until the handle's task is terminal
//! - [`TaskContext::join`] does the same but is not released by cancellation
//!
//! Every await is recorded in a runtime-wide wait-for graph. An await that
//! would close a cycle back to the caller fails immediately with
//! [`TaskError::SelfDependency`] instead of hanging. Cancelling the run's
//! token releases all suspended awaits with [`TaskError::Cancelled`]; code
//! running outside an await is never interrupted.
//!
//! ```ignore
//! let runtime = TaskRuntime::new(cancel);
//! let total = runtime
//!   .main_task("root", |ctx| async move {
//!     let a = ctx.spawn("a", |_| async { Ok(1) });
//!     let b = ctx.spawn("b", |_| async { Ok(2) });
//!     Ok(ctx.await_task(&a).await? + ctx.await_task(&b).await?)
//!   })
//!   .await?;
//! ```

mod context;
mod error;
mod handle;
mod runtime;
mod waits;

pub use context::TaskContext;
pub use error::TaskError;
pub use handle::{TaskHandle, TaskId};
pub use runtime::TaskRuntime;
