//! Error types for apply runs.

use strata_plan::PlanError;
use strata_task::TaskError;
use thiserror::Error;

/// Faults that abort a whole apply run.
///
/// Failures of individual apply actions are never reported here; they are
/// recorded as instance outcomes.
#[derive(Debug, Error)]
pub enum ApplyError {
  /// The plan is structurally invalid, e.g. its dependencies form a cycle.
  #[error("invalid plan: {0}")]
  InvalidPlan(#[from] PlanError),

  /// Instance tasks ended up waiting on themselves.
  #[error("apply aborted, instance tasks deadlocked: {source}")]
  Deadlock {
    #[source]
    source: TaskError,
  },

  /// The root task failed for another reason.
  #[error("apply aborted: {source}")]
  Runtime {
    #[source]
    source: TaskError,
  },
}

impl From<TaskError> for ApplyError {
  fn from(source: TaskError) -> Self {
    if source.is_self_dependency() {
      Self::Deadlock { source }
    } else {
      Self::Runtime { source }
    }
  }
}
