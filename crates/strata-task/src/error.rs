//! Task runtime error types.

use thiserror::Error;

/// Terminal failure of a task, delivered to every task awaiting it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
  /// The run was cancelled while the task was suspended.
  #[error("task cancelled")]
  Cancelled,

  /// An await would have waited on itself, directly or through other tasks.
  ///
  /// `chain` lists task names from the awaiting task around the cycle and
  /// back to it.
  #[error("self-dependency detected: {}", .chain.join(" -> "))]
  SelfDependency { chain: Vec<String> },

  /// The task body panicked.
  #[error("task '{task}' panicked: {message}")]
  Panicked { task: String, message: String },

  /// The task was dropped before producing a result.
  #[error("task '{task}' ended without a result")]
  Abandoned { task: String },

  /// The task body reported a failure.
  #[error("{message}")]
  Failed { message: String },
}

impl TaskError {
  /// Create a failure reported by a task body.
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed {
      message: message.into(),
    }
  }

  /// Whether this error indicates a defect in how tasks wait on each other.
  pub fn is_self_dependency(&self) -> bool {
    matches!(self, Self::SelfDependency { .. })
  }
}
