//! The seam through which apply actions reach the outside world.

use async_trait::async_trait;
use serde_json::Value;
use strata_plan::{ComponentInstanceAddr, PlannedChange};
use tokio_util::sync::CancellationToken;

use crate::diagnostics::Diagnostic;

/// What one apply action produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeResult {
  /// The instance's new state. `None` after a delete means the instance no
  /// longer exists; for any other action the recorded state is left as is.
  pub new_state: Option<Value>,
  pub diagnostics: Vec<Diagnostic>,
}

impl ChangeResult {
  pub fn applied(new_state: Value) -> Self {
    Self {
      new_state: Some(new_state),
      diagnostics: Vec::new(),
    }
  }

  pub fn destroyed() -> Self {
    Self::default()
  }

  pub fn failed(diagnostic: Diagnostic) -> Self {
    Self {
      new_state: None,
      diagnostics: vec![diagnostic],
    }
  }

  pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
    self.diagnostics.push(diagnostic);
    self
  }

  /// An action failed if it reported any error diagnostic.
  pub fn has_errors(&self) -> bool {
    self.diagnostics.iter().any(Diagnostic::is_error)
  }
}

/// Performs the planned change for a single component instance.
///
/// Called at most once per instance per run, only after every prerequisite
/// instance has succeeded. Implementations report failure through error
/// diagnostics rather than by returning an error. The token is the run's
/// cancellation token; honouring it is optional.
#[async_trait]
pub trait ChangeExecutor: Send + Sync {
  async fn apply_change(
    &self,
    instance: &ComponentInstanceAddr,
    change: &PlannedChange,
    cancel: CancellationToken,
  ) -> ChangeResult;
}
