use async_trait::async_trait;
use serde_json::Value;
use strata_apply::{ChangeExecutor, ChangeResult, Diagnostic};
use strata_plan::{ChangeAction, ComponentInstanceAddr, PlannedChange};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Executor that reports each planned state as the applied state.
///
/// A planned state carrying `"fail": true` makes the action fail, which is
/// handy for rehearsing how a plan behaves when one instance breaks.
pub struct EchoExecutor;

#[async_trait]
impl ChangeExecutor for EchoExecutor {
  async fn apply_change(
    &self,
    instance: &ComponentInstanceAddr,
    change: &PlannedChange,
    _cancel: CancellationToken,
  ) -> ChangeResult {
    debug!(instance = %instance, action = ?change.action, "echo_apply");

    let fail = change
      .planned_state
      .as_ref()
      .and_then(|state| state.get("fail"))
      .and_then(Value::as_bool)
      .unwrap_or(false);
    if fail {
      return ChangeResult::failed(
        Diagnostic::error("Apply action failed")
          .with_detail(format!("planned state for {} requested a failure", instance)),
      );
    }

    match change.action {
      ChangeAction::Delete => ChangeResult::destroyed(),
      ChangeAction::NoOp => ChangeResult {
        new_state: change.prior_state.clone(),
        diagnostics: Vec::new(),
      },
      ChangeAction::Create | ChangeAction::Update => match &change.planned_state {
        Some(state) => ChangeResult::applied(state.clone()),
        None => ChangeResult::failed(Diagnostic::error("Planned change has no planned state")),
      },
    }
  }
}
