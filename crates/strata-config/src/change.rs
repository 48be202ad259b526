use serde::{Deserialize, Serialize};

/// The kind of change planned for one component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
  Create,
  Update,
  Delete,
  #[serde(alias = "noop")]
  NoOp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeDef {
  pub action: ChangeAction,
  /// State recorded for the instance before this apply, if any.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub prior_state: Option<serde_json::Value>,
  /// State the planning phase expects after the change. Absent for deletes.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub planned_state: Option<serde_json::Value>,
}
