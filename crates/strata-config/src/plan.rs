use serde::{Deserialize, Serialize};

use crate::component::ComponentDef;

/// Planning mode the plan was produced with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
  #[default]
  Normal,
  Destroy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDef {
  pub plan_id: String,
  #[serde(default)]
  pub mode: PlanMode,
  pub components: Vec<ComponentDef>,
}
