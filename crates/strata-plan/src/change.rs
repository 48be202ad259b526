use serde::{Deserialize, Serialize};

pub use strata_config::ChangeAction;

/// The change planned for a single component instance.
///
/// Opaque to the scheduler: it is handed as-is to the change executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedChange {
  pub action: ChangeAction,
  pub prior_state: Option<serde_json::Value>,
  pub planned_state: Option<serde_json::Value>,
}

impl PlannedChange {
  pub fn new(action: ChangeAction) -> Self {
    Self {
      action,
      prior_state: None,
      planned_state: None,
    }
  }

  pub fn with_prior_state(mut self, state: serde_json::Value) -> Self {
    self.prior_state = Some(state);
    self
  }

  pub fn with_planned_state(mut self, state: serde_json::Value) -> Self {
    self.planned_state = Some(state);
    self
  }
}

impl From<strata_config::ChangeDef> for PlannedChange {
  fn from(def: strata_config::ChangeDef) -> Self {
    Self {
      action: def.action,
      prior_state: def.prior_state,
      planned_state: def.planned_state,
    }
  }
}
