use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strata_plan::ComponentInstanceAddr;
use tracing::warn;

use crate::diagnostics::Diagnostic;

/// Why an instance was never applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
  /// A prerequisite instance failed or was itself skipped.
  Prerequisite { cause: ComponentInstanceAddr },
  /// The run was cancelled before the instance started.
  Cancelled,
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Prerequisite { cause } => write!(f, "prerequisite {} did not succeed", cause),
      Self::Cancelled => f.write_str("apply was cancelled"),
    }
  }
}

/// Terminal result of one component instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstanceOutcome {
  Succeeded {
    new_state: Option<Value>,
    diagnostics: Vec<Diagnostic>,
  },
  Failed {
    diagnostics: Vec<Diagnostic>,
  },
  Skipped {
    reason: SkipReason,
  },
}

impl InstanceOutcome {
  pub fn is_succeeded(&self) -> bool {
    matches!(self, Self::Succeeded { .. })
  }

  pub fn is_failed(&self) -> bool {
    matches!(self, Self::Failed { .. })
  }

  pub fn is_skipped(&self) -> bool {
    matches!(self, Self::Skipped { .. })
  }

  pub fn diagnostics(&self) -> &[Diagnostic] {
    match self {
      Self::Succeeded { diagnostics, .. } | Self::Failed { diagnostics } => diagnostics,
      Self::Skipped { .. } => &[],
    }
  }
}

/// Outcomes of one run, keyed by instance.
///
/// Each instance's outcome is recorded once and never revised.
#[derive(Debug, Default)]
pub struct OutcomeLog {
  outcomes: Mutex<BTreeMap<ComponentInstanceAddr, InstanceOutcome>>,
}

impl OutcomeLog {
  /// Record `outcome` for `instance`. Returns false if one was already recorded.
  pub fn record(&self, instance: &ComponentInstanceAddr, outcome: InstanceOutcome) -> bool {
    let mut outcomes = self.outcomes.lock().unwrap_or_else(PoisonError::into_inner);
    if outcomes.contains_key(instance) {
      warn!(instance = %instance, "outcome_already_recorded");
      return false;
    }
    outcomes.insert(instance.clone(), outcome);
    true
  }

  pub fn get(&self, instance: &ComponentInstanceAddr) -> Option<InstanceOutcome> {
    let outcomes = self.outcomes.lock().unwrap_or_else(PoisonError::into_inner);
    outcomes.get(instance).cloned()
  }

  pub fn len(&self) -> usize {
    let outcomes = self.outcomes.lock().unwrap_or_else(PoisonError::into_inner);
    outcomes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn snapshot(&self) -> BTreeMap<ComponentInstanceAddr, InstanceOutcome> {
    let outcomes = self.outcomes.lock().unwrap_or_else(PoisonError::into_inner);
    outcomes.clone()
  }
}
