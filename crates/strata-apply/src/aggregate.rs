//! Folding instance outcomes into the result of a run.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strata_plan::{ChangeAction, ComponentInstanceAddr, Plan};

use crate::diagnostics::Diagnostic;
use crate::outcome::{InstanceOutcome, SkipReason};
use crate::state::{InfraState, InstanceState};

/// Overall status of an apply run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
  Succeeded,
  Failed {
    failed: Vec<ComponentInstanceAddr>,
    skipped: Vec<ComponentInstanceAddr>,
  },
  /// The run was cancelled before every instance could be applied.
  Cancelled {
    failed: Vec<ComponentInstanceAddr>,
    skipped: Vec<ComponentInstanceAddr>,
  },
}

impl RunStatus {
  pub fn is_success(&self) -> bool {
    matches!(self, Self::Succeeded)
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self, Self::Cancelled { .. })
  }

  pub fn failed(&self) -> &[ComponentInstanceAddr] {
    match self {
      Self::Succeeded => &[],
      Self::Failed { failed, .. } | Self::Cancelled { failed, .. } => failed,
    }
  }

  pub fn skipped(&self) -> &[ComponentInstanceAddr] {
    match self {
      Self::Succeeded => &[],
      Self::Failed { skipped, .. } | Self::Cancelled { skipped, .. } => skipped,
    }
  }
}

impl fmt::Display for RunStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fn write_group(
      f: &mut fmt::Formatter<'_>,
      label: &str,
      instances: &[ComponentInstanceAddr],
    ) -> fmt::Result {
      write!(f, "{} {}", instances.len(), label)?;
      if !instances.is_empty() {
        let names: Vec<String> = instances.iter().map(ToString::to_string).collect();
        write!(f, " ({})", names.join(", "))?;
      }
      Ok(())
    }

    let (verdict, failed, skipped) = match self {
      Self::Succeeded => return f.write_str("apply succeeded"),
      Self::Failed { failed, skipped } => ("failed", failed, skipped),
      Self::Cancelled { failed, skipped } => ("cancelled", failed, skipped),
    };
    write!(f, "apply {}: ", verdict)?;
    write_group(f, "failed", failed)?;
    f.write_str(", ")?;
    write_group(f, "skipped", skipped)
  }
}

/// Everything [`aggregate`] derives from a run's outcomes.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
  pub state: InfraState,
  pub diagnostics: Vec<Diagnostic>,
  pub status: RunStatus,
}

/// Merge per-instance outcomes into the post-apply state, diagnostics and
/// run status.
///
/// State starts from `prior_state`. A succeeded instance writes its new state.
/// A succeeded delete that left no state removes the entry; any other action
/// without a new state keeps the prior one. Failed and skipped
/// instances keep whatever state they had before. Every diagnostic is
/// attributed to the instance that produced it, and each skipped instance
/// gets a warning naming the reason unless `surface_skipped` is false.
///
/// Pure: calling it twice with the same inputs yields the same result.
pub fn aggregate(
  plan: &Plan,
  prior_state: &InfraState,
  outcomes: &BTreeMap<ComponentInstanceAddr, InstanceOutcome>,
  surface_skipped: bool,
) -> Aggregate {
  let mut state = prior_state.clone();
  let mut diagnostics = Vec::new();
  let mut failed = Vec::new();
  let mut skipped = Vec::new();
  let mut cancelled = false;

  for (addr, instance) in &plan.instances {
    let Some(outcome) = outcomes.get(addr) else {
      diagnostics.push(
        Diagnostic::error("Component instance has no outcome")
          .with_detail(format!("{} finished the run without a recorded outcome", addr))
          .for_instance(addr),
      );
      failed.push(addr.clone());
      continue;
    };

    diagnostics.extend(
      outcome
        .diagnostics()
        .iter()
        .cloned()
        .map(|diagnostic| diagnostic.for_instance(addr)),
    );

    match outcome {
      InstanceOutcome::Succeeded {
        new_state: Some(value),
        ..
      } => {
        state.insert(
          addr.clone(),
          InstanceState {
            value: value.clone(),
            dependencies: instance.dependencies.iter().cloned().collect(),
          },
        );
      }
      InstanceOutcome::Succeeded {
        new_state: None, ..
      } => {
        if instance.change.action == ChangeAction::Delete {
          state.remove(addr);
        }
      }
      InstanceOutcome::Failed { .. } => failed.push(addr.clone()),
      InstanceOutcome::Skipped { reason } => {
        cancelled |= *reason == SkipReason::Cancelled;
        if surface_skipped {
          diagnostics.push(
            Diagnostic::warning("Component instance skipped")
              .with_detail(format!("{} was not applied: {}", addr, reason))
              .for_instance(addr),
          );
        }
        skipped.push(addr.clone());
      }
    }
  }

  let status = if cancelled {
    RunStatus::Cancelled { failed, skipped }
  } else if failed.is_empty() && skipped.is_empty() {
    RunStatus::Succeeded
  } else {
    RunStatus::Failed { failed, skipped }
  };

  Aggregate {
    state,
    diagnostics,
    status,
  }
}
