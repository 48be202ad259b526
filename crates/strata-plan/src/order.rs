//! Execution order resolution.
//!
//! The resolver never builds a linear order. It only answers, per component,
//! which other components must be fully terminal before any instance of it may
//! start. The scheduler evaluates readiness incrementally from that.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::addr::ComponentAddr;
use crate::error::PlanError;
use crate::plan::Plan;

/// Direction the dependency edges are honoured in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyDirection {
  /// Create/update: dependencies before dependents.
  #[default]
  Normal,
  /// Destroy: dependents before dependencies.
  Destroy,
}

impl From<strata_config::PlanMode> for ApplyDirection {
  fn from(mode: strata_config::PlanMode) -> Self {
    match mode {
      strata_config::PlanMode::Normal => Self::Normal,
      strata_config::PlanMode::Destroy => Self::Destroy,
    }
  }
}

/// Per-component prerequisite sets for one apply direction.
#[derive(Debug, Clone)]
pub struct ExecutionOrder {
  direction: ApplyDirection,
  prerequisites: BTreeMap<ComponentAddr, Vec<ComponentAddr>>,
}

impl ExecutionOrder {
  /// Resolve the prerequisites of every component in the plan.
  pub fn resolve(plan: &Plan) -> Result<Self, PlanError> {
    let graph = plan.graph();

    if let Some(path) = graph.detect_cycle() {
      return Err(PlanError::Cycle { path });
    }

    let prerequisites = graph
      .components()
      .map(|component| {
        let waits_on = match plan.direction {
          ApplyDirection::Normal => graph.upstream(component),
          ApplyDirection::Destroy => graph.downstream(component),
        };
        (component.clone(), waits_on.to_vec())
      })
      .collect();

    Ok(Self {
      direction: plan.direction,
      prerequisites,
    })
  }

  pub fn direction(&self) -> ApplyDirection {
    self.direction
  }

  /// Components whose instances must all be terminal before `component` starts.
  pub fn prerequisites(&self, component: &ComponentAddr) -> &[ComponentAddr] {
    self
      .prerequisites
      .get(component)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }
}
