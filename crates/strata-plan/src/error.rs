use thiserror::Error;

use crate::addr::ComponentAddr;

/// Errors raised while locking or ordering a plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
  #[error("invalid address '{address}': {reason}")]
  InvalidAddress { address: String, reason: String },

  #[error("component declared more than once: {component}")]
  DuplicateComponent { component: ComponentAddr },

  #[error("instance declared more than once: {instance}")]
  DuplicateInstance { instance: String },

  #[error("{component} mixes an unkeyed instance with keyed instances")]
  MixedInstanceKeys { component: ComponentAddr },

  #[error("{component} depends on undeclared component {dependency}")]
  UnknownDependency {
    component: ComponentAddr,
    dependency: ComponentAddr,
  },

  #[error("{component} depends on itself")]
  SelfDependency { component: ComponentAddr },

  #[error("dependency cycle between components: {}", join_path(.path))]
  Cycle { path: Vec<ComponentAddr> },
}

fn join_path(path: &[ComponentAddr]) -> String {
  path
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join(" -> ")
}
