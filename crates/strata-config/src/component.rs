use serde::{Deserialize, Serialize};

use crate::change::ChangeDef;

/// An instance key as written in a plan file: an integer or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstanceKeyDef {
  Int(i64),
  Str(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDef {
  /// Absent for components that are not repeated.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub key: Option<InstanceKeyDef>,
  pub change: ChangeDef,
}

/// A component together with its planned instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDef {
  /// Absolute component address, e.g. `component.a` or `stack.net.component.vpc`.
  pub address: String,
  /// Addresses of the components this one depends on.
  #[serde(default)]
  pub depends_on: Vec<String>,
  /// May be empty, e.g. when a `for_each` expression produced no elements.
  #[serde(default)]
  pub instances: Vec<InstanceDef>,
}
