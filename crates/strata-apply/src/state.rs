use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strata_plan::{ComponentAddr, ComponentInstanceAddr};

/// Recorded state of one component instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceState {
  pub value: Value,
  /// The component dependencies in force when this state was written.
  #[serde(default)]
  pub dependencies: Vec<ComponentAddr>,
}

/// Infrastructure state for every instance the stack manages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InfraState {
  instances: BTreeMap<ComponentInstanceAddr, InstanceState>,
}

impl InfraState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, instance: &ComponentInstanceAddr) -> Option<&InstanceState> {
    self.instances.get(instance)
  }

  pub fn insert(&mut self, instance: ComponentInstanceAddr, state: InstanceState) {
    self.instances.insert(instance, state);
  }

  pub fn remove(&mut self, instance: &ComponentInstanceAddr) -> Option<InstanceState> {
    self.instances.remove(instance)
  }

  pub fn contains(&self, instance: &ComponentInstanceAddr) -> bool {
    self.instances.contains_key(instance)
  }

  pub fn len(&self) -> usize {
    self.instances.len()
  }

  pub fn is_empty(&self) -> bool {
    self.instances.is_empty()
  }

  pub fn iter(&self) -> btree_map::Iter<'_, ComponentInstanceAddr, InstanceState> {
    self.instances.iter()
  }
}

impl FromIterator<(ComponentInstanceAddr, InstanceState)> for InfraState {
  fn from_iter<I: IntoIterator<Item = (ComponentInstanceAddr, InstanceState)>>(iter: I) -> Self {
    Self {
      instances: iter.into_iter().collect(),
    }
  }
}
