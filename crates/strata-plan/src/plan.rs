use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strata_config::PlanDef;

use crate::addr::{ComponentAddr, ComponentInstanceAddr, InstanceKey};
use crate::change::PlannedChange;
use crate::error::PlanError;
use crate::graph::Graph;
use crate::order::ApplyDirection;

/// A component as seen by the apply phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentPlan {
  pub addr: ComponentAddr,
  pub dependencies: BTreeSet<ComponentAddr>,
  /// Empty when the component expanded to no instances.
  pub instances: BTreeSet<InstanceKey>,
}

/// The change planned for one component instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstancePlan {
  pub addr: ComponentInstanceAddr,
  pub change: PlannedChange,
  /// The owning component's declared dependencies.
  pub dependencies: BTreeSet<ComponentAddr>,
}

/// A locked plan ready to be applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
  pub plan_id: String,
  pub direction: ApplyDirection,
  pub components: BTreeMap<ComponentAddr, ComponentPlan>,
  pub instances: BTreeMap<ComponentInstanceAddr, InstancePlan>,
}

impl Plan {
  /// Validate a plan definition and lock it.
  ///
  /// This process:
  /// 1. Parses every component and dependency address
  /// 2. Rejects duplicate components and instance keys
  /// 3. Checks that dependencies point at declared components
  /// 4. Rejects dependency cycles
  pub fn from_def(def: PlanDef) -> Result<Self, PlanError> {
    let mut components = BTreeMap::new();
    let mut instances = BTreeMap::new();

    for component_def in def.components {
      let addr: ComponentAddr = component_def.address.parse()?;
      if components.contains_key(&addr) {
        return Err(PlanError::DuplicateComponent { component: addr });
      }

      let mut dependencies = BTreeSet::new();
      for dep in &component_def.depends_on {
        let dep: ComponentAddr = dep.parse()?;
        if dep == addr {
          return Err(PlanError::SelfDependency { component: addr });
        }
        dependencies.insert(dep);
      }

      let mut keys = BTreeSet::new();
      for instance_def in component_def.instances {
        let key = InstanceKey::from(instance_def.key);
        let instance_addr = addr.instance(key.clone());
        if !keys.insert(key) {
          return Err(PlanError::DuplicateInstance {
            instance: instance_addr.to_string(),
          });
        }
        instances.insert(
          instance_addr.clone(),
          InstancePlan {
            addr: instance_addr,
            change: instance_def.change.into(),
            dependencies: dependencies.clone(),
          },
        );
      }

      if keys.len() > 1 && keys.contains(&InstanceKey::NoKey) {
        return Err(PlanError::MixedInstanceKeys { component: addr });
      }

      components.insert(
        addr.clone(),
        ComponentPlan {
          addr,
          dependencies,
          instances: keys,
        },
      );
    }

    for component in components.values() {
      if let Some(missing) = component
        .dependencies
        .iter()
        .find(|dep| !components.contains_key(*dep))
      {
        return Err(PlanError::UnknownDependency {
          component: component.addr.clone(),
          dependency: missing.clone(),
        });
      }
    }

    let plan = Self {
      plan_id: def.plan_id,
      direction: def.mode.into(),
      components,
      instances,
    };

    if let Some(path) = plan.graph().detect_cycle() {
      return Err(PlanError::Cycle { path });
    }

    Ok(plan)
  }

  /// Build the component graph for traversal.
  pub fn graph(&self) -> Graph {
    Graph::new(self.components.keys(), &self.edges())
  }

  /// Dependency edges as `(dependency, dependent)` pairs.
  pub fn edges(&self) -> Vec<(ComponentAddr, ComponentAddr)> {
    self
      .components
      .values()
      .flat_map(|component| {
        component
          .dependencies
          .iter()
          .map(|dep| (dep.clone(), component.addr.clone()))
      })
      .collect()
  }

  pub fn instance(&self, addr: &ComponentInstanceAddr) -> Option<&InstancePlan> {
    self.instances.get(addr)
  }

  /// The dependency set recorded for an instance.
  pub fn dependencies_of(&self, addr: &ComponentInstanceAddr) -> Option<&BTreeSet<ComponentAddr>> {
    self.instances.get(addr).map(|instance| &instance.dependencies)
  }

  /// Instances of a component, in key order.
  pub fn instances_of<'a>(
    &'a self,
    component: &'a ComponentAddr,
  ) -> impl Iterator<Item = ComponentInstanceAddr> + 'a {
    self
      .components
      .get(component)
      .into_iter()
      .flat_map(move |plan| plan.instances.iter().map(move |key| component.instance(key.clone())))
  }
}
