//! Strata Config
//!
//! This crate contains the serializable plan definition types for strata.
//! These types describe a completed planning pass before it is validated and
//! locked into a `strata_plan::Plan` for the apply phase.
//!
//! Plans can be loaded from:
//! - JSON files (via the CLI with `strata apply plan.json`)
//! - Any other serde source produced by a planning collaborator

mod change;
mod component;
mod options;
mod plan;

pub use change::{ChangeAction, ChangeDef};
pub use component::{ComponentDef, InstanceDef, InstanceKeyDef};
pub use options::ApplyOptions;
pub use plan::{PlanDef, PlanMode};
