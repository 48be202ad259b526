//! Strata Plan
//!
//! This crate provides the "locked" plan representation for strata.
//! A locked plan is the validated form of a `PlanDef` that is ready to be
//! applied.
//!
//! Key differences from `strata-config`:
//! - Addresses are parsed into typed, ordered values
//! - Dependencies are validated (declared targets, no cycles)
//! - Components with zero instances are kept so dependents can see them
//! - Instance ordering is derived per apply direction by [`ExecutionOrder`]

mod addr;
mod change;
mod error;
mod graph;
mod order;
mod plan;

pub use addr::{ComponentAddr, ComponentInstanceAddr, InstanceKey, StackAddr};
pub use change::{ChangeAction, PlannedChange};
pub use error::PlanError;
pub use graph::Graph;
pub use order::{ApplyDirection, ExecutionOrder};
pub use plan::{ComponentPlan, InstancePlan, Plan};
