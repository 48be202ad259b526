//! Strata Apply
//!
//! This crate applies a locked [`Plan`](strata_plan::Plan). It provides the
//! [`Applier`] which handles:
//! - Spawning one task per component instance, all up front
//! - Holding each instance until every instance of its prerequisite
//!   components is terminal (reversed for destroy plans)
//! - Skipping dependents of failed or skipped instances
//! - Aggregating outcomes into the new infrastructure state and diagnostics
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Applier                             │
//! │  - execute(plan, prior_state, cancel) → ApplyResult         │
//! │  - root task spawns and joins every instance task           │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    instance tasks                           │
//! │  - await prerequisite groups via strata-task                │
//! │  - admission gate, then ChangeExecutor::apply_change        │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        aggregate                            │
//! │  - merges state deltas, diagnostics and run status          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod aggregate;
mod applier;
mod diagnostics;
mod error;
mod events;
mod executor;
mod outcome;
mod state;

pub use aggregate::{Aggregate, RunStatus, aggregate};
pub use applier::{ApplyConfig, ApplyResult, Applier};
pub use diagnostics::{Diagnostic, Severity};
pub use error::ApplyError;
pub use events::{ApplyEvent, ApplyNotifier, ChannelNotifier, NoopNotifier};
pub use executor::{ChangeExecutor, ChangeResult};
pub use outcome::{InstanceOutcome, OutcomeLog, SkipReason};
pub use state::{InfraState, InstanceState};
