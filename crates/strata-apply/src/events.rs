//! Apply events and notifiers for observability.
//!
//! Events are emitted while a plan is applied so consumers can observe
//! progress, persist partial results or stream them to a UI.

use serde::{Deserialize, Serialize};
use strata_plan::ComponentInstanceAddr;
use tokio::sync::mpsc;

use crate::aggregate::RunStatus;
use crate::outcome::SkipReason;

/// Events emitted during an apply run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ApplyEvent {
  /// The plan passed validation and instance tasks are about to be spawned.
  ApplyStarted { apply_id: String, plan_id: String },

  /// An instance passed its prerequisites and admission; its action is running.
  InstanceStarted {
    apply_id: String,
    instance: ComponentInstanceAddr,
  },

  InstanceSucceeded {
    apply_id: String,
    instance: ComponentInstanceAddr,
  },

  InstanceFailed {
    apply_id: String,
    instance: ComponentInstanceAddr,
    error: String,
  },

  InstanceSkipped {
    apply_id: String,
    instance: ComponentInstanceAddr,
    reason: SkipReason,
  },

  /// Every instance is terminal.
  ApplyCompleted { apply_id: String, status: RunStatus },

  /// The run was aborted by a structural fault.
  ApplyFailed { apply_id: String, error: String },
}

/// Receives apply events.
///
/// The applier calls `notify` from instance tasks, so implementations must
/// not block.
pub trait ApplyNotifier: Send + Sync {
  fn notify(&self, event: ApplyEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ApplyNotifier for NoopNotifier {
  fn notify(&self, _event: ApplyEvent) {}
}

/// Sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never holds up instance tasks. Volume is at
  // most a few events per instance.
  sender: mpsc::UnboundedSender<ApplyEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ApplyEvent>) -> Self {
    Self { sender }
  }
}

impl ApplyNotifier for ChannelNotifier {
  fn notify(&self, event: ApplyEvent) {
    // The receiver may have been dropped.
    let _ = self.sender.send(event);
  }
}
