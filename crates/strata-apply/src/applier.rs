//! The apply scheduler.
//!
//! The `Applier` spawns one task per component instance up front. Each task
//! waits on every instance of its prerequisite components and then runs its
//! apply action, so independent instances proceed concurrently and the order
//! between dependent ones is enforced by the tasks themselves.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use strata_config::ApplyOptions;
use strata_plan::{ComponentAddr, ComponentInstanceAddr, ExecutionOrder, Plan, PlannedChange};
use strata_task::{TaskContext, TaskError, TaskHandle, TaskRuntime};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::aggregate::{Aggregate, RunStatus, aggregate};
use crate::diagnostics::Diagnostic;
use crate::error::ApplyError;
use crate::events::{ApplyEvent, ApplyNotifier, NoopNotifier};
use crate::executor::ChangeExecutor;
use crate::outcome::{InstanceOutcome, OutcomeLog, SkipReason};
use crate::state::InfraState;

/// Configuration for the applier.
#[derive(Debug, Clone)]
pub struct ApplyConfig {
  /// Upper bound on apply actions in flight at once. `None` means unbounded;
  /// values below 1 are treated as 1.
  pub max_concurrency: Option<usize>,
  /// Emit a warning diagnostic for each skipped instance.
  pub surface_skipped: bool,
}

impl Default for ApplyConfig {
  fn default() -> Self {
    Self {
      max_concurrency: None,
      surface_skipped: true,
    }
  }
}

impl From<&ApplyOptions> for ApplyConfig {
  fn from(options: &ApplyOptions) -> Self {
    Self {
      max_concurrency: options.max_concurrency,
      surface_skipped: options.surface_skipped,
    }
  }
}

/// Result of a complete apply run.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyResult {
  pub apply_id: String,
  pub plan_id: String,
  pub status: RunStatus,
  pub state: InfraState,
  pub diagnostics: Vec<Diagnostic>,
  pub outcomes: BTreeMap<ComponentInstanceAddr, InstanceOutcome>,
}

/// Applies locked plans.
///
/// Generic over `N: ApplyNotifier` so callers can observe progress. Use
/// `Applier::new()` to discard events or `Applier::with_notifier()` to
/// receive them.
pub struct Applier<N: ApplyNotifier = NoopNotifier> {
  executor: Arc<dyn ChangeExecutor>,
  config: ApplyConfig,
  notifier: Arc<N>,
}

impl Applier<NoopNotifier> {
  pub fn new(executor: Arc<dyn ChangeExecutor>, config: ApplyConfig) -> Self {
    Self::with_notifier(executor, config, NoopNotifier)
  }
}

impl<N: ApplyNotifier + 'static> Applier<N> {
  pub fn with_notifier(executor: Arc<dyn ChangeExecutor>, config: ApplyConfig, notifier: N) -> Self {
    Self {
      executor,
      config,
      notifier: Arc::new(notifier),
    }
  }

  pub fn config(&self) -> &ApplyConfig {
    &self.config
  }

  /// Apply `plan` on top of `prior_state`.
  ///
  /// Returns once every instance is terminal. Failed actions and skipped
  /// instances are reported in the result, not as errors; an `Err` means the
  /// run itself was rejected or aborted. Cancelling `cancel` skips every
  /// instance whose action has not started yet and lets running actions
  /// finish.
  #[instrument(name = "apply", skip_all, fields(plan_id = %plan.plan_id, direction = ?plan.direction))]
  pub async fn execute(
    &self,
    plan: &Plan,
    prior_state: InfraState,
    cancel: CancellationToken,
  ) -> Result<ApplyResult, ApplyError> {
    let apply_id = uuid::Uuid::new_v4().to_string();

    let order = ExecutionOrder::resolve(plan).inspect_err(|e| {
      error!(apply_id = %apply_id, error = %e, "plan_rejected");
    })?;

    info!(
      apply_id = %apply_id,
      components = plan.components.len(),
      instances = plan.instances.len(),
      "apply_started"
    );
    self.notifier.notify(ApplyEvent::ApplyStarted {
      apply_id: apply_id.clone(),
      plan_id: plan.plan_id.clone(),
    });

    let log = Arc::new(OutcomeLog::default());
    let run = ApplyRun {
      apply_id: Arc::from(apply_id.as_str()),
      executor: self.executor.clone(),
      notifier: self.notifier.clone(),
      admission: self
        .config
        .max_concurrency
        .map(|limit| Arc::new(Semaphore::new(limit.max(1)))),
      log: log.clone(),
    };

    let runtime = TaskRuntime::new(cancel);
    if let Err(source) = runtime
      .main_task("apply", |ctx| run.drive(ctx, plan, &order))
      .await
    {
      let err = ApplyError::from(source);
      error!(apply_id = %apply_id, error = %err, "apply_failed");
      self.notifier.notify(ApplyEvent::ApplyFailed {
        apply_id: apply_id.clone(),
        error: err.to_string(),
      });
      return Err(err);
    }

    let outcomes = log.snapshot();
    let Aggregate {
      state,
      diagnostics,
      status,
    } = aggregate(plan, &prior_state, &outcomes, self.config.surface_skipped);

    info!(
      apply_id = %apply_id,
      status = %status,
      diagnostics = diagnostics.len(),
      "apply_completed"
    );
    self.notifier.notify(ApplyEvent::ApplyCompleted {
      apply_id: apply_id.clone(),
      status: status.clone(),
    });

    Ok(ApplyResult {
      apply_id,
      plan_id: plan.plan_id.clone(),
      status,
      state,
      diagnostics,
      outcomes,
    })
  }
}

type InstanceTask = (ComponentInstanceAddr, TaskHandle<InstanceOutcome>);

/// Everything an instance task shares with the rest of its run.
struct ApplyRun<N> {
  apply_id: Arc<str>,
  executor: Arc<dyn ChangeExecutor>,
  notifier: Arc<N>,
  admission: Option<Arc<Semaphore>>,
  log: Arc<OutcomeLog>,
}

impl<N> Clone for ApplyRun<N> {
  fn clone(&self) -> Self {
    Self {
      apply_id: self.apply_id.clone(),
      executor: self.executor.clone(),
      notifier: self.notifier.clone(),
      admission: self.admission.clone(),
      log: self.log.clone(),
    }
  }
}

/// The work handed to one instance task.
struct InstanceJob {
  addr: ComponentInstanceAddr,
  change: PlannedChange,
  /// Every instance of every prerequisite component, in address order.
  prerequisites: Vec<InstanceTask>,
}

impl<N: ApplyNotifier + 'static> ApplyRun<N> {
  /// Body of the root task: spawn every instance task, then join them all.
  async fn drive(
    &self,
    ctx: TaskContext,
    plan: &Plan,
    order: &ExecutionOrder,
  ) -> Result<(), TaskError> {
    let mut spawner = Spawner {
      run: self,
      ctx: &ctx,
      plan,
      order,
      spawned: BTreeMap::new(),
    };
    for component in plan.components.keys() {
      spawner.spawn_component(component);
    }
    let tasks: Vec<InstanceTask> = spawner.spawned.into_values().flatten().collect();
    debug!(apply_id = %self.apply_id, tasks = tasks.len(), "instance_tasks_spawned");

    // Joined rather than awaited: a cancelled run still waits for actions
    // that already started.
    let mut fault = None;
    for (addr, handle) in &tasks {
      match ctx.join(handle).await {
        Ok(_) => {}
        Err(e) if e.is_self_dependency() => {
          fault.get_or_insert(e);
        }
        Err(e) => self.record_crash(addr, &e),
      }
    }

    match fault {
      Some(e) => Err(e),
      None => Ok(()),
    }
  }

  #[instrument(name = "apply_instance", skip_all, fields(instance = %job.addr))]
  async fn apply_instance(
    self,
    ctx: TaskContext,
    job: InstanceJob,
  ) -> Result<InstanceOutcome, TaskError> {
    let InstanceJob {
      addr,
      change,
      prerequisites,
    } = job;

    for (prerequisite, handle) in &prerequisites {
      let reason = match ctx.await_task(handle).await {
        Ok(outcome) if outcome.is_succeeded() => continue,
        Ok(_) => SkipReason::Prerequisite {
          cause: prerequisite.clone(),
        },
        Err(TaskError::Cancelled) => SkipReason::Cancelled,
        Err(e) if e.is_self_dependency() => return Err(e),
        Err(e) => {
          warn!(prerequisite = %prerequisite, error = %e, "prerequisite_crashed");
          SkipReason::Prerequisite {
            cause: prerequisite.clone(),
          }
        }
      };
      return Ok(self.skip(&addr, reason));
    }

    if ctx.is_cancelled() {
      return Ok(self.skip(&addr, SkipReason::Cancelled));
    }

    let permit = match &self.admission {
      Some(gate) => tokio::select! {
        biased;
        _ = ctx.cancellation().cancelled() => {
          return Ok(self.skip(&addr, SkipReason::Cancelled));
        }
        permit = gate.clone().acquire_owned() => permit.ok(),
      },
      None => None,
    };

    info!(apply_id = %self.apply_id, action = ?change.action, "instance_started");
    self.notifier.notify(ApplyEvent::InstanceStarted {
      apply_id: self.apply_id.to_string(),
      instance: addr.clone(),
    });

    let result = self
      .executor
      .apply_change(&addr, &change, ctx.cancellation().clone())
      .await;
    drop(permit);

    let outcome = if result.has_errors() {
      let error = result
        .diagnostics
        .iter()
        .find(|d| d.is_error())
        .map(|d| d.summary.clone())
        .unwrap_or_default();
      warn!(apply_id = %self.apply_id, error = %error, "instance_failed");
      self.notifier.notify(ApplyEvent::InstanceFailed {
        apply_id: self.apply_id.to_string(),
        instance: addr.clone(),
        error,
      });
      InstanceOutcome::Failed {
        diagnostics: result.diagnostics,
      }
    } else {
      info!(apply_id = %self.apply_id, destroyed = result.new_state.is_none(), "instance_succeeded");
      self.notifier.notify(ApplyEvent::InstanceSucceeded {
        apply_id: self.apply_id.to_string(),
        instance: addr.clone(),
      });
      InstanceOutcome::Succeeded {
        new_state: result.new_state,
        diagnostics: result.diagnostics,
      }
    };

    self.log.record(&addr, outcome.clone());
    Ok(outcome)
  }

  fn skip(&self, addr: &ComponentInstanceAddr, reason: SkipReason) -> InstanceOutcome {
    info!(apply_id = %self.apply_id, instance = %addr, reason = %reason, "instance_skipped");
    let outcome = InstanceOutcome::Skipped {
      reason: reason.clone(),
    };
    self.log.record(addr, outcome.clone());
    self.notifier.notify(ApplyEvent::InstanceSkipped {
      apply_id: self.apply_id.to_string(),
      instance: addr.clone(),
      reason,
    });
    outcome
  }

  /// Record a failure for an instance task that ended without an outcome.
  fn record_crash(&self, addr: &ComponentInstanceAddr, err: &TaskError) {
    error!(apply_id = %self.apply_id, instance = %addr, error = %err, "instance_crashed");
    let outcome = InstanceOutcome::Failed {
      diagnostics: vec![
        Diagnostic::error("Apply action did not complete")
          .with_detail(err.to_string())
          .for_instance(addr),
      ],
    };
    if self.log.record(addr, outcome) {
      self.notifier.notify(ApplyEvent::InstanceFailed {
        apply_id: self.apply_id.to_string(),
        instance: addr.clone(),
        error: err.to_string(),
      });
    }
  }
}

/// Spawns instance tasks so that every task is created after the tasks it
/// waits on, giving it their handles.
///
/// Recursion over prerequisites terminates because an [`ExecutionOrder`] is
/// only built by `resolve`, which rejects cycles.
struct Spawner<'a, N> {
  run: &'a ApplyRun<N>,
  ctx: &'a TaskContext,
  plan: &'a Plan,
  order: &'a ExecutionOrder,
  spawned: BTreeMap<ComponentAddr, Vec<InstanceTask>>,
}

impl<N: ApplyNotifier + 'static> Spawner<'_, N> {
  fn spawn_component(&mut self, component: &ComponentAddr) {
    if self.spawned.contains_key(component) {
      return;
    }

    let order = self.order;
    for prerequisite in order.prerequisites(component) {
      self.spawn_component(prerequisite);
    }

    let prerequisites: Vec<InstanceTask> = order
      .prerequisites(component)
      .iter()
      .filter_map(|prerequisite| self.spawned.get(prerequisite))
      .flatten()
      .cloned()
      .collect();

    let plan = self.plan;
    let mut tasks = Vec::new();
    for addr in plan.instances_of(component) {
      let Some(instance) = plan.instance(&addr) else {
        continue;
      };
      let job = InstanceJob {
        addr: addr.clone(),
        change: instance.change.clone(),
        prerequisites: prerequisites.clone(),
      };
      let run = self.run.clone();
      let handle = self
        .ctx
        .spawn(addr.to_string(), move |ctx| run.apply_instance(ctx, job));
      tasks.push((addr, handle));
    }

    self.spawned.insert(component.clone(), tasks);
  }
}
