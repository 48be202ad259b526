use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use strata_apply::{Applier, ApplyConfig, Diagnostic, InfraState, RunStatus};
use strata_config::{ApplyOptions, PlanDef, PlanMode};
use strata_plan::Plan;

mod echo;

use echo::EchoExecutor;

/// Strata - applies locked stack plans in dependency order
#[derive(Parser)]
#[command(name = "strata")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Increase log verbosity (-v, -vv, -vvv). Ignored when RUST_LOG is set.
  #[arg(short, long, action = clap::ArgAction::Count, global = true)]
  verbose: u8,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Apply a plan file
  Apply {
    /// Path to the plan file (JSON)
    plan_file: PathBuf,

    /// Apply the plan in destroy order regardless of its recorded mode
    #[arg(long)]
    destroy: bool,

    /// Maximum number of apply actions running at once
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Prior state file (JSON); an empty state is used when omitted
    #[arg(long)]
    state: Option<PathBuf>,

    /// Do not report skipped instances as warnings
    #[arg(long)]
    quiet_skips: bool,
  },
}

#[derive(Serialize)]
struct ApplyOutput<'a> {
  apply_id: &'a str,
  status: &'a RunStatus,
  summary: String,
  state: &'a InfraState,
  diagnostics: &'a [Diagnostic],
}

fn main() -> Result<ExitCode> {
  let cli = Cli::parse();
  init_tracing(cli.verbose)?;

  match cli.command {
    Some(Commands::Apply {
      plan_file,
      destroy,
      max_concurrency,
      state,
      quiet_skips,
    }) => {
      let options = ApplyOptions {
        max_concurrency,
        surface_skipped: !quiet_skips,
      };
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { apply(&plan_file, state.as_deref(), destroy, options).await })
    }
    None => {
      println!("strata - use --help to see available commands");
      Ok(ExitCode::SUCCESS)
    }
  }
}

fn init_tracing(verbose: u8) -> Result<()> {
  let filter = if std::env::var_os("RUST_LOG").is_some() {
    EnvFilter::try_from_default_env().context("invalid RUST_LOG filter")?
  } else {
    let level = match verbose {
      0 => "warn",
      1 => "info",
      2 => "debug",
      _ => "trace",
    };
    EnvFilter::new(format!("error,strata={level},strata_={level}"))
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();

  Ok(())
}

async fn apply(
  plan_file: &Path,
  state_file: Option<&Path>,
  destroy: bool,
  options: ApplyOptions,
) -> Result<ExitCode> {
  let plan_content = tokio::fs::read_to_string(plan_file)
    .await
    .with_context(|| format!("failed to read plan file: {}", plan_file.display()))?;

  let mut plan_def: PlanDef = serde_json::from_str(&plan_content)
    .with_context(|| format!("failed to parse plan file: {}", plan_file.display()))?;
  if destroy {
    plan_def.mode = PlanMode::Destroy;
  }

  let plan = Plan::from_def(plan_def).context("invalid plan")?;
  eprintln!(
    "Loaded plan {} ({:?}): {} components, {} instances",
    plan.plan_id,
    plan.direction,
    plan.components.len(),
    plan.instances.len()
  );

  let prior_state = match state_file {
    Some(path) => {
      let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read state file: {}", path.display()))?;
      serde_json::from_str(&content)
        .with_context(|| format!("failed to parse state file: {}", path.display()))?
    }
    None => InfraState::new(),
  };

  let cancel = CancellationToken::new();
  tokio::spawn({
    let cancel = cancel.clone();
    async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        eprintln!("Interrupt received, cancelling apply");
        cancel.cancel();
      }
    }
  });

  let applier = Applier::new(Arc::new(EchoExecutor), ApplyConfig::from(&options));
  let result = applier
    .execute(&plan, prior_state, cancel)
    .await
    .context("apply aborted")?;

  eprintln!("Apply {}: {}", result.apply_id, result.status);

  let output = ApplyOutput {
    apply_id: &result.apply_id,
    status: &result.status,
    summary: result.status.to_string(),
    state: &result.state,
    diagnostics: &result.diagnostics,
  };
  println!("{}", serde_json::to_string_pretty(&output)?);

  Ok(if result.status.is_success() {
    ExitCode::SUCCESS
  } else {
    ExitCode::FAILURE
  })
}
