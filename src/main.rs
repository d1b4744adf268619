use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sluice_action::{Action, JsonFileSource, QueryAction, RetryPolicy, RetryingAction};
use sluice_artifact::FsStore;
use sluice_config::TriggerDef;
use sluice_scheduler::{ChannelQueue, Scheduler, TracingNotifier};
use sluice_trigger::{PollingTrigger, TriggerConfig, TriggerContext};

/// Sluice - polling triggers that start executions when a query matches
#[derive(Parser)]
#[command(name = "sluice")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.sluice)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Evaluate a trigger once and print the execution it would start
  Evaluate {
    /// Path to the trigger definition (JSON)
    trigger_file: PathBuf,
  },

  /// Poll a trigger on its interval until interrupted
  Watch {
    /// Path to the trigger definition (JSON)
    trigger_file: PathBuf,

    /// Capacity of the execution queue
    #[arg(long, default_value_t = 64)]
    queue_size: usize,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".sluice"),
  };

  match cli.command {
    Some(Commands::Evaluate { trigger_file }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(evaluate(trigger_file, data_dir))?;
    }
    Some(Commands::Watch {
      trigger_file,
      queue_size,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(watch(trigger_file, data_dir, queue_size))?;
    }
    None => {
      println!("sluice - use --help to see available commands");
    }
  }

  Ok(())
}

async fn load_def(trigger_file: &Path) -> Result<TriggerDef> {
  let content = tokio::fs::read_to_string(trigger_file)
    .await
    .with_context(|| format!("failed to read trigger file: {}", trigger_file.display()))?;

  TriggerDef::from_json(&content)
    .with_context(|| format!("failed to parse trigger file: {}", trigger_file.display()))
}

/// Query action reading rows relative to the trigger file, storing results
/// under the data directory.
fn build_action(trigger_file: &Path, data_dir: &Path) -> Arc<dyn Action> {
  let base_dir = trigger_file
    .parent()
    .map(Path::to_path_buf)
    .unwrap_or_default();
  let store = FsStore::new(data_dir.join("storage"));

  Arc::new(QueryAction::new(JsonFileSource::new(base_dir)).with_store(Arc::new(store)))
}

async fn evaluate(trigger_file: PathBuf, data_dir: PathBuf) -> Result<()> {
  let def = load_def(&trigger_file).await?;
  let config = TriggerConfig::from_def(&def).context("failed to resolve trigger parameters")?;

  let mut action = build_action(&trigger_file, &data_dir);
  if let Some(retry) = def.retry {
    action = Arc::new(RetryingAction::new(action, RetryPolicy::from(retry)));
  }

  let trigger = PollingTrigger::new(config, action);
  let ctx = TriggerContext::for_def(&def);

  let evaluation = trigger.evaluate(&ctx);
  let envelope = match def.timeout() {
    Some(timeout) => tokio::time::timeout(timeout, evaluation)
      .await
      .with_context(|| format!("trigger timed out after {timeout:?}"))?,
    None => evaluation.await,
  }
  .context("trigger evaluation failed")?;

  println!("{}", serde_json::to_string_pretty(&envelope)?);

  Ok(())
}

async fn watch(trigger_file: PathBuf, data_dir: PathBuf, queue_size: usize) -> Result<()> {
  let def = load_def(&trigger_file).await?;

  let (queue, mut executions) = ChannelQueue::new(queue_size.max(1));
  let scheduler = Arc::new(Scheduler::new(Arc::new(queue), Arc::new(TracingNotifier)));
  let trigger_id = scheduler
    .register_def(&def, build_action(&trigger_file, &data_dir))
    .context("failed to register trigger")?;

  info!(trigger_id = %trigger_id, interval = ?def.interval(), "watching trigger");

  let cancel = CancellationToken::new();
  let run = tokio::spawn(scheduler.clone().run(cancel.clone()));

  loop {
    tokio::select! {
      _ = tokio::signal::ctrl_c() => break,
      envelope = executions.recv() => {
        let Some(envelope) = envelope else { break };
        println!("{}", serde_json::to_string(&envelope)?);
      }
    }
  }

  cancel.cancel();
  run.await.context("scheduler task failed")?;
  info!("stopped watching");

  Ok(())
}
