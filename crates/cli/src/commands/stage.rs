//! Hidden `stage` command: one link of a process-backed sieve.

use std::process::ExitCode;

use anyhow::{Context, Result};
use sieve::pipeline::{ProcessSpawner, StageError, run_process_stage};
use tracing::debug;

use crate::logging::init_logging;

pub async fn cmd_stage(depth: usize, report_from: u32, log_level: Option<String>) -> Result<ExitCode> {
  let level = log_level.unwrap_or_else(|| "warn".to_string());
  init_logging(&level);

  let spawner = ProcessSpawner::current_exe()
    .context("failed to locate the primes binary")?
    .report_from(report_from)
    .with_args(["--log-level", level.as_str()]);

  match run_process_stage(&spawner, depth).await {
    Ok(summary) => {
      debug!(depth, key = ?summary.key, forwarded = summary.forwarded, "Stage process done");
      Ok(ExitCode::SUCCESS)
    }
    // The failing stage already reported its own error.
    Err(StageError::Downstream(failure)) => {
      debug!(depth, error = %failure, "Downstream stage failed");
      Ok(ExitCode::FAILURE)
    }
    Err(err) => Err(err).with_context(|| format!("stage {depth} failed")),
  }
}
