//! Default command: run the sieve and print every discovered prime.

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::Args;
use sieve::{
  SieveConfig, Substrate,
  pipeline::{FloorSink, ProcessSpawner, StdoutSink, TaskSpawner},
  run_pipeline,
};
use tracing::info;

use crate::logging::init_logging;

/// Overrides for the loaded configuration
#[derive(Args, Debug, Default)]
pub struct RunArgs {
  /// Smallest prime to print (>= 2)
  #[arg(long)]
  pub lo: Option<u32>,
  /// Largest value to test
  #[arg(long)]
  pub hi: Option<u32>,
  /// Channel capacity between stages (task substrate)
  #[arg(long)]
  pub capacity: Option<usize>,
  /// Where stages run
  #[arg(long, value_parser = ["task", "process"])]
  pub substrate: Option<String>,
  /// Config file (default: ./primes.toml, then the user config)
  #[arg(long, value_name = "FILE", global = true)]
  pub config: Option<PathBuf>,
}

impl RunArgs {
  /// Apply command-line overrides on top of `config`.
  pub fn apply(&self, config: &mut SieveConfig) -> Result<()> {
    if let Some(lo) = self.lo {
      config.range.lo = lo;
    }
    if let Some(hi) = self.hi {
      config.range.hi = hi;
    }
    if let Some(capacity) = self.capacity {
      config.pipeline.capacity = capacity;
    }
    if let Some(ref substrate) = self.substrate {
      config.pipeline.substrate = substrate.parse()?;
    }
    Ok(())
  }
}

pub async fn cmd_run(args: RunArgs, log_level: Option<String>) -> Result<ExitCode> {
  let cwd = std::env::current_dir()?;
  let mut config = SieveConfig::load(args.config.as_deref(), &cwd)?;
  args.apply(&mut config)?;
  if let Some(level) = log_level {
    config.logging.level = level;
  }

  init_logging(&config.logging.level);
  config.validate()?;

  let range = config.range.bounds();
  let result = match config.pipeline.substrate {
    Substrate::Task => {
      let sink = FloorSink::new(StdoutSink, config.range.lo);
      let spawner = TaskSpawner::new(config.pipeline.capacity, Arc::new(sink));
      run_pipeline(&spawner, range).await
    }
    Substrate::Process => {
      let spawner = ProcessSpawner::current_exe()
        .context("failed to locate the primes binary")?
        .report_from(config.range.lo)
        .with_args(["--log-level", config.logging.level.as_str()]);
      run_pipeline(&spawner, range).await
    }
  }
  .context("sieve pipeline failed")?;

  info!(
    substrate = %config.pipeline.substrate,
    values_fed = result.values_fed,
    "Sieve finished"
  );
  Ok(ExitCode::SUCCESS)
}
