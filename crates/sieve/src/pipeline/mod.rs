//! Recursive filter pipeline
//!
//! ```text
//! Source → Stage(k1) → Stage(k2) → … → Stage(kn) → (empty)
//! ```
//!
//! Data and end-of-stream flow downstream; completion flows back upstream as
//! each stage waits on its direct child before finishing. Channels are bounded,
//! so a slow stage throttles everything upstream of it.
//!
//! ## Substrates
//!
//! - [`TaskSpawner`]: stages are tokio tasks joined by bounded `mpsc` channels.
//! - [`ProcessSpawner`]: stages are child processes joined by OS pipes carrying
//!   4-byte little-endian frames.

pub mod channel;
pub mod codec;
pub mod ledger;
pub mod process;
pub mod sink;
pub mod source;
pub mod spawner;
pub mod stage;


use std::{ops::RangeInclusive, sync::Arc};

use tracing::debug;

pub use self::{
  channel::{ChannelError, ChannelReader, ChannelWriter, Inbound, Outbound, channel, tracked_channel},
  ledger::EndpointLedger,
  process::{ProcessSpawner, STAGE_SUBCOMMAND, run_process_stage},
  sink::{ChannelSink, FloorSink, KeySink, StdoutSink, format_key},
  source::{FIRST_KEY, feed, source_range},
  spawner::{SpawnError, Spawner, StageHandle, TaskSpawner},
  stage::{DownstreamFailure, StageError, StageState, StageSummary, run_stage},
};
use crate::config::ConfigError;

/// Result of running the pipeline
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineResult {
  /// Values the source wrote into the first stage.
  pub values_fed: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
  #[error("invalid configuration: {0}")]
  Config(#[from] ConfigError),
  #[error("source failed: {0}")]
  Channel(#[from] ChannelError),
  #[error("failed to start first stage: {0}")]
  Spawn(#[from] SpawnError),
  #[error(transparent)]
  Stage(#[from] DownstreamFailure),
}

/// Run the whole sieve up to the end of `range`.
///
/// Starts the first stage, feeds it [`source_range`] and waits on it once. That
/// single wait covers the entire chain, since every stage waits on its own
/// child. The spawner's sink decides which keys are reported; wrap it in a
/// [`FloorSink`] to report only the primes in `range`.
pub async fn run_pipeline<S: Spawner>(spawner: &S, range: RangeInclusive<u32>) -> Result<PipelineResult, PipelineError> {
  debug!(lo = range.start(), hi = range.end(), "Starting sieve pipeline");

  let (writer, first) = spawner.spawn_next(1).await?;
  let fed = feed(source_range(&range), writer).await;
  // Wait even when feeding failed; the first stage still owns a live reader.
  let waited = first.wait().await;

  waited?;
  let values_fed = fed?;

  debug!(values_fed, "Sieve pipeline complete");
  Ok(PipelineResult { values_fed })
}

/// Run the sieve on tokio tasks and collect the primes in `range` in order.
pub async fn collect_primes(range: RangeInclusive<u32>, capacity: usize) -> Result<Vec<u32>, PipelineError> {
  if *range.start() < FIRST_KEY {
    return Err(ConfigError::InvalidRange { lo: *range.start() }.into());
  }
  if capacity == 0 {
    return Err(ConfigError::InvalidCapacity.into());
  }

  let (sink, mut keys) = ChannelSink::new();
  let spawner = TaskSpawner::new(capacity, Arc::new(FloorSink::new(sink, *range.start())));
  run_pipeline(&spawner, range).await?;

  // Every report happened before its stage finished, so nothing is in flight.
  let mut primes = Vec::new();
  while let Ok(key) = keys.try_recv() {
    primes.push(key);
  }
  Ok(primes)
}
