//! Filter stage - the recursive core of the sieve.
//!
//! A stage reads its key, reports it, starts the next stage and then forwards
//! every value its key does not divide:
//!
//! ```text
//! AwaitingKey ──(value)──► Filtering ──(exhausted)──► Draining ──(child done)──► Terminated
//!      │                                                                             ▲
//!      └──────────────────────────────(exhausted)────────────────────────────────────┘
//! ```
//!
//! Because every value reaching a stage survived all earlier keys, and the input
//! ascends from 2, each key is prime and keys appear in ascending order.

use std::io;

use tracing::{debug, trace, warn};

use super::{
  channel::{ChannelError, Inbound, Outbound},
  sink::KeySink,
  spawner::{SpawnError, Spawner, StageHandle},
};

/// Lifecycle of a single stage activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
  AwaitingKey,
  Filtering { key: u32 },
  Draining { key: u32 },
  Terminated,
}

impl StageState {
  /// Whether `next` is a legal successor of `self`.
  pub fn can_advance_to(&self, next: &StageState) -> bool {
    matches!(
      (self, next),
      (StageState::AwaitingKey, StageState::Filtering { .. })
        | (StageState::AwaitingKey, StageState::Terminated)
        | (StageState::Filtering { .. }, StageState::Draining { .. })
        | (StageState::Draining { .. }, StageState::Terminated)
    )
  }

  fn advance(&mut self, next: StageState, depth: usize) {
    debug_assert!(self.can_advance_to(&next), "illegal stage transition {self:?} -> {next:?}");
    trace!(depth, from = ?self, to = ?next, "Stage transition");
    *self = next;
  }
}

/// What one stage saw and did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSummary {
  /// `None` when the inbound stream was empty.
  pub key: Option<u32>,
  /// Values read, including the key.
  pub received: u64,
  pub forwarded: u64,
  pub discarded: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum StageError {
  #[error("channel error: {0}")]
  Channel(#[from] ChannelError),
  #[error("failed to start next stage: {0}")]
  Spawn(#[from] SpawnError),
  #[error("failed to report key: {0}")]
  Report(#[source] io::Error),
  #[error("{0} cannot be a stage key")]
  InvalidKey(u32),
  #[error(transparent)]
  Downstream(#[from] DownstreamFailure),
}

/// A downstream stage that did not finish cleanly.
#[derive(Debug, thiserror::Error)]
pub enum DownstreamFailure {
  #[error("stage {depth} failed: {source}")]
  Failed {
    depth: usize,
    #[source]
    source: Box<StageError>,
  },
  #[error("stage {depth} aborted")]
  Aborted { depth: usize },
  #[error("stage {depth} exited abnormally (code {code:?})")]
  Exited { depth: usize, code: Option<i32> },
  #[error("lost track of stage {depth}: {source}")]
  Wait {
    depth: usize,
    #[source]
    source: io::Error,
  },
}

impl DownstreamFailure {
  /// Wrap a child's own error, passing deeper failures through unchanged.
  pub fn from_stage(depth: usize, err: StageError) -> Self {
    match err {
      StageError::Downstream(inner) => inner,
      other => DownstreamFailure::Failed {
        depth,
        source: Box::new(other),
      },
    }
  }
}

/// Run one stage to completion.
///
/// `depth` is this stage's position in the chain, starting at 1. The inbound
/// reader and the outbound writer are released on every return path, and a
/// spawned child is always waited on before returning.
pub async fn run_stage<I, S>(
  mut inbound: I,
  spawner: &S,
  sink: &dyn KeySink,
  depth: usize,
) -> Result<StageSummary, StageError>
where
  I: Inbound,
  S: Spawner,
{
  let mut state = StageState::AwaitingKey;
  let mut summary = StageSummary::default();

  let key = match inbound.recv().await? {
    Some(key) => key,
    None => {
      drop(inbound);
      state.advance(StageState::Terminated, depth);
      debug!(depth, "Stage found no input, terminating");
      return Ok(summary);
    }
  };
  summary.received = 1;

  if key < 2 {
    return Err(StageError::InvalidKey(key));
  }
  sink.report(key).map_err(StageError::Report)?;
  summary.key = Some(key);

  let (mut outbound, child) = spawner.spawn_next(depth + 1).await?;
  state.advance(StageState::Filtering { key }, depth);
  debug!(depth, key, "Stage filtering");

  let filtered = forward_survivors(&mut inbound, &mut outbound, key, &mut summary).await;

  drop(inbound);
  state.advance(StageState::Draining { key }, depth);
  let closed = outbound.close().await;
  let waited = child.wait().await;
  state.advance(StageState::Terminated, depth);

  debug!(
    depth,
    key,
    received = summary.received,
    forwarded = summary.forwarded,
    discarded = summary.discarded,
    "Stage complete"
  );

  // A failed child usually explains our own write failure, so report it first.
  if let Err(failure) = waited {
    warn!(depth, error = %failure, "Downstream stage failed");
    return Err(failure.into());
  }
  filtered?;
  closed?;
  Ok(summary)
}

async fn forward_survivors<I, O>(
  inbound: &mut I,
  outbound: &mut O,
  key: u32,
  summary: &mut StageSummary,
) -> Result<(), StageError>
where
  I: Inbound,
  O: Outbound,
{
  while let Some(value) = inbound.recv().await? {
    summary.received += 1;

    if value % key == 0 {
      trace!(key, value, "Discarded");
      summary.discarded += 1;
      continue;
    }

    outbound.send(value).await?;
    summary.forwarded += 1;
  }
  Ok(())
}
