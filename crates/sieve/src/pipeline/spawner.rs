//! Starting stages and waiting for them.
//!
//! A [`Spawner`] creates the channel to a new stage and starts that stage in a
//! single step: the reader moves into the new worker and only the writer comes
//! back, together with a [`StageHandle`] that can be waited on exactly once.
//!
//! [`TaskSpawner`] runs every stage as a tokio task over bounded in-memory
//! channels. The process-backed equivalent lives in [`super::process`].

use std::{io, sync::Arc};

use futures::{FutureExt, future::BoxFuture};
use tokio::task::JoinHandle;
use tracing::trace;

use super::{
  channel::{ChannelReader, ChannelWriter, Outbound, channel, tracked_channel},
  ledger::EndpointLedger,
  sink::KeySink,
  stage::{DownstreamFailure, StageError, StageSummary, run_stage},
};

/// Opaque token for a started stage.
#[async_trait::async_trait]
pub trait StageHandle: Send {
  /// Block until the stage and everything downstream of it has finished.
  async fn wait(self) -> Result<(), DownstreamFailure>;
}

#[async_trait::async_trait]
pub trait Spawner: Send + Sync {
  type Writer: Outbound;
  type Handle: StageHandle;

  /// Open a channel and start a stage at `depth` reading from it.
  async fn spawn_next(&self, depth: usize) -> Result<(Self::Writer, Self::Handle), SpawnError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
  #[error("failed to start stage process: {0}")]
  Io(#[from] io::Error),
  #[error("stage process started without a stdin pipe")]
  MissingStdin,
}

// ============================================================================
// Task substrate
// ============================================================================

/// Runs each stage as a tokio task.
#[derive(Clone)]
pub struct TaskSpawner {
  capacity: usize,
  sink: Arc<dyn KeySink>,
  ledger: Option<EndpointLedger>,
}

impl TaskSpawner {
  /// `capacity` bounds every inter-stage channel and must be non-zero.
  pub fn new(capacity: usize, sink: Arc<dyn KeySink>) -> Self {
    Self {
      capacity,
      sink,
      ledger: None,
    }
  }

  /// Count every endpoint this spawner creates.
  pub fn with_ledger(mut self, ledger: EndpointLedger) -> Self {
    self.ledger = Some(ledger);
    self
  }

  fn open_channel(&self) -> (ChannelWriter, ChannelReader) {
    match &self.ledger {
      Some(ledger) => tracked_channel(self.capacity, ledger),
      None => channel(self.capacity),
    }
  }

  /// Start a stage that reads from `reader`.
  pub fn spawn_stage(&self, reader: ChannelReader, depth: usize) -> TaskHandle {
    trace!(depth, "Spawning stage task");
    TaskHandle {
      depth,
      join: tokio::spawn(task_stage(reader, self.clone(), depth)),
    }
  }
}

// Boxed so a stage task can spawn the next stage task.
fn task_stage(
  reader: ChannelReader,
  spawner: TaskSpawner,
  depth: usize,
) -> BoxFuture<'static, Result<StageSummary, StageError>> {
  async move {
    let sink = spawner.sink.clone();
    run_stage(reader, &spawner, sink.as_ref(), depth).await
  }
  .boxed()
}

#[async_trait::async_trait]
impl Spawner for TaskSpawner {
  type Writer = ChannelWriter;
  type Handle = TaskHandle;

  async fn spawn_next(&self, depth: usize) -> Result<(ChannelWriter, TaskHandle), SpawnError> {
    let (writer, reader) = self.open_channel();
    Ok((writer, self.spawn_stage(reader, depth)))
  }
}

#[derive(Debug)]
pub struct TaskHandle {
  depth: usize,
  join: JoinHandle<Result<StageSummary, StageError>>,
}

#[async_trait::async_trait]
impl StageHandle for TaskHandle {
  async fn wait(self) -> Result<(), DownstreamFailure> {
    match self.join.await {
      Ok(Ok(summary)) => {
        trace!(depth = self.depth, key = ?summary.key, "Stage task joined");
        Ok(())
      }
      Ok(Err(err)) => Err(DownstreamFailure::from_stage(self.depth, err)),
      Err(_) => Err(DownstreamFailure::Aborted { depth: self.depth }),
    }
  }
}
