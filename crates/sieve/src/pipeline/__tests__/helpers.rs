//! Test helpers for pipeline scenario tests.
//!
//! Scripted inbound streams, a spawner that records what a stage forwards
//! instead of starting a real next stage, a sink that fails on demand and a
//! trial-division reference.

use std::{
  collections::VecDeque,
  io,
  ops::RangeInclusive,
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  },
};

use tokio::task::JoinHandle;

use crate::pipeline::{
  channel::{ChannelError, ChannelWriter, Inbound, channel},
  sink::KeySink,
  spawner::{SpawnError, Spawner, StageHandle},
  stage::DownstreamFailure,
};

/// Inbound stream over a fixed list of values.
pub struct ScriptedInbound {
  values: VecDeque<u32>,
}

impl ScriptedInbound {
  pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
    Self {
      values: values.into_iter().collect(),
    }
  }
}

#[async_trait::async_trait]
impl Inbound for ScriptedInbound {
  async fn recv(&mut self) -> Result<Option<u32>, ChannelError> {
    Ok(self.values.pop_front())
  }
}

/// How the recorded child finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutcome {
  Clean,
  Exit(i32),
  Panic,
}

/// Spawner whose "next stage" only records what it receives.
#[derive(Clone)]
pub struct RecordingSpawner {
  capacity: usize,
  outcome: ChildOutcome,
  forwarded: Arc<Mutex<Vec<u32>>>,
  spawned: Arc<AtomicUsize>,
}

impl RecordingSpawner {
  pub fn new(capacity: usize) -> Self {
    Self {
      capacity,
      outcome: ChildOutcome::Clean,
      forwarded: Arc::default(),
      spawned: Arc::default(),
    }
  }

  pub fn with_outcome(mut self, outcome: ChildOutcome) -> Self {
    self.outcome = outcome;
    self
  }

  pub fn forwarded(&self) -> Vec<u32> {
    self.forwarded.lock().expect("forwarded lock").clone()
  }

  pub fn spawned(&self) -> usize {
    self.spawned.load(Ordering::SeqCst)
  }
}

#[async_trait::async_trait]
impl Spawner for RecordingSpawner {
  type Writer = ChannelWriter;
  type Handle = RecordingHandle;

  async fn spawn_next(&self, depth: usize) -> Result<(ChannelWriter, RecordingHandle), SpawnError> {
    self.spawned.fetch_add(1, Ordering::SeqCst);
    let (writer, mut reader) = channel(self.capacity);
    let forwarded = self.forwarded.clone();
    let outcome = self.outcome;

    let join = tokio::spawn(async move {
      while let Some(value) = reader.recv().await.expect("recorded channel read") {
        forwarded.lock().expect("forwarded lock").push(value);
      }
      if outcome == ChildOutcome::Panic {
        panic!("recorded stage panicked");
      }
    });

    Ok((writer, RecordingHandle { depth, outcome, join }))
  }
}

pub struct RecordingHandle {
  depth: usize,
  outcome: ChildOutcome,
  join: JoinHandle<()>,
}

#[async_trait::async_trait]
impl StageHandle for RecordingHandle {
  async fn wait(self) -> Result<(), DownstreamFailure> {
    if self.join.await.is_err() {
      return Err(DownstreamFailure::Aborted { depth: self.depth });
    }
    match self.outcome {
      ChildOutcome::Exit(code) => Err(DownstreamFailure::Exited {
        depth: self.depth,
        code: Some(code),
      }),
      _ => Ok(()),
    }
  }
}

/// Spawner that can never start a stage.
pub struct ExhaustedSpawner;

#[async_trait::async_trait]
impl Spawner for ExhaustedSpawner {
  type Writer = ChannelWriter;
  type Handle = RecordingHandle;

  async fn spawn_next(&self, _depth: usize) -> Result<(ChannelWriter, RecordingHandle), SpawnError> {
    Err(SpawnError::Io(io::Error::other("process table full")))
  }
}

/// Sink that refuses one key, failing the stage that owns it.
pub struct FailingSink {
  pub fail_on: u32,
}

impl KeySink for FailingSink {
  fn report(&self, key: u32) -> io::Result<()> {
    if key == self.fail_on {
      return Err(io::Error::new(io::ErrorKind::BrokenPipe, "output closed"));
    }
    Ok(())
  }
}

/// Primes in `range` by trial division.
pub fn primes_between(range: RangeInclusive<u32>) -> Vec<u32> {
  range
    .filter(|&n| n >= 2 && (2..).take_while(|d| d * d <= n).all(|d| n % d != 0))
    .collect()
}
