//! Process substrate - one OS process per stage.
//!
//! Each stage re-executes the current binary with the hidden `stage`
//! subcommand. The child's stdin is the read end of a fresh pipe and its stdout
//! and stderr are inherited, so every stage prints its key to the same output.
//!
//! Only the write end of the pipe comes back to the parent: the read end is
//! closed in the parent as part of spawning, and every other descriptor is
//! close-on-exec, so a child never holds a stray copy of an upstream writer.

use std::{
  ffi::OsString,
  path::PathBuf,
  process::Stdio,
};

use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, trace};

use super::{
  codec::{FramedInbound, FramedOutbound},
  sink::{FloorSink, StdoutSink},
  source::FIRST_KEY,
  spawner::{SpawnError, Spawner, StageHandle},
  stage::{DownstreamFailure, StageError, StageSummary, run_stage},
};

/// Subcommand a binary must route to [`run_process_stage`].
pub const STAGE_SUBCOMMAND: &str = "stage";

/// Starts stages as child processes of `program`.
#[derive(Debug, Clone)]
pub struct ProcessSpawner {
  program: PathBuf,
  report_from: u32,
  extra_args: Vec<OsString>,
}

impl ProcessSpawner {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      report_from: FIRST_KEY,
      extra_args: Vec::new(),
    }
  }

  /// Spawn stages from the binary that is currently running.
  pub fn current_exe() -> std::io::Result<Self> {
    Ok(Self::new(std::env::current_exe()?))
  }

  /// Arguments appended after `stage --depth <n> --report-from <lo>` on every child.
  pub fn with_args<I, A>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = A>,
    A: Into<OsString>,
  {
    self.extra_args.extend(args.into_iter().map(Into::into));
    self
  }

  /// Print only keys at or above `floor`, here and in every descendant.
  pub fn report_from(mut self, floor: u32) -> Self {
    self.report_from = floor;
    self
  }

  fn command(&self, depth: usize) -> Command {
    let mut cmd = Command::new(&self.program);
    cmd
      .arg(STAGE_SUBCOMMAND)
      .arg("--depth")
      .arg(depth.to_string())
      .arg("--report-from")
      .arg(self.report_from.to_string())
      .args(&self.extra_args)
      .stdin(Stdio::piped())
      .stdout(Stdio::inherit())
      .stderr(Stdio::inherit());
    cmd
  }
}

#[async_trait::async_trait]
impl Spawner for ProcessSpawner {
  type Writer = FramedOutbound<ChildStdin>;
  type Handle = ProcessHandle;

  async fn spawn_next(&self, depth: usize) -> Result<(Self::Writer, Self::Handle), SpawnError> {
    let mut child = self.command(depth).spawn()?;
    trace!(depth, pid = ?child.id(), "Spawned stage process");

    let Some(stdin) = child.stdin.take() else {
      // Not waited on by anyone else; reap it here.
      let _ = child.kill().await;
      return Err(SpawnError::MissingStdin);
    };

    Ok((FramedOutbound::new(stdin), ProcessHandle { depth, child }))
  }
}

#[derive(Debug)]
pub struct ProcessHandle {
  depth: usize,
  child: Child,
}

#[async_trait::async_trait]
impl StageHandle for ProcessHandle {
  async fn wait(mut self) -> Result<(), DownstreamFailure> {
    let status = self.child.wait().await.map_err(|source| DownstreamFailure::Wait {
      depth: self.depth,
      source,
    })?;

    if status.success() {
      trace!(depth = self.depth, "Stage process exited");
      Ok(())
    } else {
      Err(DownstreamFailure::Exited {
        depth: self.depth,
        code: status.code(),
      })
    }
  }
}

/// Body of the `stage` subcommand: filter stdin, print the key to stdout.
pub async fn run_process_stage(spawner: &ProcessSpawner, depth: usize) -> Result<StageSummary, StageError> {
  debug!(depth, pid = std::process::id(), "Stage process starting");
  let inbound = FramedInbound::new(tokio::io::stdin());
  let sink = FloorSink::new(StdoutSink, spawner.report_from);
  run_stage(inbound, spawner, &sink, depth).await
}
