//! Common test utilities for CLI integration tests
//!
//! Every invocation runs in its own temp directory with an empty user config
//! directory, so no config file from the host leaks into a test.

use std::{path::Path, process::Stdio, time::Duration};

use tempfile::TempDir;
use tokio::{io::AsyncWriteExt, process::Command};

/// Upper bound for any single invocation; a leaked write end would hang forever.
const RUN_TIMEOUT: Duration = Duration::from_secs(60);

pub struct Run {
  pub status: std::process::ExitStatus,
  pub stdout: String,
  pub stderr: String,
}

impl Run {
  pub fn lines(&self) -> Vec<&str> {
    self.stdout.lines().collect()
  }
}

/// Isolated working directory for one test
pub struct Sandbox {
  pub work_dir: TempDir,
  pub config_dir: TempDir,
}

impl Sandbox {
  pub fn new() -> Self {
    Self {
      work_dir: TempDir::new().expect("create work temp dir"),
      config_dir: TempDir::new().expect("create config temp dir"),
    }
  }

  #[allow(dead_code)]
  pub fn write(&self, name: &str, content: &str) {
    std::fs::write(self.work_dir.path().join(name), content).expect("write file");
  }

  #[allow(dead_code)]
  pub fn path(&self) -> &Path {
    self.work_dir.path()
  }

  pub async fn run(&self, args: &[&str]) -> Run {
    self.run_with_stdin(args, None).await
  }

  pub async fn run_with_stdin(&self, args: &[&str], stdin: Option<&[u8]>) -> Run {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_primes"));
    cmd
      .args(args)
      .current_dir(self.work_dir.path())
      .env("CONFIG_DIR", self.config_dir.path())
      .env_remove("RUST_LOG")
      .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);

    let mut child = cmd.spawn().expect("spawn primes");
    if let Some(bytes) = stdin {
      let mut pipe = child.stdin.take().expect("stdin pipe");
      pipe.write_all(bytes).await.expect("write stdin");
      // Dropping the pipe is the end-of-stream signal
      drop(pipe);
    }

    let output = tokio::time::timeout(RUN_TIMEOUT, child.wait_with_output())
      .await
      .expect("primes did not terminate")
      .expect("collect primes output");

    Run {
      status: output.status,
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
  }
}

/// Encode values the way stages exchange them over pipes
#[allow(dead_code)]
pub fn frames(values: &[u32]) -> Vec<u8> {
  values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Expected stdout lines for `keys`
pub fn prime_lines(keys: &[u32]) -> Vec<String> {
  keys.iter().map(|&k| sieve::pipeline::format_key(k)).collect()
}

/// Primes in `lo..=hi` by trial division
#[allow(dead_code)]
pub fn primes_between(lo: u32, hi: u32) -> Vec<u32> {
  (lo.max(2)..=hi)
    .filter(|&n| (2..).take_while(|d| d * d <= n).all(|d| n % d != 0))
    .collect()
}
