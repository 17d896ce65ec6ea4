//! Destinations for discovered keys.

use std::io::{self, Write};

use tokio::sync::mpsc;

/// Receives each stage's key as soon as the stage learns it.
pub trait KeySink: Send + Sync {
  fn report(&self, key: u32) -> io::Result<()>;
}

/// The line printed for one discovered key.
pub fn format_key(key: u32) -> String {
  format!("prime {key}")
}

/// Writes `prime <key>` lines to the process's standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl KeySink for StdoutSink {
  fn report(&self, key: u32) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{}", format_key(key))?;
    // Children share this stdout; nothing may sit in our buffer when they print.
    out.flush()
  }
}

/// Forwards keys to a collector over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
  tx: mpsc::UnboundedSender<u32>,
}

impl ChannelSink {
  pub fn new() -> (Self, mpsc::UnboundedReceiver<u32>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, rx)
  }
}

impl KeySink for ChannelSink {
  fn report(&self, key: u32) -> io::Result<()> {
    self
      .tx
      .send(key)
      .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "key collector dropped"))
  }
}

/// Reports only keys at or above `floor` to the wrapped sink.
///
/// Stages always sieve from 2, so a range starting higher still needs every
/// smaller prime as a filter. Only the reporting is cut.
#[derive(Debug, Clone)]
pub struct FloorSink<S> {
  inner: S,
  floor: u32,
}

impl<S: KeySink> FloorSink<S> {
  pub fn new(inner: S, floor: u32) -> Self {
    Self { inner, floor }
  }
}

impl<S: KeySink> KeySink for FloorSink<S> {
  fn report(&self, key: u32) -> io::Result<()> {
    if key < self.floor {
      return Ok(());
    }
    self.inner.report(key)
  }
}
