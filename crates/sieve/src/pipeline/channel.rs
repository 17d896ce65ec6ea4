//! Channel primitive connecting two adjacent stages.
//!
//! A channel is created as two separately owned endpoints. Neither endpoint can
//! be cloned, so handing the reader to a new stage moves it out of the parent
//! entirely; the reader sees end-of-stream once the writer is closed and every
//! buffered value has been read.

use std::io;

use tokio::sync::mpsc;

use super::ledger::{EndpointLedger, LedgerGuard};

/// Read half of a stage-to-stage stream.
#[async_trait::async_trait]
pub trait Inbound: Send {
  /// Next value, or `Ok(None)` once the stream is exhausted.
  async fn recv(&mut self) -> Result<Option<u32>, ChannelError>;
}

/// Write half of a stage-to-stage stream.
#[async_trait::async_trait]
pub trait Outbound: Send {
  /// Blocks while the channel is full.
  async fn send(&mut self, value: u32) -> Result<(), ChannelError>;

  /// Release the write end. Pending values stay readable.
  async fn close(self) -> Result<(), ChannelError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
  #[error("channel closed by the reader")]
  Closed,
  #[error("stream ended inside a frame ({got} of 4 bytes)")]
  TruncatedFrame { got: usize },
  #[error("channel IO error: {0}")]
  Io(io::Error),
}

impl From<io::Error> for ChannelError {
  fn from(err: io::Error) -> Self {
    match err.kind() {
      io::ErrorKind::BrokenPipe => ChannelError::Closed,
      _ => ChannelError::Io(err),
    }
  }
}

/// Create a bounded channel holding at most `capacity` values in flight.
///
/// # Panics
///
/// Panics if `capacity` is zero, like [`mpsc::channel`].
pub fn channel(capacity: usize) -> (ChannelWriter, ChannelReader) {
  open(capacity, None)
}

/// Like [`channel`], registering both endpoints with `ledger`.
pub fn tracked_channel(capacity: usize, ledger: &EndpointLedger) -> (ChannelWriter, ChannelReader) {
  open(capacity, Some(ledger))
}

fn open(capacity: usize, ledger: Option<&EndpointLedger>) -> (ChannelWriter, ChannelReader) {
  let (tx, rx) = mpsc::channel(capacity);
  let writer = ChannelWriter {
    tx,
    _guard: ledger.map(EndpointLedger::guard),
  };
  let reader = ChannelReader {
    rx,
    _guard: ledger.map(EndpointLedger::guard),
  };
  (writer, reader)
}

#[derive(Debug)]
pub struct ChannelWriter {
  tx: mpsc::Sender<u32>,
  _guard: Option<LedgerGuard>,
}

#[derive(Debug)]
pub struct ChannelReader {
  rx: mpsc::Receiver<u32>,
  _guard: Option<LedgerGuard>,
}

#[async_trait::async_trait]
impl Outbound for ChannelWriter {
  async fn send(&mut self, value: u32) -> Result<(), ChannelError> {
    self.tx.send(value).await.map_err(|_| ChannelError::Closed)
  }

  async fn close(self) -> Result<(), ChannelError> {
    drop(self);
    Ok(())
  }
}

#[async_trait::async_trait]
impl Inbound for ChannelReader {
  async fn recv(&mut self) -> Result<Option<u32>, ChannelError> {
    Ok(self.rx.recv().await)
  }
}
