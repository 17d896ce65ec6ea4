//! Live-endpoint accounting for in-process channels.
//!
//! Every endpoint created through a tracked channel holds a [`LedgerGuard`]. The
//! guard is released when the endpoint is closed or dropped, so a ledger reading
//! zero after a run means no stage kept a channel half alive.

use std::sync::{
  Arc,
  atomic::{AtomicUsize, Ordering},
};

#[derive(Debug, Default)]
struct Counts {
  live: AtomicUsize,
  created: AtomicUsize,
}

/// Shared counter of channel endpoints. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct EndpointLedger {
  counts: Arc<Counts>,
}

impl EndpointLedger {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a new endpoint.
  pub fn guard(&self) -> LedgerGuard {
    self.counts.live.fetch_add(1, Ordering::SeqCst);
    self.counts.created.fetch_add(1, Ordering::SeqCst);
    LedgerGuard {
      counts: self.counts.clone(),
    }
  }

  /// Endpoints created but not yet released.
  pub fn live(&self) -> usize {
    self.counts.live.load(Ordering::SeqCst)
  }

  /// Endpoints ever created through this ledger.
  pub fn created(&self) -> usize {
    self.counts.created.load(Ordering::SeqCst)
  }
}

/// Held by one endpoint; decrements the live count on drop.
#[derive(Debug)]
pub struct LedgerGuard {
  counts: Arc<Counts>,
}

impl Drop for LedgerGuard {
  fn drop(&mut self) {
    self.counts.live.fetch_sub(1, Ordering::SeqCst);
  }
}
