//! Source stage - feeds the input range into the first filter stage.

use std::ops::RangeInclusive;

use tracing::debug;

use super::channel::{ChannelError, Outbound};

/// Smallest value a stage may take as its key; the source always starts here.
pub const FIRST_KEY: u32 = 2;

/// Values to feed for a sieve reporting keys in `range`.
///
/// Keys are only prime when the input starts at [`FIRST_KEY`], so the source
/// covers `FIRST_KEY..=hi` and callers cut reporting below `lo`. An empty
/// `range` stays empty.
pub fn source_range(range: &RangeInclusive<u32>) -> RangeInclusive<u32> {
  if range.is_empty() {
    return range.clone();
  }
  FIRST_KEY..=*range.end()
}

/// Write every value of `range` in ascending order, then close the writer.
///
/// Returns the number of values written. The writer is released on every path.
pub async fn feed<O: Outbound>(range: RangeInclusive<u32>, mut writer: O) -> Result<u64, ChannelError> {
  let mut sent = 0u64;
  for value in range {
    writer.send(value).await?;
    sent += 1;
  }
  writer.close().await?;
  debug!(sent, "Source exhausted");
  Ok(sent)
}
