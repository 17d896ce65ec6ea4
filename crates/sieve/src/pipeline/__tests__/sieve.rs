//! Whole-chain tests on the task substrate.

#[cfg(test)]
mod tests {
  use std::{sync::Arc, time::Duration};

  use pretty_assertions::assert_eq;

  use crate::{
    config::ConfigError,
    pipeline::{
      __tests__::helpers::{FailingSink, primes_between},
      PipelineError, PipelineResult, collect_primes,
      ledger::EndpointLedger,
      run_pipeline,
      sink::{ChannelSink, format_key},
      spawner::TaskSpawner,
      stage::{DownstreamFailure, StageError},
    },
  };

  /// Test: the default domain yields exactly the primes up to 35.
  #[tokio::test]
  async fn test_primes_to_35() {
    let primes = collect_primes(2..=35, 32).await.expect("sieve should succeed");
    assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31]);

    let lines: Vec<String> = primes.into_iter().map(format_key).collect();
    assert_eq!(lines.first().map(String::as_str), Some("prime 2"));
    assert_eq!(lines.last().map(String::as_str), Some("prime 31"));
  }

  #[tokio::test]
  async fn test_matches_trial_division() {
    for hi in [2, 3, 10, 97, 100, 250] {
      let primes = collect_primes(2..=hi, 8).await.unwrap();
      assert_eq!(primes, primes_between(2..=hi), "range 2..={hi}");
    }
  }

  /// Test: a range starting above 2 reports only the primes inside it.
  #[tokio::test]
  async fn test_range_not_starting_at_two() {
    assert_eq!(collect_primes(4..=20, 4).await.unwrap(), vec![5, 7, 11, 13, 17, 19]);

    for (lo, hi) in [(3, 3), (4, 4), (24, 28), (90, 200), (990, 1000)] {
      let primes = collect_primes(lo..=hi, 4).await.unwrap();
      assert_eq!(primes, primes_between(lo..=hi), "range {lo}..={hi}");
    }
  }

  #[tokio::test]
  async fn test_deterministic_output() {
    let first = collect_primes(2..=500, 2).await.unwrap();
    let second = collect_primes(2..=500, 2).await.unwrap();
    assert_eq!(first, second);
  }

  #[tokio::test]
  #[allow(clippy::reversed_empty_ranges)]
  async fn test_empty_range() {
    let primes = collect_primes(35..=2, 4).await.unwrap();
    assert!(primes.is_empty());
  }

  #[tokio::test]
  async fn test_single_value() {
    let primes = collect_primes(2..=2, 1).await.unwrap();
    assert_eq!(primes, vec![2]);
  }

  /// Test: a deep chain (168 stages) terminates with capacity 1 everywhere.
  #[tokio::test]
  async fn test_deep_chain_terminates() {
    let primes = tokio::time::timeout(Duration::from_secs(30), collect_primes(2..=1000, 1))
      .await
      .expect("deep chain should not deadlock")
      .unwrap();

    assert_eq!(primes.len(), 168);
    assert_eq!(primes.last(), Some(&997));
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_multi_thread_runtime() {
    let primes = collect_primes(2..=300, 3).await.unwrap();
    assert_eq!(primes, primes_between(2..=300));
  }

  /// Test: every endpoint of every channel is released once the chain is done.
  #[tokio::test]
  async fn test_no_endpoint_outlives_pipeline() {
    let ledger = EndpointLedger::new();
    let (sink, _keys) = ChannelSink::new();
    let spawner = TaskSpawner::new(2, Arc::new(sink)).with_ledger(ledger.clone());

    let result = run_pipeline(&spawner, 2..=200).await.unwrap();

    assert_eq!(result, PipelineResult { values_fed: 199 });
    // One channel per prime plus the trailing empty stage's inbound.
    assert_eq!(ledger.created(), 2 * (primes_between(2..=200).len() + 1));
    assert_eq!(ledger.live(), 0);
  }

  #[tokio::test]
  async fn test_zero_capacity_rejected() {
    let result = collect_primes(2..=35, 0).await;
    assert!(matches!(result, Err(PipelineError::Config(_))));
  }

  #[tokio::test]
  async fn test_range_from_one_rejected() {
    let result = collect_primes(1..=10, 4).await;
    assert!(matches!(
      result,
      Err(PipelineError::Config(ConfigError::InvalidRange { lo: 1 }))
    ));
  }

  /// Test: a stage failing mid-chain still releases every endpoint.
  #[tokio::test]
  async fn test_no_endpoint_outlives_failed_pipeline() {
    let ledger = EndpointLedger::new();
    let spawner = TaskSpawner::new(1, Arc::new(FailingSink { fail_on: 7 })).with_ledger(ledger.clone());

    let result = tokio::time::timeout(Duration::from_secs(30), run_pipeline(&spawner, 2..=200))
      .await
      .expect("failed chain should still terminate");

    assert!(matches!(
      result,
      Err(PipelineError::Stage(DownstreamFailure::Failed { depth: 4, ref source }))
        if matches!(**source, StageError::Report(_))
    ));
    // Stages 1 to 4 each opened their inbound channel; key 7 never spawned a fifth.
    assert_eq!(ledger.created(), 2 * 4);
    assert_eq!(ledger.live(), 0);
  }
}
