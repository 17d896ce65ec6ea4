//! Concurrent prime sieve built from a recursively spawned chain of filter stages.
//!
//! ```text
//! Source → Stage(2) → Stage(3) → Stage(5) → … → Stage(p) → (empty)
//! ```
//!
//! Each stage keeps the first value it reads as its key, reports it, spawns the
//! next stage and forwards every later value its key does not divide. Stages run
//! either as tokio tasks or as child processes of the same binary.

pub mod config;
pub mod pipeline;

pub use config::{ConfigError, SieveConfig, Substrate};
pub use pipeline::{PipelineError, PipelineResult, collect_primes, run_pipeline};
