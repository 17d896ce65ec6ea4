//! Logging setup for the sieve binary
//!
//! Stdout carries only `prime N` lines, so every log line goes to stderr. Stage
//! processes inherit stderr and `RUST_LOG`, so a whole process chain logs to one
//! stream.

use std::io::IsTerminal;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Parse log level from config string
pub fn parse_log_level(level: &str) -> LevelFilter {
  match level.to_lowercase().as_str() {
    "off" => LevelFilter::OFF,
    "error" => LevelFilter::ERROR,
    "warn" => LevelFilter::WARN,
    "info" => LevelFilter::INFO,
    "debug" => LevelFilter::DEBUG,
    "trace" => LevelFilter::TRACE,
    _ => LevelFilter::WARN,
  }
}

/// Initialize stderr logging at `level` (RUST_LOG overrides).
pub fn init_logging(level: &str) {
  let env_filter = EnvFilter::builder()
    .with_default_directive(parse_log_level(level).into())
    .from_env_lossy();

  tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_target(true)
    .with_ansi(std::io::stderr().is_terminal())
    .with_writer(std::io::stderr)
    .init();
}
