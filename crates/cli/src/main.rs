//! primes CLI - prime sieve built from a recursive chain of filter stages

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod logging;

use commands::{RunArgs, cmd_config_init, cmd_config_show, cmd_run, cmd_stage};

#[derive(Parser)]
#[command(name = "primes")]
#[command(about = "Print the primes in a range using a recursive pipeline of filter stages")]
#[command(after_help = "\
EXAMPLES:
  primes                          # primes from 2 to 35
  primes --hi 1000                # primes from 2 to 1000
  primes --substrate process      # one OS process per stage
  primes config init              # write ./primes.toml")]
struct Cli {
  #[command(flatten)]
  run: RunArgs,

  /// Log level: off, error, warn, info, debug, trace (RUST_LOG overrides)
  #[arg(long, global = true)]
  log_level: Option<String>,

  #[command(subcommand)]
  command: Option<Commands>,
}

/// Subcommands for `primes config`
#[derive(Subcommand)]
pub enum ConfigCommand {
  /// Show current effective configuration
  Show,
  /// Write a default ./primes.toml
  Init {
    /// Overwrite an existing file
    #[arg(long)]
    force: bool,
  },
}

#[derive(Subcommand)]
enum Commands {
  /// Manage configuration
  #[command(after_help = "\
CONFIG LOCATIONS:
  Project: ./primes.toml
  User:    ~/.config/primes/config.toml")]
  Config {
    #[command(subcommand)]
    command: ConfigCommand,
  },
  /// Run one filter stage over framed values on stdin (used by --substrate process)
  #[command(hide = true)]
  Stage {
    /// Position of this stage in the chain
    #[arg(long, default_value_t = 1)]
    depth: usize,
    /// Print only keys at or above this value
    #[arg(long, default_value_t = sieve::pipeline::FIRST_KEY)]
    report_from: u32,
  },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
  let cli = Cli::parse();

  match cli.command {
    None => cmd_run(cli.run, cli.log_level).await,
    Some(Commands::Stage { depth, report_from }) => cmd_stage(depth, report_from, cli.log_level).await,
    Some(Commands::Config { command }) => match command {
      ConfigCommand::Show => cmd_config_show(cli.run.config.as_deref()),
      ConfigCommand::Init { force } => cmd_config_init(force),
    },
  }
}
