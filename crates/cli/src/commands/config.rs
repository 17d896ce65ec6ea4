//! `primes config` subcommands

use std::{path::Path, process::ExitCode};

use anyhow::{Result, bail};
use sieve::SieveConfig;

/// Show the effective configuration as TOML
pub fn cmd_config_show(explicit: Option<&Path>) -> Result<ExitCode> {
  let cwd = std::env::current_dir()?;
  let config = SieveConfig::load(explicit, &cwd)?;

  match SieveConfig::resolve_path(explicit, &cwd) {
    Some(path) => println!("# Using config: {}", path.display()),
    None => println!("# Using default configuration (no config file found)"),
  }
  println!();

  let toml_str = toml::to_string_pretty(&config)?;
  println!("{}", toml_str);

  Ok(ExitCode::SUCCESS)
}

/// Write a default project configuration file
pub fn cmd_config_init(force: bool) -> Result<ExitCode> {
  let cwd = std::env::current_dir()?;
  let config_path = SieveConfig::project_config_path(&cwd);

  if config_path.exists() && !force {
    bail!(
      "config already exists at {} (use --force to overwrite)",
      config_path.display()
    );
  }

  std::fs::write(&config_path, SieveConfig::generate_template())?;
  println!("Created {}", config_path.display());

  Ok(ExitCode::SUCCESS)
}
