//! Configuration for the sieve with per-project overrides.
//!
//! Config priority: explicit path > project-relative (./primes.toml) > user
//! (~/.config/primes/config.toml) > defaults.

use std::{
  fmt,
  ops::RangeInclusive,
  path::{Path, PathBuf},
  str::FromStr,
};

use serde::{Deserialize, Serialize};

/// Project-relative config file name
pub const PROJECT_CONFIG_FILE: &str = "primes.toml";

// ============================================================================
// Range Configuration
// ============================================================================

/// Inclusive range of primes to report; the source always sieves from 2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
  /// Smallest prime reported (must be at least 2)
  pub lo: u32,
  /// Largest value tested; a range with `hi < lo` is empty
  pub hi: u32,
}

impl Default for RangeConfig {
  fn default() -> Self {
    Self { lo: 2, hi: 35 }
  }
}

impl RangeConfig {
  pub fn bounds(&self) -> RangeInclusive<u32> {
    self.lo..=self.hi
  }
}

// ============================================================================
// Pipeline Configuration
// ============================================================================

/// Where stages run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Substrate {
  /// One tokio task per stage, bounded in-memory channels
  #[default]
  Task,
  /// One child process per stage, OS pipes
  Process,
}

impl fmt::Display for Substrate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Substrate::Task => write!(f, "task"),
      Substrate::Process => write!(f, "process"),
    }
  }
}

impl FromStr for Substrate {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "task" => Ok(Substrate::Task),
      "process" => Ok(Substrate::Process),
      other => Err(ConfigError::UnknownSubstrate(other.to_string())),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Values in flight per channel (task substrate; pipes use the OS buffer)
  pub capacity: usize,
  pub substrate: Substrate,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      capacity: 32,
      substrate: Substrate::Task,
    }
  }
}

// ============================================================================
// Logging Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
  /// off, error, warn, info, debug or trace (RUST_LOG overrides)
  pub level: String,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: "warn".to_string(),
    }
  }
}

// ============================================================================
// Root Configuration
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SieveConfig {
  #[serde(default)]
  pub range: RangeConfig,

  #[serde(default)]
  pub pipeline: PipelineConfig,

  #[serde(default)]
  pub logging: LoggingConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
  #[error("range must start at 2 or above (got {lo})")]
  InvalidRange { lo: u32 },
  #[error("channel capacity must be at least 1")]
  InvalidCapacity,
  #[error("unknown substrate '{0}' (expected task or process)")]
  UnknownSubstrate(String),
}

impl SieveConfig {
  /// Load config from `explicit` if given, else the project file in
  /// `project_path`, else the user file, else defaults.
  pub fn load(explicit: Option<&Path>, project_path: &Path) -> Result<Self, ConfigError> {
    if let Some(path) = explicit {
      return Self::load_file(path);
    }

    let project_config = Self::project_config_path(project_path);
    if project_config.exists() {
      return Self::load_file(&project_config);
    }

    if let Some(user_config) = Self::user_config_path()
      && user_config.exists()
    {
      return Self::load_file(&user_config);
    }

    Ok(Self::default())
  }

  /// Which file [`SieveConfig::load`] would read, if any.
  pub fn resolve_path(explicit: Option<&Path>, project_path: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
      return Some(path.to_path_buf());
    }
    let project_config = Self::project_config_path(project_path);
    if project_config.exists() {
      return Some(project_config);
    }
    Self::user_config_path().filter(|p| p.exists())
  }

  pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Get the user-level config path
  pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CONFIG_DIR") {
      return Some(PathBuf::from(path).join("config.toml"));
    }

    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
      return Some(PathBuf::from(path).join("primes").join("config.toml"));
    }

    dirs::config_dir().map(|p: PathBuf| p.join("primes").join("config.toml"))
  }

  /// Get the project-relative config path
  pub fn project_config_path(project_path: &Path) -> PathBuf {
    project_path.join(PROJECT_CONFIG_FILE)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.range.lo < 2 {
      return Err(ConfigError::InvalidRange { lo: self.range.lo });
    }
    if self.pipeline.capacity == 0 {
      return Err(ConfigError::InvalidCapacity);
    }
    Ok(())
  }

  /// Generate a default config file as a string
  pub fn generate_template() -> String {
    let defaults = Self::default();
    format!(
      r#"# Prime sieve configuration
# Place in ./{PROJECT_CONFIG_FILE} (project) or ~/.config/primes/config.toml (user)

[range]
# Primes in lo..=hi are printed; stages always sieve from 2 (lo must be >= 2)
lo = {lo}
hi = {hi}

[pipeline]
# Values in flight per inter-stage channel (task substrate only)
capacity = {capacity}
# task    = one tokio task per stage
# process = one child process per stage, connected by pipes
substrate = "{substrate}"

[logging]
# off, error, warn, info, debug, trace (RUST_LOG overrides)
level = "{level}"
"#,
      lo = defaults.range.lo,
      hi = defaults.range.hi,
      capacity = defaults.pipeline.capacity,
      substrate = defaults.pipeline.substrate,
      level = defaults.logging.level,
    )
  }
}
