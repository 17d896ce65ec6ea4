//! CLI command implementations

mod config;
mod run;
mod stage;

pub use config::{cmd_config_init, cmd_config_show};
pub use run::{RunArgs, cmd_run};
pub use stage::cmd_stage;
