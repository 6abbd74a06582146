pub mod config;
pub mod logging;
pub mod runner;

pub use config::{Config, ConfigError};
pub use runner::{run, RunError, RunOptions, RunSummary};
