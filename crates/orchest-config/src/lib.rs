//! Process-wide configuration for the pipeline run orchestrator.
//!
//! Everything here is read once at startup (see `Config::from_env`) and
//! threaded through as an immutable value rather than touched as a global.

mod config;
mod error;

pub use config::Config;
pub use error::ConfigError;
