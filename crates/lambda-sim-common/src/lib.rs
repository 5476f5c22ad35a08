//! Common types, errors, and configuration for lambda-sim.
//!
//! This crate provides shared functionality used across the lambda-sim workspace:
//! - Error types using `thiserror`
//! - Simulator configuration and TOML config-file loading

pub mod config;
pub mod config_file;
pub mod error;

pub use config::SimulatorConfig;
pub use config_file::{ConfigFile, ConfigFileError, ServerConfigFile};
pub use error::{BoxError, SimulatorError};
