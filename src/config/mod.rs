//! Configuration module for assetflow
//!
//! Provides types and parsing for `assetflow.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::{
    default_config, find_config, find_config_from, load_config, merge_cli_overrides, project_root,
    CliOverrides, ConfigError, CONFIG_FILE_NAME,
};
pub use schema::*;
