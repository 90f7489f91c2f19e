// src/config/mod.rs

//! Configuration loading and validation for snapcheck.
//!
//! - The TOML-backed data model lives in `model.rs`.
//! - Loading from disk is in `loader.rs`.
//! - `validate.rs` turns a `RawConfigFile` into a checked `ConfigFile`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, parse_str};
pub use model::{
    ConfigFile, ConfigSection, DefaultSection, FilePropertyConfig, RawConfigFile, TaskConfig,
};
