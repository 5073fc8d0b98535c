//! Relay configuration: the user's credentials, their versioned persisted
//! form, shareable links, and the process settings file.
//!
//! Settings files: `duplex.toml` or `duplex.json`, searched in `./` then
//! `~/.config/duplex/`. Supports `${ENV_VAR}` substitution.

pub mod env_subst;
pub mod error;
pub mod link;
pub mod loader;
pub mod manager;
pub mod migrate;
pub mod schema;
pub mod settings;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{config_dir, data_dir, discover_and_load},
    manager::ConfigManager,
    migrate::{CURRENT_SCHEMA_VERSION, SchemaVersion},
    schema::{ConfigField, Configuration},
    settings::DuplexSettings,
    validate::{ValidationErrors, validate},
};
