//! Field validation for the relay configuration.

use std::collections::BTreeMap;

use crate::schema::{ConfigField, Configuration};

/// Error message per failing field. Empty means valid.
pub type ValidationErrors = BTreeMap<ConfigField, String>;

/// Check every field independently so a single save surfaces all problems.
#[must_use]
pub fn validate(config: &Configuration) -> ValidationErrors {
    ConfigField::ALL
        .into_iter()
        .filter(|field| config.get(*field).trim().is_empty())
        .map(|field| (field, format!("{} is empty", field.label())))
        .collect()
}
