use std::path::PathBuf;

use crate::validate::ValidationErrors;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The persisted record is not a JSON object carrying a version tag,
    /// or a field has the wrong type.
    #[error("malformed configuration record: {message}")]
    MalformedRecord { message: String },

    /// No migration is registered for this schema version.
    #[error("unknown configuration schema version: {version}")]
    UnknownSchemaVersion { version: u64 },

    /// One or more fields failed validation; nothing was persisted.
    #[error("configuration is invalid: {}", summarize(.errors))]
    Validation { errors: ValidationErrors },

    #[error("unknown configuration field: {name}")]
    UnknownField { name: String },

    #[error("invalid link: {message}")]
    InvalidLink { message: String },

    #[error("failed to load settings from {}: {message}", .path.display())]
    Settings { path: PathBuf, message: String },

    #[error(transparent)]
    Store(#[from] duplex_store::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn malformed(message: impl std::fmt::Display) -> Self {
        Self::MalformedRecord {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn invalid_link(message: impl std::fmt::Display) -> Self {
        Self::InvalidLink {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn settings(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::Settings {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

fn summarize(errors: &ValidationErrors) -> String {
    errors.values().cloned().collect::<Vec<_>>().join("; ")
}
