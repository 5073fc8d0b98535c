use thiserror::Error;

use crate::sync::SyncState;

#[derive(Debug, Error)]
pub enum Error {
    /// Network failure, non-2xx status, `ok: false`, or an undecodable body.
    #[error("telegram {method} failed: {message}")]
    Transport {
        method: &'static str,
        message: String,
    },

    #[error("configuration is incomplete")]
    IncompleteConfiguration,

    /// Polling needs both a credential and loaded history.
    #[error("synchronizer is not ready to poll (state: {state:?})")]
    NotReady { state: SyncState },

    #[error("poll round cancelled")]
    Cancelled,

    /// A relayed message did not reach every target.
    #[error("Failed to send: {body}")]
    SendFailed {
        body: String,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Store(#[from] duplex_store::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn transport(method: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Transport {
            method,
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
