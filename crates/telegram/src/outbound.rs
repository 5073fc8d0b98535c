//! Outbound relay: frame a composed message and post it to the channels.

use std::sync::Arc;

use {
    duplex_config::Configuration,
    futures::future::join_all,
    secrecy::ExposeSecret,
    tracing::{debug, info, warn},
};

use crate::{Error, Result, api::BotApi, classify::frame, types::SendMessageRequest};

/// When the two channels differ, post a second copy of each message.
///
/// The copy goes to the sender channel under the sender credential again,
/// not to the receiver channel. Flip to `false` to post exactly once.
pub const MIRROR_TO_SENDER_CHANNEL: bool = true;

/// Bare channel names get an `@` prefix; `@name` and numeric `-100…` ids
/// pass through unchanged.
#[must_use]
pub fn normalize_chat_id(channel: &str) -> String {
    let channel = channel.trim();
    if channel.starts_with('@') || channel.starts_with('-') {
        channel.to_string()
    } else {
        format!("@{channel}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank body; nothing was posted.
    Skipped,
    Sent { deliveries: usize },
}

pub struct Relay {
    api: Arc<dyn BotApi>,
}

impl Relay {
    pub fn new(api: Arc<dyn BotApi>) -> Self {
        Self { api }
    }

    /// Post `body` framed with the local user's name.
    ///
    /// All posts are issued together. If any of them fails the whole send
    /// fails once with [`Error::SendFailed`]; posts that did go through stay.
    pub async fn send(&self, config: &Configuration, body: &str) -> Result<SendOutcome> {
        if body.trim().is_empty() {
            debug!("ignoring blank message");
            return Ok(SendOutcome::Skipped);
        }
        if !config.is_complete() {
            return Err(Error::IncompleteConfiguration);
        }

        let token = config.sender_bot_token.expose_secret();
        let request = SendMessageRequest {
            chat_id: normalize_chat_id(&config.sender_channel_id),
            text: frame(&config.name, body),
        };
        let copies = if MIRROR_TO_SENDER_CHANNEL
            && config.receiver_channel_id.trim() != config.sender_channel_id.trim()
        {
            2
        } else {
            1
        };

        let results = join_all((0..copies).map(|_| self.api.send_message(token, &request))).await;
        if let Some(e) = results.into_iter().find_map(|r| r.err()) {
            warn!(error = %e, chat_id = %request.chat_id, "failed to relay message");
            return Err(Error::SendFailed {
                body: body.to_string(),
                source: Box::new(e),
            });
        }

        info!(chat_id = %request.chat_id, deliveries = copies, "message relayed");
        Ok(SendOutcome::Sent { deliveries: copies })
    }
}
