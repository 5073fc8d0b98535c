//! Bot API wire types, limited to what the relay reads and writes.

use serde::{Deserialize, Serialize};

/// The only update type the relay subscribes to.
pub const CHANNEL_POST_UPDATE: &str = "channel_post";

/// Body of `getUpdates`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetUpdatesRequest {
    pub offset: i64,
    pub timeout: u64,
    pub allowed_updates: Vec<String>,
}

impl GetUpdatesRequest {
    /// Long-poll for channel posts starting at `offset`.
    #[must_use]
    pub fn channel_posts(offset: i64, timeout: u64) -> Self {
        Self {
            offset,
            timeout,
            allowed_updates: vec![CHANNEL_POST_UPDATE.to_string()],
        }
    }
}

/// Body of `sendMessage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub chat_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_post: Option<ChannelPost>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPost {
    /// Numbered per chat, so only unique together with `chat.id`.
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<Chat>,
    /// Seconds since the epoch.
    #[serde(default)]
    pub date: i64,
    /// Absent for photos, stickers and other non-text posts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Envelope every Bot API method answers with.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
}
