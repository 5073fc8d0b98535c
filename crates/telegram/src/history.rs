//! Persisted message history.
//!
//! Besides the current record shape, the `messages` key may still hold raw
//! channel posts tagged with a bubble `position` (`"right"` for the local
//! user). Those are migrated on read.

use {
    duplex_store::{KvStore, MESSAGES_KEY},
    serde::Deserialize,
    tracing::{debug, warn},
};

use crate::{
    Result,
    classify::{ChannelMessage, Direction, split_framed},
    types::Chat,
};

/// Key an unreadable history value is copied to before it can be
/// overwritten.
pub const UNREADABLE_MESSAGES_KEY: &str = "messages-unreadable";

/// What the store holds under [`MESSAGES_KEY`].
#[derive(Debug, PartialEq, Eq)]
pub enum StoredHistory {
    Absent,
    Loaded(Vec<ChannelMessage>),
    /// Present but in no known shape.
    Unreadable { raw: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredMessage {
    Current(ChannelMessage),
    Post(StoredPost),
}

/// A channel post as stored before classification was persisted.
#[derive(Deserialize)]
struct StoredPost {
    message_id: i64,
    #[serde(default)]
    chat: Option<Chat>,
    #[serde(default)]
    date: i64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    position: Option<String>,
}

impl From<StoredMessage> for ChannelMessage {
    fn from(stored: StoredMessage) -> Self {
        match stored {
            StoredMessage::Current(message) => message,
            StoredMessage::Post(post) => {
                let (label, body) = split_framed(&post.text);
                let direction = if post.position.as_deref() == Some("right") {
                    Direction::Outgoing
                } else {
                    Direction::Incoming
                };
                Self {
                    chat_id: post.chat.map_or(0, |chat| chat.id),
                    id: post.message_id,
                    sender_label: label.to_string(),
                    body: body.to_string(),
                    timestamp: post.date,
                    direction,
                }
            },
        }
    }
}

/// Read and decode the persisted history.
pub fn read_history(store: &dyn KvStore) -> Result<StoredHistory> {
    let Some(raw) = store.get(MESSAGES_KEY)? else {
        return Ok(StoredHistory::Absent);
    };
    match serde_json::from_str::<Vec<StoredMessage>>(&raw) {
        Ok(stored) => {
            let messages: Vec<ChannelMessage> = stored.into_iter().map(Into::into).collect();
            debug!(count = messages.len(), "loaded message history");
            Ok(StoredHistory::Loaded(messages))
        },
        Err(e) => {
            debug!(error = %e, "message history has an unknown shape");
            Ok(StoredHistory::Unreadable { raw })
        },
    }
}

/// Read the persisted history for display. Absent, unreadable or malformed
/// history is an empty one.
pub fn load_history(store: &dyn KvStore) -> Vec<ChannelMessage> {
    match read_history(store) {
        Ok(StoredHistory::Loaded(messages)) => messages,
        Ok(StoredHistory::Absent) => Vec::new(),
        Ok(StoredHistory::Unreadable { .. }) => {
            warn!("invalid saved message history, starting empty");
            Vec::new()
        },
        Err(e) => {
            warn!(error = %e, "failed to read message history");
            Vec::new()
        },
    }
}

/// Copy an unreadable history value to [`UNREADABLE_MESSAGES_KEY`].
pub fn set_aside(store: &dyn KvStore, raw: &str) -> Result<()> {
    store.set(UNREADABLE_MESSAGES_KEY, raw)?;
    Ok(())
}

/// Overwrite the persisted history with `messages`.
pub fn save_history(store: &dyn KvStore, messages: &[ChannelMessage]) -> Result<()> {
    let json = serde_json::to_string(messages)?;
    store.set(MESSAGES_KEY, &json)?;
    Ok(())
}
