//! Turning raw channel posts into chat messages.
//!
//! Every relayed post is framed as `<sender>:\n<body>`; the first line names
//! the sender and decides which side of the chat the message belongs to.

use serde::{Deserialize, Serialize};

use crate::types::ChannelPost;

/// Character that terminates the sender label on the first line.
pub const LABEL_SEPARATOR: char = ':';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Written by the local user.
    Outgoing,
    Incoming,
}

/// A classified post, as kept in history. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMessage {
    /// Channel the post was made in. Ids repeat across channels.
    #[serde(default)]
    pub chat_id: i64,
    pub id: i64,
    pub sender_label: String,
    pub body: String,
    /// Seconds since the epoch.
    pub timestamp: i64,
    pub direction: Direction,
}

impl ChannelMessage {
    /// Identity of the underlying post.
    #[must_use]
    pub fn key(&self) -> (i64, i64) {
        (self.chat_id, self.id)
    }
}

/// Frame `body` the way [`classify`] parses it back out.
#[must_use]
pub fn frame(sender: &str, body: &str) -> String {
    format!("{sender}{LABEL_SEPARATOR}\n{body}")
}

/// Split framed text into `(sender_label, body)`.
#[must_use]
pub fn split_framed(text: &str) -> (&str, &str) {
    let (first, body) = text.split_once('\n').unwrap_or((text, ""));
    let first = first.strip_suffix('\r').unwrap_or(first);
    let label = first.strip_suffix(LABEL_SEPARATOR).unwrap_or(first);
    (label, body)
}

/// Classify a post relative to the local user's name. Posts without text
/// (heartbeats, media) yield `None`.
#[must_use]
pub fn classify(post: &ChannelPost, local_name: &str) -> Option<ChannelMessage> {
    let text = post.text.as_deref().filter(|t| !t.is_empty())?;
    let (label, body) = split_framed(text);
    let direction = if label == local_name {
        Direction::Outgoing
    } else {
        Direction::Incoming
    };
    Some(ChannelMessage {
        chat_id: post.chat.map_or(0, |chat| chat.id),
        id: post.message_id,
        sender_label: label.to_string(),
        body: body.to_string(),
        timestamp: post.date,
        direction,
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::types::Chat, rstest::rstest};

    fn post(text: Option<&str>) -> ChannelPost {
        ChannelPost {
            message_id: 42,
            chat: Some(Chat { id: -100_200 }),
            date: 1_700_000_000,
            text: text.map(str::to_string),
        }
    }

    #[test]
    fn own_message_is_outgoing() {
        let msg = classify(&post(Some("Alice:\nHello there")), "Alice").unwrap();
        assert_eq!(msg.sender_label, "Alice");
        assert_eq!(msg.body, "Hello there");
        assert_eq!(msg.direction, Direction::Outgoing);
        assert_eq!(msg.id, 42);
        assert_eq!(msg.timestamp, 1_700_000_000);
    }

    #[test]
    fn other_message_is_incoming() {
        let msg = classify(&post(Some("Alice:\nHello there")), "Bob").unwrap();
        assert_eq!(msg.sender_label, "Alice");
        assert_eq!(msg.direction, Direction::Incoming);
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    fn textless_posts_are_dropped(#[case] text: Option<&str>) {
        assert!(classify(&post(text), "Alice").is_none());
    }

    #[rstest]
    #[case("Alice:\nline one\nline two", "Alice", "line one\nline two")]
    #[case("Alice:", "Alice", "")]
    #[case("Alice:\r\nbody", "Alice", "body")]
    #[case("no framing here", "no framing here", "")]
    #[case("a:b:\nbody", "a:b", "body")]
    fn splits_label_and_body(#[case] text: &str, #[case] label: &str, #[case] body: &str) {
        assert_eq!(split_framed(text), (label, body));
    }

    #[test]
    fn frame_is_parsed_back() {
        let framed = frame("Alice", "multi\nline");
        assert_eq!(framed, "Alice:\nmulti\nline");
        assert_eq!(split_framed(&framed), ("Alice", "multi\nline"));
    }

    #[test]
    fn history_record_shape() {
        let msg = classify(&post(Some("Bob:\nhi")), "Alice").unwrap();
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "chatId": -100_200,
                "id": 42,
                "senderLabel": "Bob",
                "body": "hi",
                "timestamp": 1_700_000_000,
                "direction": "incoming"
            })
        );
    }
}
