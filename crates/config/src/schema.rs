//! The relay configuration: who the local user is and which bots and
//! channels carry each direction of the conversation.

use std::{fmt, str::FromStr};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use crate::Error;

/// One of the five configuration fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigField {
    Name,
    SenderBotToken,
    ReceiverBotToken,
    SenderChannelId,
    ReceiverChannelId,
}

impl ConfigField {
    pub const ALL: [Self; 5] = [
        Self::Name,
        Self::SenderBotToken,
        Self::ReceiverBotToken,
        Self::SenderChannelId,
        Self::ReceiverChannelId,
    ];

    /// Key used in the persisted record.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::SenderBotToken => "senderBotToken",
            Self::ReceiverBotToken => "receiverBotToken",
            Self::SenderChannelId => "senderChannelID",
            Self::ReceiverChannelId => "receiverChannelID",
        }
    }

    /// Short query-string key used in shareable links.
    #[must_use]
    pub fn link_key(self) -> &'static str {
        match self {
            Self::Name => "n",
            Self::SenderBotToken => "st",
            Self::ReceiverBotToken => "rt",
            Self::SenderChannelId => "sch",
            Self::ReceiverChannelId => "rch",
        }
    }

    /// Human-readable label, as shown next to an input.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::SenderBotToken => "Sender Bot Token",
            Self::ReceiverBotToken => "Receiver Bot Token",
            Self::SenderChannelId => "Sender Channel ID",
            Self::ReceiverChannelId => "Receiver Channel ID",
        }
    }

    #[must_use]
    pub fn is_secret(self) -> bool {
        matches!(self, Self::SenderBotToken | Self::ReceiverBotToken)
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ConfigField {
    type Err = Error;

    /// Accepts the persisted key, the link key, or a snake/kebab-case name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .into_iter()
            .find(|field| {
                normalized == field.key().to_lowercase() || s == field.link_key()
            })
            .ok_or_else(|| Error::UnknownField {
                name: s.to_string(),
            })
    }
}

/// Credentials and identity for both directions of the relay.
///
/// A configuration is complete iff every field is non-empty; nothing that
/// talks to the Bot API may run against an incomplete one.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Display identity of the local user; also the sender label on the wire.
    pub name: String,

    #[serde(rename = "senderBotToken", serialize_with = "serialize_secret")]
    pub sender_bot_token: Secret<String>,

    #[serde(rename = "receiverBotToken", serialize_with = "serialize_secret")]
    pub receiver_bot_token: Secret<String>,

    #[serde(rename = "senderChannelID")]
    pub sender_channel_id: String,

    #[serde(rename = "receiverChannelID")]
    pub receiver_channel_id: String,
}

impl Configuration {
    /// Raw value of `field`. Tokens are exposed.
    #[must_use]
    pub fn get(&self, field: ConfigField) -> &str {
        match field {
            ConfigField::Name => &self.name,
            ConfigField::SenderBotToken => self.sender_bot_token.expose_secret(),
            ConfigField::ReceiverBotToken => self.receiver_bot_token.expose_secret(),
            ConfigField::SenderChannelId => &self.sender_channel_id,
            ConfigField::ReceiverChannelId => &self.receiver_channel_id,
        }
    }

    /// Replace exactly one field.
    pub fn set(&mut self, field: ConfigField, value: impl Into<String>) {
        let value = value.into();
        match field {
            ConfigField::Name => self.name = value,
            ConfigField::SenderBotToken => self.sender_bot_token = Secret::new(value),
            ConfigField::ReceiverBotToken => self.receiver_bot_token = Secret::new(value),
            ConfigField::SenderChannelId => self.sender_channel_id = value,
            ConfigField::ReceiverChannelId => self.receiver_channel_id = value,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        ConfigField::ALL
            .into_iter()
            .all(|field| !self.get(field).is_empty())
    }

    /// Value suitable for display: tokens are masked, keeping the bot id prefix.
    #[must_use]
    pub fn display_value(&self, field: ConfigField) -> String {
        let value = self.get(field);
        if !field.is_secret() || value.is_empty() {
            return value.to_string();
        }
        match value.split_once(':') {
            Some((bot_id, _)) => format!("{bot_id}:********"),
            None => "********".to_string(),
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: String::new(),
            sender_bot_token: Secret::new(String::new()),
            receiver_bot_token: Secret::new(String::new()),
            sender_channel_id: String::new(),
            receiver_channel_id: String::new(),
        }
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        ConfigField::ALL
            .into_iter()
            .all(|field| self.get(field) == other.get(field))
    }
}

impl Eq for Configuration {}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("name", &self.name)
            .field("sender_bot_token", &"[REDACTED]")
            .field("receiver_bot_token", &"[REDACTED]")
            .field("sender_channel_id", &self.sender_channel_id)
            .field("receiver_channel_id", &self.receiver_channel_id)
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
