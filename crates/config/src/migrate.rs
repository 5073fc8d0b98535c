//! Versioned persistence of the configuration record.
//!
//! Every persisted record carries an integer `schemaVersion` tag. Reading a
//! record dispatches on the tag to exactly one migration that produces the
//! current [`Configuration`]. A new schema version adds a variant and a
//! migration; existing migrations are never rewritten.

use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

use crate::{
    Error, Result,
    schema::{ConfigField, Configuration},
};

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: SchemaVersion = SchemaVersion::V1;

/// Tag key on persisted records.
const SCHEMA_VERSION_KEY: &str = "schemaVersion";

/// Tag key used by records written before `schemaVersion` existed.
const LEGACY_VERSION_KEY: &str = "version";

/// Known persisted schema versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    V1,
}

impl SchemaVersion {
    #[must_use]
    pub fn number(self) -> u64 {
        match self {
            Self::V1 => 1,
        }
    }
}

impl TryFrom<u64> for SchemaVersion {
    type Error = Error;

    fn try_from(version: u64) -> Result<Self> {
        match version {
            1 => Ok(Self::V1),
            version => Err(Error::UnknownSchemaVersion { version }),
        }
    }
}

/// Parse persisted text and migrate it to the current shape.
pub fn load_record(raw: &str) -> Result<Configuration> {
    let value: Value = serde_json::from_str(raw).map_err(Error::malformed)?;
    let Value::Object(mut record) = value else {
        return Err(Error::malformed("record is not an object"));
    };

    let version = take_version(&mut record)?;
    migrate(SchemaVersion::try_from(version)?, record)
}

/// Serialize `config` tagged with [`CURRENT_SCHEMA_VERSION`].
pub fn to_record(config: &Configuration) -> Result<String> {
    #[derive(Serialize)]
    struct Tagged<'a> {
        #[serde(rename = "schemaVersion")]
        schema_version: u64,
        #[serde(flatten)]
        config: &'a Configuration,
    }

    Ok(serde_json::to_string(&Tagged {
        schema_version: CURRENT_SCHEMA_VERSION.number(),
        config,
    })?)
}

fn take_version(record: &mut Map<String, Value>) -> Result<u64> {
    let tag = record
        .remove(SCHEMA_VERSION_KEY)
        .or_else(|| record.remove(LEGACY_VERSION_KEY))
        .ok_or_else(|| Error::malformed("record has no schema version"))?;
    tag.as_u64()
        .ok_or_else(|| Error::malformed(format!("schema version is not an integer: {tag}")))
}

fn migrate(version: SchemaVersion, record: Map<String, Value>) -> Result<Configuration> {
    match version {
        SchemaVersion::V1 => migrate_v1(record),
    }
}

/// Version 1 stored the five fields flat. Anything else is dropped.
#[derive(Deserialize, Default)]
#[serde(default)]
struct RecordV1 {
    name: String,
    #[serde(rename = "senderBotToken")]
    sender_bot_token: String,
    #[serde(rename = "receiverBotToken")]
    receiver_bot_token: String,
    #[serde(rename = "senderChannelID")]
    sender_channel_id: String,
    #[serde(rename = "receiverChannelID")]
    receiver_channel_id: String,
}

fn migrate_v1(record: Map<String, Value>) -> Result<Configuration> {
    let v1: RecordV1 = serde_json::from_value(Value::Object(record)).map_err(Error::malformed)?;

    let mut config = Configuration::default();
    config.set(ConfigField::Name, v1.name);
    config.set(ConfigField::SenderBotToken, v1.sender_bot_token);
    config.set(ConfigField::ReceiverBotToken, v1.receiver_bot_token);
    config.set(ConfigField::SenderChannelId, v1.sender_channel_id);
    config.set(ConfigField::ReceiverChannelId, v1.receiver_channel_id);
    Ok(config)
}
