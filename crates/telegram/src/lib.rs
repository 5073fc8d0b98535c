//! Telegram side of the duplex relay.
//!
//! Two channels act as a pair of one-way mailboxes. The [`Synchronizer`]
//! long-polls the receiver bot for channel posts and keeps an append-only
//! history; the [`Relay`] posts composed messages through the sender bot.
//! Both talk to the Bot API through the [`BotApi`] seam.

pub mod api;
pub mod classify;
pub mod error;
pub mod history;
pub mod outbound;
pub mod sync;
pub mod types;

#[cfg(test)]
mod testing;

pub use {
    api::{BotApi, HttpBotApi},
    classify::{ChannelMessage, Direction},
    error::{Error, Result},
    outbound::{Relay, SendOutcome},
    sync::{RoundReport, SyncState, Synchronizer},
};
