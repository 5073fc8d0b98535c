//! Scripted [`BotApi`] double shared by the synchronizer and relay tests.

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use {async_trait::async_trait, tokio_util::sync::CancellationToken};

use crate::{
    Error, Result,
    api::BotApi,
    types::{ChannelPost, Chat, GetUpdatesRequest, SendMessageRequest, Update},
};

pub(crate) enum Step {
    Updates(Vec<Update>),
    Fail,
    /// Cancel the token, then answer anyway.
    CancelThenAnswer(CancellationToken, Vec<Update>),
}

#[derive(Default)]
pub(crate) struct ScriptedApi {
    script: Mutex<VecDeque<Step>>,
    /// Cancelled once the script runs dry; the poll then hangs like a held
    /// long-poll request.
    drained: Mutex<Option<CancellationToken>>,
    pub(crate) polls: Mutex<Vec<(String, GetUpdatesRequest)>>,
    pub(crate) sent: Mutex<Vec<(String, SendMessageRequest)>>,
    /// Zero-based index of the `sendMessage` call that should fail.
    fail_send_at: Mutex<Option<usize>>,
    send_calls: AtomicUsize,
}

impl ScriptedApi {
    pub(crate) fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            ..Default::default()
        }
    }

    pub(crate) fn cancel_when_drained(self, cancel: CancellationToken) -> Self {
        *self.drained.lock().unwrap_or_else(|e| e.into_inner()) = Some(cancel);
        self
    }

    pub(crate) fn fail_send_at(self, index: usize) -> Self {
        *self.fail_send_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(index);
        self
    }

    pub(crate) fn poll_offsets(&self) -> Vec<i64> {
        self.polls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, req)| req.offset)
            .collect()
    }

    pub(crate) fn sent(&self) -> Vec<(String, SendMessageRequest)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl BotApi for ScriptedApi {
    async fn get_updates(&self, token: &str, request: &GetUpdatesRequest) -> Result<Vec<Update>> {
        self.polls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((token.to_string(), request.clone()));

        let step = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match step {
            Some(Step::Updates(updates)) => Ok(updates),
            Some(Step::Fail) => Err(Error::transport("getUpdates", "connection reset")),
            Some(Step::CancelThenAnswer(cancel, updates)) => {
                cancel.cancel();
                Ok(updates)
            },
            None => {
                let drained = self
                    .drained
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .clone();
                match drained {
                    Some(cancel) => {
                        cancel.cancel();
                        std::future::pending().await
                    },
                    None => Ok(Vec::new()),
                }
            },
        }
    }

    async fn send_message(&self, token: &str, request: &SendMessageRequest) -> Result<()> {
        let index = self.send_calls.fetch_add(1, Ordering::SeqCst);
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((token.to_string(), request.clone()));
        let fail_at = *self.fail_send_at.lock().unwrap_or_else(|e| e.into_inner());
        if fail_at == Some(index) {
            return Err(Error::transport("sendMessage", "HTTP 502 Bad Gateway"));
        }
        Ok(())
    }
}

/// Chat id used by [`text_update`] and [`media_update`].
pub(crate) const CHANNEL: i64 = -100_111;

/// A text channel post wrapped in an update.
pub(crate) fn text_update(update_id: i64, message_id: i64, text: &str) -> Update {
    text_update_in(CHANNEL, update_id, message_id, text)
}

/// Like [`text_update`], posted in `chat_id`.
pub(crate) fn text_update_in(chat_id: i64, update_id: i64, message_id: i64, text: &str) -> Update {
    Update {
        update_id,
        channel_post: Some(ChannelPost {
            message_id,
            chat: Some(Chat { id: chat_id }),
            date: 1_700_000_000 + message_id,
            text: Some(text.to_string()),
        }),
    }
}

/// A channel post with no text (photo, sticker, ...).
pub(crate) fn media_update(update_id: i64, message_id: i64) -> Update {
    Update {
        update_id,
        channel_post: Some(ChannelPost {
            message_id,
            chat: Some(Chat { id: CHANNEL }),
            date: 1_700_000_000,
            text: None,
        }),
    }
}
