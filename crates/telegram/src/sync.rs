//! Long-poll synchronizer: pulls channel posts, classifies them, appends
//! them to history and persists the result.
//!
//! One round is one `getUpdates` call. Rounds run strictly one after the
//! other, so the cursor and history are only ever touched by the round in
//! progress. The loop stops when its [`CancellationToken`] fires; a response
//! that lands after cancellation is discarded without touching the cursor.

use std::{collections::HashSet, sync::Arc, time::Duration};

use {
    duplex_config::{Configuration, settings::DEFAULT_POLL_TIMEOUT_SECS},
    duplex_store::KvStore,
    secrecy::{ExposeSecret, Secret},
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    Error, Result,
    api::BotApi,
    classify::{ChannelMessage, classify},
    history::{StoredHistory, read_history, save_history, set_aside},
    types::{GetUpdatesRequest, Update},
};

/// Lifecycle of the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No credential yet.
    Idle,
    /// Credential set, persisted history not loaded yet. Polling would risk
    /// overwriting a longer saved history with an empty buffer.
    Suspended,
    Polling,
}

/// Position in the provider's update stream.
#[derive(Debug, Clone, Default)]
pub struct SyncCursor {
    /// Smallest update id not yet acknowledged. Never decreases.
    pub offset: i64,
    /// Completed poll rounds, seeded to 1 by [`Synchronizer::start`].
    pub generation: u64,
    credential: Option<Secret<String>>,
}

impl SyncCursor {
    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }
}

/// Outcome of one poll round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundReport {
    /// Messages appended to history this round.
    pub appended: usize,
    pub offset: i64,
    pub generation: u64,
    /// The transport call failed; the round counted as zero updates.
    pub failed: bool,
}

pub struct Synchronizer {
    api: Arc<dyn BotApi>,
    store: Arc<dyn KvStore>,
    local_name: String,
    poll_timeout_secs: u64,
    failure_backoff: Duration,
    cursor: SyncCursor,
    history: Vec<ChannelMessage>,
    /// `(chat_id, id)` of every message in `history`.
    seen: HashSet<(i64, i64)>,
    history_loaded: bool,
    /// Cleared when the stored history could be neither read nor set
    /// aside, so it is never overwritten.
    persist: bool,
    listener: Option<mpsc::UnboundedSender<ChannelMessage>>,
}

impl Synchronizer {
    /// `local_name` decides which posts are classified as outgoing.
    pub fn new(api: Arc<dyn BotApi>, store: Arc<dyn KvStore>, local_name: impl Into<String>) -> Self {
        Self {
            api,
            store,
            local_name: local_name.into(),
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            failure_backoff: Duration::ZERO,
            cursor: SyncCursor::default(),
            history: Vec::new(),
            seen: HashSet::new(),
            history_loaded: false,
            persist: true,
            listener: None,
        }
    }

    /// Build a synchronizer for `config`, started with its receiver token.
    pub fn for_config(
        api: Arc<dyn BotApi>,
        store: Arc<dyn KvStore>,
        config: &Configuration,
    ) -> Result<Self> {
        if !config.is_complete() {
            return Err(Error::IncompleteConfiguration);
        }
        let mut sync = Self::new(api, store, config.name.clone());
        sync.start(config.receiver_bot_token.clone());
        Ok(sync)
    }

    #[must_use]
    pub fn with_poll_timeout(mut self, secs: u64) -> Self {
        self.poll_timeout_secs = secs;
        self
    }

    /// Pause after a failed round. Zero (the default) polls again at once.
    #[must_use]
    pub fn with_failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = backoff;
        self
    }

    /// Receive every message as it is appended.
    #[must_use]
    pub fn with_listener(mut self, listener: mpsc::UnboundedSender<ChannelMessage>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Record the receiver credential and seed the generation counter.
    ///
    /// A different credential means a different update stream, so the
    /// offset restarts at 0.
    pub fn start(&mut self, credential: Secret<String>) {
        let same_stream = self
            .cursor
            .credential
            .as_ref()
            .is_some_and(|c| c.expose_secret() == credential.expose_secret());
        if !same_stream {
            self.cursor.offset = 0;
        }
        self.cursor.credential = Some(credential);
        self.cursor.generation = 1;
        debug!(state = ?self.state(), "synchronizer started");
    }

    /// Load persisted history into memory. Must happen before the first
    /// round's results are accepted.
    ///
    /// History in an unknown shape is copied to
    /// [`UNREADABLE_MESSAGES_KEY`](crate::history::UNREADABLE_MESSAGES_KEY)
    /// and polling starts from an empty buffer. If that copy, or the read
    /// itself, fails, history is kept in memory only for this run.
    pub fn load_history(&mut self) {
        let persisted = match read_history(self.store.as_ref()) {
            Ok(StoredHistory::Loaded(messages)) => messages,
            Ok(StoredHistory::Absent) => Vec::new(),
            Ok(StoredHistory::Unreadable { raw }) => {
                match set_aside(self.store.as_ref(), &raw) {
                    Ok(()) => warn!("invalid saved message history set aside, starting empty"),
                    Err(e) => {
                        warn!(
                            error = %e,
                            "invalid saved message history, not saving history this run"
                        );
                        self.persist = false;
                    },
                }
                Vec::new()
            },
            Err(e) => {
                warn!(
                    error = %e,
                    "failed to read message history, not saving history this run"
                );
                self.persist = false;
                Vec::new()
            },
        };
        // Anything already received this run stays after the persisted part.
        let received = std::mem::replace(&mut self.history, persisted);
        self.seen = self.history.iter().map(ChannelMessage::key).collect();
        for message in received {
            if self.seen.insert(message.key()) {
                self.history.push(message);
            }
        }
        self.history_loaded = true;
        debug!(count = self.history.len(), state = ?self.state(), "history loaded");
    }

    pub fn state(&self) -> SyncState {
        match (self.cursor.has_credential(), self.history_loaded) {
            (false, _) => SyncState::Idle,
            (true, false) => SyncState::Suspended,
            (true, true) => SyncState::Polling,
        }
    }

    pub fn history(&self) -> &[ChannelMessage] {
        &self.history
    }

    pub fn cursor(&self) -> &SyncCursor {
        &self.cursor
    }

    /// Run one poll round.
    ///
    /// Transport failures are not errors: the round counts as empty and the
    /// generation still advances. Errors are `NotReady` and `Cancelled`.
    pub async fn poll_once(&mut self, cancel: &CancellationToken) -> Result<RoundReport> {
        let state = self.state();
        if state != SyncState::Polling {
            return Err(Error::NotReady { state });
        }
        let Some(token) = self
            .cursor
            .credential
            .as_ref()
            .map(|c| c.expose_secret().clone())
        else {
            return Err(Error::NotReady { state });
        };

        let request = GetUpdatesRequest::channel_posts(self.cursor.offset, self.poll_timeout_secs);
        let api = Arc::clone(&self.api);
        let fetched = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            fetched = api.get_updates(&token, &request) => fetched,
        };
        if cancel.is_cancelled() {
            debug!(offset = self.cursor.offset, "discarding response after cancellation");
            return Err(Error::Cancelled);
        }

        let (updates, failed) = match fetched {
            Ok(updates) => (updates, false),
            Err(e) => {
                warn!(error = %e, offset = self.cursor.offset, "telegram getUpdates failed");
                (Vec::new(), true)
            },
        };

        let appended = self.apply(updates);

        if self.persist
            && self.cursor.offset > 0
            && let Err(e) = save_history(self.store.as_ref(), &self.history)
        {
            warn!(error = %e, "failed to persist message history");
        }

        self.cursor.generation += 1;
        let report = RoundReport {
            appended,
            offset: self.cursor.offset,
            generation: self.cursor.generation,
            failed,
        };
        debug!(?report, "poll round complete");
        Ok(report)
    }

    /// Poll until `cancel` fires.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        info!(
            offset = self.cursor.offset,
            history = self.history.len(),
            "starting channel sync loop"
        );
        loop {
            match self.poll_once(&cancel).await {
                Ok(report) if report.failed && !self.failure_backoff.is_zero() => {
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(self.failure_backoff) => {},
                    }
                },
                Ok(_) => {},
                Err(Error::Cancelled) => break,
                Err(e) => return Err(e),
            }
        }
        info!(
            offset = self.cursor.offset,
            generation = self.cursor.generation,
            "channel sync loop stopped"
        );
        Ok(())
    }

    /// Classify and append in received order, then advance the offset past
    /// the highest update id seen. Returns the number appended.
    fn apply(&mut self, updates: Vec<Update>) -> usize {
        let Some(highest) = updates.iter().map(|u| u.update_id).max() else {
            return 0;
        };

        let mut appended = 0;
        for update in updates {
            let Some(message) = update
                .channel_post
                .as_ref()
                .and_then(|post| classify(post, &self.local_name))
            else {
                debug!(update_id = update.update_id, "ignoring update without text");
                continue;
            };
            if !self.seen.insert(message.key()) {
                debug!(
                    chat_id = message.chat_id,
                    id = message.id,
                    "ignoring already received message"
                );
                continue;
            }
            if let Some(listener) = &self.listener {
                let _ = listener.send(message.clone());
            }
            self.history.push(message);
            appended += 1;
        }

        self.cursor.offset = self.cursor.offset.max(highest + 1);
        appended
    }
}
