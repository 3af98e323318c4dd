//! Pull-based message synchronization for one thread.
//!
//! A poller first performs a full load of the thread, then repeatedly asks
//! the service for messages created at or after its cursor. Until a full
//! load has succeeded, every poll is a full load. Render events are sent on
//! a bounded channel and wait for the consumer when it is full. The cursor is
//! owned by the poller and published through a `watch` channel so other
//! tasks can read a consistent snapshot without touching the poller.

use std::{collections::HashSet, sync::Arc, time::Duration};

use chrono::{DateTime, FixedOffset, SecondsFormat};
use reqwest::StatusCode;
use shared::{
    domain::Link,
    protocol::{Message, MessagesQuery},
};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::{ClientError, Result},
    events::{ChatEvent, RenderedMessage, SyncFailure, SyncOperation},
    identity::IdentityCache,
    threads::fetch_user,
    transport::{read_json, Auth, ResourceClient},
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Timestamp of the most recently observed message, `None` before any.
pub type Cursor = Option<DateTime<FixedOffset>>;

pub struct MessagePoller {
    client: ResourceClient,
    own: Link,
    thread: Link,
    cache: Arc<IdentityCache>,
    events: mpsc::Sender<ChatEvent>,
    cursor: watch::Sender<Cursor>,
    loaded: bool,
    // hrefs already observed at exactly the cursor timestamp; the service's
    // time filter is inclusive so they come back on the next poll.
    seen_at_cursor: HashSet<String>,
}

impl MessagePoller {
    pub fn new(
        client: ResourceClient,
        own: Link,
        thread: Link,
        cache: Arc<IdentityCache>,
        events: mpsc::Sender<ChatEvent>,
    ) -> Self {
        let (cursor, _) = watch::channel(None);
        Self {
            client,
            own,
            thread,
            cache,
            events,
            cursor,
            loaded: false,
            seen_at_cursor: HashSet::new(),
        }
    }

    pub fn cursor(&self) -> Cursor {
        *self.cursor.borrow()
    }

    pub fn subscribe_cursor(&self) -> watch::Receiver<Cursor> {
        self.cursor.subscribe()
    }

    /// Renders the whole thread, own messages included, and positions the
    /// cursor on the last message. Returns the number of rendered messages.
    pub async fn initial_load(&mut self) -> Result<usize> {
        let batch = match self.fetch(None).await {
            Ok(batch) => batch,
            Err(err) => return Err(self.report(SyncOperation::InitialLoad, err).await),
        };

        for message in &batch {
            self.render(message).await;
        }
        self.advance(&batch);
        self.loaded = true;

        info!(
            thread = %self.thread,
            messages = batch.len(),
            cursor = ?self.cursor(),
            "poller: initial load complete"
        );
        Ok(batch.len())
    }

    /// One incremental poll. Own messages are skipped; an empty batch leaves
    /// the cursor where it was. Falls back to [`Self::initial_load`] while no
    /// full load has succeeded yet.
    pub async fn poll_once(&mut self) -> Result<usize> {
        if !self.loaded {
            return self.initial_load().await;
        }

        let since = self.cursor();
        let batch = match self.fetch(since).await {
            Ok(batch) => batch,
            Err(err) => return Err(self.report(SyncOperation::Poll, err).await),
        };

        let mut rendered = 0usize;
        for message in &batch {
            if message.from == self.own {
                continue;
            }
            if since == Some(message.time) && self.seen_at_cursor.contains(&message.href) {
                continue;
            }
            self.render(message).await;
            rendered += 1;
        }
        self.advance(&batch);

        if !batch.is_empty() {
            debug!(
                thread = %self.thread,
                fetched = batch.len(),
                rendered,
                cursor = ?self.cursor(),
                "poller: batch applied"
            );
        }
        Ok(rendered)
    }

    /// Polls every `period` until `cancel` fires. Failed polls are reported
    /// and retried on the next tick.
    pub async fn run(mut self, period: Duration, cancel: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        // already logged and reported
                        _ = self.poll_once() => {}
                    }
                }
            }
        }

        info!(thread = %self.thread, cursor = ?self.cursor(), "poller: stopped");
    }

    pub fn spawn(self, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(period, cancel))
    }

    async fn fetch(&self, since: Cursor) -> Result<Vec<Message>> {
        let query = MessagesQuery {
            time: since.map(|time| time.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        };
        let response = self
            .client
            .get_with_query(&self.thread.messages(), &query, Auth::Required)
            .await?;
        let mut batch: Vec<Message> = read_json(response, StatusCode::OK).await?;

        let before = batch.len();
        batch.retain(|message| message.thread == self.thread);
        if batch.len() != before {
            warn!(
                thread = %self.thread,
                dropped = before - batch.len(),
                "poller: dropped messages belonging to another thread"
            );
        }
        Ok(batch)
    }

    fn advance(&mut self, batch: &[Message]) {
        let Some(last) = batch.last() else {
            return;
        };
        let current = self.cursor();
        if current.is_some_and(|cursor| last.time < cursor) {
            warn!(
                thread = %self.thread,
                last = %last.time,
                cursor = ?current,
                "poller: batch ends before cursor, keeping cursor"
            );
            return;
        }
        if current != Some(last.time) {
            self.seen_at_cursor.clear();
        }
        self.seen_at_cursor.extend(
            batch
                .iter()
                .filter(|message| message.time == last.time)
                .map(|message| message.href.clone()),
        );
        self.cursor.send_replace(Some(last.time));
    }

    async fn render(&self, message: &Message) {
        let sender_name = self.sender_name(&message.from).await;
        let _ = self
            .events
            .send(ChatEvent::Message(RenderedMessage {
                sender_name,
                message: message.clone(),
            }))
            .await;
    }

    async fn sender_name(&self, sender: &Link) -> String {
        if let Some(name) = self.cache.resolve(sender).await {
            return name;
        }
        match fetch_user(&self.client, sender).await {
            Ok(user) => {
                self.cache.remember(sender.clone(), user.name).await;
                self.cache.display_name(sender).await
            }
            Err(err) => {
                warn!(sender = %sender, error = %err, "poller: sender lookup failed");
                sender.href.clone()
            }
        }
    }

    async fn report(&self, operation: SyncOperation, err: ClientError) -> ClientError {
        warn!(
            thread = %self.thread,
            ?operation,
            error = %err,
            "poller: fetch failed"
        );
        let _ = self
            .events
            .send(ChatEvent::Failure(SyncFailure::new(operation, &err)))
            .await;
        err
    }
}

#[cfg(test)]
#[path = "tests/poller_tests.rs"]
mod tests;
