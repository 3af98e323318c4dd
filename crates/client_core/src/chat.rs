use std::{sync::Arc, time::Duration};

use shared::domain::Link;
use tokio::{
    io::{AsyncBufRead, Lines},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    error::Result,
    events::ChatEvent,
    identity::IdentityCache,
    poller::{Cursor, MessagePoller, DEFAULT_POLL_INTERVAL},
    resolver::resolve_participants,
    send_loop::{run_send_loop, SendLoopExit},
    session::SessionContext,
    transport::ResourceClient,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub poll_interval: Duration,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOutcome {
    pub exit: SendLoopExit,
    pub cursor: Cursor,
}

/// Live chat inside one thread: participant resolution, history load, a
/// background poller and the foreground send loop.
///
/// Events go to the single receiver returned by [`ChatSession::new`]. The
/// channel is bounded, so producers wait while the receiver is behind; the
/// receiver must be drained while [`ChatSession::run`] is in progress.
pub struct ChatSession {
    client: ResourceClient,
    own: Link,
    thread: Link,
    cache: Arc<IdentityCache>,
    events: mpsc::Sender<ChatEvent>,
    options: ChatOptions,
    cancel: CancellationToken,
}

impl ChatSession {
    pub fn new(
        client: &ResourceClient,
        session: &SessionContext,
        thread: Link,
        options: ChatOptions,
    ) -> (Self, mpsc::Receiver<ChatEvent>) {
        let (events, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let chat = Self {
            client: session.authorize(client),
            own: session.user().clone(),
            thread,
            cache: Arc::new(IdentityCache::new()),
            events,
            options,
            cancel: CancellationToken::new(),
        };
        (chat, receiver)
    }

    pub fn identities(&self) -> Arc<IdentityCache> {
        Arc::clone(&self.cache)
    }

    /// Token that ends the session from outside, e.g. on ctrl-c.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the session until the send loop ends, then stops the poller.
    pub async fn run<R>(&self, lines: &mut Lines<R>) -> Result<ChatOutcome>
    where
        R: AsyncBufRead + Unpin,
    {
        // Failures below are reported on the event channel; the chat still
        // opens so the user can type and later polls can catch up.
        let _ = resolve_participants(&self.client, &self.thread, &self.cache, &self.events).await;

        let mut poller = MessagePoller::new(
            self.client.clone(),
            self.own.clone(),
            self.thread.clone(),
            Arc::clone(&self.cache),
            self.events.clone(),
        );
        let _ = poller.initial_load().await;

        let cursor = poller.subscribe_cursor();
        let poll_cancel = self.cancel.child_token();
        let handle = poller.spawn(self.options.poll_interval, poll_cancel.clone());
        info!(thread = %self.thread, "chat: session started");

        let exit = run_send_loop(
            &self.client,
            &self.own,
            &self.thread,
            lines,
            &self.cancel,
            &self.events,
        )
        .await;

        poll_cancel.cancel();
        if let Err(err) = handle.await {
            warn!(thread = %self.thread, error = %err, "chat: poller task failed");
        }

        let exit = exit?;
        let cursor = *cursor.borrow();
        info!(thread = %self.thread, ?exit, "chat: session ended");
        Ok(ChatOutcome { exit, cursor })
    }
}

#[cfg(test)]
#[path = "tests/chat_tests.rs"]
mod tests;
