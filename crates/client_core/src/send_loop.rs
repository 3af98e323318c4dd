use chrono::Local;
use reqwest::StatusCode;
use shared::{domain::Link, protocol::NewMessage};
use tokio::{
    io::{AsyncBufRead, Lines},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    error::Result,
    events::{ChatEvent, SyncFailure, SyncOperation},
    transport::{expect_status, Auth, ResourceClient},
};

/// Typed on its own line, leaves the chat and returns to the thread menu.
pub const QUIT_COMMAND: &str = "/quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendLoopExit {
    Quit,
    EndOfInput,
    Cancelled,
}

/// Posts `content` to `thread` as `own`, stamped with the local time.
pub async fn send_message(
    client: &ResourceClient,
    own: &Link,
    thread: &Link,
    content: &str,
) -> Result<()> {
    let payload = NewMessage {
        thread: thread.clone(),
        from: own.clone(),
        content: content.to_string(),
        time: Local::now().fixed_offset(),
    };
    let response = client
        .post(&thread.messages(), &payload, Auth::Required)
        .await?;
    expect_status(&response, StatusCode::CREATED)
}

/// Forwards each non-blank input line to `thread` until `/quit`, end of
/// input, or cancellation.
///
/// A failed post is logged and reported on `events`; the line is dropped
/// and the loop keeps reading.
pub async fn run_send_loop<R>(
    client: &ResourceClient,
    own: &Link,
    thread: &Link,
    lines: &mut Lines<R>,
    cancel: &CancellationToken,
    events: &mpsc::Sender<ChatEvent>,
) -> Result<SendLoopExit>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return Ok(SendLoopExit::Cancelled),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            return Ok(SendLoopExit::EndOfInput);
        };

        if line.trim().is_empty() {
            continue;
        }
        if line.trim() == QUIT_COMMAND {
            return Ok(SendLoopExit::Quit);
        }

        match send_message(client, own, thread, &line).await {
            Ok(()) => {
                debug!(thread = %thread, bytes = line.len(), "send: message posted");
                let _ = events.send(ChatEvent::Sent { content: line }).await;
            }
            Err(err) => {
                warn!(thread = %thread, error = %err, "send: could not create message");
                let _ = events
                    .send(ChatEvent::Failure(SyncFailure::new(
                        SyncOperation::Send,
                        &err,
                    )))
                    .await;
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/send_loop_tests.rs"]
mod tests;
