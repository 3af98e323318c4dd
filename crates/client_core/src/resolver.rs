use futures::future::join_all;
use shared::{domain::Link, protocol::Thread};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{
    error::Result,
    events::{ChatEvent, SyncFailure, SyncOperation},
    identity::IdentityCache,
    threads::{fetch_thread, fetch_user},
    transport::ResourceClient,
};

/// Fetches `thread` and warms `cache` with every participant's name.
///
/// Participant lookups run concurrently and independently: a failed lookup
/// is logged and reported on `events` but does not stop the others. Only a
/// failure to fetch the thread record itself is returned.
pub async fn resolve_participants(
    client: &ResourceClient,
    thread: &Link,
    cache: &IdentityCache,
    events: &mpsc::Sender<ChatEvent>,
) -> Result<Thread> {
    let record = match fetch_thread(client, thread).await {
        Ok(record) => record,
        Err(err) => {
            warn!(thread = %thread, error = %err, "resolver: thread fetch failed");
            let _ = events
                .send(ChatEvent::Failure(SyncFailure::new(
                    SyncOperation::ResolveThread,
                    &err,
                )))
                .await;
            return Err(err);
        }
    };

    let lookups = record
        .participants
        .iter()
        .map(|participant| fetch_user(client, participant));
    let results = join_all(lookups).await;

    let mut resolved = 0usize;
    for (participant, result) in record.participants.iter().zip(results) {
        match result {
            Ok(user) => {
                cache.remember(participant.clone(), user.name.clone()).await;
                resolved += 1;
                let _ = events
                    .send(ChatEvent::Participant {
                        link: participant.clone(),
                        name: user.name,
                    })
                    .await;
            }
            Err(err) => {
                warn!(
                    participant = %participant,
                    error = %err,
                    "resolver: participant lookup failed"
                );
                let _ = events
                    .send(ChatEvent::Failure(SyncFailure::new(
                        SyncOperation::ResolveParticipant,
                        &err,
                    )))
                    .await;
            }
        }
    }

    let cached = cache.len().await;
    info!(
        thread = %thread,
        participants = record.participants.len(),
        resolved,
        cached,
        "resolver: participants resolved"
    );
    Ok(record)
}

#[cfg(test)]
#[path = "tests/resolver_tests.rs"]
mod tests;
