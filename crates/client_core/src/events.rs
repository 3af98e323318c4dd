use shared::{domain::Link, protocol::Message};

use crate::error::{ClientError, FailureKind};

/// Step of a chat session that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    ResolveThread,
    ResolveParticipant,
    InitialLoad,
    Poll,
    Send,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub operation: SyncOperation,
    pub kind: FailureKind,
    pub detail: String,
}

impl SyncFailure {
    pub fn new(operation: SyncOperation, err: &ClientError) -> Self {
        Self {
            operation,
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub sender_name: String,
    pub message: Message,
}

impl RenderedMessage {
    /// Terminal line for this message.
    pub fn line(&self) -> String {
        format!("{} sent : {}", self.sender_name, self.message.content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Participant { link: Link, name: String },
    Message(RenderedMessage),
    Sent { content: String },
    Failure(SyncFailure),
}
