//! Client side of the thread chat service: authenticated resource access,
//! account and thread flows, and the message synchronization engine that
//! runs a background poller next to a foreground send loop.

pub mod chat;
pub mod error;
pub mod events;
pub mod identity;
pub mod poller;
pub mod resolver;
pub mod send_loop;
pub mod session;
pub mod threads;
pub mod transport;

pub use chat::{ChatOptions, ChatOutcome, ChatSession};
pub use error::{ClientError, FailureKind, Result};
pub use events::{ChatEvent, RenderedMessage, SyncFailure, SyncOperation};
pub use identity::IdentityCache;
pub use poller::{Cursor, MessagePoller, DEFAULT_POLL_INTERVAL};
pub use resolver::resolve_participants;
pub use send_loop::{run_send_loop, send_message, SendLoopExit, QUIT_COMMAND};
pub use session::{login, register, SessionContext};
pub use transport::{Auth, ResourceClient, DEFAULT_REQUEST_TIMEOUT};

#[cfg(test)]
#[path = "tests/fake_service.rs"]
mod fake_service;
