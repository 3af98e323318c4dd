use reqwest::StatusCode;
use shared::error::LinkError;
use thiserror::Error;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("request failed: expected status {expected}, got {actual}")]
    RequestFailed {
        expected: StatusCode,
        actual: StatusCode,
    },
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("authenticated request attempted without credentials")]
    MissingCredentials,
    #[error("service returned user '{0}' without a secret")]
    MissingSecret(String),
    #[error("invalid service host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },
    #[error("invalid reference: {0}")]
    InvalidLink(#[from] LinkError),
    #[error("failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

/// Coarse classification used when reporting failures on the event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Protocol,
    Decoding,
    Session,
}

impl ClientError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport(err) if err.is_decode() => FailureKind::Decoding,
            Self::Transport(_) => FailureKind::Transport,
            Self::RequestFailed { .. } => FailureKind::Protocol,
            Self::Decode(_) => FailureKind::Decoding,
            Self::MissingCredentials
            | Self::MissingSecret(_)
            | Self::InvalidHost { .. }
            | Self::InvalidLink(_)
            | Self::Input(_) => FailureKind::Session,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_timeout())
    }
}
