use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LinkError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(UserId);

/// Opaque resource locator handed out by the service (`/users/42`,
/// `/threads/7`, `/threads/7/messages/3`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.href
    }

    /// Trailing path segment parsed as a numeric id.
    pub fn numeric_id(&self) -> Result<i64, LinkError> {
        let segment = self
            .href
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| LinkError::MissingId(self.href.clone()))?;
        segment
            .parse::<i64>()
            .map_err(|_| LinkError::NonNumericId(self.href.clone()))
    }

    pub fn user_id(&self) -> Result<UserId, LinkError> {
        self.numeric_id().map(UserId)
    }

    /// Sub-resource holding the messages of a thread link.
    pub fn messages(&self) -> String {
        format!("{}/messages", self.href.trim_end_matches('/'))
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.href)
    }
}

impl From<&str> for Link {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Basic-auth material derived from a user record at login time.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: UserId,
    pub secret: String,
}

impl Credentials {
    pub fn new(user_id: UserId, secret: impl Into<String>) -> Self {
        Self {
            user_id,
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}
