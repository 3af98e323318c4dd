use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::domain::Link;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub href: String,
    pub name: String,
    /// Only present on login and registration responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl User {
    pub fn link(&self) -> Link {
        Link::new(self.href.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginQuery {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub href: String,
    #[serde(default)]
    pub participants: Vec<Link>,
}

impl Thread {
    pub fn link(&self) -> Link {
        Link::new(self.href.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewThread {
    pub participants: Vec<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllThreads {
    #[serde(default)]
    pub threads: Vec<Link>,
}

/// Canonical message record, as created and echoed back by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub href: String,
    #[serde(rename = "threadid")]
    pub thread: Link,
    pub from: Link,
    pub content: String,
    pub time: DateTime<FixedOffset>,
}

impl Message {
    pub fn link(&self) -> Link {
        Link::new(self.href.clone())
    }
}

/// Outbound message payload. Becomes a [`Message`] only once the service
/// stores it and assigns an href.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    #[serde(rename = "threadid")]
    pub thread: Link,
    pub from: Link,
    pub content: String,
    pub time: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}
