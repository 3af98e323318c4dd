use std::collections::HashMap;

use shared::domain::Link;
use tokio::sync::RwLock;
use tracing::debug;

/// Participant reference to display name, shared between the resolver and
/// the poller of a chat session.
///
/// The first name stored for a reference is kept for the lifetime of the
/// cache, so a reader never observes a name change mid-session.
#[derive(Debug, Default)]
pub struct IdentityCache {
    names: RwLock<HashMap<Link, String>>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn resolve(&self, link: &Link) -> Option<String> {
        self.names.read().await.get(link).cloned()
    }

    /// Returns `true` when the entry was newly stored.
    pub async fn remember(&self, link: Link, name: impl Into<String>) -> bool {
        let name = name.into();
        let mut guard = self.names.write().await;
        match guard.get(&link) {
            Some(existing) => {
                if *existing != name {
                    debug!(
                        link = %link,
                        kept = %existing,
                        ignored = %name,
                        "identity: keeping first name for reference"
                    );
                }
                false
            }
            None => {
                guard.insert(link, name);
                true
            }
        }
    }

    /// Cached name, or the href itself as a stable placeholder.
    pub async fn display_name(&self, link: &Link) -> String {
        self.resolve(link)
            .await
            .unwrap_or_else(|| link.href.clone())
    }

    pub async fn len(&self) -> usize {
        self.names.read().await.len()
    }
}

#[cfg(test)]
#[path = "tests/identity_tests.rs"]
mod tests;
