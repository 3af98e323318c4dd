use reqwest::StatusCode;
use shared::{
    domain::{Credentials, Link},
    protocol::{LoginQuery, RegisterRequest, User},
};
use tracing::{info, warn};

use crate::{
    error::{ClientError, Result},
    threads,
    transport::{read_json, Auth, ResourceClient},
};

const USERS_PATH: &str = "/users";

/// Identity of the logged-in user plus their known threads.
///
/// Built once from the user record returned by login or registration and
/// passed explicitly to every flow that needs it.
#[derive(Debug, Clone)]
pub struct SessionContext {
    user: Link,
    name: String,
    credentials: Credentials,
    threads: Vec<Link>,
}

impl SessionContext {
    pub fn from_user(user: User) -> Result<Self> {
        let link = user.link();
        let user_id = link.user_id()?;
        let secret = user
            .secret
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| ClientError::MissingSecret(user.href.clone()))?;
        Ok(Self {
            user: link,
            name: user.name,
            credentials: Credentials::new(user_id, secret),
            threads: Vec::new(),
        })
    }

    pub fn user(&self) -> &Link {
        &self.user
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn threads(&self) -> &[Link] {
        &self.threads
    }

    pub fn thread(&self, index: usize) -> Option<&Link> {
        self.threads.get(index)
    }

    pub fn add_thread(&mut self, thread: Link) {
        if !self.threads.contains(&thread) {
            self.threads.push(thread);
        }
    }

    /// Authenticated clone of `client` for this session.
    pub fn authorize(&self, client: &ResourceClient) -> ResourceClient {
        client.with_credentials(self.credentials.clone())
    }

    /// Replaces the local thread list with the service's view.
    pub async fn refresh_threads(&mut self, client: &ResourceClient) -> Result<usize> {
        self.threads = threads::list_threads(client).await?;
        Ok(self.threads.len())
    }
}

pub async fn login(client: &ResourceClient, name: &str, password: &str) -> Result<SessionContext> {
    let query = LoginQuery {
        name: name.to_string(),
        password: password.to_string(),
    };
    let response = client
        .get_with_query(USERS_PATH, &query, Auth::Anonymous)
        .await?;
    let user: User = read_json(response, StatusCode::OK).await.map_err(|err| {
        warn!(name, error = %err, "session: login rejected");
        err
    })?;
    let session = SessionContext::from_user(user)?;
    info!(user = %session.user, "session: logged in");
    Ok(session)
}

pub async fn register(
    client: &ResourceClient,
    name: &str,
    password: &str,
) -> Result<SessionContext> {
    let request = RegisterRequest {
        name: name.to_string(),
        password: password.to_string(),
    };
    let response = client.post(USERS_PATH, &request, Auth::Anonymous).await?;
    let user: User = read_json(response, StatusCode::CREATED)
        .await
        .map_err(|err| {
            warn!(name, error = %err, "session: registration rejected");
            err
        })?;
    let session = SessionContext::from_user(user)?;
    info!(user = %session.user, "session: registered");
    Ok(session)
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
