//! Thin authenticated HTTP helper shared by every flow of the client.
//!
//! Callers decode bodies and check status codes themselves through
//! [`read_json`] and [`expect_status`]; nothing here retries.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::domain::Credentials;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ClientError, Result};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    Required,
    Anonymous,
}

#[derive(Debug, Clone)]
pub struct ResourceClient {
    http: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl ResourceClient {
    pub fn new(host: &str, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(host).map_err(|err| ClientError::InvalidHost {
            host: host.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidHost {
                host: host.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: host.trim_end_matches('/').to_string(),
            credentials: None,
        })
    }

    /// Clone sharing the same connection pool, authenticating as `credentials`.
    pub fn with_credentials(&self, credentials: Credentials) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            credentials: Some(credentials),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub async fn get(&self, path: &str, auth: Auth) -> Result<Response> {
        debug!(path, ?auth, "http: GET");
        let request = self.authorize(self.http.get(self.url(path)), auth)?;
        Ok(request.send().await?)
    }

    pub async fn get_with_query<Q>(&self, path: &str, query: &Q, auth: Auth) -> Result<Response>
    where
        Q: Serialize + ?Sized,
    {
        debug!(path, ?auth, "http: GET with query");
        let request = self.authorize(self.http.get(self.url(path)).query(query), auth)?;
        Ok(request.send().await?)
    }

    pub async fn post<B>(&self, path: &str, body: &B, auth: Auth) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        debug!(path, ?auth, "http: POST");
        let request = self.authorize(self.http.post(self.url(path)).json(body), auth)?;
        Ok(request.send().await?)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    fn authorize(&self, request: RequestBuilder, auth: Auth) -> Result<RequestBuilder> {
        match auth {
            Auth::Anonymous => Ok(request),
            Auth::Required => {
                let credentials = self
                    .credentials
                    .as_ref()
                    .ok_or(ClientError::MissingCredentials)?;
                Ok(request.basic_auth(credentials.user_id, Some(&credentials.secret)))
            }
        }
    }
}

pub fn expect_status(response: &Response, expected: StatusCode) -> Result<()> {
    let actual = response.status();
    if actual != expected {
        warn!(
            url = %response.url(),
            %expected,
            %actual,
            "http: request failed"
        );
        return Err(ClientError::RequestFailed { expected, actual });
    }
    Ok(())
}

pub async fn read_json<T>(response: Response, expected: StatusCode) -> Result<T>
where
    T: DeserializeOwned,
{
    expect_status(&response, expected)?;
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
