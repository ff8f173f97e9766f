//! Collections API status client
//!
//! One `reqwest::Client` is built at startup and reused for every poll
//! cycle. Each fetch is bounded by the configured timeout and every failure
//! mode is normalized into a [`FetchError`]; nothing is retried here, the
//! next scheduler tick is the retry.

use overseer_core::{Config, FetchError, StatusDocument};
use reqwest::StatusCode;
use std::time::Duration;

/// Longest slice of an error body kept in [`FetchError::Status`]
const MAX_ERROR_BODY: usize = 256;

/// Build the status URL for a node and Collections API action
pub fn status_url(host: &str, port: u16, command: &str) -> String {
    format!(
        "http://{}:{}/solr/admin/collections?action={}&wt=json",
        host, port, command
    )
}

/// Fetches and parses the status document of one Solr node
#[derive(Debug, Clone)]
pub struct StatusClient {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl StatusClient {
    /// Create a client for the node and action named in `config`
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        Self::for_endpoint(&config.host, config.port, &config.status, config.timeout())
    }

    /// Create a client for an explicit endpoint
    pub fn for_endpoint(
        host: &str,
        port: u16,
        command: &str,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            http,
            url: status_url(host, port, command),
            timeout,
        })
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn status_url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue one GET and parse the JSON object it returns
    pub async fn fetch(&self) -> Result<StatusDocument, FetchError> {
        tracing::debug!("Fetching status from {}", self.url);

        let response = self
            .http
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.normalize(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.normalize(e))?;
        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        let document = StatusDocument::from_value(value).ok_or_else(|| FetchError::NotAnObject {
            url: self.url.clone(),
        })?;

        tracing::debug!("Fetched status document with {} fields", document.len());
        Ok(document)
    }

    fn normalize(&self, e: reqwest::Error) -> FetchError {
        let url = self.url.clone();
        if e.is_timeout() {
            FetchError::Timeout {
                url,
                timeout: self.timeout,
            }
        } else if e.is_connect() {
            FetchError::Connect {
                url,
                reason: e.to_string(),
            }
        } else {
            FetchError::Request {
                url,
                reason: e.to_string(),
            }
        }
    }
}

/// Fetch the status document of `host:port` for `command` with a one-off client
pub async fn fetch(
    host: &str,
    port: u16,
    command: &str,
    timeout: Duration,
) -> Result<StatusDocument, FetchError> {
    StatusClient::for_endpoint(host, port, command, timeout)?
        .fetch()
        .await
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
