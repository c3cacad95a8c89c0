use std::time::Duration;

use archive_fetch::{FetchError, SourceDescriptor, Transport};
use bytes::Bytes;
use tracing::debug;

const USER_AGENT: &str = "archive-fetch";

/// Settings for the HTTP client shared by every fetch in a batch.
#[derive(Debug, Clone, Default)]
pub struct HttpTransportConfig {
    /// Whole-request timeout. `None` leaves reqwest's defaults in place.
    pub timeout: Option<Duration>,
}

#[derive(Debug, thiserror::Error)]
pub enum HttpTransportError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Downloads archive bodies over HTTP(S).
///
/// One instance holds one pooled `reqwest::Client`, so concurrent fetches
/// against the same host share connections.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, HttpTransportError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| HttpTransportError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, source: &SourceDescriptor) -> Result<Bytes, FetchError> {
        debug!(uri = %source, "requesting");

        let response = self
            .client
            .get(source.as_str())
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(format!("failed to read body: {e}")))?;

        debug!(uri = %source, bytes = body.len(), "received body");
        Ok(body)
    }
}
