//! HTTP client for the index endpoint.

use crate::ingest::{parse_index, IndexLoad};
use crate::source::FetchError;
use std::time::Duration;
use tracing::{debug, info};

/// Client for the `GET /api/index` endpoint.
#[derive(Debug, Clone)]
pub struct IndexClient {
    http: reqwest::Client,
    index_url: String,
    timeout_seconds: u64,
}

impl IndexClient {
    /// Create a client for the given endpoint.
    pub fn new(index_url: impl Into<String>, timeout_seconds: u64) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            index_url: index_url.into(),
            timeout_seconds,
        })
    }

    /// The endpoint this client reads from.
    pub fn index_url(&self) -> &str {
        &self.index_url
    }

    /// Fetch and ingest the index. No retries are attempted.
    pub async fn fetch_index(&self) -> Result<IndexLoad, FetchError> {
        info!("Fetching index from {}", self.index_url);

        let response = self
            .http
            .get(&self.index_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout {
                        url: self.index_url.clone(),
                        seconds: self.timeout_seconds,
                    }
                } else if e.is_connect() {
                    FetchError::Connect(self.index_url.clone())
                } else {
                    FetchError::Transport(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let body = response.text().await?;
        debug!("Received {} bytes of index data", body.len());

        let load = parse_index(&body)?;
        info!(
            "Loaded {} items ({} received)",
            load.summary.accepted, load.summary.received
        );

        Ok(load)
    }
}
