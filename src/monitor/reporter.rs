//! Delivery of error records to the backend error sink.

use crate::monitor::{ErrorCollector, ErrorRecord};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
struct ErrorPayload<'a> {
    #[serde(rename = "jsErrors")]
    js_errors: &'a [ErrorRecord],
}

/// One batch as stored by the error sink.
///
/// Entries are kept loosely typed: the sink accepts records from other
/// clients too.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBatch {
    #[serde(rename = "jsErrors", default)]
    pub js_errors: Vec<StoredError>,
}

/// A stored error entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reason: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl StoredError {
    /// Human-readable summary of the entry.
    pub fn summary(&self) -> String {
        match (&self.message, &self.reason) {
            (Some(message), _) => message.clone(),
            (None, Some(serde_json::Value::String(reason))) => reason.clone(),
            (None, Some(reason)) => reason.to_string(),
            (None, None) => "(no message)".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorListResponse {
    #[serde(default)]
    errors: Vec<ErrorBatch>,
}

/// Client for the `/api/errors` endpoint.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    http: reqwest::Client,
    errors_url: String,
}

impl ErrorReporter {
    pub fn new(errors_url: impl Into<String>, timeout_seconds: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            errors_url: errors_url.into(),
        })
    }

    /// POST a batch of records to the sink.
    pub async fn send(&self, records: &[ErrorRecord]) -> Result<()> {
        let response = self
            .http
            .post(&self.errors_url)
            .json(&ErrorPayload { js_errors: records })
            .send()
            .await
            .with_context(|| format!("Failed to reach error sink at {}", self.errors_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Error sink returned {}: {}", status, body));
        }

        debug!("Error sink accepted {} records", records.len());
        Ok(())
    }

    /// Drain the collector and deliver its records, best effort.
    ///
    /// Returns the number of records delivered. Records are dropped when
    /// delivery fails.
    pub async fn flush(&self, collector: &ErrorCollector) -> usize {
        let records = collector.drain();
        if records.is_empty() {
            return 0;
        }

        match self.send(&records).await {
            Ok(()) => {
                info!("Reported {} runtime errors", records.len());
                records.len()
            }
            Err(e) => {
                warn!("Could not report {} runtime errors: {:#}", records.len(), e);
                0
            }
        }
    }

    /// GET the batches stored by the sink.
    pub async fn fetch_recent(&self) -> Result<Vec<ErrorBatch>> {
        let response = self
            .http
            .get(&self.errors_url)
            .send()
            .await
            .with_context(|| format!("Failed to reach error sink at {}", self.errors_url))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Error sink returned {}",
                response.status()
            ));
        }

        let list: ErrorListResponse = response
            .json()
            .await
            .context("Failed to parse error list")?;

        Ok(list.errors)
    }
}
