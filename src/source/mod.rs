//! Index endpoint access.
//!
//! This module fetches the precomputed index over HTTP and hands the body
//! to [`crate::ingest`].

pub mod fetcher;

pub use fetcher::IndexClient;

use thiserror::Error;

/// Failure to obtain a usable item collection from the index endpoint.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    /// The endpoint could not be reached.
    #[error("cannot connect to index endpoint at {0}. Is the index API running?")]
    Connect(String),

    /// Any other transport-level failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("index endpoint returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The body was not valid JSON.
    #[error("index body is not valid JSON: {0}")]
    MalformedBody(#[source] serde_json::Error),

    /// The body was JSON but not an index envelope.
    #[error("unexpected index shape: {0}")]
    UnexpectedShape(String),
}
