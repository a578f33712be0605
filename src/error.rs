// src/error.rs
//! Error taxonomy for the scraping pipeline

use thiserror::Error;

/// Transport-level failure talking to the job board.
///
/// Always fatal to the enclosing search or detail call and never retried
/// inside the pipeline.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection, IO, body decoding or timeout failure
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The board answered with a non-2xx status
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// A request URL could not be built from the configured base
    #[error("invalid request url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client itself could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Request { source, .. } if source.is_timeout())
    }
}

/// Errors surfaced by orchestrator entry points.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("storage error: {0:#}")]
    Store(#[from] anyhow::Error),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
