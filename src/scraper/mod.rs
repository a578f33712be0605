// src/scraper/mod.rs
//! HTTP access to the job board plus the page parsers built on top of it.

pub mod detail;
pub mod extract;
pub mod search;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::environment::ScraperConfig;
use crate::error::FetchError;
use crate::jobs::{JobDetails, JobStub, SearchQuery};

pub use detail::DetailFetcher;
pub use search::SearchFetcher;

/// Source of job stubs and detail records.
///
/// The orchestrator only talks to this trait, so tests can substitute a board
/// that never touches the network.
#[async_trait]
pub trait JobBoard: Send + Sync {
    /// Up to `limit` unique stubs for `query`, in result order.
    async fn search(&self, query: &SearchQuery, limit: usize) -> Result<Vec<JobStub>, FetchError>;

    /// Full record for `job_id`; `None` when the page has no title.
    async fn job_details(&self, job_id: &str) -> Result<Option<JobDetails>, FetchError>;
}

/// Explicit HTTP session for one board. Cheap to clone; clones share the
/// underlying connection pool and cookie jar.
#[derive(Clone, Debug)]
pub struct BoardClient {
    client: reqwest::Client,
    base_url: Url,
}

impl BoardClient {
    pub fn new(config: &ScraperConfig) -> Result<Self, FetchError> {
        let base_url = Url::parse(&config.base_url)?;

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(browser_headers())
            .timeout(config.request_timeout())
            .cookie_store(true)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// GET `url` and return the body. Non-2xx statuses are errors.
    pub async fn get_html(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers
}

/// Spaces out successive calls to the board: every call after the first
/// waits `delay`.
#[derive(Debug)]
pub struct RequestPacer {
    delay: Duration,
    first: bool,
}

impl RequestPacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, first: true }
    }

    pub async fn ready(&mut self) {
        if std::mem::replace(&mut self.first, false) || self.delay.is_zero() {
            return;
        }
        debug!("Waiting {:?} before the next request", self.delay);
        tokio::time::sleep(self.delay).await;
    }
}

/// The public LinkedIn job pages.
#[derive(Clone, Debug)]
pub struct LinkedInBoard {
    client: BoardClient,
    config: ScraperConfig,
}

impl LinkedInBoard {
    pub fn new(config: ScraperConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: BoardClient::new(&config)?,
            config,
        })
    }

    pub fn client(&self) -> &BoardClient {
        &self.client
    }
}

#[async_trait]
impl JobBoard for LinkedInBoard {
    async fn search(&self, query: &SearchQuery, limit: usize) -> Result<Vec<JobStub>, FetchError> {
        SearchFetcher::new(&self.client, &self.config)
            .search(query, limit)
            .await
    }

    async fn job_details(&self, job_id: &str) -> Result<Option<JobDetails>, FetchError> {
        DetailFetcher::new(&self.client).fetch_details(job_id).await
    }
}
