//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client from the `[fetcher]` config
//! - A global request rate limit
//! - Re-requesting pages that came back empty or not yet rendered
//! - An overall timeout per fetch

use crate::config::FetcherConfig;
use crate::crawler::retry::{retry, RetryError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::Quota;
use std::num::NonZeroU32;

/// Errors that can occur while fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Timed out after {timeout_ms} ms fetching {url}")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("{url} was still not rendered after {tries} tries")]
    NotRendered { url: String, tries: u32 },
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// How a page has to be retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// The server response is the page; only an empty body is re-requested
    Fetch,
    /// The page is rendered late; placeholder bodies are re-requested too
    Visit,
}

/// Retrieves page content by URL
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str, strategy: FetchStrategy) -> FetchResult<String>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(FetchError)` - Failed to build client
pub fn build_http_client(config: &FetcherConfig) -> FetchResult<Client> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_millis(config.request_timeout))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(FetchError::Client)
}

type DirectLimiter = governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Global requests-per-second limit shared by all tasks
///
/// Bursts are not allowed: consecutive requests are spaced `1s / rate` apart.
pub struct RateLimiter {
    limiter: Option<DirectLimiter>,
}

impl RateLimiter {
    /// Creates a limiter allowing `per_second` requests per second (0 = unlimited)
    pub fn new(per_second: u32) -> Self {
        let limiter = NonZeroU32::new(per_second).map(|rate| {
            governor::RateLimiter::direct(Quota::per_second(rate).allow_burst(NonZeroU32::MIN))
        });
        Self { limiter }
    }

    /// Waits until the caller may send its request
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

/// `ContentFetcher` over plain HTTP GET requests
pub struct HttpFetcher {
    client: Client,
    limiter: RateLimiter,
    async_timeout: Duration,
    max_tries: u32,
    retry_delay: Duration,
    placeholder: Option<String>,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> FetchResult<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            limiter: RateLimiter::new(config.rate_limit),
            async_timeout: Duration::from_millis(config.async_timeout),
            max_tries: config.max_tries,
            retry_delay: Duration::from_millis(config.retry_delay),
            placeholder: config.placeholder.clone(),
        })
    }

    async fn get(&self, url: &str) -> FetchResult<String> {
        self.limiter.acquire().await;

        let response = self
            .client
            .get(url)
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
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })
    }

    /// True if the body is not the finished page yet
    fn not_ready(&self, body: &str, strategy: FetchStrategy) -> bool {
        if body.trim().is_empty() {
            return true;
        }
        match (strategy, &self.placeholder) {
            (FetchStrategy::Visit, Some(marker)) => body.contains(marker.as_str()),
            _ => false,
        }
    }

    async fn fetch_with_retry(&self, url: &str, strategy: FetchStrategy) -> FetchResult<String> {
        let attempt = retry(
            || self.get(url),
            |body: &String| self.not_ready(body, strategy),
            || tokio::time::sleep(self.retry_delay),
            self.max_tries,
        )
        .await;

        match attempt {
            Ok(body) => Ok(body),
            Err(RetryError::Failed(e)) => Err(e),
            Err(RetryError::MaxTriesReached { tries, .. }) => Err(FetchError::NotRendered {
                url: url.to_string(),
                tries,
            }),
        }
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, strategy: FetchStrategy) -> FetchResult<String> {
        tracing::debug!("Fetching {}", url);
        tokio::time::timeout(self.async_timeout, self.fetch_with_retry(url, strategy))
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
                timeout_ms: self.async_timeout.as_millis() as u64,
            })?
    }
}
