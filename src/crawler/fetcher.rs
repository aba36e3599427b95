//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the single shared HTTP client with the configured user agent
//! - Acquiring a scheduler slot around every request
//! - Retry with backoff for transient failures
//! - Error classification (transient, permanent, cancelled)

use crate::config::{CrawlerConfig, RetryConfig, UserAgentConfig};
use crate::crawler::scheduler::Scheduler;
use crate::state::RunCounters;
use crate::url::Reference;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A fetched page, handed straight to a parser and then dropped
#[derive(Debug, Clone)]
pub struct RawPage {
    /// The reference the page was requested from
    pub reference: Reference,

    /// HTTP status code (always 2xx)
    pub status: u16,

    /// Response body
    pub body: String,

    /// Attempts it took, 1 when the first request succeeded
    pub attempts: u32,
}

impl RawPage {
    /// Number of retries that preceded the successful attempt
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// How a fetch failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Network error, timeout or retryable status; all attempts used up
    Transient,

    /// Non-retryable failure, returned on the attempt it happened
    Permanent {
        /// HTTP status, or `None` when the request could not be built
        status: Option<u16>,
    },

    /// The run was cancelled before the next attempt could be issued
    Cancelled,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => f.write_str("transient failure, retries exhausted"),
            Self::Permanent { status: Some(status) } => write!(f, "permanent HTTP {}", status),
            Self::Permanent { status: None } => f.write_str("invalid request"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Terminal failure of one `fetch` call
#[derive(Debug, Clone, Error)]
#[error("{kind} for {reference} after {attempts} attempt(s): {cause}")]
pub struct FetchError {
    pub reference: Reference,
    pub kind: FetchErrorKind,
    pub attempts: u32,
    /// Description of the last underlying failure
    pub cause: String,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        self.kind == FetchErrorKind::Cancelled
    }
}

/// Failure of a single attempt, before retry policy is applied
#[derive(Debug)]
enum AttemptFailure {
    Transient(String),
    Permanent { status: Option<u16>, cause: String },
}

/// Builds the HTTP client shared by every request of a run
///
/// One client means one connection pool, so connections to the site are
/// reused across listing and detail requests.
///
/// # Example
///
/// ```no_run
/// use quote_harvest::config::Config;
/// use quote_harvest::crawler::build_http_client;
///
/// let config = Config::default();
/// let client = build_http_client(&config.crawler, &config.user_agent).unwrap();
/// ```
pub fn build_http_client(
    crawler: &CrawlerConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );

    let timeout = crawler.request_timeout();

    Client::builder()
        .user_agent(user_agent.header_value())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .pool_max_idle_per_host(crawler.max_concurrent_requests as usize)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues GET requests with scheduling, retry and backoff
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    scheduler: Scheduler,
    retry: RetryConfig,
    counters: Arc<RunCounters>,
}

impl Fetcher {
    pub fn new(
        client: Client,
        scheduler: Scheduler,
        retry: RetryConfig,
        counters: Arc<RunCounters>,
    ) -> Self {
        Self {
            client,
            scheduler,
            retry,
            counters,
        }
    }

    pub fn counters(&self) -> &Arc<RunCounters> {
        &self.counters
    }

    /// Fetches a page, retrying transient failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return the page |
    /// | 5xx, 408, 429 | Retry with backoff |
    /// | Timeout, connect or body-read error | Retry with backoff |
    /// | Any other status (404, 403, ...) | Fail immediately |
    /// | Run cancelled | Fail immediately, no new request |
    ///
    /// The scheduler slot is held for one attempt only; it is released
    /// before the backoff sleep.
    pub async fn fetch(&self, reference: &Reference) -> Result<RawPage, FetchError> {
        let max_attempts = self.retry.attempts.max(1);
        let mut attempt = 0;

        loop {
            let slot = match self.scheduler.acquire().await {
                Ok(slot) => slot,
                Err(_) => return Err(self.cancelled(reference, attempt)),
            };
            attempt += 1;

            tracing::debug!(url = %reference, attempt, "Sending request");
            self.counters.record_request();
            let outcome = self.attempt(reference).await;
            drop(slot);

            let cause = match outcome {
                Ok((status, body)) => {
                    return Ok(RawPage {
                        reference: reference.clone(),
                        status,
                        body,
                        attempts: attempt,
                    });
                }
                Err(AttemptFailure::Permanent { status, cause }) => {
                    return Err(FetchError {
                        reference: reference.clone(),
                        kind: FetchErrorKind::Permanent { status },
                        attempts: attempt,
                        cause,
                    });
                }
                Err(AttemptFailure::Transient(cause)) => cause,
            };

            if attempt >= max_attempts {
                return Err(FetchError {
                    reference: reference.clone(),
                    kind: FetchErrorKind::Transient,
                    attempts: attempt,
                    cause,
                });
            }

            let delay = self.retry.delay_for(attempt);
            self.counters.record_retry();
            tracing::warn!(
                url = %reference,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                cause = %cause,
                "Transient fetch failure, retrying"
            );

            if self.scheduler.backoff(delay).await.is_err() {
                return Err(self.cancelled(reference, attempt));
            }
        }
    }

    async fn attempt(&self, reference: &Reference) -> Result<(u16, String), AttemptFailure> {
        let response = self
            .client
            .get(reference.as_url().clone())
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            self.counters.record_non_success();
            tracing::warn!(url = %reference, status = status.as_u16(), "Non-success response");

            let cause = format!("HTTP {}", status);
            return Err(if is_transient_status(status) {
                AttemptFailure::Transient(cause)
            } else {
                AttemptFailure::Permanent {
                    status: Some(status.as_u16()),
                    cause,
                }
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| AttemptFailure::Transient(format!("Failed to read body: {}", e)))?;

        Ok((status.as_u16(), body))
    }

    fn cancelled(&self, reference: &Reference, attempts: u32) -> FetchError {
        FetchError {
            reference: reference.clone(),
            kind: FetchErrorKind::Cancelled,
            attempts,
            cause: "run cancelled".to_string(),
        }
    }
}

/// Statuses worth another attempt
fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

fn classify_request_error(e: reqwest::Error) -> AttemptFailure {
    if e.is_builder() {
        AttemptFailure::Permanent {
            status: None,
            cause: e.to_string(),
        }
    } else if e.is_timeout() {
        AttemptFailure::Transient("Request timeout".to_string())
    } else if e.is_connect() {
        AttemptFailure::Transient(format!("Connection failed: {}", e))
    } else {
        AttemptFailure::Transient(e.to_string())
    }
}
