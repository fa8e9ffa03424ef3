//! Rate-limited, retrying JSON client shared by the catalog providers.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::config::ProviderConfig;
use crate::retry::RetryPolicy;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Why a provider request failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Throttling, upstream 5xx, and connection trouble are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            FetchError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            FetchError::Decode(_) => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

/// HTTP plumbing for one upstream: base URL, token-bucket rate limiting, and
/// bounded retries with exponential backoff.
pub struct ProviderHttp {
    name: &'static str,
    client: reqwest::Client,
    base_url: String,
    rate_limiter: DirectLimiter,
    retry: RetryPolicy,
}

impl ProviderHttp {
    /// Build a client from provider config, falling back to `default_base_url`
    /// when the config leaves the base URL empty.
    pub fn new(name: &'static str, config: &ProviderConfig, default_base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(provider = name, "Failed to build HTTP client with timeout: {}", e);
                reqwest::Client::new()
            });

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let base_url = if config.base_url.trim().is_empty() {
            default_base_url
        } else {
            config.base_url.trim()
        };

        Self {
            name,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
            retry: RetryPolicy::new(
                config.retry_attempts,
                Duration::from_millis(config.retry_base_delay_ms),
            ),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` with the given query pairs and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let url = url.as_str();
        self.retry
            .run(move |_| self.get_once(url, query), FetchError::is_retryable)
            .await
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        self.rate_limiter.until_ready().await;
        tracing::debug!(provider = self.name, url = %url, "Provider request");

        let resp = self.client.get(url).query(query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!(provider = self.name, "Upstream returned 429, backing off");
            }
            return Err(FetchError::Status {
                status,
                body: body.chars().take(200).collect(),
            });
        }

        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

/// Extract a four-digit year from a date string like `"2023-04-15"`.
pub fn parse_year(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.get(..4))
        .and_then(|y| y.parse::<i32>().ok())
        .filter(|y| *y > 0)
}

/// Treat empty strings and OMDb's `"N/A"` as absent.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty() && v != "N/A")
}
