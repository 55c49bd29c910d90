//! Resilient GET transport for the Tradier REST API.
//!
//! The client is an explicitly constructed value carrying its whole policy
//! (retry budget, backoff, rate gate); nothing here is process-global.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse};
use crate::retry::RetryConfig;
use crate::throttle::RateGate;

pub const DEFAULT_BASE_URL: &str = "https://api.tradier.com/v1";
const DEFAULT_TIMEOUT_MS: u64 = 25_000;
/// Tradier's production per-minute budget for market-data endpoints.
const DEFAULT_REQUESTS_PER_MINUTE: u32 = 120;

/// Terminal outcome of a GET after retry handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("resource not found (404): {url}")]
    NotFound { url: String },

    #[error("unauthorized (401); check the TRADIER_TOKEN credential")]
    Unauthorized,

    #[error("upstream rejected the request with HTTP {status}")]
    Upstream { status: u16 },

    #[error("retry budget exhausted after {attempts} attempts; last error: {last}")]
    Exhausted { attempts: u32, last: String },

    #[error("malformed response body: {0}")]
    Malformed(String),
}

/// Tradier API client: bearer auth, retry with linear backoff, rate-limit
/// header adherence, uniform error classification.
#[derive(Clone)]
pub struct TradierClient {
    http: Arc<dyn HttpClient>,
    auth: HttpAuth,
    base_url: String,
    retry: RetryConfig,
    gate: RateGate,
    timeout_ms: u64,
}

impl TradierClient {
    pub fn new(http: Arc<dyn HttpClient>, token: impl Into<String>) -> Self {
        Self {
            http,
            auth: HttpAuth::BearerToken(token.into()),
            base_url: String::from(DEFAULT_BASE_URL),
            retry: RetryConfig::default(),
            gate: RateGate::new(DEFAULT_REQUESTS_PER_MINUTE),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Issue a GET against `path` with url-encoded query parameters and
    /// parse the body as JSON.
    pub(crate) async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, FetchError> {
        let url = self.build_url(path, query);
        let response = self.get_with_retry(&url).await?;
        serde_json::from_str(&response.body)
            .map_err(|e| FetchError::Malformed(format!("{path}: {e}")))
    }

    async fn get_with_retry(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let mut last_failure = String::from("no attempt made");
        let total_attempts = self.retry.max_retries + 1;

        for attempt in 0..total_attempts {
            if let Some(pause) = self.gate.pause_before_call() {
                tokio::time::sleep(pause).await;
            }

            let request = HttpRequest::get(url)
                .with_auth(&self.auth)
                .with_header("accept", "application/json")
                .with_timeout_ms(self.timeout_ms);

            match self.http.execute(request).await {
                Ok(response) => {
                    self.gate.record(&response);

                    if response.is_success() {
                        return Ok(response);
                    }

                    match response.status {
                        404 => {
                            return Err(FetchError::NotFound {
                                url: url.to_owned(),
                            })
                        }
                        401 | 403 => return Err(FetchError::Unauthorized),
                        status if self.retry.should_retry_status(status) => {
                            last_failure = format!("HTTP {status}");
                            if attempt + 1 < total_attempts {
                                let delay = retry_after(&response)
                                    .unwrap_or_else(|| self.retry.delay_for_attempt(attempt));
                                tokio::time::sleep(delay).await;
                            }
                        }
                        status => return Err(FetchError::Upstream { status }),
                    }
                }
                Err(error) => {
                    if !(error.retryable() && self.retry.retry_on_transport) {
                        return Err(FetchError::Exhausted {
                            attempts: attempt + 1,
                            last: error.message().to_owned(),
                        });
                    }
                    last_failure = error.message().to_owned();
                    if attempt + 1 < total_attempts {
                        tokio::time::sleep(self.retry.delay_for_attempt(attempt)).await;
                    }
                }
            }
        }

        Err(FetchError::Exhausted {
            attempts: total_attempts,
            last: last_failure,
        })
    }

    fn build_url(&self, path: &str, query: &[(&str, String)]) -> String {
        let mut url = format!("{}{}", self.base_url, path);
        for (i, (key, value)) in query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            url.push(sep);
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }
}

/// An upstream-provided retry-after signal takes precedence over the
/// computed backoff. The header is whole seconds.
fn retry_after(response: &HttpResponse) -> Option<Duration> {
    response
        .header("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
