//! Paced, retrying JSON GETs shared by every source adapter.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::AdapterError;

const USER_AGENT: &str = concat!("football-warehouse/", env!("CARGO_PKG_VERSION"));

/// Headers through which providers report the remaining request quota.
const QUOTA_HEADERS: &[&str] = &["x-requests-remaining", "x-ratelimit-requests-remaining"];

/// Transport settings shared by all adapters of a run.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    /// Fixed pause between two requests of the same adapter. Zero disables pacing.
    pub request_delay: Duration,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            request_delay: Duration::from_millis(250),
            max_attempts: 3,
            backoff: Duration::from_millis(1000),
        }
    }
}

/// One configured client for one provider, reused for every call of a run.
pub struct HttpSource {
    name: &'static str,
    base_url: String,
    client: reqwest::Client,
    pacer: Option<DefaultDirectRateLimiter>,
    max_attempts: u32,
    backoff: Duration,
}

impl HttpSource {
    pub fn new(
        name: &'static str,
        base_url: &str,
        headers: HeaderMap,
        settings: &HttpSettings,
    ) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AdapterError::Client {
                source_name: name.to_string(),
                reason: e.to_string(),
            })?;

        let pacer = Quota::with_period(settings.request_delay)
            .map(|q| RateLimiter::direct(q.allow_burst(NonZeroU32::MIN)));

        Ok(Self {
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            pacer,
            max_attempts: settings.max_attempts.max(1),
            backoff: settings.backoff,
        })
    }

    /// GET `path` and decode the JSON body.
    ///
    /// Connection failures, timeouts, 5xx and 429 are retried with exponential
    /// backoff; any other non-success status is returned immediately.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AdapterError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let endpoint = format!("{}:{}", self.name, path);
        let mut attempt = 0;

        loop {
            attempt += 1;
            if let Some(pacer) = &self.pacer {
                pacer.until_ready().await;
            }

            let failure = match self.client.get(&url).query(query).send().await {
                Ok(response) => {
                    self.log_quota(&response);
                    let status = response.status();
                    match response.text().await {
                        Ok(body) if status.is_success() => {
                            return serde_json::from_str(&body)
                                .map_err(|source| AdapterError::Decode { endpoint, source });
                        }
                        Ok(body) if is_retryable(status) => {
                            format!("status {}: {}", status, snippet(&body))
                        }
                        Ok(body) => {
                            return Err(AdapterError::Rejected {
                                endpoint,
                                status,
                                body: snippet(&body),
                            });
                        }
                        Err(e) => format!("failed to read response body: {}", e),
                    }
                }
                Err(e) => e.to_string(),
            };

            if attempt >= self.max_attempts {
                return Err(AdapterError::RetriesExhausted {
                    endpoint,
                    attempts: attempt,
                    last: failure,
                });
            }

            let delay = backoff_delay(self.backoff, attempt);
            warn!(
                "{} attempt {}/{} failed: {}. Retrying in {:?}",
                endpoint, attempt, self.max_attempts, failure, delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn log_quota(&self, response: &Response) {
        for header in QUOTA_HEADERS {
            if let Some(remaining) = response.headers().get(*header) {
                debug!(
                    source = self.name,
                    "API requests remaining: {}",
                    remaining.to_str().unwrap_or("?")
                );
            }
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// `backoff * 2^(attempt - 1)`, saturating.
fn backoff_delay(backoff: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    backoff.saturating_mul(factor)
}

fn snippet(body: &str) -> String {
    const MAX: usize = 500;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
