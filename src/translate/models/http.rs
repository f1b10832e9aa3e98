//! Shared blocking HTTP plumbing for model backends.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// How often and how long to wait when the upstream rate-limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Wait between attempts
    pub wait: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retry.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            wait: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            wait: Duration::from_secs(60),
        }
    }
}

/// JSON-over-HTTP client with rate-limit retries.
#[derive(Debug, Clone)]
pub struct JsonClient {
    client: Client,
    retry: RetryPolicy,
}

impl JsonClient {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, retry })
    }

    /// POST `body` as JSON and decode the JSON reply.
    ///
    /// HTTP 429 is retried per the retry policy; exhaustion and every other
    /// fault surface as [`Error::Request`].
    pub fn post<B, R>(&self, url: &str, bearer: Option<&str>, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let attempts = self.retry.attempts.max(1);
        for attempt in 1..=attempts {
            let mut request = self.client.post(url).json(body);
            if let Some(key) = bearer {
                request = request.bearer_auth(key);
            }

            let response = request.send()?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt < attempts {
                    log::warn!(
                        "Rate limited by {} (attempt {}/{}), retrying in {}s",
                        url,
                        attempt,
                        attempts,
                        self.retry.wait.as_secs()
                    );
                    thread::sleep(self.retry.wait);
                    continue;
                }
                return Err(Error::Request(format!(
                    "rate limited by {} after {} attempts",
                    url, attempts
                )));
            }

            if !status.is_success() {
                let text = response.text().unwrap_or_default();
                return Err(Error::Request(format!("{} returned {}: {}", url, status, text)));
            }

            return response
                .json::<R>()
                .map_err(|e| Error::Request(format!("invalid JSON from {}: {}", url, e)));
        }
        Err(Error::Request(format!("no attempts made against {}", url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.wait, Duration::from_secs(60));
        assert_eq!(RetryPolicy::none().attempts, 1);
    }

    #[test]
    fn test_unreachable_host_is_request_error() {
        let client = JsonClient::new(Duration::from_millis(200), RetryPolicy::none()).unwrap();
        let result: Result<serde_json::Value> =
            client.post("http://127.0.0.1:9/unused", None, &serde_json::json!({}));
        assert!(matches!(result, Err(Error::Request(_))));
    }
}
