use std::time::{Duration, Instant};

use banditlb_core::Outcome;

use crate::DEFAULT_TIMEOUT_MS;

/// Pooled client for the downstream fleet. One instance is shared across
/// the whole process — `reqwest::Client` already pools connections
/// internally, so there's no reason to build a fresh one per request.
pub struct DownstreamClient {
    http: reqwest::Client,
}

impl DownstreamClient {
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("a client with only a timeout configured always builds");
        Self { http }
    }

    /// Sends the request body (the raw 24-character request id, as plain
    /// text) to `port` and classifies the result. Returns the outcome and
    /// the observed latency in milliseconds, measured around the whole
    /// send/receive.
    pub async fn send(&self, port: u16, request_id: &str) -> (Outcome, f64) {
        let url = format!("http://localhost:{port}/");
        let start = Instant::now();

        let result = self
            .http
            .post(url)
            .header("content-type", "text/plain")
            .body(request_id.to_string())
            .send()
            .await;

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        let outcome = match result {
            Ok(response) => {
                let status = response.status().as_u16();
                if status == 429 {
                    Outcome::RateLimited
                } else if (200..300).contains(&status) {
                    Outcome::Success
                } else {
                    Outcome::Failure
                }
            }
            Err(err) => {
                tracing::debug!(port, error = %err, "downstream request failed");
                Outcome::Failure
            }
        };

        (outcome, latency_ms)
    }
}

impl Default for DownstreamClient {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connection_failure_classifies_as_failure() {
        let client = DownstreamClient::new(Duration::from_millis(200));
        // Nothing listens here in a test environment.
        let (outcome, _latency) = client.send(65500, "x".repeat(24).as_str()).await;
        assert_eq!(outcome, Outcome::Failure);
    }
}
