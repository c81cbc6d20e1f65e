//! HTTP side of an iteration: POST the payload, classify what came back

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tokio::time::Instant;

use super::payload::RequestPayload;
use crate::error::LoadTestError;

/// Name of the status check recorded for every request
pub const STATUS_CHECK: &str = "status was 200";

/// What a single POST produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Response { status: u16, latency: Duration },
    NetworkError { reason: String },
}

impl RequestOutcome {
    /// Only a 200 passes; no response at all fails
    pub fn status_ok(&self) -> bool {
        matches!(self, Self::Response { status: 200, .. })
    }
}

/// The endpoint under test
#[derive(Debug, Clone)]
pub struct HttpTarget {
    url: String,
    client: reqwest::Client,
}

impl HttpTarget {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LoadTestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("simcue-load/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one payload. Never fails: transport problems become [`RequestOutcome::NetworkError`]
    pub async fn post(&self, payload: &RequestPayload) -> RequestOutcome {
        let start = Instant::now();
        let response = self.client.post(&self.url).json(payload).send().await;

        match response {
            Ok(response) => {
                let status = response.status().as_u16();
                // drain the body so the latency covers the full exchange
                let _ = response.bytes().await;
                RequestOutcome::Response {
                    status,
                    latency: start.elapsed(),
                }
            }
            Err(e) => RequestOutcome::NetworkError {
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_200_passes_the_check() {
        let ok = RequestOutcome::Response {
            status: 200,
            latency: Duration::from_millis(1),
        };
        assert!(ok.status_ok());

        for status in [201, 204, 301, 400, 404, 500, 503] {
            let outcome = RequestOutcome::Response {
                status,
                latency: Duration::from_millis(1),
            };
            assert!(!outcome.status_ok(), "status {} must fail", status);
        }

        let err = RequestOutcome::NetworkError {
            reason: "connection refused".to_string(),
        };
        assert!(!err.status_ok());
    }

    #[tokio::test]
    async fn test_post_sends_payload_as_json() {
        use serde_json::json;
        use wiremock::matchers::{body_json, header, method};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"priority": 4, "data": {"k": [1, 2]}})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let target = HttpTarget::new(server.uri(), Duration::from_secs(5)).unwrap();
        let payload = RequestPayload {
            priority: 4,
            data: json!({"k": [1, 2]}),
        };
        let outcome = target.post(&payload).await;
        assert!(outcome.status_ok(), "{:?}", outcome);
    }
}
