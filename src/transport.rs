//! HTTP transport underneath the login flows
//!
//! The manager talks to the platform through the [`LoginTransport`] trait so
//! integration tests can swap in [`mock::MockTransport`]. The real
//! [`HttpTransport`] applies the bounded timeout and the caller-configured
//! retry/backoff from [`TransportConfig`]; rate-limit responses (HTTP 429)
//! short-circuit into their own error so callers can back off.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::TransportConfig;
use crate::error::{ConfigError, LoginError};

/// A platform response the auth core can reason about: status plus parsed
/// JSON body (`Value::Null` when the body is not JSON).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Best-effort human-readable message from an error body.
    pub fn error_message(&self) -> String {
        for key in ["message", "msg", "error"] {
            if let Some(text) = self.body.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
        format!("HTTP {}", self.status)
    }
}

/// Minimal request surface the auth manager needs.
#[async_trait]
pub trait LoginTransport: Send + Sync {
    /// POST a JSON body to `path` (relative to the configured base URL).
    async fn post_json(
        &self,
        path: &str,
        headers: &HashMap<String, String>,
        body: &Value,
    ) -> Result<TransportResponse, LoginError>;

    /// GET `path` with the given headers. Used by the connection test.
    async fn get(
        &self,
        path: &str,
        headers: &HashMap<String, String>,
    ) -> Result<TransportResponse, LoginError>;
}

/// reqwest-backed transport with timeout and fixed-backoff retry.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    retry_count: u32,
    retry_backoff: std::time::Duration,
    timeout: std::time::Duration,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "transport".to_string(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry_count: config.retry_count,
            retry_backoff: config.retry_backoff,
            timeout: config.timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn map_request_error(&self, err: reqwest::Error) -> LoginError {
        if err.is_timeout() {
            LoginError::Timeout(self.timeout)
        } else {
            LoginError::Network(err.to_string())
        }
    }

    /// Run `send` up to `retry_count + 1` times. Only network failures,
    /// timeouts and 5xx responses are retried; 429 never is.
    async fn with_retries<F, Fut>(&self, send: F) -> Result<TransportResponse, LoginError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut last_error: Option<LoginError> = None;

        for attempt in 0..=self.retry_count {
            if attempt > 0 {
                tokio::time::sleep(self.retry_backoff).await;
            }

            match send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.json::<Value>().await.unwrap_or(Value::Null);
                    let response = TransportResponse { status, body };

                    if status == 429 {
                        return Err(LoginError::RateLimited(response.error_message()));
                    }
                    if (500..600).contains(&status) && attempt < self.retry_count {
                        warn!(status, attempt, "platform returned server error, retrying");
                        last_error = Some(LoginError::Http {
                            status,
                            message: response.error_message(),
                        });
                        continue;
                    }
                    return Ok(response);
                }
                Err(err) => {
                    let mapped = self.map_request_error(err);
                    if attempt < self.retry_count {
                        warn!(error = %mapped, attempt, "request failed, retrying");
                    }
                    last_error = Some(mapped);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| LoginError::Network("request failed with no attempts".to_string())))
    }
}

#[async_trait]
impl LoginTransport for HttpTransport {
    async fn post_json(
        &self,
        path: &str,
        headers: &HashMap<String, String>,
        body: &Value,
    ) -> Result<TransportResponse, LoginError> {
        let url = self.url(path);
        debug!(%url, "POST to platform");
        self.with_retries(|| {
            let mut request = self.client.post(&url).json(body);
            for (name, value) in headers {
                request = request.header(name, value);
            }
            request.send()
        })
        .await
    }

    async fn get(
        &self,
        path: &str,
        headers: &HashMap<String, String>,
    ) -> Result<TransportResponse, LoginError> {
        let url = self.url(path);
        debug!(%url, "GET to platform");
        self.with_retries(|| {
            let mut request = self.client.get(&url);
            for (name, value) in headers {
                request = request.header(name, value);
            }
            request.send()
        })
        .await
    }
}

/// Mock transport for tests.
///
/// Available in all builds (not just tests) so integration tests can drive
/// the manager without network access. Responses are served from a FIFO
/// queue; every request is recorded for later assertions.
pub mod mock {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// A request the mock saw: method, path, headers, body.
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: &'static str,
        pub path: String,
        pub headers: HashMap<String, String>,
        pub body: Value,
    }

    #[derive(Default)]
    pub struct MockTransport {
        responses: Mutex<VecDeque<Result<TransportResponse, LoginError>>>,
        requests: Arc<Mutex<Vec<RecordedRequest>>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Mock that serves a single response.
        pub fn single(status: u16, body: Value) -> Self {
            let mock = Self::new();
            mock.push_response(status, body);
            mock
        }

        /// Mock whose every request fails with the given error.
        pub fn failing(error: LoginError) -> Self {
            let mock = Self::new();
            mock.push_error(error);
            mock
        }

        pub fn push_response(&self, status: u16, body: Value) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Ok(TransportResponse { status, body }));
        }

        pub fn push_error(&self, error: LoginError) {
            self.responses.lock().unwrap().push_back(Err(error));
        }

        /// Number of requests the mock has served.
        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn last_request(&self) -> Option<RecordedRequest> {
            self.requests.lock().unwrap().last().cloned()
        }

        fn record(
            &self,
            method: &'static str,
            path: &str,
            headers: &HashMap<String, String>,
            body: Value,
        ) {
            self.requests.lock().unwrap().push(RecordedRequest {
                method,
                path: path.to_string(),
                headers: headers.clone(),
                body,
            });
        }

        fn next_response(&self) -> Result<TransportResponse, LoginError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(LoginError::Network(
                        "mock transport response queue is empty".to_string(),
                    ))
                })
        }
    }

    #[async_trait]
    impl LoginTransport for MockTransport {
        async fn post_json(
            &self,
            path: &str,
            headers: &HashMap<String, String>,
            body: &Value,
        ) -> Result<TransportResponse, LoginError> {
            self.record("POST", path, headers, body.clone());
            self.next_response()
        }

        async fn get(
            &self,
            path: &str,
            headers: &HashMap<String, String>,
        ) -> Result<TransportResponse, LoginError> {
            self.record("GET", path, headers, Value::Null);
            self.next_response()
        }
    }
}
