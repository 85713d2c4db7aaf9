// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Rasa REST channel.
//!
//! Provides [`RasaClient`] which posts citizen turns to the webhook and
//! retries once on transient errors.

use std::time::Duration;

use atenea_core::AteneaError;
use tracing::{debug, warn};

use crate::types::{RasaMessage, WebhookRequest};

/// Path of the Rasa REST input channel.
const WEBHOOK_PATH: &str = "/webhooks/rest/webhook";

/// HTTP client for Rasa server communication.
#[derive(Debug, Clone)]
pub struct RasaClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl RasaClient {
    /// Creates a client for the Rasa server at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AteneaError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AteneaError::Bot {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Shortens the retry delay (for testing with wiremock).
    #[cfg(test)]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Posts one turn and returns the raw response elements.
    ///
    /// On transient errors (429, 500, 502, 503), retries once.
    pub async fn send_turn(&self, request: &WebhookRequest) -> Result<Vec<RasaMessage>, AteneaError> {
        let url = format!("{}{WEBHOOK_PATH}", self.base_url);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying bot request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self
                .client
                .post(&url)
                .json(request)
                .send()
                .await
                .map_err(|e| AteneaError::Bot {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "bot response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| AteneaError::Bot {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                // Rasa answers an empty body when no action produced output.
                if body.trim().is_empty() {
                    return Ok(Vec::new());
                }
                return serde_json::from_str(&body).map_err(|e| AteneaError::Bot {
                    message: format!("failed to parse bot response: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(AteneaError::Bot {
                    message: format!("bot returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            return Err(AteneaError::Bot {
                message: format!("bot returned {status}: {body}"),
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| AteneaError::Bot {
            message: "bot request failed after retries".into(),
            source: None,
        }))
    }

    /// Probes the server root, which Rasa answers with a greeting.
    pub async fn ping(&self) -> Result<(), AteneaError> {
        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .map_err(|e| AteneaError::Bot {
                message: format!("bot unreachable: {e}"),
                source: Some(Box::new(e)),
            })?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(AteneaError::Bot {
                message: format!("bot health probe returned {}", response.status()),
                source: None,
            })
        }
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> RasaClient {
        RasaClient::new(base_url, Duration::from_secs(5))
            .unwrap()
            .with_retry_delay(Duration::from_millis(10))
    }

    fn turn() -> WebhookRequest {
        WebhookRequest {
            sender: "room-1".into(),
            message: "hola".into(),
        }
    }

    #[tokio::test]
    async fn send_turn_posts_sender_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(WEBHOOK_PATH))
            .and(body_json(serde_json::json!({"sender": "room-1", "message": "hola"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"recipient_id": "room-1", "text": "Hola, soy Atenea."}
            ])))
            .mount(&server)
            .await;

        let messages = test_client(&server.uri()).send_turn(&turn()).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text.as_deref(), Some("Hola, soy Atenea."));
    }

    #[tokio::test]
    async fn send_turn_retries_once_on_503() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(WEBHOOK_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(WEBHOOK_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let messages = test_client(&server.uri()).send_turn(&turn()).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn send_turn_fails_on_400_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(WEBHOOK_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).send_turn(&turn()).await.unwrap_err();
        assert!(matches!(err, AteneaError::Bot { .. }));
        assert!(err.to_string().contains("400"), "got: {err}");
    }

    #[tokio::test]
    async fn empty_body_means_no_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(WEBHOOK_PATH))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let messages = test_client(&server.uri()).send_turn(&turn()).await.unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = RasaClient::new("http://rasa:5005/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://rasa:5005");
    }
}
