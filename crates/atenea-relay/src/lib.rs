// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP relay channel adapter for the Atenea contact center.
//!
//! Implements [`ChannelAdapter`] by posting each outgoing command as JSON
//! to the transport adapter service that owns the provider connection
//! (WhatsApp, Telegram, mail, ...). The relay answers with the provider's
//! message id.

use std::time::Duration;

use async_trait::async_trait;
use atenea_config::model::RelayConfig;
use atenea_core::error::AteneaError;
use atenea_core::traits::{ChannelAdapter, PluginAdapter};
use atenea_core::types::{
    AdapterType, ChannelCapabilities, HealthStatus, MessageId, OutgoingCommand,
};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Header carrying the command's idempotency key.
pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

/// Body the relay answers with.
#[derive(Debug, Deserialize)]
struct RelayResponse {
    message_id: String,
}

/// Relay-backed channel adapter implementing [`ChannelAdapter`].
pub struct RelayChannel {
    client: reqwest::Client,
    channel: String,
    endpoint: String,
    capabilities: ChannelCapabilities,
}

impl RelayChannel {
    /// Creates a relay adapter for one channel.
    ///
    /// `timeout` bounds the HTTP exchange; dispatch applies its own limit
    /// on top.
    pub fn new(config: &RelayConfig, timeout: Duration) -> Result<Self, AteneaError> {
        if config.endpoint.trim().is_empty() {
            return Err(AteneaError::Config(format!(
                "relay endpoint for channel '{}' cannot be empty",
                config.channel
            )));
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.auth_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                AteneaError::Config(format!("invalid relay auth token header value: {e}"))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AteneaError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        info!(channel = %config.channel, endpoint = %config.endpoint, "relay channel initialized");
        Ok(Self {
            client,
            channel: config.channel.clone(),
            endpoint: config.endpoint.clone(),
            capabilities: ChannelCapabilities {
                supports_interactive: config.supports_interactive,
                supports_attachments: config.supports_attachments,
                max_message_length: config.max_message_length,
            },
        })
    }
}

#[async_trait]
impl PluginAdapter for RelayChannel {
    fn name(&self) -> &str {
        "relay"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, AteneaError> {
        // Relays expose no probe endpoint; delivery failures surface per send.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AteneaError> {
        debug!(channel = %self.channel, "relay channel shutting down");
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for RelayChannel {
    fn channel(&self) -> &str {
        &self.channel
    }

    fn capabilities(&self) -> ChannelCapabilities {
        self.capabilities.clone()
    }

    async fn send(&self, cmd: OutgoingCommand) -> Result<MessageId, AteneaError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(IDEMPOTENCY_HEADER, &cmd.idempotency_key)
            .json(&cmd)
            .send()
            .await
            .map_err(|e| AteneaError::Channel {
                message: format!("relay request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(channel = %self.channel, status = %status, body = %body, "relay rejected command");
            return Err(AteneaError::Channel {
                message: format!("relay returned {status}: {body}"),
                source: None,
            });
        }

        let body: RelayResponse = response.json().await.map_err(|e| AteneaError::Channel {
            message: format!("failed to parse relay response: {e}"),
            source: Some(Box::new(e)),
        })?;
        debug!(channel = %self.channel, message_id = %body.message_id, "relay accepted command");
        Ok(MessageId(body.message_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn relay_config(endpoint: String, token: Option<&str>) -> RelayConfig {
        RelayConfig {
            channel: "whatsapp".into(),
            endpoint,
            auth_token: token.map(str::to_string),
            supports_interactive: true,
            supports_attachments: true,
            max_message_length: Some(4096),
        }
    }

    fn command() -> OutgoingCommand {
        OutgoingCommand {
            channel: "whatsapp".into(),
            to: "51999000111".into(),
            chat_id: None,
            message: "Buenos días".into(),
            options: None,
            attachments: Vec::new(),
            bot_reply: false,
            idempotency_key: "key-1".into(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn capabilities_come_from_config() {
        let relay = RelayChannel::new(
            &relay_config("http://relay.local/send".into(), None),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(relay.channel(), "whatsapp");
        let caps = relay.capabilities();
        assert!(caps.supports_interactive);
        assert_eq!(caps.max_message_length, Some(4096));
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        let result = RelayChannel::new(&relay_config("  ".into(), None), Duration::from_secs(5));
        assert!(matches!(result, Err(AteneaError::Config(_))));
    }

    #[tokio::test]
    async fn send_posts_command_with_auth_and_idempotency_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("authorization", "Bearer relay-secret"))
            .and(header(IDEMPOTENCY_HEADER, "key-1"))
            .and(body_partial_json(serde_json::json!({
                "channel": "whatsapp",
                "to": "51999000111",
                "message": "Buenos días"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"message_id": "wamid.out.1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let relay = RelayChannel::new(
            &relay_config(format!("{}/send", server.uri()), Some("relay-secret")),
            Duration::from_secs(5),
        )
        .unwrap();
        let id = relay.send(command()).await.unwrap();
        assert_eq!(id, MessageId("wamid.out.1".into()));
    }

    #[tokio::test]
    async fn relay_error_status_is_channel_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(502).set_body_string("provider down"))
            .mount(&server)
            .await;

        let relay = RelayChannel::new(
            &relay_config(format!("{}/send", server.uri()), None),
            Duration::from_secs(5),
        )
        .unwrap();
        let err = relay.send(command()).await.unwrap_err();
        assert!(matches!(err, AteneaError::Channel { .. }));
        assert!(err.to_string().contains("provider down"), "got: {err}");
    }

    #[tokio::test]
    async fn malformed_response_is_channel_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let relay = RelayChannel::new(
            &relay_config(format!("{}/send", server.uri()), None),
            Duration::from_secs(5),
        )
        .unwrap();
        let err = relay.send(command()).await.unwrap_err();
        assert!(err.to_string().contains("parse"), "got: {err}");
    }
}
