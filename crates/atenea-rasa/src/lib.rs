// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rasa bot adapter for the Atenea contact center.
//!
//! This crate implements [`BotAdapter`] over the Rasa REST input channel.
//! Escalation and fallback are read from the `custom` payload of the
//! assistant's response.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use atenea_config::model::BotConfig;
use atenea_core::error::AteneaError;
use atenea_core::traits::{BotAdapter, PluginAdapter};
use atenea_core::types::{AdapterType, BotReply, BotTurn, HealthStatus};
use tracing::{debug, info};

use crate::client::RasaClient;
use crate::types::{WebhookRequest, into_bot_reply};

/// Rasa-backed bot implementing [`BotAdapter`].
pub struct RasaBot {
    client: RasaClient,
}

impl RasaBot {
    /// Creates a bot adapter from the given configuration.
    pub fn new(config: &BotConfig) -> Result<Self, AteneaError> {
        let client = RasaClient::new(&config.rasa_url, Duration::from_secs(config.timeout_secs))?;
        info!(url = %client.base_url(), "Rasa bot adapter initialized");
        Ok(Self { client })
    }

    /// Creates a bot with an existing client.
    pub fn with_client(client: RasaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PluginAdapter for RasaBot {
    fn name(&self) -> &str {
        "rasa"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Bot
    }

    async fn health_check(&self) -> Result<HealthStatus, AteneaError> {
        match self.client.ping().await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Degraded(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), AteneaError> {
        debug!("Rasa bot adapter shutting down");
        Ok(())
    }
}

#[async_trait]
impl BotAdapter for RasaBot {
    async fn respond(&self, turn: BotTurn) -> Result<BotReply, AteneaError> {
        let request = WebhookRequest {
            sender: turn.sender_key,
            message: turn.text,
        };
        let messages = self.client.send_turn(&request).await?;
        let reply = into_bot_reply(messages);
        debug!(
            room_id = %turn.room_id,
            channel = %turn.channel,
            messages = reply.messages.len(),
            escalate = reply.escalate,
            understood = reply.understood,
            "bot replied"
        );
        Ok(reply)
    }
}
