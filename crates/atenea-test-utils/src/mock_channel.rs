// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` and captures every outgoing
//! command for assertion. It can be told to fail or to stall so dispatch
//! failure and timeout paths can be exercised.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use atenea_core::AteneaError;
use atenea_core::traits::adapter::PluginAdapter;
use atenea_core::traits::channel::ChannelAdapter;
use atenea_core::types::{
    AdapterType, ChannelCapabilities, HealthStatus, MessageId, OutgoingCommand,
};

/// A mock channel for testing.
pub struct MockChannel {
    channel: String,
    capabilities: ChannelCapabilities,
    sent: Arc<Mutex<Vec<OutgoingCommand>>>,
    failure: Arc<Mutex<Option<String>>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl MockChannel {
    /// Create a mock serving `channel` with default capabilities.
    pub fn new(channel: &str) -> Self {
        Self::with_capabilities(channel, ChannelCapabilities::default())
    }

    pub fn with_capabilities(channel: &str, capabilities: ChannelCapabilities) -> Self {
        Self {
            channel: channel.to_string(),
            capabilities,
            sent: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
            delay: Arc::new(Mutex::new(None)),
        }
    }

    /// Get all commands that were sent through `send()`.
    pub async fn sent_messages(&self) -> Vec<OutgoingCommand> {
        self.sent.lock().await.clone()
    }

    /// Text of every sent command, in order.
    pub async fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|c| c.message.clone())
            .collect()
    }

    /// Get the count of sent messages.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Clear all sent messages.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    /// Make every following send fail with `reason`.
    pub async fn fail_with(&self, reason: &str) {
        *self.failure.lock().await = Some(reason.to_string());
    }

    /// Stall every following send for `delay` before answering.
    pub async fn stall_for(&self, delay: Duration) {
        *self.delay.lock().await = Some(delay);
    }

    /// Back to immediate successful sends.
    pub async fn recover(&self) {
        *self.failure.lock().await = None;
        *self.delay.lock().await = None;
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, AteneaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AteneaError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    fn channel(&self) -> &str {
        &self.channel
    }

    fn capabilities(&self) -> ChannelCapabilities {
        self.capabilities.clone()
    }

    async fn send(&self, cmd: OutgoingCommand) -> Result<MessageId, AteneaError> {
        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = self.failure.lock().await.clone() {
            return Err(AteneaError::Channel {
                message: reason,
                source: None,
            });
        }
        let id = format!("mock-msg-{}", uuid::Uuid::new_v4());
        self.sent.lock().await.push(cmd);
        Ok(MessageId(id))
    }
}
