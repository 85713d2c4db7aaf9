// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for transport integrations (WhatsApp, Telegram, email, ...).

use async_trait::async_trait;

use crate::error::AteneaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChannelCapabilities, MessageId, OutgoingCommand};

/// Adapter for delivering outbound commands to one channel.
///
/// Inbound traffic arrives through the gateway webhook already normalized,
/// so adapters only send. Retry policy belongs to the adapter's provider,
/// never to the caller.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Channel code this adapter serves (`whatsapp`, `telegram`, ...).
    fn channel(&self) -> &str;

    /// Returns the capabilities supported by this channel.
    fn capabilities(&self) -> ChannelCapabilities;

    /// Delivers a command and returns the provider message id.
    async fn send(&self, cmd: OutgoingCommand) -> Result<MessageId, AteneaError>;
}
