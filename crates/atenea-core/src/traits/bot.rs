// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot adapter trait for the conversational engine.

use async_trait::async_trait;

use crate::error::AteneaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{BotReply, BotTurn};

/// Adapter for the automated bot answering bot-served rooms.
///
/// The core never inspects intents; it only reads the escalation and
/// fallback signals the bot puts on its reply.
#[async_trait]
pub trait BotAdapter: PluginAdapter {
    /// Sends one citizen turn and returns the bot's reply.
    async fn respond(&self, turn: BotTurn) -> Result<BotReply, AteneaError>;
}
