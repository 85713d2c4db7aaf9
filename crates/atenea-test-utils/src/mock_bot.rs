// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock bot adapter with scripted replies.
//!
//! Replies are consumed in order. When the script runs out, the bot
//! answers with an understood reply carrying no messages.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use atenea_core::AteneaError;
use atenea_core::traits::adapter::PluginAdapter;
use atenea_core::traits::bot::BotAdapter;
use atenea_core::types::{AdapterType, BotMessage, BotReply, BotTurn, HealthStatus};

/// A mock bot engine for testing.
#[derive(Default)]
pub struct MockBot {
    script: Arc<Mutex<VecDeque<Result<BotReply, String>>>>,
    turns: Arc<Mutex<Vec<BotTurn>>>,
}

impl MockBot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an arbitrary reply.
    pub async fn push_reply(&self, reply: BotReply) {
        self.script.lock().await.push_back(Ok(reply));
    }

    /// Queue an understood reply with one text message.
    pub async fn push_text(&self, text: &str) {
        self.push_reply(BotReply {
            messages: vec![BotMessage {
                text: text.to_string(),
                buttons: Vec::new(),
            }],
            escalate: false,
            understood: true,
        })
        .await;
    }

    /// Queue a fallback (not understood) reply.
    pub async fn push_fallback(&self, text: &str) {
        self.push_reply(BotReply {
            messages: vec![BotMessage {
                text: text.to_string(),
                buttons: Vec::new(),
            }],
            escalate: false,
            understood: false,
        })
        .await;
    }

    /// Queue a reply asking for a human agent.
    pub async fn push_escalation(&self, text: &str) {
        self.push_reply(BotReply {
            messages: vec![BotMessage {
                text: text.to_string(),
                buttons: Vec::new(),
            }],
            escalate: true,
            understood: true,
        })
        .await;
    }

    /// Queue an adapter error.
    pub async fn push_error(&self, reason: &str) {
        self.script.lock().await.push_back(Err(reason.to_string()));
    }

    /// Turns received so far.
    pub async fn turns(&self) -> Vec<BotTurn> {
        self.turns.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockBot {
    fn name(&self) -> &str {
        "mock-bot"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Bot
    }

    async fn health_check(&self) -> Result<HealthStatus, AteneaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AteneaError> {
        Ok(())
    }
}

#[async_trait]
impl BotAdapter for MockBot {
    async fn respond(&self, turn: BotTurn) -> Result<BotReply, AteneaError> {
        self.turns.lock().await.push(turn);
        match self.script.lock().await.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(reason)) => Err(AteneaError::Bot {
                message: reason,
                source: None,
            }),
            None => Ok(BotReply {
                messages: Vec::new(),
                escalate: false,
                understood: true,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(text: &str) -> BotTurn {
        BotTurn {
            room_id: "r1".into(),
            channel: "whatsapp".into(),
            sender_key: "r1".into(),
            text: text.into(),
        }
    }

    #[tokio::test]
    async fn replies_follow_the_script() {
        let bot = MockBot::new();
        bot.push_fallback("¿Perdón?").await;
        bot.push_error("rasa down").await;

        let first = bot.respond(turn("hola")).await.unwrap();
        assert!(!first.understood);
        assert!(bot.respond(turn("hola")).await.is_err());
        let default = bot.respond(turn("hola")).await.unwrap();
        assert!(default.understood);
        assert!(default.messages.is_empty());
        assert_eq!(bot.turns().await.len(), 3);
    }
}
