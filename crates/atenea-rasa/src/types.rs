// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rasa REST channel request/response types.

use serde::{Deserialize, Serialize};

use atenea_core::types::{BotMessage, BotReply, Button};

/// Body posted to `/webhooks/rest/webhook`.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookRequest {
    /// Conversation key for the Rasa tracker.
    pub sender: String,
    pub message: String,
}

/// A quick-reply button as Rasa renders it.
#[derive(Debug, Clone, Deserialize)]
pub struct RasaButton {
    pub title: String,
    #[serde(default)]
    pub payload: Option<String>,
}

/// Custom payload attached to a Rasa response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomPayload {
    /// The assistant asked for a human agent.
    #[serde(default)]
    pub handoff: bool,
    /// The fallback policy answered this turn.
    #[serde(default)]
    pub fallback: bool,
}

/// One element of the webhook response array.
#[derive(Debug, Clone, Deserialize)]
pub struct RasaMessage {
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub buttons: Vec<RasaButton>,
    #[serde(default)]
    pub custom: Option<CustomPayload>,
}

/// Folds a webhook response into a [`BotReply`].
///
/// Elements without text (pure custom payloads) only contribute their
/// flags.
pub fn into_bot_reply(messages: Vec<RasaMessage>) -> BotReply {
    let mut reply = BotReply {
        messages: Vec::new(),
        escalate: false,
        understood: true,
    };
    for message in messages {
        if let Some(custom) = &message.custom {
            reply.escalate |= custom.handoff;
            if custom.fallback {
                reply.understood = false;
            }
        }
        let Some(text) = message.text.filter(|t| !t.trim().is_empty()) else {
            continue;
        };
        reply.messages.push(BotMessage {
            text,
            buttons: message
                .buttons
                .into_iter()
                .map(|b| Button {
                    title: b.title,
                    payload: b.payload,
                })
                .collect(),
        });
    }
    reply
}
