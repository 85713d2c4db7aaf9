// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound dispatch: normalize a reply for the target channel, send it with
//! a bounded timeout, and record the result in the ledger.
//!
//! There are no retries here. A failed or timed-out send is recorded with
//! `delivery = failed` and reported back so the caller can decide; a retry
//! must reuse the same idempotency key.

use atenea_core::AteneaError;
use atenea_core::models::{
    Attachment, Attention, AuditMeta, Message, NewAttention, NewMessage, Room, SYSTEM_ACTOR,
};
use atenea_core::types::{
    AttachmentPayload, ChannelCapabilities, Delivery, MessageStatus, OutgoingCommand,
    OutgoingKind, OutgoingOptions, OutgoingPayload, SenderType, format_timestamp,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{ContactCenter, new_id};

/// Outcome of one outbound send.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    /// The recorded ledger message, delivered or not.
    pub message: Message,
    pub delivered: bool,
    /// Recipient address handed to the adapter.
    pub target: String,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
}

impl DispatchResult {
    /// Turns an undelivered result into [`AteneaError::DispatchFailure`].
    pub fn into_result(self) -> Result<Message, AteneaError> {
        if self.delivered {
            return Ok(self.message);
        }
        Err(AteneaError::DispatchFailure {
            channel: self.message.channel,
            target: self.target,
            reason: self.error.unwrap_or_else(|| "not delivered".to_string()),
        })
    }
}

/// A reply reshaped for one channel's capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedReply {
    pub message: String,
    pub options: Option<OutgoingOptions>,
    pub attachments: Vec<AttachmentPayload>,
    /// Attachments removed because the channel cannot carry them.
    pub dropped_attachments: usize,
}

/// Reshapes a reply for a channel.
///
/// Buttons become a numbered text list on channels without interactive
/// support, interactive messages get `default_footer` when they carry no
/// footer, text is truncated to the channel's character limit, and
/// attachments are dropped where unsupported.
pub fn normalize(
    message: &str,
    options: Option<OutgoingOptions>,
    attachments: Vec<AttachmentPayload>,
    caps: &ChannelCapabilities,
    default_footer: Option<&str>,
) -> NormalizedReply {
    let mut text = message.to_string();
    let options = match options {
        Some(mut opts) if opts.kind == OutgoingKind::Interactive || !opts.buttons.is_empty() => {
            if opts.footer.is_none() {
                opts.footer = default_footer.map(str::to_string);
            }
            if caps.supports_interactive {
                opts.kind = OutgoingKind::Interactive;
                Some(opts)
            } else {
                for (i, button) in opts.buttons.iter().enumerate() {
                    text.push_str(if i == 0 { "\n\n" } else { "\n" });
                    text.push_str(&format!("{}. {}", i + 1, button.title));
                }
                if let Some(footer) = &opts.footer {
                    text.push_str("\n\n");
                    text.push_str(footer);
                }
                None
            }
        }
        other => other,
    };

    if let Some(max) = caps.max_message_length
        && text.chars().count() > max
    {
        text = text.chars().take(max).collect();
    }

    let (attachments, dropped_attachments) = if caps.supports_attachments {
        (attachments, 0)
    } else {
        let dropped = attachments.len();
        (Vec::new(), dropped)
    };

    NormalizedReply {
        message: text,
        options,
        attachments,
        dropped_attachments,
    }
}

impl ContactCenter {
    /// Sends an agent or bot reply to the room's citizen.
    ///
    /// Rejects missing (`NotFound`) and completed (`InvalidTransition`) rooms
    /// and empty replies (`Validation`). An unknown channel is a
    /// `DispatchFailure`. Adapter failures and timeouts are not errors: the
    /// message is recorded as failed and the result says so.
    pub async fn send(&self, payload: OutgoingPayload) -> Result<DispatchResult, AteneaError> {
        let (_guard, room) = self.lock_room(&payload.room_id).await?;
        self.send_locked(&room, None, payload).await
    }

    /// Sends under an already held room lock. The message is recorded on
    /// `attention` when given, otherwise on the room's open attention.
    pub(crate) async fn send_locked(
        &self,
        room: &Room,
        attention: Option<&Attention>,
        payload: OutgoingPayload,
    ) -> Result<DispatchResult, AteneaError> {
        if !room.status.is_active() {
            return Err(AteneaError::invalid_transition(
                "room",
                &room.id,
                "cannot send to a completed room",
            ));
        }
        if payload.message.trim().is_empty() && payload.attachments.is_empty() {
            return Err(AteneaError::Validation(
                "outgoing message has no text and no attachments".to_string(),
            ));
        }
        for attachment in &payload.attachments {
            attachment.validate()?;
        }

        let adapter = self.channels.get(&room.channel).cloned().ok_or_else(|| {
            AteneaError::DispatchFailure {
                channel: room.channel.clone(),
                target: room.external_room_id.clone(),
                reason: "no adapter registered for channel".to_string(),
            }
        })?;
        let citizen = self
            .storage
            .get_citizen(&room.citizen_id)
            .await?
            .ok_or_else(|| AteneaError::not_found("citizen", &room.citizen_id))?;

        let now = self.now();
        let attention = match attention {
            Some(attention) if !attention.status.is_open() => {
                return Err(AteneaError::invalid_transition(
                    "attention",
                    &attention.id,
                    "cannot send on a closed attention",
                ));
            }
            Some(attention) => attention.clone(),
            None => {
                self.storage
                    .open_or_get_attention(&NewAttention {
                        id: new_id(),
                        room_id: room.id.clone(),
                        start_date: format_timestamp(now),
                        audit: AuditMeta::created(SYSTEM_ACTOR, now),
                    })
                    .await?
                    .attention
            }
        };

        let normalized = normalize(
            &payload.message,
            payload.options,
            payload.attachments,
            &adapter.capabilities(),
            self.settings.default_footer.as_deref(),
        );
        if normalized.dropped_attachments > 0 {
            warn!(
                room_id = %room.id,
                channel = %room.channel,
                dropped = normalized.dropped_attachments,
                "channel does not support attachments, dropping them"
            );
        }

        let command = OutgoingCommand {
            channel: room.channel.clone(),
            to: citizen.external_user_id.clone(),
            chat_id: Some(room.external_room_id.clone()),
            message: normalized.message,
            options: normalized.options,
            attachments: normalized.attachments,
            bot_reply: payload.bot_reply,
            idempotency_key: payload.idempotency_key.unwrap_or_else(new_id),
            timestamp: now,
        };

        debug!(
            room_id = %room.id,
            attention_id = %attention.id,
            idempotency_key = %command.idempotency_key,
            "dispatching outbound message"
        );
        let timeout = self.settings.dispatch_timeout;
        let (provider_message_id, error) =
            match tokio::time::timeout(timeout, adapter.send(command.clone())).await {
                Ok(Ok(id)) => (Some(id.0), None),
                Ok(Err(e)) => (None, Some(e.to_string())),
                Err(_) => (None, Some(AteneaError::Timeout { duration: timeout }.to_string())),
            };
        let delivered = error.is_none();

        let message_id = new_id();
        let sender_user_id = if payload.bot_reply {
            None
        } else {
            payload.sender_user_id
        };
        let actor = sender_user_id.clone().unwrap_or_else(|| SYSTEM_ACTOR.to_string());
        let attachments = command
            .attachments
            .iter()
            .map(|a| Attachment {
                id: new_id(),
                message_id: message_id.clone(),
                content: a.content.clone(),
                extension: a.extension.clone(),
                size: a.size,
                kind: a.kind,
            })
            .collect();
        let outcome = self
            .storage
            .append_message(&NewMessage {
                id: message_id,
                attention_id: attention.id.clone(),
                room_id: room.id.clone(),
                channel: room.channel.clone(),
                content: command.message.clone(),
                external_message_id: provider_message_id.clone(),
                sender_type: if payload.bot_reply {
                    SenderType::Bot
                } else {
                    SenderType::Agent
                },
                sender_user_id,
                status: MessageStatus::Read,
                delivery: if delivered {
                    Delivery::Sent
                } else {
                    Delivery::Failed
                },
                timestamp: format_timestamp(now),
                attachments,
                audit: AuditMeta::created(actor, now),
            })
            .await?;

        if delivered {
            info!(
                room_id = %room.id,
                attention_id = %attention.id,
                message_id = %outcome.message.id,
                bot_reply = command.bot_reply,
                "outbound message delivered"
            );
        } else {
            warn!(
                room_id = %room.id,
                attention_id = %attention.id,
                message_id = %outcome.message.id,
                channel = %room.channel,
                error = error.as_deref().unwrap_or_default(),
                "outbound message not delivered"
            );
        }

        Ok(DispatchResult {
            message: outcome.message,
            delivered,
            target: command.to,
            provider_message_id,
            error,
        })
    }
}
