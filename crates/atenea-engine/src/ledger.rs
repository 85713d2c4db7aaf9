// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message ledger: idempotent append, read tracking and ordered listings.

use atenea_core::AteneaError;
use atenea_core::models::{
    AppendOutcome, Attachment, Attention, AuditMeta, Message, NewMessage, Room, SYSTEM_ACTOR,
};
use atenea_core::types::{AttachmentPayload, Delivery, MessageStatus, SenderType, format_timestamp};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{ContactCenter, new_id, require_non_empty};

/// One message to append to an attention.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub sender_type: SenderType,
    /// Agent author, for agent messages.
    pub sender_user_id: Option<String>,
    pub content: String,
    /// Channel-native id, the idempotency key.
    pub external_message_id: Option<String>,
    pub attachments: Vec<AttachmentPayload>,
    /// Channel-reported send time, the display ordering key.
    pub timestamp: DateTime<Utc>,
    pub delivery: Delivery,
}

impl LedgerEntry {
    /// A citizen message received from a channel.
    pub fn inbound(
        content: impl Into<String>,
        external_message_id: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            sender_type: SenderType::Citizen,
            sender_user_id: None,
            content: content.into(),
            external_message_id,
            attachments: Vec::new(),
            timestamp,
            delivery: Delivery::Received,
        }
    }
}

impl ContactCenter {
    /// Appends a message to an open attention.
    ///
    /// A known (channel, external message id) returns the stored message
    /// with `replayed = true` instead of writing a second row.
    pub async fn append_message(
        &self,
        attention_id: &str,
        entry: LedgerEntry,
    ) -> Result<AppendOutcome, AteneaError> {
        let attention = self.require_attention(attention_id).await?;
        let (_guard, room) = self.lock_room(&attention.room_id).await?;
        let attention = self.require_attention(attention_id).await?;
        self.append_locked(&room, &attention, entry).await
    }

    pub(crate) async fn append_locked(
        &self,
        room: &Room,
        attention: &Attention,
        entry: LedgerEntry,
    ) -> Result<AppendOutcome, AteneaError> {
        if !attention.status.is_open() {
            return Err(AteneaError::invalid_transition(
                "attention",
                &attention.id,
                "cannot append to a closed attention",
            ));
        }
        if entry.content.trim().is_empty() && entry.attachments.is_empty() {
            return Err(AteneaError::Validation(
                "message has no body and no attachments".to_string(),
            ));
        }
        for attachment in &entry.attachments {
            attachment.validate()?;
        }

        let message_id = new_id();
        let attachments = entry
            .attachments
            .into_iter()
            .map(|a| Attachment {
                id: new_id(),
                message_id: message_id.clone(),
                content: a.content,
                extension: a.extension,
                size: a.size,
                kind: a.kind,
            })
            .collect();
        let status = if entry.sender_type == SenderType::Citizen {
            MessageStatus::Unread
        } else {
            MessageStatus::Read
        };
        let actor = entry
            .sender_user_id
            .clone()
            .unwrap_or_else(|| SYSTEM_ACTOR.to_string());

        let outcome = self
            .storage
            .append_message(&NewMessage {
                id: message_id,
                attention_id: attention.id.clone(),
                room_id: room.id.clone(),
                channel: room.channel.clone(),
                content: entry.content,
                external_message_id: entry.external_message_id,
                sender_type: entry.sender_type,
                sender_user_id: entry.sender_user_id,
                status,
                delivery: entry.delivery,
                timestamp: format_timestamp(entry.timestamp),
                attachments,
                audit: AuditMeta::created(actor, self.now()),
            })
            .await?;
        if outcome.replayed {
            debug!(
                room_id = %room.id,
                message_id = %outcome.message.id,
                "duplicate external message id, replaying stored message"
            );
        }
        Ok(outcome)
    }

    /// Marks messages read by `reader`. Returns how many were unread.
    pub async fn mark_read(&self, message_ids: &[String], reader: &str) -> Result<u64, AteneaError> {
        require_non_empty("reader", reader)?;
        if message_ids.is_empty() {
            return Ok(0);
        }
        let changed = self
            .storage
            .mark_messages_read(message_ids, reader, self.now())
            .await?;
        info!(reader, requested = message_ids.len(), changed, "messages marked read");
        Ok(changed)
    }

    /// Unread citizen messages in a room.
    pub async fn unread_count(&self, room_id: &str) -> Result<u64, AteneaError> {
        self.require_room(room_id).await?;
        self.storage.unread_count(room_id).await
    }

    /// Room messages in display order.
    pub async fn room_messages(&self, room_id: &str) -> Result<Vec<Message>, AteneaError> {
        self.require_room(room_id).await?;
        self.storage.list_room_messages(room_id).await
    }

    /// Attention messages in display order.
    pub async fn attention_messages(&self, attention_id: &str) -> Result<Vec<Message>, AteneaError> {
        self.require_attention(attention_id).await?;
        self.storage.list_attention_messages(attention_id).await
    }

    pub async fn last_message(&self, room_id: &str) -> Result<Option<Message>, AteneaError> {
        self.require_room(room_id).await?;
        self.storage.last_message(room_id).await
    }
}
