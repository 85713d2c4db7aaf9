// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted entity types shared across the storage trait boundary.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (see
//! [`crate::types::format_timestamp`]) so they sort lexically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    AttachmentType, AttentionStatus, Delivery, Handler, HandoffTrigger, MessageStatus, QueryType,
    RoomStatus, SenderType, format_timestamp,
};

/// Actor id used for writes not attributable to a person.
pub const SYSTEM_ACTOR: &str = "system";

/// Audit columns carried by every persisted entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMeta {
    pub created_by: String,
    pub updated_by: Option<String>,
    pub deleted_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

impl AuditMeta {
    /// Audit metadata for a row created now by `actor`.
    pub fn created(actor: impl Into<String>, at: DateTime<Utc>) -> Self {
        let ts = format_timestamp(at);
        Self {
            created_by: actor.into(),
            updated_by: None,
            deleted_by: None,
            created_at: ts.clone(),
            updated_at: ts,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Canonical citizen identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citizen {
    pub id: String,
    /// Channel the external user id belongs to.
    pub channel: String,
    pub external_user_id: String,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// True until a document identity has been verified.
    pub is_external: bool,
    pub audit: AuditMeta,
}

/// Input for the citizen find-or-create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCitizen {
    pub id: String,
    pub channel: String,
    pub external_user_id: String,
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub audit: AuditMeta,
}

/// A conversation session on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub channel: String,
    pub external_room_id: String,
    pub citizen_id: String,
    /// Assigned agent.
    pub user_id: Option<String>,
    pub bot_replies: bool,
    pub status: RoomStatus,
    pub failed_bot_turns: u32,
    pub audit: AuditMeta,
}

impl Room {
    pub fn handler(&self) -> Handler {
        Handler::from_bot_replies(self.bot_replies)
    }
}

/// Input for the room find-or-create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoom {
    pub id: String,
    pub channel: String,
    pub external_room_id: String,
    pub citizen_id: String,
    pub audit: AuditMeta,
}

/// Filter for room listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomFilter {
    #[serde(default)]
    pub status: Option<RoomStatus>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

/// A ticketed case inside a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attention {
    pub id: String,
    pub room_id: String,
    pub consult_type_id: Option<i64>,
    pub attention_detail: Option<String>,
    pub status: AttentionStatus,
    pub start_date: String,
    pub end_date: Option<String>,
    /// Set when the system closed the attention on behalf of a room transition.
    pub close_reason: Option<String>,
    pub audit: AuditMeta,
}

/// Input for the attention open-or-get.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttention {
    pub id: String,
    pub room_id: String,
    pub start_date: String,
    pub audit: AuditMeta,
}

/// Result of the attention open-or-get.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenedAttention {
    pub attention: Attention,
    /// True when a new attention was inserted.
    pub created: bool,
}

/// A ledger message with its attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub attention_id: String,
    pub room_id: String,
    pub channel: String,
    pub content: String,
    pub external_message_id: Option<String>,
    pub sender_type: SenderType,
    pub sender_user_id: Option<String>,
    pub status: MessageStatus,
    pub delivery: Delivery,
    /// Channel-reported send time.
    pub timestamp: String,
    pub read_by: Option<String>,
    pub read_at: Option<String>,
    /// Insertion sequence, the ordering tie-breaker.
    pub seq: i64,
    pub attachments: Vec<Attachment>,
    pub audit: AuditMeta,
}

/// Input for a ledger append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub id: String,
    pub attention_id: String,
    pub room_id: String,
    pub channel: String,
    pub content: String,
    pub external_message_id: Option<String>,
    pub sender_type: SenderType,
    pub sender_user_id: Option<String>,
    pub status: MessageStatus,
    pub delivery: Delivery,
    pub timestamp: String,
    pub attachments: Vec<Attachment>,
    pub audit: AuditMeta,
}

/// Result of a ledger append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendOutcome {
    pub message: Message,
    /// True when the external message id was already recorded and the
    /// stored message was returned instead of a new one.
    pub replayed: bool,
}

/// Message attachment, decoded size already validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub message_id: String,
    /// Base64 content.
    pub content: String,
    pub extension: String,
    pub size: i64,
    pub kind: AttachmentType,
}

/// One external lookup performed during an attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub id: String,
    pub attention_id: String,
    pub query_type: QueryType,
    pub document_type: String,
    pub document_value: String,
    pub audit: AuditMeta,
}

/// Post-attention satisfaction survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survey {
    pub id: String,
    pub attention_id: String,
    pub room_id: String,
    pub citizen_id: String,
    pub user_id: Option<String>,
    pub rating: u8,
    pub comment: Option<String>,
    pub audit: AuditMeta,
}

/// Channel lookup row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub code: String,
    pub name: String,
    /// Grouping used by automatic messages (`chat`, `voice`, `mail`, ...).
    pub category: String,
}

/// Consult type lookup row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultType {
    pub id: i64,
    pub name: String,
}

/// Telephony channel state lookup row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelState {
    pub id: String,
    pub name: String,
    pub category: String,
}

/// A canned message variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomaticMessage {
    pub channel_category: String,
    pub name: String,
    pub position: u32,
    pub description: String,
}

/// An agent's telephony identity and current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VicidialUser {
    pub id: String,
    pub username: String,
    pub phone_login: Option<String>,
    /// Actor id of the agent.
    pub user_id: String,
    pub channel_state_id: String,
    pub pause_code: Option<String>,
    pub audit: AuditMeta,
}

/// One immutable presence transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub id: String,
    pub vicidial_user_id: String,
    pub old_channel_state_id: String,
    pub new_channel_state_id: String,
    pub old_pause_code: Option<String>,
    pub new_pause_code: Option<String>,
    /// When the previous state began.
    pub start_time: String,
    /// When the previous state ended (transition time).
    pub end_time: String,
    /// Whole seconds between `start_time` and `end_time`.
    pub duration: i64,
    pub created_by: String,
}

/// Analytics record of a bot/agent handoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffEvent {
    pub id: String,
    pub room_id: String,
    pub from_handler: Handler,
    pub to_handler: Handler,
    pub trigger: HandoffTrigger,
    pub user_id: Option<String>,
    pub created_at: String,
}

/// Attention portion of a room summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttentionSummary {
    pub id: String,
    pub end_date: Option<String>,
    pub consult_type_id: Option<i64>,
    pub detail: Option<String>,
}

/// Last-message portion of a room summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMessage {
    pub id: String,
    pub body: String,
    pub has_attachments: bool,
    pub sender_type: SenderType,
    pub status: MessageStatus,
    pub timestamp: String,
}

/// Agent-workspace view of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_id: String,
    pub attention: Option<AttentionSummary>,
    pub external_room_id: String,
    pub channel: String,
    pub last_message: Option<LastMessage>,
    pub status: RoomStatus,
    pub user_id: Option<String>,
    pub unread_count: u64,
    pub bot_replies: bool,
}

/// Outcome of a room completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedRoom {
    pub room: Room,
    /// Attentions that were still open and got force-closed.
    pub force_closed: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn audit_meta_created_sets_both_timestamps() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let meta = AuditMeta::created("agent-7", at);
        assert_eq!(meta.created_by, "agent-7");
        assert_eq!(meta.created_at, "2026-03-01T09:00:00.000Z");
        assert_eq!(meta.created_at, meta.updated_at);
        assert!(!meta.is_deleted());
    }

    #[test]
    fn room_handler_follows_bot_replies() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut room = Room {
            id: "r1".into(),
            channel: "whatsapp".into(),
            external_room_id: "51999".into(),
            citizen_id: "c1".into(),
            user_id: None,
            bot_replies: true,
            status: RoomStatus::Pending,
            failed_bot_turns: 0,
            audit: AuditMeta::created(SYSTEM_ACTOR, at),
        };
        assert_eq!(room.handler(), Handler::Bot);
        room.bot_replies = false;
        assert_eq!(room.handler(), Handler::Agent);
    }
}
