// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Atenea core.
//!
//! Fixed state columns are closed enums; data-driven lookups (channels,
//! consult types, telephony channel states) are plain keys into
//! configuration tables.

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::AteneaError;

/// Identifier returned by a channel adapter for a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Bot,
    Storage,
}

/// Formats a timestamp the way every persisted column stores it.
///
/// Fixed-width UTC with millisecond precision, so lexical order equals
/// chronological order inside SQLite.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a persisted timestamp back into a UTC datetime.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// --- Room / attention / message state ---

/// Lifecycle status of a conversation room.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Pending,
    Priority,
    Completed,
}

impl RoomStatus {
    /// Whether the room can still receive traffic and transitions.
    pub fn is_active(self) -> bool {
        !matches!(self, RoomStatus::Completed)
    }

    /// Allowed forward transitions. Completed is terminal.
    pub fn can_transition_to(self, next: RoomStatus) -> bool {
        matches!(
            (self, next),
            (RoomStatus::Pending, RoomStatus::Priority)
                | (RoomStatus::Pending, RoomStatus::Completed)
                | (RoomStatus::Priority, RoomStatus::Completed)
        )
    }
}

/// Lifecycle status of an attention ticket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttentionStatus {
    IdentityVerification,
    InProgress,
    Closed,
}

impl AttentionStatus {
    pub fn is_open(self) -> bool {
        !matches!(self, AttentionStatus::Closed)
    }
}

/// Who authored a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Agent,
    Citizen,
    Bot,
}

/// Read state of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Read,
    Unread,
}

/// Delivery marker for a message.
///
/// Inbound messages are `Received`; outbound ones are `Sent` or `Failed`
/// depending on the adapter outcome.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    Received,
    Sent,
    Failed,
}

/// Kind of a message attachment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttachmentType {
    File,
    Image,
}

/// External lookup kinds performed during an attention.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    TaxesByDocument,
    TicketsByDocument,
    TicketsByPlate,
    VehicleByPlate,
    PropertyByCode,
    DebtsByDocument,
}

/// Who currently answers inbound traffic in a room.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Handler {
    Bot,
    Agent,
}

impl Handler {
    pub fn from_bot_replies(bot_replies: bool) -> Self {
        if bot_replies { Handler::Bot } else { Handler::Agent }
    }
}

/// What caused a bot/agent handoff.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HandoffTrigger {
    /// An agent explicitly claimed the room.
    AgentClaim,
    /// The bot signalled an escalation intent in its reply.
    BotEscalation,
    /// The failed-turn threshold was reached.
    FailedTurns,
    /// An agent explicitly returned the room to the bot.
    AgentRelease,
}

// --- Inbound wire shape ---

/// A participant in an inbound channel event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Channel-native user id (phone for WhatsApp, chat id for Telegram, ...).
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// The message body of an inbound event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingBody {
    /// Channel-native message id, the idempotency key.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub body: String,
    /// Set by adapters that echo bot-sent messages back through the webhook.
    #[serde(default)]
    pub bot_reply: Option<bool>,
}

/// A base64 attachment as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentPayload {
    /// Base64-encoded content.
    pub content: String,
    pub extension: String,
    /// Decoded length in bytes; must match `content`.
    pub size: i64,
    #[serde(rename = "type")]
    pub kind: AttachmentType,
}

impl AttachmentPayload {
    /// Checks that `content` is valid base64 whose decoded length equals `size`.
    pub fn validate(&self) -> Result<(), AteneaError> {
        let decoded = BASE64_STANDARD
            .decode(self.content.as_bytes())
            .map_err(|e| AteneaError::Validation(format!("attachment is not valid base64: {e}")))?;
        if decoded.len() as i64 != self.size {
            return Err(AteneaError::Validation(format!(
                "attachment size {} does not match decoded length {}",
                self.size,
                decoded.len()
            )));
        }
        Ok(())
    }
}

/// Normalized inbound event produced by a channel adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingEvent {
    /// Channel code (`whatsapp`, `telegram`, ...).
    pub channel: String,
    /// Channel-native chat or thread id.
    pub external_room_id: String,
    pub sender: Party,
    #[serde(default)]
    pub receiver: Option<Party>,
    pub message: IncomingBody,
    #[serde(default)]
    pub attachments: Vec<AttachmentPayload>,
    /// Provider-reported send time.
    pub timestamp: DateTime<Utc>,
}

// --- Outbound wire shape ---

/// Interactive message style.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OutgoingKind {
    #[default]
    Text,
    Interactive,
}

/// A quick-reply button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub title: String,
    #[serde(default)]
    pub payload: Option<String>,
}

/// Presentation options for an outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingOptions {
    #[serde(rename = "type", default)]
    pub kind: OutgoingKind,
    #[serde(default)]
    pub buttons: Vec<Button>,
    #[serde(default)]
    pub footer: Option<String>,
}

/// Channel-ready command handed to a channel adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingCommand {
    pub channel: String,
    /// Recipient address (phone, user id, email).
    pub to: String,
    #[serde(default)]
    pub chat_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub options: Option<OutgoingOptions>,
    #[serde(default)]
    pub attachments: Vec<AttachmentPayload>,
    pub bot_reply: bool,
    /// Idempotency key the adapter may forward to providers that support one.
    pub idempotency_key: String,
    pub timestamp: DateTime<Utc>,
}

/// A reply submitted to the dispatch gateway by an agent action or the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingPayload {
    pub room_id: String,
    pub message: String,
    #[serde(default)]
    pub options: Option<OutgoingOptions>,
    #[serde(default)]
    pub attachments: Vec<AttachmentPayload>,
    #[serde(default)]
    pub bot_reply: bool,
    /// Agent authoring the reply. Ignored for bot replies.
    #[serde(default)]
    pub sender_user_id: Option<String>,
    /// Reuse on retries so the same logical send keeps its key.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Capabilities reported by a channel adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCapabilities {
    pub supports_interactive: bool,
    pub supports_attachments: bool,
    pub max_message_length: Option<usize>,
}

impl Default for ChannelCapabilities {
    fn default() -> Self {
        Self {
            supports_interactive: false,
            supports_attachments: true,
            max_message_length: None,
        }
    }
}

// --- Bot wire shape ---

/// A single message produced by the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotMessage {
    pub text: String,
    #[serde(default)]
    pub buttons: Vec<Button>,
}

/// The bot's answer to one citizen turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotReply {
    pub messages: Vec<BotMessage>,
    /// The bot asked for a human agent.
    #[serde(default)]
    pub escalate: bool,
    /// False when the bot fell back (did not understand the turn).
    #[serde(default = "default_understood")]
    pub understood: bool,
}

fn default_understood() -> bool {
    true
}

/// What the bot is told about the turn it must answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotTurn {
    pub room_id: String,
    pub channel: String,
    /// Stable conversation key for the bot engine's tracker.
    pub sender_key: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn room_status_transitions() {
        assert!(RoomStatus::Pending.can_transition_to(RoomStatus::Priority));
        assert!(RoomStatus::Pending.can_transition_to(RoomStatus::Completed));
        assert!(RoomStatus::Priority.can_transition_to(RoomStatus::Completed));
        assert!(!RoomStatus::Priority.can_transition_to(RoomStatus::Pending));
        assert!(!RoomStatus::Priority.can_transition_to(RoomStatus::Priority));
        for next in [RoomStatus::Pending, RoomStatus::Priority, RoomStatus::Completed] {
            assert!(!RoomStatus::Completed.can_transition_to(next));
        }
    }

    #[test]
    fn enum_strings_are_snake_case() {
        assert_eq!(
            AttentionStatus::IdentityVerification.to_string(),
            "identity_verification"
        );
        assert_eq!(
            AttentionStatus::from_str("in_progress").unwrap(),
            AttentionStatus::InProgress
        );
        assert_eq!(QueryType::TicketsByPlate.to_string(), "tickets_by_plate");
        assert_eq!(
            HandoffTrigger::from_str("failed_turns").unwrap(),
            HandoffTrigger::FailedTurns
        );
        let json = serde_json::to_string(&SenderType::Citizen).unwrap();
        assert_eq!(json, "\"citizen\"");
    }

    #[test]
    fn timestamps_round_trip_with_millis() {
        let at = DateTime::parse_from_rfc3339("2026-03-01T10:15:30.250+02:00")
            .unwrap()
            .with_timezone(&Utc);
        let s = format_timestamp(at);
        assert_eq!(s, "2026-03-01T08:15:30.250Z");
        assert_eq!(parse_timestamp(&s), Some(at));
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn incoming_event_deserializes_with_defaults() {
        let json = r#"{
            "channel": "whatsapp",
            "external_room_id": "51999888777",
            "sender": {"id": "51999888777", "full_name": "Ana Quispe"},
            "message": {"id": "wamid.1", "body": "hola"},
            "timestamp": "2026-03-01T10:00:00Z"
        }"#;
        let event: IncomingEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.channel, "whatsapp");
        assert_eq!(event.message.id.as_deref(), Some("wamid.1"));
        assert!(event.attachments.is_empty());
        assert!(event.receiver.is_none());
    }

    #[test]
    fn attachment_size_must_match_decoded_length() {
        let ok = AttachmentPayload {
            content: "aGVsbG8=".into(),
            extension: "txt".into(),
            size: 5,
            kind: AttachmentType::File,
        };
        assert!(ok.validate().is_ok());

        let wrong_size = AttachmentPayload { size: 6, ..ok.clone() };
        assert!(matches!(
            wrong_size.validate(),
            Err(AteneaError::Validation(_))
        ));

        let garbage = AttachmentPayload {
            content: "***".into(),
            ..ok
        };
        assert!(garbage.validate().is_err());
    }

    #[test]
    fn bot_reply_defaults_to_understood() {
        let reply: BotReply = serde_json::from_str(r#"{"messages": []}"#).unwrap();
        assert!(reply.understood);
        assert!(!reply.escalate);
    }

    #[test]
    fn outgoing_options_use_type_key() {
        let opts = OutgoingOptions {
            kind: OutgoingKind::Interactive,
            buttons: vec![Button {
                title: "Yes".into(),
                payload: None,
            }],
            footer: Some("Municipalidad".into()),
        };
        let json = serde_json::to_value(&opts).unwrap();
        assert_eq!(json["type"], "interactive");
    }

    proptest::proptest! {
        #[test]
        fn formatted_timestamps_sort_chronologically(a in 0i64..4_000_000_000_000, b in 0i64..4_000_000_000_000) {
            let ta = DateTime::<Utc>::from_timestamp_millis(a).unwrap();
            let tb = DateTime::<Utc>::from_timestamp_millis(b).unwrap();
            let (sa, sb) = (format_timestamp(ta), format_timestamp(tb));
            proptest::prop_assert_eq!(sa.cmp(&sb), ta.cmp(&tb));
        }
    }
}
