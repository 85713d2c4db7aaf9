// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AteneaError;
use crate::models::{
    AppendOutcome, Attention, AutomaticMessage, ChannelInfo, ChannelState, Citizen, CompletedRoom,
    ConsultType, HandoffEvent, Message, NewAttention, NewCitizen, NewMessage, NewRoom,
    OpenedAttention, PresenceRecord, QueryRecord, Room, RoomFilter, Survey, VicidialUser,
};
use crate::traits::adapter::PluginAdapter;
use crate::types::RoomStatus;

/// Adapter for storage and persistence backends.
///
/// Methods are persistence primitives: each one is atomic on its own, and
/// state-guarded updates report whether the guard matched (`bool` /
/// `Option`) instead of deciding business rules. Rule decisions live in the
/// engine. Actor ids passed in are registered on first use.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), AteneaError>;

    /// Closes the storage backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), AteneaError>;

    // --- Catalog ---

    /// Upserts channel lookup rows.
    async fn sync_channels(&self, channels: &[ChannelInfo]) -> Result<(), AteneaError>;

    async fn get_channel(&self, code: &str) -> Result<Option<ChannelInfo>, AteneaError>;

    async fn list_channels(&self) -> Result<Vec<ChannelInfo>, AteneaError>;

    /// Upserts consult type lookup rows.
    async fn sync_consult_types(&self, types: &[ConsultType]) -> Result<(), AteneaError>;

    async fn get_consult_type(&self, id: i64) -> Result<Option<ConsultType>, AteneaError>;

    /// Upserts telephony channel state lookup rows.
    async fn sync_channel_states(&self, states: &[ChannelState]) -> Result<(), AteneaError>;

    async fn get_channel_state(&self, id: &str) -> Result<Option<ChannelState>, AteneaError>;

    /// Replaces the automatic message catalog.
    async fn sync_automatic_messages(
        &self,
        messages: &[AutomaticMessage],
    ) -> Result<(), AteneaError>;

    /// Variants for (channel category, name), ordered by position.
    async fn automatic_messages(
        &self,
        channel_category: &str,
        name: &str,
    ) -> Result<Vec<AutomaticMessage>, AteneaError>;

    // --- Citizens ---

    /// Returns the citizen for (channel, external user id), creating it if
    /// absent. Missing contact fields are filled from the input.
    async fn find_or_create_citizen(&self, citizen: &NewCitizen) -> Result<Citizen, AteneaError>;

    async fn get_citizen(&self, id: &str) -> Result<Option<Citizen>, AteneaError>;

    async fn find_citizen_by_document(
        &self,
        document_type: &str,
        document_number: &str,
    ) -> Result<Option<Citizen>, AteneaError>;

    /// Sets the document identity when none is set yet. Returns `false`
    /// when the citizen already carries a document.
    async fn set_citizen_document(
        &self,
        id: &str,
        document_type: &str,
        document_number: &str,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AteneaError>;

    // --- Rooms ---

    /// Returns the non-completed room for (channel, citizen), creating it
    /// with a conditional insert when none exists.
    async fn find_or_create_room(&self, room: &NewRoom) -> Result<Room, AteneaError>;

    async fn get_room(&self, id: &str) -> Result<Option<Room>, AteneaError>;

    async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<Room>, AteneaError>;

    /// Moves the room from `expected` to `next`. Returns `false` when the
    /// room was not in `expected`.
    async fn update_room_status(
        &self,
        id: &str,
        expected: RoomStatus,
        next: RoomStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AteneaError>;

    /// Force-closes every open attention of the room with `close_reason`
    /// and marks the room completed, in one transaction. Returns `None`
    /// when the room was not in `expected`.
    async fn complete_room(
        &self,
        id: &str,
        expected: RoomStatus,
        close_reason: &str,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<CompletedRoom>, AteneaError>;

    /// Flips `bot_replies` from `event.from_handler` to `event.to_handler`,
    /// assigns `assign_user` when the room has no assignee, resets the
    /// failed-turn counter and records `event`, in one transaction.
    /// Returns `None` when the room is completed or not served by
    /// `event.from_handler`.
    async fn apply_handoff(
        &self,
        event: &HandoffEvent,
        assign_user: Option<&str>,
        actor: &str,
    ) -> Result<Option<Room>, AteneaError>;

    /// Assigns an agent to an active room that has none. Returns `None`
    /// when the guard did not match.
    async fn assign_room_user(
        &self,
        id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Room>, AteneaError>;

    /// Increments the failed bot turn counter and returns the new value.
    async fn record_failed_turn(&self, id: &str, at: DateTime<Utc>) -> Result<u32, AteneaError>;

    async fn reset_failed_turns(&self, id: &str) -> Result<(), AteneaError>;

    async fn list_handoff_events(&self, room_id: &str) -> Result<Vec<HandoffEvent>, AteneaError>;

    // --- Attentions ---

    /// Returns the room's open attention or inserts `attention`. Rejects
    /// missing (`NotFound`) and completed (`InvalidTransition`) rooms.
    async fn open_or_get_attention(
        &self,
        attention: &NewAttention,
    ) -> Result<OpenedAttention, AteneaError>;

    async fn get_attention(&self, id: &str) -> Result<Option<Attention>, AteneaError>;

    /// The room's non-closed attention, if any.
    async fn open_attention(&self, room_id: &str) -> Result<Option<Attention>, AteneaError>;

    /// The most recently started attention of the room.
    async fn latest_attention(&self, room_id: &str) -> Result<Option<Attention>, AteneaError>;

    /// Records the consult type and detail and moves the attention to
    /// in_progress. Returns `false` when the attention is closed.
    async fn classify_attention(
        &self,
        id: &str,
        consult_type_id: i64,
        detail: Option<&str>,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AteneaError>;

    /// Closes the attention. Returns `false` when it was already closed.
    async fn close_attention(
        &self,
        id: &str,
        close_reason: Option<&str>,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AteneaError>;

    async fn count_open_attentions(&self, room_id: &str) -> Result<u64, AteneaError>;

    // --- Messages ---

    /// Appends a message and its attachments in one transaction. A known
    /// (channel, external message id) returns the stored message as a replay.
    async fn append_message(&self, message: &NewMessage) -> Result<AppendOutcome, AteneaError>;

    async fn get_message(&self, id: &str) -> Result<Option<Message>, AteneaError>;

    /// The message recorded under a channel-native id, if any.
    async fn find_message_by_external_id(
        &self,
        channel: &str,
        external_message_id: &str,
    ) -> Result<Option<Message>, AteneaError>;

    /// Flips unread messages to read. Returns how many changed.
    async fn mark_messages_read(
        &self,
        ids: &[String],
        reader: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, AteneaError>;

    /// Citizen-authored unread messages in the room.
    async fn unread_count(&self, room_id: &str) -> Result<u64, AteneaError>;

    /// Room messages ordered by timestamp, ties by insertion.
    async fn list_room_messages(&self, room_id: &str) -> Result<Vec<Message>, AteneaError>;

    /// Attention messages ordered by timestamp, ties by insertion.
    async fn list_attention_messages(
        &self,
        attention_id: &str,
    ) -> Result<Vec<Message>, AteneaError>;

    async fn last_message(&self, room_id: &str) -> Result<Option<Message>, AteneaError>;

    // --- Presence ---

    async fn create_vicidial_user(&self, user: &VicidialUser) -> Result<(), AteneaError>;

    async fn get_vicidial_user(&self, id: &str) -> Result<Option<VicidialUser>, AteneaError>;

    async fn find_vicidial_user_by_actor(
        &self,
        user_id: &str,
    ) -> Result<Option<VicidialUser>, AteneaError>;

    async fn last_presence_record(
        &self,
        vicidial_user_id: &str,
    ) -> Result<Option<PresenceRecord>, AteneaError>;

    /// Inserts the history row and moves the user to its new state in one
    /// transaction. Returns `false` (writing nothing) when the user's current
    /// state no longer matches the record's old state.
    async fn record_presence_transition(
        &self,
        record: &PresenceRecord,
    ) -> Result<bool, AteneaError>;

    /// History rows oldest first.
    async fn presence_history(
        &self,
        vicidial_user_id: &str,
    ) -> Result<Vec<PresenceRecord>, AteneaError>;

    // --- Query history and surveys ---

    async fn insert_query_record(&self, record: &QueryRecord) -> Result<(), AteneaError>;

    async fn list_query_records(
        &self,
        attention_id: &str,
    ) -> Result<Vec<QueryRecord>, AteneaError>;

    /// Inserts the survey. Returns `false` when the attention already has one.
    async fn insert_survey(&self, survey: &Survey) -> Result<bool, AteneaError>;

    async fn get_survey(&self, attention_id: &str) -> Result<Option<Survey>, AteneaError>;
}
