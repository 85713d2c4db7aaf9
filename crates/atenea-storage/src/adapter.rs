// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use atenea_config::model::StorageConfig;
use atenea_core::types::RoomStatus;
use atenea_core::{AdapterType, AteneaError, HealthStatus, PluginAdapter, StorageAdapter};

use crate::database::{Database, map_tr_err};
use crate::models::{
    AppendOutcome, Attention, AutomaticMessage, ChannelInfo, ChannelState, Citizen, CompletedRoom,
    ConsultType, HandoffEvent, Message, NewAttention, NewCitizen, NewMessage, NewRoom,
    OpenedAttention, PresenceRecord, QueryRecord, Room, RoomFilter, Survey, VicidialUser,
};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, AteneaError> {
        self.db.get().ok_or_else(|| AteneaError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(db: &Database) -> Result<(), AteneaError> {
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, AteneaError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AteneaError> {
        if let Some(db) = self.db.get() {
            Self::checkpoint(db).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), AteneaError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| AteneaError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), AteneaError> {
        Self::checkpoint(self.db()?).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Catalog ---

    async fn sync_channels(&self, channels: &[ChannelInfo]) -> Result<(), AteneaError> {
        queries::catalog::sync_channels(self.db()?, channels.to_vec()).await
    }

    async fn get_channel(&self, code: &str) -> Result<Option<ChannelInfo>, AteneaError> {
        queries::catalog::get_channel(self.db()?, code).await
    }

    async fn list_channels(&self) -> Result<Vec<ChannelInfo>, AteneaError> {
        queries::catalog::list_channels(self.db()?).await
    }

    async fn sync_consult_types(&self, types: &[ConsultType]) -> Result<(), AteneaError> {
        queries::catalog::sync_consult_types(self.db()?, types.to_vec()).await
    }

    async fn get_consult_type(&self, id: i64) -> Result<Option<ConsultType>, AteneaError> {
        queries::catalog::get_consult_type(self.db()?, id).await
    }

    async fn sync_channel_states(&self, states: &[ChannelState]) -> Result<(), AteneaError> {
        queries::catalog::sync_channel_states(self.db()?, states.to_vec()).await
    }

    async fn get_channel_state(&self, id: &str) -> Result<Option<ChannelState>, AteneaError> {
        queries::catalog::get_channel_state(self.db()?, id).await
    }

    async fn sync_automatic_messages(
        &self,
        messages: &[AutomaticMessage],
    ) -> Result<(), AteneaError> {
        queries::catalog::sync_automatic_messages(self.db()?, messages.to_vec()).await
    }

    async fn automatic_messages(
        &self,
        channel_category: &str,
        name: &str,
    ) -> Result<Vec<AutomaticMessage>, AteneaError> {
        queries::catalog::automatic_messages(self.db()?, channel_category, name).await
    }

    // --- Citizens ---

    async fn find_or_create_citizen(&self, citizen: &NewCitizen) -> Result<Citizen, AteneaError> {
        queries::citizens::find_or_create(self.db()?, citizen.clone()).await
    }

    async fn get_citizen(&self, id: &str) -> Result<Option<Citizen>, AteneaError> {
        queries::citizens::get(self.db()?, id).await
    }

    async fn find_citizen_by_document(
        &self,
        document_type: &str,
        document_number: &str,
    ) -> Result<Option<Citizen>, AteneaError> {
        queries::citizens::find_by_document(self.db()?, document_type, document_number).await
    }

    async fn set_citizen_document(
        &self,
        id: &str,
        document_type: &str,
        document_number: &str,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AteneaError> {
        queries::citizens::set_document(self.db()?, id, document_type, document_number, actor, at)
            .await
    }

    // --- Rooms ---

    async fn find_or_create_room(&self, room: &NewRoom) -> Result<Room, AteneaError> {
        queries::rooms::find_or_create(self.db()?, room.clone()).await
    }

    async fn get_room(&self, id: &str) -> Result<Option<Room>, AteneaError> {
        queries::rooms::get(self.db()?, id).await
    }

    async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<Room>, AteneaError> {
        queries::rooms::list(self.db()?, filter.clone()).await
    }

    async fn update_room_status(
        &self,
        id: &str,
        expected: RoomStatus,
        next: RoomStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AteneaError> {
        queries::rooms::update_status(self.db()?, id, expected, next, actor, at).await
    }

    async fn complete_room(
        &self,
        id: &str,
        expected: RoomStatus,
        close_reason: &str,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<CompletedRoom>, AteneaError> {
        queries::rooms::complete(self.db()?, id, expected, close_reason, actor, at).await
    }

    async fn apply_handoff(
        &self,
        event: &HandoffEvent,
        assign_user: Option<&str>,
        actor: &str,
    ) -> Result<Option<Room>, AteneaError> {
        queries::rooms::apply_handoff(
            self.db()?,
            event.clone(),
            assign_user.map(String::from),
            actor,
        )
        .await
    }

    async fn assign_room_user(
        &self,
        id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Room>, AteneaError> {
        queries::rooms::assign_user(self.db()?, id, user_id, at).await
    }

    async fn record_failed_turn(&self, id: &str, at: DateTime<Utc>) -> Result<u32, AteneaError> {
        queries::rooms::record_failed_turn(self.db()?, id, at).await
    }

    async fn reset_failed_turns(&self, id: &str) -> Result<(), AteneaError> {
        queries::rooms::reset_failed_turns(self.db()?, id).await
    }

    async fn list_handoff_events(&self, room_id: &str) -> Result<Vec<HandoffEvent>, AteneaError> {
        queries::handoffs::list(self.db()?, room_id).await
    }

    // --- Attentions ---

    async fn open_or_get_attention(
        &self,
        attention: &NewAttention,
    ) -> Result<OpenedAttention, AteneaError> {
        queries::attentions::open_or_get(self.db()?, attention.clone()).await
    }

    async fn get_attention(&self, id: &str) -> Result<Option<Attention>, AteneaError> {
        queries::attentions::get(self.db()?, id).await
    }

    async fn open_attention(&self, room_id: &str) -> Result<Option<Attention>, AteneaError> {
        queries::attentions::open_for_room(self.db()?, room_id).await
    }

    async fn latest_attention(&self, room_id: &str) -> Result<Option<Attention>, AteneaError> {
        queries::attentions::latest_for_room(self.db()?, room_id).await
    }

    async fn classify_attention(
        &self,
        id: &str,
        consult_type_id: i64,
        detail: Option<&str>,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AteneaError> {
        queries::attentions::classify(
            self.db()?,
            id,
            consult_type_id,
            detail.map(String::from),
            actor,
            at,
        )
        .await
    }

    async fn close_attention(
        &self,
        id: &str,
        close_reason: Option<&str>,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AteneaError> {
        queries::attentions::close(self.db()?, id, close_reason.map(String::from), actor, at).await
    }

    async fn count_open_attentions(&self, room_id: &str) -> Result<u64, AteneaError> {
        queries::attentions::count_open(self.db()?, room_id).await
    }

    // --- Messages ---

    async fn append_message(&self, message: &NewMessage) -> Result<AppendOutcome, AteneaError> {
        queries::messages::append(self.db()?, message.clone()).await
    }

    async fn get_message(&self, id: &str) -> Result<Option<Message>, AteneaError> {
        queries::messages::get(self.db()?, id).await
    }

    async fn find_message_by_external_id(
        &self,
        channel: &str,
        external_message_id: &str,
    ) -> Result<Option<Message>, AteneaError> {
        queries::messages::find_by_external_id(self.db()?, channel, external_message_id).await
    }

    async fn mark_messages_read(
        &self,
        ids: &[String],
        reader: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, AteneaError> {
        queries::messages::mark_read(self.db()?, ids.to_vec(), reader, at).await
    }

    async fn unread_count(&self, room_id: &str) -> Result<u64, AteneaError> {
        queries::messages::unread_count(self.db()?, room_id).await
    }

    async fn list_room_messages(&self, room_id: &str) -> Result<Vec<Message>, AteneaError> {
        queries::messages::list_for_room(self.db()?, room_id).await
    }

    async fn list_attention_messages(
        &self,
        attention_id: &str,
    ) -> Result<Vec<Message>, AteneaError> {
        queries::messages::list_for_attention(self.db()?, attention_id).await
    }

    async fn last_message(&self, room_id: &str) -> Result<Option<Message>, AteneaError> {
        queries::messages::last_for_room(self.db()?, room_id).await
    }

    // --- Presence ---

    async fn create_vicidial_user(&self, user: &VicidialUser) -> Result<(), AteneaError> {
        queries::presence::create_user(self.db()?, user.clone()).await
    }

    async fn get_vicidial_user(&self, id: &str) -> Result<Option<VicidialUser>, AteneaError> {
        queries::presence::get_user(self.db()?, id).await
    }

    async fn find_vicidial_user_by_actor(
        &self,
        user_id: &str,
    ) -> Result<Option<VicidialUser>, AteneaError> {
        queries::presence::find_by_actor(self.db()?, user_id).await
    }

    async fn last_presence_record(
        &self,
        vicidial_user_id: &str,
    ) -> Result<Option<PresenceRecord>, AteneaError> {
        queries::presence::last_record(self.db()?, vicidial_user_id).await
    }

    async fn record_presence_transition(
        &self,
        record: &PresenceRecord,
    ) -> Result<bool, AteneaError> {
        queries::presence::record_transition(self.db()?, record.clone()).await
    }

    async fn presence_history(
        &self,
        vicidial_user_id: &str,
    ) -> Result<Vec<PresenceRecord>, AteneaError> {
        queries::presence::history(self.db()?, vicidial_user_id).await
    }

    // --- Query history and surveys ---

    async fn insert_query_record(&self, record: &QueryRecord) -> Result<(), AteneaError> {
        queries::records::insert_query(self.db()?, record.clone()).await
    }

    async fn list_query_records(
        &self,
        attention_id: &str,
    ) -> Result<Vec<QueryRecord>, AteneaError> {
        queries::records::list_queries(self.db()?, attention_id).await
    }

    async fn insert_survey(&self, survey: &Survey) -> Result<bool, AteneaError> {
        queries::records::insert_survey(self.db()?, survey.clone()).await
    }

    async fn get_survey(&self, attention_id: &str) -> Result<Option<Survey>, AteneaError> {
        queries::records::get_survey(self.db()?, attention_id).await
    }
}
