// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compliance query history and post-attention surveys.

use atenea_core::AteneaError;
use atenea_core::models::{AuditMeta, QueryRecord, Survey};
use atenea_core::types::QueryType;
use tracing::info;

use crate::{ContactCenter, new_id, require_non_empty};

impl ContactCenter {
    /// Records an external lookup performed during an open attention.
    /// Records are never updated or deleted.
    pub async fn record_query(
        &self,
        attention_id: &str,
        query_type: QueryType,
        document_type: &str,
        document_value: &str,
        actor: &str,
    ) -> Result<QueryRecord, AteneaError> {
        require_non_empty("document_type", document_type)?;
        require_non_empty("document_value", document_value)?;
        require_non_empty("actor", actor)?;
        let attention = self.require_attention(attention_id).await?;
        if !attention.status.is_open() {
            return Err(AteneaError::invalid_transition(
                "attention",
                attention_id,
                "queries are recorded during an open attention",
            ));
        }

        let record = QueryRecord {
            id: new_id(),
            attention_id: attention_id.to_string(),
            query_type,
            document_type: document_type.to_string(),
            document_value: document_value.to_string(),
            audit: AuditMeta::created(actor, self.now()),
        };
        self.storage.insert_query_record(&record).await?;
        info!(attention_id, query_type = %query_type, actor, "query recorded");
        Ok(record)
    }

    pub async fn list_queries(&self, attention_id: &str) -> Result<Vec<QueryRecord>, AteneaError> {
        self.require_attention(attention_id).await?;
        self.storage.list_query_records(attention_id).await
    }

    /// Records the satisfaction survey of a closed attention.
    ///
    /// The rated agent defaults to the room's assignee.
    pub async fn create_survey(
        &self,
        attention_id: &str,
        rating: u8,
        comment: Option<String>,
        user_id: Option<String>,
        actor: &str,
    ) -> Result<Survey, AteneaError> {
        require_non_empty("actor", actor)?;
        if !(1..=5).contains(&rating) {
            return Err(AteneaError::Validation(format!(
                "rating must be between 1 and 5, got {rating}"
            )));
        }
        let attention = self.require_attention(attention_id).await?;
        if attention.status.is_open() {
            return Err(AteneaError::invalid_transition(
                "attention",
                attention_id,
                "surveys require a closed attention",
            ));
        }
        let room = self.require_room(&attention.room_id).await?;

        let survey = Survey {
            id: new_id(),
            attention_id: attention_id.to_string(),
            room_id: room.id,
            citizen_id: room.citizen_id,
            user_id: user_id.or(room.user_id),
            rating,
            comment: comment.filter(|c| !c.trim().is_empty()),
            audit: AuditMeta::created(actor, self.now()),
        };
        if !self.storage.insert_survey(&survey).await? {
            return Err(AteneaError::invalid_transition(
                "attention",
                attention_id,
                "attention already has a survey",
            ));
        }
        info!(attention_id, rating, "survey recorded");
        Ok(survey)
    }

    pub async fn get_survey(&self, attention_id: &str) -> Result<Survey, AteneaError> {
        self.storage
            .get_survey(attention_id)
            .await?
            .ok_or_else(|| AteneaError::not_found("survey", attention_id))
    }
}
