// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attention tickets: `identity_verification -> in_progress -> closed`.
//!
//! At most one non-closed attention exists per room and closed is
//! terminal. Closing the last open attention completes the room.

use atenea_core::AteneaError;
use atenea_core::models::{Attention, AuditMeta, NewAttention, OpenedAttention, Room};
use atenea_core::types::format_timestamp;
use serde::Serialize;
use tracing::info;

use crate::automatic::{self, ATTENTION_CLASSIFIED, ATTENTION_CLOSED, ATTENTION_OPENED};
use crate::locks::RoomGuard;
use crate::{ContactCenter, new_id, require_non_empty};

/// Outcome of closing an attention.
#[derive(Debug, Clone, Serialize)]
pub struct ClosedAttention {
    pub attention: Attention,
    /// The parent room after the close.
    pub room: Room,
    /// True when the close left no open attention and completed the room.
    pub room_completed: bool,
}

impl ContactCenter {
    /// Returns the room's open attention, opening one when none exists.
    pub async fn open_or_get_attention(
        &self,
        room_id: &str,
        actor: &str,
    ) -> Result<OpenedAttention, AteneaError> {
        require_non_empty("actor", actor)?;
        let (_guard, room) = self.lock_room(room_id).await?;
        let opened = self.open_attention_locked(&room, actor).await?;
        if opened.created {
            self.fire_automatic(&room, Some(&opened.attention), ATTENTION_OPENED)
                .await;
        }
        Ok(opened)
    }

    pub(crate) async fn open_attention_locked(
        &self,
        room: &Room,
        actor: &str,
    ) -> Result<OpenedAttention, AteneaError> {
        if !room.status.is_active() {
            return Err(AteneaError::invalid_transition(
                "room",
                &room.id,
                "cannot open an attention in a completed room",
            ));
        }
        let now = self.now();
        let opened = self
            .storage
            .open_or_get_attention(&NewAttention {
                id: new_id(),
                room_id: room.id.clone(),
                start_date: format_timestamp(now),
                audit: AuditMeta::created(actor, now),
            })
            .await?;
        if opened.created {
            info!(room_id = %room.id, attention_id = %opened.attention.id, "attention opened");
        }
        Ok(opened)
    }

    pub async fn get_attention(&self, id: &str) -> Result<Attention, AteneaError> {
        self.require_attention(id).await
    }

    /// Loads an attention, locks its room and re-reads both under the lock.
    async fn lock_attention(&self, id: &str) -> Result<(RoomGuard, Room, Attention), AteneaError> {
        let attention = self.require_attention(id).await?;
        let (guard, room) = self.lock_room(&attention.room_id).await?;
        let attention = self.require_attention(id).await?;
        Ok((guard, room, attention))
    }

    /// Records the consult type and detail; the attention moves to
    /// in_progress. Reclassifying an in-progress attention overwrites the
    /// consult type without a status change.
    pub async fn classify_attention(
        &self,
        attention_id: &str,
        consult_type_id: i64,
        detail: Option<String>,
        actor: &str,
    ) -> Result<Attention, AteneaError> {
        require_non_empty("actor", actor)?;
        let (_guard, room, attention) = self.lock_attention(attention_id).await?;
        if !attention.status.is_open() {
            return Err(AteneaError::invalid_transition(
                "attention",
                attention_id,
                "attention is closed",
            ));
        }
        if self.storage.get_consult_type(consult_type_id).await?.is_none() {
            return Err(AteneaError::not_found(
                "consult_type",
                consult_type_id.to_string(),
            ));
        }

        let classified = self
            .storage
            .classify_attention(attention_id, consult_type_id, detail.as_deref(), actor, self.now())
            .await?;
        if !classified {
            return Err(AteneaError::invalid_transition(
                "attention",
                attention_id,
                "attention closed concurrently",
            ));
        }
        let attention = self.require_attention(attention_id).await?;
        info!(
            room_id = %room.id,
            attention_id,
            consult_type_id,
            "attention classified"
        );

        self.fire_automatic(&room, Some(&attention), ATTENTION_CLASSIFIED)
            .await;
        self.fire_automatic(&room, Some(&attention), &automatic::consult_type(consult_type_id))
            .await;
        Ok(attention)
    }

    /// Closes an attention, completing the room when nothing else is open.
    pub async fn close_attention(
        &self,
        attention_id: &str,
        actor: &str,
    ) -> Result<ClosedAttention, AteneaError> {
        require_non_empty("actor", actor)?;
        let (_guard, room, attention) = self.lock_attention(attention_id).await?;
        if !attention.status.is_open() {
            return Err(AteneaError::invalid_transition(
                "attention",
                attention_id,
                "attention is already closed",
            ));
        }
        // The farewell belongs to the attention, so it goes out while still open.
        self.fire_automatic(&room, Some(&attention), ATTENTION_CLOSED)
            .await;

        let closed = self
            .storage
            .close_attention(attention_id, None, actor, self.now())
            .await?;
        if !closed {
            return Err(AteneaError::invalid_transition(
                "attention",
                attention_id,
                "attention closed concurrently",
            ));
        }
        let attention = self.require_attention(attention_id).await?;
        info!(room_id = %room.id, attention_id, actor, "attention closed");

        let mut room_completed = false;
        let room = if room.status.is_active()
            && self.storage.count_open_attentions(&room.id).await? == 0
        {
            room_completed = true;
            self.complete_locked(&room, actor).await?.room
        } else {
            room
        };

        Ok(ClosedAttention {
            attention,
            room,
            room_completed,
        })
    }
}
