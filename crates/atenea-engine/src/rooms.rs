// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel room lifecycle: one active room per (channel, citizen).
//!
//! `pending -> priority -> completed`, with completed terminal. Completing
//! a room force-closes any attention still open in it.

use atenea_core::AteneaError;
use atenea_core::models::{
    AttentionSummary, AuditMeta, Citizen, CompletedRoom, LastMessage, NewRoom, Room, RoomFilter,
    RoomSummary, SYSTEM_ACTOR,
};
use atenea_core::types::RoomStatus;
use tracing::{debug, info, warn};

use crate::locks::RoomGuard;
use crate::{ContactCenter, new_id, require_non_empty};

/// Close reason stamped on attentions force-closed by a room completion.
pub const ROOM_COMPLETED: &str = "room_completed";

/// Lock key shared by every transition of the conversation between a
/// citizen and one channel.
pub fn room_key(channel: &str, citizen_id: &str) -> String {
    format!("{channel}:{citizen_id}")
}

impl ContactCenter {
    /// Returns the citizen's active room on `channel`, creating a pending,
    /// bot-served one when none exists.
    pub async fn resolve_room(
        &self,
        channel: &str,
        external_room_id: &str,
        citizen: &Citizen,
    ) -> Result<Room, AteneaError> {
        let _guard = self.room_locks.lock(&room_key(channel, &citizen.id)).await;
        self.resolve_room_locked(channel, external_room_id, citizen).await
    }

    pub(crate) async fn resolve_room_locked(
        &self,
        channel: &str,
        external_room_id: &str,
        citizen: &Citizen,
    ) -> Result<Room, AteneaError> {
        require_non_empty("external_room_id", external_room_id)?;
        let room = self
            .storage
            .find_or_create_room(&NewRoom {
                id: new_id(),
                channel: channel.to_string(),
                external_room_id: external_room_id.to_string(),
                citizen_id: citizen.id.clone(),
                audit: AuditMeta::created(SYSTEM_ACTOR, self.now()),
            })
            .await?;
        debug!(room_id = %room.id, channel, citizen_id = %citizen.id, "room resolved");
        Ok(room)
    }

    pub async fn get_room(&self, id: &str) -> Result<Room, AteneaError> {
        self.require_room(id).await
    }

    /// Loads a room, takes its lock and re-reads it under the lock.
    pub(crate) async fn lock_room(&self, id: &str) -> Result<(RoomGuard, Room), AteneaError> {
        let room = self.require_room(id).await?;
        let guard = self
            .room_locks
            .lock(&room_key(&room.channel, &room.citizen_id))
            .await;
        let room = self.require_room(id).await?;
        Ok((guard, room))
    }

    /// Agent-workspace summaries of the rooms matching `filter`.
    pub async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<RoomSummary>, AteneaError> {
        let rooms = self.storage.list_rooms(filter).await?;
        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms {
            summaries.push(self.summarize(room).await?);
        }
        Ok(summaries)
    }

    pub async fn room_summary(&self, id: &str) -> Result<RoomSummary, AteneaError> {
        let room = self.require_room(id).await?;
        self.summarize(room).await
    }

    async fn summarize(&self, room: Room) -> Result<RoomSummary, AteneaError> {
        let attention = match self.storage.open_attention(&room.id).await? {
            Some(open) => Some(open),
            None => self.storage.latest_attention(&room.id).await?,
        };
        let last_message = self.storage.last_message(&room.id).await?;
        let unread_count = self.storage.unread_count(&room.id).await?;
        Ok(RoomSummary {
            room_id: room.id,
            attention: attention.map(|a| AttentionSummary {
                id: a.id,
                end_date: a.end_date,
                consult_type_id: a.consult_type_id,
                detail: a.attention_detail,
            }),
            external_room_id: room.external_room_id,
            channel: room.channel,
            last_message: last_message.map(|m| LastMessage {
                has_attachments: !m.attachments.is_empty(),
                id: m.id,
                body: m.content,
                sender_type: m.sender_type,
                status: m.status,
                timestamp: m.timestamp,
            }),
            status: room.status,
            user_id: room.user_id,
            unread_count,
            bot_replies: room.bot_replies,
        })
    }

    /// Moves a pending room to priority.
    pub async fn mark_priority(&self, room_id: &str, actor: &str) -> Result<Room, AteneaError> {
        require_non_empty("actor", actor)?;
        let (_guard, room) = self.lock_room(room_id).await?;
        self.mark_priority_locked(&room, actor).await
    }

    pub(crate) async fn mark_priority_locked(
        &self,
        room: &Room,
        actor: &str,
    ) -> Result<Room, AteneaError> {
        if !room.status.can_transition_to(RoomStatus::Priority) {
            return Err(AteneaError::invalid_transition(
                "room",
                &room.id,
                format!("cannot move from {} to priority", room.status),
            ));
        }
        let moved = self
            .storage
            .update_room_status(&room.id, room.status, RoomStatus::Priority, actor, self.now())
            .await?;
        if !moved {
            return Err(AteneaError::invalid_transition(
                "room",
                &room.id,
                "room status changed concurrently",
            ));
        }
        info!(room_id = %room.id, actor, "room marked priority");
        self.require_room(&room.id).await
    }

    /// Completes a room. Open attentions are force-closed first.
    pub async fn mark_completed(
        &self,
        room_id: &str,
        actor: &str,
    ) -> Result<CompletedRoom, AteneaError> {
        require_non_empty("actor", actor)?;
        let (_guard, room) = self.lock_room(room_id).await?;
        self.complete_locked(&room, actor).await
    }

    pub(crate) async fn complete_locked(
        &self,
        room: &Room,
        actor: &str,
    ) -> Result<CompletedRoom, AteneaError> {
        if !room.status.can_transition_to(RoomStatus::Completed) {
            return Err(AteneaError::invalid_transition(
                "room",
                &room.id,
                "room is already completed",
            ));
        }
        let completed = self
            .storage
            .complete_room(&room.id, room.status, ROOM_COMPLETED, actor, self.now())
            .await?
            .ok_or_else(|| {
                AteneaError::invalid_transition("room", &room.id, "room status changed concurrently")
            })?;
        for attention_id in &completed.force_closed {
            warn!(
                room_id = %room.id,
                attention_id = %attention_id,
                "open attention force-closed on room completion"
            );
        }
        info!(room_id = %room.id, actor, "room completed");
        Ok(completed)
    }
}
