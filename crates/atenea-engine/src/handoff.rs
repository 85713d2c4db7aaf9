// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot/agent handoff.
//!
//! `bot_replies` decides who answers inbound traffic. Agents claim and
//! release rooms explicitly; the bot can only escalate, and escalation
//! never picks an agent. Every flip records a [`HandoffEvent`].

use atenea_core::AteneaError;
use atenea_core::models::{HandoffEvent, Room, SYSTEM_ACTOR};
use atenea_core::types::{Handler, HandoffTrigger, RoomStatus, format_timestamp};
use tracing::{debug, info};

use crate::automatic::AGENT_ASSIGNED;
use crate::{ContactCenter, new_id, require_non_empty};

/// Channel category whose rooms require an available telephony agent.
pub const VOICE_CATEGORY: &str = "voice";

impl ContactCenter {
    /// Hands the room to `user_id`.
    ///
    /// An agent-served room is returned unchanged, except that an
    /// unassigned one gets `user_id` as assignee. A claim on a telephony
    /// room requires the agent's presence to be in an available state.
    pub async fn handoff_to_agent(&self, room_id: &str, user_id: &str) -> Result<Room, AteneaError> {
        require_non_empty("user_id", user_id)?;
        let (_guard, room) = self.lock_room(room_id).await?;
        if !room.status.is_active() {
            return Err(AteneaError::invalid_transition(
                "room",
                room_id,
                "cannot hand off a completed room",
            ));
        }
        self.ensure_agent_available(&room, user_id).await?;

        if !room.bot_replies {
            if room.user_id.is_some() {
                debug!(room_id, user_id, "room already served by an agent");
                return Ok(room);
            }
            return match self
                .storage
                .assign_room_user(room_id, user_id, self.now())
                .await?
            {
                Some(room) => {
                    info!(room_id, user_id, "agent assigned to escalated room");
                    self.fire_automatic(&room, None, AGENT_ASSIGNED).await;
                    Ok(room)
                }
                None => self.require_room(room_id).await,
            };
        }

        let event = HandoffEvent {
            id: new_id(),
            room_id: room.id.clone(),
            from_handler: Handler::Bot,
            to_handler: Handler::Agent,
            trigger: HandoffTrigger::AgentClaim,
            user_id: Some(user_id.to_string()),
            created_at: format_timestamp(self.now()),
        };
        let mut room = self
            .storage
            .apply_handoff(&event, Some(user_id), user_id)
            .await?
            .ok_or_else(|| {
                AteneaError::invalid_transition("room", room_id, "room changed concurrently")
            })?;
        info!(room_id, user_id, "room handed off to agent");

        if self.settings.priority_on_claim && room.status == RoomStatus::Pending {
            room = self.mark_priority_locked(&room, user_id).await?;
        }
        self.fire_automatic(&room, None, AGENT_ASSIGNED).await;
        Ok(room)
    }

    /// Returns the room to the bot. Only agents do this.
    pub async fn handoff_to_bot(&self, room_id: &str, actor: &str) -> Result<Room, AteneaError> {
        require_non_empty("actor", actor)?;
        let (_guard, room) = self.lock_room(room_id).await?;
        if !room.status.is_active() {
            return Err(AteneaError::invalid_transition(
                "room",
                room_id,
                "cannot hand off a completed room",
            ));
        }
        if room.bot_replies {
            debug!(room_id, "room already served by the bot");
            return Ok(room);
        }

        let event = HandoffEvent {
            id: new_id(),
            room_id: room.id.clone(),
            from_handler: Handler::Agent,
            to_handler: Handler::Bot,
            trigger: HandoffTrigger::AgentRelease,
            user_id: Some(actor.to_string()),
            created_at: format_timestamp(self.now()),
        };
        let room = self
            .storage
            .apply_handoff(&event, None, actor)
            .await?
            .ok_or_else(|| {
                AteneaError::invalid_transition("room", room_id, "room changed concurrently")
            })?;
        info!(room_id, actor, "room handed back to bot");
        Ok(room)
    }

    /// Moves a bot-served room to the agent queue without assigning anyone.
    pub(crate) async fn escalate_locked(
        &self,
        room: &Room,
        trigger: HandoffTrigger,
    ) -> Result<Room, AteneaError> {
        if !room.bot_replies {
            return Ok(room.clone());
        }
        let event = HandoffEvent {
            id: new_id(),
            room_id: room.id.clone(),
            from_handler: Handler::Bot,
            to_handler: Handler::Agent,
            trigger,
            user_id: None,
            created_at: format_timestamp(self.now()),
        };
        let escalated = self
            .storage
            .apply_handoff(&event, None, SYSTEM_ACTOR)
            .await?
            .ok_or_else(|| {
                AteneaError::invalid_transition("room", &room.id, "room changed concurrently")
            })?;
        info!(room_id = %room.id, trigger = %trigger, "room escalated to agents");
        Ok(escalated)
    }

    /// Handoff analytics for a room, oldest first.
    pub async fn handoff_history(&self, room_id: &str) -> Result<Vec<HandoffEvent>, AteneaError> {
        self.require_room(room_id).await?;
        self.storage.list_handoff_events(room_id).await
    }

    async fn ensure_agent_available(&self, room: &Room, user_id: &str) -> Result<(), AteneaError> {
        let Some(channel) = self.storage.get_channel(&room.channel).await? else {
            return Ok(());
        };
        if channel.category != VOICE_CATEGORY {
            return Ok(());
        }
        let Some(agent) = self.storage.find_vicidial_user_by_actor(user_id).await? else {
            return Ok(());
        };
        if self.state_category(&agent.channel_state_id).await?.as_deref()
            != Some(self.settings.available_category.as_str())
        {
            return Err(AteneaError::invalid_transition(
                "room",
                &room.id,
                format!("agent {user_id} is not available for telephony"),
            ));
        }
        Ok(())
    }
}
