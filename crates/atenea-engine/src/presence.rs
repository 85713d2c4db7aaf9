// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telephony agent presence.
//!
//! States are data-driven lookup rows grouped by category; the machine has
//! no terminal state. Every transition writes one immutable history row
//! together with the current-state update, or neither.

use atenea_core::AteneaError;
use atenea_core::models::{AuditMeta, ChannelState, PresenceRecord, VicidialUser};
use atenea_core::types::{format_timestamp, parse_timestamp};
use chrono::SubsecRound;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{ContactCenter, new_id, require_non_empty};

/// Telephony identity for a new agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAgent {
    pub username: String,
    #[serde(default)]
    pub phone_login: Option<String>,
    /// Actor id of the agent.
    pub user_id: String,
    pub channel_state_id: String,
}

/// An agent's current presence.
#[derive(Debug, Clone, Serialize)]
pub struct PresenceSnapshot {
    pub user: VicidialUser,
    pub state: ChannelState,
    /// When the current state began.
    pub since: String,
}

impl ContactCenter {
    /// Registers a telephony identity in its initial state. Pause codes
    /// start empty.
    pub async fn register_agent(
        &self,
        agent: NewAgent,
        actor: &str,
    ) -> Result<VicidialUser, AteneaError> {
        require_non_empty("username", &agent.username)?;
        require_non_empty("user_id", &agent.user_id)?;
        require_non_empty("actor", actor)?;
        self.require_state(&agent.channel_state_id).await?;

        let user = VicidialUser {
            id: new_id(),
            username: agent.username,
            phone_login: agent.phone_login,
            user_id: agent.user_id,
            channel_state_id: agent.channel_state_id,
            pause_code: None,
            audit: AuditMeta::created(actor, self.now()),
        };
        self.storage.create_vicidial_user(&user).await?;
        info!(vicidial_user_id = %user.id, username = %user.username, "telephony agent registered");
        Ok(user)
    }

    /// Moves an agent to `new_state_id`, returning the history row written.
    ///
    /// The pause code is kept only when the new state is in the paused
    /// category. The previous state's begin time is the end of the last
    /// history row, or the user's creation time for a first transition.
    pub async fn transition_presence(
        &self,
        vicidial_user_id: &str,
        new_state_id: &str,
        new_pause_code: Option<String>,
        actor: &str,
    ) -> Result<PresenceRecord, AteneaError> {
        require_non_empty("actor", actor)?;
        let _guard = self.presence_locks.lock(vicidial_user_id).await;

        let user = self.require_agent(vicidial_user_id).await?;
        let state = self.require_state(new_state_id).await?;

        let pause_code = if state.category == self.settings.paused_category {
            new_pause_code.filter(|code| !code.trim().is_empty())
        } else {
            if new_pause_code.is_some() {
                debug!(vicidial_user_id, new_state_id, "pause code dropped outside the paused category");
            }
            None
        };

        let start_time = self.state_began(&user).await?;
        let start = parse_timestamp(&start_time).ok_or_else(|| {
            AteneaError::Internal(format!("unparseable presence timestamp `{start_time}`"))
        })?;
        let end = self.now().trunc_subsecs(3).max(start);
        let record = PresenceRecord {
            id: new_id(),
            vicidial_user_id: user.id.clone(),
            old_channel_state_id: user.channel_state_id.clone(),
            new_channel_state_id: state.id.clone(),
            old_pause_code: user.pause_code.clone(),
            new_pause_code: pause_code,
            start_time,
            end_time: format_timestamp(end),
            duration: (end - start).num_seconds(),
            created_by: actor.to_string(),
        };

        match self.storage.record_presence_transition(&record).await {
            Ok(true) => {
                info!(
                    vicidial_user_id,
                    from = %record.old_channel_state_id,
                    to = %record.new_channel_state_id,
                    pause_code = ?record.new_pause_code,
                    duration = record.duration,
                    "presence transition recorded"
                );
                Ok(record)
            }
            Ok(false) => Err(AteneaError::invalid_transition(
                "vicidial_user",
                vicidial_user_id,
                "presence state changed concurrently",
            )),
            Err(e) => {
                error!(
                    vicidial_user_id,
                    record_id = %record.id,
                    error = %e,
                    "presence transition rolled back"
                );
                Err(AteneaError::IntegrityFailure {
                    message: format!(
                        "presence history and state for {vicidial_user_id} could not commit together"
                    ),
                    source: Some(Box::new(e)),
                })
            }
        }
    }

    /// Current state with the time it began.
    pub async fn current_presence(
        &self,
        vicidial_user_id: &str,
    ) -> Result<PresenceSnapshot, AteneaError> {
        let user = self.require_agent(vicidial_user_id).await?;
        let state = self.require_state(&user.channel_state_id).await?;
        let since = self.state_began(&user).await?;
        Ok(PresenceSnapshot { user, state, since })
    }

    /// Transitions oldest first.
    pub async fn presence_history(
        &self,
        vicidial_user_id: &str,
    ) -> Result<Vec<PresenceRecord>, AteneaError> {
        self.require_agent(vicidial_user_id).await?;
        self.storage.presence_history(vicidial_user_id).await
    }

    /// Whether the agent is in the available category.
    pub async fn is_agent_available(&self, vicidial_user_id: &str) -> Result<bool, AteneaError> {
        let user = self.require_agent(vicidial_user_id).await?;
        Ok(self.state_category(&user.channel_state_id).await?.as_deref()
            == Some(self.settings.available_category.as_str()))
    }

    pub(crate) async fn state_category(
        &self,
        state_id: &str,
    ) -> Result<Option<String>, AteneaError> {
        Ok(self
            .storage
            .get_channel_state(state_id)
            .await?
            .map(|s| s.category))
    }

    async fn state_began(&self, user: &VicidialUser) -> Result<String, AteneaError> {
        Ok(match self.storage.last_presence_record(&user.id).await? {
            Some(last) => last.end_time,
            None => user.audit.created_at.clone(),
        })
    }

    async fn require_agent(&self, id: &str) -> Result<VicidialUser, AteneaError> {
        self.storage
            .get_vicidial_user(id)
            .await?
            .ok_or_else(|| AteneaError::not_found("vicidial_user", id))
    }

    async fn require_state(&self, id: &str) -> Result<ChannelState, AteneaError> {
        self.storage
            .get_channel_state(id)
            .await?
            .ok_or_else(|| AteneaError::not_found("channel_state", id))
    }
}
