// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation and attention state machines for the Atenea contact center.
//!
//! The [`ContactCenter`] is the central coordinator that:
//! - Resolves citizens and their one active room per channel
//! - Opens, classifies and closes attention tickets inside a room
//! - Appends to the idempotent message ledger
//! - Routes rooms between the bot and human agents
//! - Tracks telephony agent presence with audit history
//! - Dispatches replies through the registered channel adapters
//!
//! Every room-scoped transition runs under a per-room logical lock keyed by
//! (channel, citizen), so concurrent webhooks for the same conversation
//! serialize while unrelated rooms proceed in parallel.

pub mod attentions;
pub mod automatic;
pub mod calendar;
pub mod catalog;
pub mod channels;
pub mod dispatch;
pub mod handoff;
pub mod identity;
pub mod inbound;
pub mod ledger;
pub mod locks;
pub mod presence;
pub mod records;
pub mod rooms;
pub mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use atenea_config::model::AteneaConfig;
use atenea_core::models::{Attention, Room};
use atenea_core::traits::calendar::AlwaysOpen;
use atenea_core::{
    AteneaError, BotAdapter, BusinessCalendar, ChannelAdapter, Clock, HealthStatus,
    StorageAdapter, SystemClock,
};
use chrono::{DateTime, Utc};
use tracing::info;

pub use attentions::ClosedAttention;
pub use calendar::ConfigCalendar;
pub use catalog::sync_catalog;
pub use channels::ChannelRegistry;
pub use dispatch::{DispatchResult, NormalizedReply, normalize};
pub use inbound::IngestOutcome;
pub use ledger::LedgerEntry;
pub use locks::{RoomGuard, RoomLocks};
pub use presence::{NewAgent, PresenceSnapshot};

/// Policy knobs the engine reads on every operation.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Consecutive failed bot turns before escalating. `None` disables the policy.
    pub failed_turn_threshold: Option<u32>,
    /// Move a pending room to priority when an agent claims it.
    pub priority_on_claim: bool,
    /// Channel state category in which a pause code is kept.
    pub paused_category: String,
    /// Channel state category in which an agent can take telephony rooms.
    pub available_category: String,
    /// Upper bound for one adapter send.
    pub dispatch_timeout: Duration,
    /// Footer for interactive messages that carry none.
    pub default_footer: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&AteneaConfig::default())
    }
}

impl EngineSettings {
    pub fn from_config(config: &AteneaConfig) -> Self {
        Self {
            failed_turn_threshold: config.handoff.failed_turn_threshold,
            priority_on_claim: config.handoff.priority_on_claim,
            paused_category: config.presence.paused_category.clone(),
            available_category: config.presence.available_category.clone(),
            dispatch_timeout: Duration::from_secs(config.dispatch.timeout_secs),
            default_footer: config.dispatch.default_footer.clone(),
        }
    }
}

/// The contact-center core shared by the gateway and background tasks.
///
/// Cheap to share behind an `Arc`; every operation takes `&self`.
pub struct ContactCenter {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    channels: ChannelRegistry,
    bot: Option<Arc<dyn BotAdapter + Send + Sync>>,
    calendar: Arc<dyn BusinessCalendar>,
    clock: Arc<dyn Clock>,
    room_locks: RoomLocks,
    presence_locks: RoomLocks,
    settings: EngineSettings,
}

impl ContactCenter {
    /// Creates a contact center over an initialized storage backend.
    ///
    /// Starts with no channels, no bot, an always-open calendar and the
    /// system clock.
    pub fn new(storage: Arc<dyn StorageAdapter + Send + Sync>, settings: EngineSettings) -> Self {
        info!(
            failed_turn_threshold = ?settings.failed_turn_threshold,
            dispatch_timeout_secs = settings.dispatch_timeout.as_secs(),
            "contact center initialized"
        );
        Self {
            storage,
            channels: ChannelRegistry::new(),
            bot: None,
            calendar: Arc::new(AlwaysOpen),
            clock: Arc::new(SystemClock),
            room_locks: RoomLocks::new(),
            presence_locks: RoomLocks::new(),
            settings,
        }
    }

    /// Registers a channel adapter under its channel code.
    pub fn with_channel(mut self, adapter: Arc<dyn ChannelAdapter + Send + Sync>) -> Self {
        self.channels.register(adapter);
        self
    }

    /// Forwards bot-served rooms to `bot`.
    pub fn with_bot(mut self, bot: Arc<dyn BotAdapter + Send + Sync>) -> Self {
        self.bot = Some(bot);
        self
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn BusinessCalendar>) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter + Send + Sync> {
        &self.storage
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Aggregated health of storage and every registered channel.
    pub async fn health_check(&self) -> HealthStatus {
        match self.storage.health_check().await {
            Ok(HealthStatus::Healthy) => {}
            Ok(other) => return other,
            Err(e) => return HealthStatus::Unhealthy(format!("storage: {e}")),
        }
        self.channels.health_check().await
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    async fn require_room(&self, id: &str) -> Result<Room, AteneaError> {
        self.storage
            .get_room(id)
            .await?
            .ok_or_else(|| AteneaError::not_found("room", id))
    }

    async fn require_attention(&self, id: &str) -> Result<Attention, AteneaError> {
        self.storage
            .get_attention(id)
            .await?
            .ok_or_else(|| AteneaError::not_found("attention", id))
    }
}

/// Fresh entity id.
fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Rejects blank caller-supplied identifiers.
fn require_non_empty(field: &str, value: &str) -> Result<(), AteneaError> {
    if value.trim().is_empty() {
        return Err(AteneaError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
