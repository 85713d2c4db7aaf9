// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete contact center with mock channels, a
//! scripted bot, a manual clock and a temp SQLite database seeded with the
//! default catalog. Provides `inbound()` and `ingest_text()` to drive the
//! inbound pipeline in tests.

use std::collections::HashMap;
use std::sync::Arc;

use atenea_config::model::{
    AteneaConfig, AutomaticMessageConfig, BusinessHoursConfig, ConsultTypeConfig, StorageConfig,
};
use atenea_core::models::VicidialUser;
use atenea_core::types::{ChannelCapabilities, IncomingBody, IncomingEvent, Party};
use atenea_core::{AteneaError, BusinessCalendar, Clock, StorageAdapter};
use atenea_engine::{
    ConfigCalendar, ContactCenter, EngineSettings, IngestOutcome, NewAgent, sync_catalog,
};
use atenea_storage::SqliteStorage;

use crate::clock::ManualClock;
use crate::mock_bot::MockBot;
use crate::mock_channel::MockChannel;

/// Consult type used by the scenario tests.
pub const PAPELETAS: i64 = 5;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: AteneaConfig,
    channels: Vec<(String, ChannelCapabilities)>,
    with_bot: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = AteneaConfig::default();
        config.consult_types = vec![
            ConsultTypeConfig {
                id: 1,
                name: "Tributos".into(),
            },
            ConsultTypeConfig {
                id: PAPELETAS,
                name: "Papeletas".into(),
            },
        ];
        let message = |category: &str, name: &str, variants: &[&str]| AutomaticMessageConfig {
            channel_category: category.into(),
            name: name.into(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        };
        config.automatic_messages = vec![
            message("messaging", "welcome", &["Hola, soy Atenea del SAT."]),
            message("messaging", "attention_closed", &["Gracias por comunicarte con el SAT."]),
            message("messaging", "out_of_hours", &["Nuestro horario es de 8:00 a 17:00."]),
        ];
        config.dispatch.timeout_secs = 1;
        Self {
            config,
            channels: vec![
                ("whatsapp".into(), ChannelCapabilities::default()),
                ("telegram".into(), ChannelCapabilities::default()),
                ("telephony".into(), ChannelCapabilities::default()),
            ],
            with_bot: true,
        }
    }

    /// Escalate after `threshold` consecutive failed bot turns.
    pub fn with_failed_turn_threshold(mut self, threshold: u32) -> Self {
        self.config.handoff.failed_turn_threshold = Some(threshold);
        self
    }

    /// Replace the business hours section.
    pub fn with_business_hours(mut self, hours: BusinessHoursConfig) -> Self {
        self.config.business_hours = hours;
        self
    }

    /// Register (or replace) a mock channel with explicit capabilities.
    pub fn with_channel(mut self, code: &str, capabilities: ChannelCapabilities) -> Self {
        self.channels.retain(|(c, _)| c != code);
        self.channels.push((code.to_string(), capabilities));
        self
    }

    /// Do not attach a bot; bot-served rooms then only get automatic messages.
    pub fn without_bot(mut self) -> Self {
        self.with_bot = false;
        self
    }

    /// Adjust the configuration before the harness is built.
    pub fn configure(mut self, f: impl FnOnce(&mut AteneaConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, AteneaError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| AteneaError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter + Send + Sync> = Arc::new(storage);
        sync_catalog(storage.as_ref(), &config).await?;

        let clock = Arc::new(ManualClock::monday_morning());
        let calendar: Arc<dyn BusinessCalendar> =
            Arc::new(ConfigCalendar::from_config(&config.business_hours)?);
        let bot = Arc::new(MockBot::new());

        let mut center = ContactCenter::new(Arc::clone(&storage), EngineSettings::from_config(&config))
            .with_clock(Arc::clone(&clock) as Arc<dyn Clock>)
            .with_calendar(calendar);
        let mut channels = HashMap::new();
        for (code, capabilities) in self.channels {
            let channel = Arc::new(MockChannel::with_capabilities(&code, capabilities));
            center = center.with_channel(channel.clone());
            channels.insert(code, channel);
        }
        if self.with_bot {
            center = center.with_bot(bot.clone());
        }

        Ok(TestHarness {
            center: Arc::new(center),
            storage,
            channels,
            bot,
            clock,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// The contact center under test.
    pub center: Arc<ContactCenter>,
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<dyn StorageAdapter + Send + Sync>,
    /// Mock channels keyed by channel code.
    pub channels: HashMap<String, Arc<MockChannel>>,
    /// The scripted bot (attached unless built `without_bot`).
    pub bot: Arc<MockBot>,
    pub clock: Arc<ManualClock>,
    pub config: AteneaConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with the default catalog, mock channels and bot.
    pub async fn new() -> Result<Self, AteneaError> {
        Self::builder().build().await
    }

    /// The mock registered for `code`.
    ///
    /// # Panics
    ///
    /// When no mock was registered for `code`.
    pub fn channel(&self, code: &str) -> Arc<MockChannel> {
        match self.channels.get(code) {
            Some(channel) => Arc::clone(channel),
            None => panic!("no mock channel registered for {code}"),
        }
    }

    /// A text event from `from` on `channel`, stamped with the harness clock.
    pub fn inbound(&self, channel: &str, from: &str, text: &str, external_id: &str) -> IncomingEvent {
        IncomingEvent {
            channel: channel.to_string(),
            external_room_id: from.to_string(),
            sender: Party {
                id: from.to_string(),
                full_name: Some("Rosa Quispe".to_string()),
                phone: Some(from.to_string()),
                email: None,
            },
            receiver: None,
            message: IncomingBody {
                id: Some(external_id.to_string()),
                body: text.to_string(),
                bot_reply: None,
            },
            attachments: Vec::new(),
            timestamp: self.clock.now(),
        }
    }

    /// Ingests a WhatsApp text from `from`.
    pub async fn ingest_text(
        &self,
        from: &str,
        text: &str,
        external_id: &str,
    ) -> Result<IngestOutcome, AteneaError> {
        self.center
            .ingest(self.inbound("whatsapp", from, text, external_id))
            .await
    }

    /// Runs a SQL batch against the harness database on a side connection.
    ///
    /// Used to install triggers that make a later engine write fail.
    pub fn execute_sql(&self, sql: &str) -> Result<(), AteneaError> {
        let conn = rusqlite::Connection::open(&self.config.storage.database_path)
            .map_err(|e| AteneaError::Storage { source: Box::new(e) })?;
        conn.execute_batch(sql)
            .map_err(|e| AteneaError::Storage { source: Box::new(e) })
    }

    /// Registers a telephony agent for actor `user_id` in `state`.
    pub async fn register_agent(
        &self,
        user_id: &str,
        state: &str,
    ) -> Result<VicidialUser, AteneaError> {
        self.center
            .register_agent(
                NewAgent {
                    username: format!("vici-{user_id}"),
                    phone_login: None,
                    user_id: user_id.to_string(),
                    channel_state_id: state.to_string(),
                },
                "supervisor",
            )
            .await
    }
}
