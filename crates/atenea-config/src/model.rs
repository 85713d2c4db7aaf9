// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Atenea contact-center core.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Atenea configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AteneaConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Outbound dispatch settings and channel relays.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Bot/agent handoff policy.
    #[serde(default)]
    pub handoff: HandoffConfig,

    /// Telephony presence settings.
    #[serde(default)]
    pub presence: PresenceConfig,

    /// Bot engine connection.
    #[serde(default)]
    pub bot: BotConfig,

    /// Business hours and holidays.
    #[serde(default)]
    pub business_hours: BusinessHoursConfig,

    /// Channel lookup rows.
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelConfig>,

    /// Consult type lookup rows.
    #[serde(default)]
    pub consult_types: Vec<ConsultTypeConfig>,

    /// Telephony channel state lookup rows.
    #[serde(default = "default_channel_states")]
    pub channel_states: Vec<ChannelStateConfig>,

    /// Canned messages keyed by (channel category, name).
    #[serde(default)]
    pub automatic_messages: Vec<AutomaticMessageConfig>,
}

impl Default for AteneaConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            storage: StorageConfig::default(),
            gateway: GatewayConfig::default(),
            dispatch: DispatchConfig::default(),
            handoff: HandoffConfig::default(),
            presence: PresenceConfig::default(),
            bot: BotConfig::default(),
            business_hours: BusinessHoursConfig::default(),
            channels: default_channels(),
            consult_types: Vec::new(),
            channel_states: default_channel_states(),
            automatic_messages: Vec::new(),
        }
    }
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service, used in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "atenea".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("atenea").join("atenea.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("atenea.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Address to bind the server to.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on every route except `/health`.
    /// `None` leaves the API unauthenticated (local development only).
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Allowed CORS origins. Empty disables cross-origin access.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
            request_timeout_secs: default_request_timeout_secs(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Outbound dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Upper bound for a single adapter send, in seconds. A timeout is a failure.
    #[serde(default = "default_dispatch_timeout_secs")]
    pub timeout_secs: u64,

    /// Footer appended to interactive messages when the payload has none.
    #[serde(default)]
    pub default_footer: Option<String>,

    /// One relay endpoint per channel.
    #[serde(default)]
    pub relays: Vec<RelayConfig>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_dispatch_timeout_secs(),
            default_footer: None,
            relays: Vec::new(),
        }
    }
}

fn default_dispatch_timeout_secs() -> u64 {
    10
}

/// HTTP relay towards one channel's transport adapter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Channel code this relay serves.
    pub channel: String,

    /// URL receiving outgoing command JSON.
    pub endpoint: String,

    /// Bearer token sent to the relay, if any.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Whether the channel renders buttons natively.
    #[serde(default)]
    pub supports_interactive: bool,

    /// Whether the channel accepts attachments.
    #[serde(default = "default_true")]
    pub supports_attachments: bool,

    /// Longest text the channel accepts, in characters.
    #[serde(default)]
    pub max_message_length: Option<usize>,
}

fn default_true() -> bool {
    true
}

/// Bot/agent handoff policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HandoffConfig {
    /// Consecutive failed bot turns that escalate the room to an agent.
    /// `None` disables the policy.
    #[serde(default)]
    pub failed_turn_threshold: Option<u32>,

    /// Move a pending room to priority when an agent claims it.
    #[serde(default = "default_true")]
    pub priority_on_claim: bool,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            failed_turn_threshold: None,
            priority_on_claim: true,
        }
    }
}

/// Telephony presence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PresenceConfig {
    /// Channel state category in which a pause code may be set.
    #[serde(default = "default_paused_category")]
    pub paused_category: String,

    /// Channel state category in which an agent may take telephony rooms.
    #[serde(default = "default_available_category")]
    pub available_category: String,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            paused_category: default_paused_category(),
            available_category: default_available_category(),
        }
    }
}

fn default_paused_category() -> String {
    "paused".to_string()
}

fn default_available_category() -> String {
    "available".to_string()
}

/// Bot engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Whether bot-served rooms are forwarded to the bot engine.
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of the Rasa server.
    #[serde(default = "default_rasa_url")]
    pub rasa_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_bot_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rasa_url: default_rasa_url(),
            timeout_secs: default_bot_timeout_secs(),
        }
    }
}

fn default_rasa_url() -> String {
    "http://localhost:5005".to_string()
}

fn default_bot_timeout_secs() -> u64 {
    15
}

/// Business hours configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BusinessHoursConfig {
    /// When false the organization is always attending.
    #[serde(default)]
    pub enabled: bool,

    /// Offset of local time from UTC, in minutes (Lima is -300).
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Attending windows.
    #[serde(default)]
    pub days: Vec<DaySchedule>,

    /// Closed dates, `YYYY-MM-DD` in local time.
    #[serde(default)]
    pub holidays: Vec<String>,
}

/// Day of the week for schedule entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// One attending window, `HH:MM` local time, end exclusive.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DaySchedule {
    pub day: DayOfWeek,
    pub start: String,
    pub end: String,
}

/// Channel lookup entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    pub code: String,
    pub name: String,
    /// Grouping used to select automatic messages.
    pub category: String,
}

fn default_channels() -> Vec<ChannelConfig> {
    [
        ("whatsapp", "WhatsApp", "messaging"),
        ("telegram", "Telegram", "messaging"),
        ("instagram", "Instagram", "social"),
        ("sms", "SMS", "messaging"),
        ("email", "Email", "mail"),
        ("chatsat", "Chat SAT", "webchat"),
        ("telephony", "Telephony", "voice"),
    ]
    .into_iter()
    .map(|(code, name, category)| ChannelConfig {
        code: code.to_string(),
        name: name.to_string(),
        category: category.to_string(),
    })
    .collect()
}

/// Consult type lookup entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConsultTypeConfig {
    pub id: i64,
    pub name: String,
}

/// Telephony channel state lookup entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelStateConfig {
    pub id: String,
    pub name: String,
    pub category: String,
}

fn default_channel_states() -> Vec<ChannelStateConfig> {
    [
        ("AVAILABLE", "Available", "available"),
        ("INCALL", "On call", "on_call"),
        ("PAUSED", "Paused", "paused"),
        ("OFFLINE", "Offline", "offline"),
    ]
    .into_iter()
    .map(|(id, name, category)| ChannelStateConfig {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
    })
    .collect()
}

/// Canned message entry with its ordered variants.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AutomaticMessageConfig {
    pub channel_category: String,
    pub name: String,
    pub variants: Vec<String>,
}
