// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as valid bind addresses, schedule times, and unique lookup ids.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};

use crate::diagnostic::ConfigError;
use crate::model::AteneaConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &AteneaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });
    let mut references = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if config.gateway.request_timeout_secs == 0 {
        fail("gateway.request_timeout_secs must be greater than 0".to_string());
    }

    if config.dispatch.timeout_secs == 0 {
        fail("dispatch.timeout_secs must be greater than 0".to_string());
    }

    if config.bot.timeout_secs == 0 {
        fail("bot.timeout_secs must be greater than 0".to_string());
    }

    if config.handoff.failed_turn_threshold == Some(0) {
        fail("handoff.failed_turn_threshold must be at least 1 when set".to_string());
    }

    // Channels: unique codes, relays must point at a known channel.
    let mut channel_codes = HashSet::new();
    for (i, channel) in config.channels.iter().enumerate() {
        if channel.code.trim().is_empty() {
            fail(format!("channels[{i}].code must not be empty"));
        }
        if !channel_codes.insert(channel.code.as_str()) {
            fail(format!(
                "duplicate channel code `{}` in [[channels]] array",
                channel.code
            ));
        }
    }

    let known_codes: Vec<&str> = config.channels.iter().map(|c| c.code.as_str()).collect();
    let mut relay_channels = HashSet::new();
    for (i, relay) in config.dispatch.relays.iter().enumerate() {
        if !channel_codes.contains(relay.channel.as_str()) {
            references.push(ConfigError::unknown_reference(
                format!("dispatch.relays[{i}].channel"),
                &relay.channel,
                "channel code",
                &known_codes,
            ));
        }
        if !relay_channels.insert(relay.channel.as_str()) {
            fail(format!(
                "duplicate relay for channel `{}` in [[dispatch.relays]]",
                relay.channel
            ));
        }
        if !(relay.endpoint.starts_with("http://") || relay.endpoint.starts_with("https://")) {
            fail(format!(
                "dispatch.relays[{i}].endpoint must be an http(s) URL, got `{}`",
                relay.endpoint
            ));
        }
        if relay.max_message_length == Some(0) {
            fail(format!(
                "dispatch.relays[{i}].max_message_length must be greater than 0"
            ));
        }
    }

    let mut consult_ids = HashSet::new();
    for ct in &config.consult_types {
        if !consult_ids.insert(ct.id) {
            fail(format!(
                "duplicate consult type id {} in [[consult_types]] array",
                ct.id
            ));
        }
    }

    // Channel states: unique ids, the paused category must exist so pause
    // codes can ever be stored.
    let mut state_ids = HashSet::new();
    for state in &config.channel_states {
        if state.id.trim().is_empty() {
            fail("channel_states[].id must not be empty".to_string());
        }
        if !state_ids.insert(state.id.as_str()) {
            fail(format!(
                "duplicate channel state id `{}` in [[channel_states]] array",
                state.id
            ));
        }
    }
    let mut state_categories: Vec<&str> = config
        .channel_states
        .iter()
        .map(|s| s.category.as_str())
        .collect();
    state_categories.sort_unstable();
    state_categories.dedup();
    if !config.channel_states.is_empty() {
        for (key, category) in [
            ("presence.paused_category", &config.presence.paused_category),
            ("presence.available_category", &config.presence.available_category),
        ] {
            if !state_categories.contains(&category.as_str()) {
                references.push(ConfigError::unknown_reference(
                    key,
                    category,
                    "channel state category",
                    &state_categories,
                ));
            }
        }
    }

    let mut channel_categories: Vec<&str> =
        config.channels.iter().map(|c| c.category.as_str()).collect();
    channel_categories.sort_unstable();
    channel_categories.dedup();
    for (i, msg) in config.automatic_messages.iter().enumerate() {
        if !channel_categories.contains(&msg.channel_category.as_str()) {
            references.push(ConfigError::unknown_reference(
                format!("automatic_messages[{i}].channel_category"),
                &msg.channel_category,
                "channel category",
                &channel_categories,
            ));
        }
        if msg.variants.is_empty() {
            fail(format!(
                "automatic_messages[{i}] (`{}`) must have at least one variant",
                msg.name
            ));
        }
        if msg.variants.iter().any(|v| v.trim().is_empty()) {
            fail(format!(
                "automatic_messages[{i}] (`{}`) has an empty variant",
                msg.name
            ));
        }
    }

    let hours = &config.business_hours;
    if hours.utc_offset_minutes.abs() > 14 * 60 {
        fail(format!(
            "business_hours.utc_offset_minutes must be within ±840, got {}",
            hours.utc_offset_minutes
        ));
    }
    for (i, day) in hours.days.iter().enumerate() {
        let start = NaiveTime::parse_from_str(&day.start, "%H:%M");
        let end = NaiveTime::parse_from_str(&day.end, "%H:%M");
        match (start, end) {
            (Ok(start), Ok(end)) if start >= end => fail(format!(
                "business_hours.days[{i}] start {} must be before end {}",
                day.start, day.end
            )),
            (Ok(_), Ok(_)) => {}
            _ => fail(format!(
                "business_hours.days[{i}] times must be HH:MM, got `{}`-`{}`",
                day.start, day.end
            )),
        }
    }
    for holiday in &hours.holidays {
        if NaiveDate::parse_from_str(holiday, "%Y-%m-%d").is_err() {
            fail(format!(
                "business_hours.holidays entry `{holiday}` must be YYYY-MM-DD"
            ));
        }
    }
    if hours.enabled && hours.days.is_empty() {
        fail("business_hours.enabled requires at least one [[business_hours.days]] entry".to_string());
    }

    errors.extend(references);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AutomaticMessageConfig, DayOfWeek, DaySchedule, RelayConfig};

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    fn has_reference(errors: &[ConfigError], field: &str, bad: &str) -> bool {
        errors.iter().any(|e| {
            matches!(e, ConfigError::UnknownReference { key, value, .. } if key == field && value == bad)
        })
    }

    #[test]
    fn default_config_validates() {
        let config = AteneaConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = AteneaConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "database_path"));
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let mut config = AteneaConfig::default();
        config.handoff.failed_turn_threshold = Some(0);
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "failed_turn_threshold"));
    }

    #[test]
    fn relay_for_unknown_channel_is_rejected() {
        let mut config = AteneaConfig::default();
        config.dispatch.relays.push(RelayConfig {
            channel: "pigeon".into(),
            endpoint: "http://localhost:9000/send".into(),
            auth_token: None,
            supports_interactive: false,
            supports_attachments: true,
            max_message_length: None,
        });
        let errors = validate_config(&config).unwrap_err();
        assert!(has_reference(&errors, "dispatch.relays[0].channel", "pigeon"));
    }

    #[test]
    fn inverted_business_window_is_rejected() {
        let mut config = AteneaConfig::default();
        config.business_hours.days.push(DaySchedule {
            day: DayOfWeek::Monday,
            start: "18:00".into(),
            end: "08:00".into(),
        });
        config.business_hours.holidays.push("28/07/2026".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "must be before end"));
        assert!(has_error(&errors, "YYYY-MM-DD"));
    }

    #[test]
    fn missing_paused_category_is_rejected() {
        let mut config = AteneaConfig::default();
        config.presence.paused_category = "pausd".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_reference(&errors, "presence.paused_category", "pausd"));
        let suggestion = errors.iter().find_map(|e| match e {
            ConfigError::UnknownReference { suggestion, .. } => suggestion.clone(),
            _ => None,
        });
        assert_eq!(suggestion.as_deref(), Some("paused"));
    }

    #[test]
    fn automatic_message_category_must_match_a_channel() {
        let mut config = AteneaConfig::default();
        config.automatic_messages.push(AutomaticMessageConfig {
            channel_category: "fax".into(),
            name: "welcome".into(),
            variants: vec!["Hola".into()],
        });
        let errors = validate_config(&config).unwrap_err();
        assert!(has_reference(&errors, "automatic_messages[0].channel_category", "fax"));
        let ConfigError::UnknownReference { known, .. } = &errors[0] else {
            panic!("expected a reference error, got {errors:?}");
        };
        assert!(known.contains("messaging") && known.contains("voice"));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = AteneaConfig::default();
        config.storage.database_path = " ".into();
        config.dispatch.timeout_secs = 0;
        config.bot.timeout_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
