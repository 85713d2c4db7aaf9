// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `atenea check-config` command implementation.
//!
//! Runs diagnostic checks against the loaded configuration and the
//! services it points at.

use std::time::{Duration, Instant};

use atenea_config::AteneaConfig;
use atenea_core::{AteneaError, HealthStatus, PluginAdapter};
use atenea_engine::ConfigCalendar;
use atenea_rasa::RasaBot;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed successfully.
    Pass,
    /// Check passed with a warning.
    Warn,
    /// Check failed.
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check.
    pub name: String,
    /// Check status.
    pub status: CheckStatus,
    /// Human-readable message.
    pub message: String,
    /// Duration the check took.
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `atenea check-config` command.
///
/// Fails when any check fails; warnings are reported but do not fail.
pub async fn run_check(config: &AteneaConfig) -> Result<(), AteneaError> {
    let results = run_checks(config).await;

    println!();
    println!("  atenea check-config");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;
    for result in &results {
        let duration_ms = result.duration.as_millis();
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => {
                warn_count += 1;
                "[WARN]"
            }
            CheckStatus::Fail => {
                fail_count += 1;
                "[FAIL]"
            }
        };
        println!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        );
    }
    println!();

    if fail_count > 0 || warn_count > 0 {
        let issues = fail_count + warn_count;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    if fail_count > 0 {
        return Err(AteneaError::Config(format!("{fail_count} check(s) failed")));
    }
    Ok(())
}

/// Runs every check in display order.
pub async fn run_checks(config: &AteneaConfig) -> Vec<CheckResult> {
    vec![
        check_config(config),
        check_business_hours(config),
        check_relays(config),
        check_gateway_auth(config),
        check_database(&config.storage.database_path).await,
        check_bot(config).await,
    ]
}

/// The config was loaded and validated before the command ran.
fn check_config(config: &AteneaConfig) -> CheckResult {
    let start = Instant::now();
    CheckResult::new(
        "Configuration",
        CheckStatus::Pass,
        format!("valid (service {})", config.service.name),
        start,
    )
}

fn check_business_hours(config: &AteneaConfig) -> CheckResult {
    let start = Instant::now();
    match ConfigCalendar::from_config(&config.business_hours) {
        Ok(_) => CheckResult::new(
            "Business hours",
            CheckStatus::Pass,
            if config.business_hours.enabled {
                format!(
                    "{} day windows, {} holidays",
                    config.business_hours.days.len(),
                    config.business_hours.holidays.len()
                )
            } else {
                "disabled (always attending)".to_string()
            },
            start,
        ),
        Err(e) => CheckResult::new("Business hours", CheckStatus::Fail, e.to_string(), start),
    }
}

/// Every catalog channel should have a relay, or its replies fail.
fn check_relays(config: &AteneaConfig) -> CheckResult {
    let start = Instant::now();
    let missing: Vec<&str> = config
        .channels
        .iter()
        .map(|c| c.code.as_str())
        .filter(|code| !config.dispatch.relays.iter().any(|r| r.channel == *code))
        .collect();
    if missing.is_empty() {
        CheckResult::new(
            "Channel relays",
            CheckStatus::Pass,
            format!("{} configured", config.dispatch.relays.len()),
            start,
        )
    } else {
        CheckResult::new(
            "Channel relays",
            CheckStatus::Warn,
            format!("no relay for: {}", missing.join(", ")),
            start,
        )
    }
}

fn check_gateway_auth(config: &AteneaConfig) -> CheckResult {
    let start = Instant::now();
    if config.gateway.bearer_token.is_some() {
        CheckResult::new(
            "Gateway auth",
            CheckStatus::Pass,
            format!("bearer token set ({}:{})", config.gateway.host, config.gateway.port),
            start,
        )
    } else {
        CheckResult::new(
            "Gateway auth",
            CheckStatus::Warn,
            "no bearer token, API is unauthenticated",
            start,
        )
    }
}

/// Check database file exists and can be opened.
async fn check_database(db_path: &str) -> CheckResult {
    let start = Instant::now();
    let path = std::path::Path::new(db_path);

    if !path.exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (run `atenea migrate`)"),
            start,
        );
    }

    match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => {
            let query_result: Result<(), tokio_rusqlite::Error<rusqlite::Error>> = conn
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("SELECT 1")?;
                    Ok(())
                })
                .await;
            match query_result {
                Ok(()) => CheckResult::new("Database", CheckStatus::Pass, "connected", start),
                Err(e) => CheckResult::new(
                    "Database",
                    CheckStatus::Fail,
                    format!("query failed: {e}"),
                    start,
                ),
            }
        }
        Err(e) => CheckResult::new(
            "Database",
            CheckStatus::Fail,
            format!("open failed: {e}"),
            start,
        ),
    }
}

async fn check_bot(config: &AteneaConfig) -> CheckResult {
    let start = Instant::now();
    if !config.bot.enabled {
        return CheckResult::new("Bot", CheckStatus::Pass, "disabled", start);
    }
    let bot = match RasaBot::new(&config.bot) {
        Ok(bot) => bot,
        Err(e) => return CheckResult::new("Bot", CheckStatus::Fail, e.to_string(), start),
    };
    match bot.health_check().await {
        Ok(HealthStatus::Healthy) => CheckResult::new(
            "Bot",
            CheckStatus::Pass,
            format!("reachable at {}", config.bot.rasa_url),
            start,
        ),
        Ok(HealthStatus::Degraded(reason)) | Ok(HealthStatus::Unhealthy(reason)) => {
            CheckResult::new("Bot", CheckStatus::Warn, reason, start)
        }
        Err(e) => CheckResult::new("Bot", CheckStatus::Warn, e.to_string(), start),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atenea_config::model::RelayConfig;

    fn status_of<'a>(results: &'a [CheckResult], name: &str) -> &'a CheckStatus {
        &results.iter().find(|r| r.name == name).unwrap().status
    }

    #[tokio::test]
    async fn default_config_passes_with_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AteneaConfig::default();
        config.storage.database_path = dir.path().join("absent.db").to_string_lossy().into_owned();

        let results = run_checks(&config).await;
        assert_eq!(status_of(&results, "Configuration"), &CheckStatus::Pass);
        assert_eq!(status_of(&results, "Channel relays"), &CheckStatus::Warn);
        assert_eq!(status_of(&results, "Gateway auth"), &CheckStatus::Warn);
        assert_eq!(status_of(&results, "Database"), &CheckStatus::Warn);
        assert_eq!(status_of(&results, "Bot"), &CheckStatus::Pass);
        assert!(run_check(&config).await.is_ok());
    }

    #[test]
    fn relays_covering_every_channel_pass() {
        let mut config = AteneaConfig::default();
        config.dispatch.relays = config
            .channels
            .iter()
            .map(|c| RelayConfig {
                channel: c.code.clone(),
                endpoint: format!("http://relay.local/{}", c.code),
                auth_token: None,
                supports_interactive: false,
                supports_attachments: true,
                max_message_length: None,
            })
            .collect();
        assert_eq!(check_relays(&config).status, CheckStatus::Pass);
    }
}
