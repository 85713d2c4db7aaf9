// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Atenea configuration system.

use atenea_config::diagnostic::{ConfigError, suggest_key};
use atenea_config::model::{AteneaConfig, DayOfWeek};
use atenea_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_atenea_config() {
    let toml = r#"
[service]
name = "atenea-lima"
log_level = "debug"

[storage]
database_path = "/tmp/test.db"
wal_mode = false

[gateway]
host = "0.0.0.0"
port = 8080
bearer_token = "secret"
cors_origins = ["https://agents.example.org"]

[dispatch]
timeout_secs = 5
default_footer = "Municipalidad"

[[dispatch.relays]]
channel = "whatsapp"
endpoint = "http://localhost:9001/send"
supports_interactive = true
max_message_length = 4096

[handoff]
failed_turn_threshold = 3
priority_on_claim = false

[presence]
paused_category = "paused"

[bot]
enabled = true
rasa_url = "http://rasa:5005"

[business_hours]
enabled = true
utc_offset_minutes = -300
holidays = ["2026-07-28"]

[[business_hours.days]]
day = "monday"
start = "08:00"
end = "17:00"

[[consult_types]]
id = 5
name = "Tributos"

[[automatic_messages]]
channel_category = "messaging"
name = "welcome"
variants = ["Hola, bienvenido", "Buen día"]
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should validate");
    assert_eq!(config.service.name, "atenea-lima");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.gateway.host, "0.0.0.0");
    assert_eq!(config.gateway.port, 8080);
    assert_eq!(config.gateway.bearer_token.as_deref(), Some("secret"));
    assert_eq!(config.dispatch.timeout_secs, 5);
    assert_eq!(config.dispatch.relays.len(), 1);
    assert!(config.dispatch.relays[0].supports_interactive);
    assert!(config.dispatch.relays[0].supports_attachments);
    assert_eq!(config.handoff.failed_turn_threshold, Some(3));
    assert!(!config.handoff.priority_on_claim);
    assert!(config.bot.enabled);
    assert_eq!(config.business_hours.utc_offset_minutes, -300);
    assert_eq!(config.business_hours.days[0].day, DayOfWeek::Monday);
    assert_eq!(config.consult_types[0].id, 5);
    assert_eq!(config.automatic_messages[0].variants.len(), 2);
}

/// Unknown field in [gateway] section produces an UnknownField error.
#[test]
fn unknown_field_in_gateway_produces_error() {
    let toml = r#"
[gateway]
prot = 3000
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("prot"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.service.name, "atenea");
    assert_eq!(config.service.log_level, "info");
    assert!(config.storage.wal_mode);
    assert_eq!(config.gateway.host, "127.0.0.1");
    assert_eq!(config.gateway.port, 3000);
    assert!(config.gateway.bearer_token.is_none());
    assert_eq!(config.dispatch.timeout_secs, 10);
    assert!(config.handoff.failed_turn_threshold.is_none());
    assert_eq!(config.presence.paused_category, "paused");
    assert!(!config.bot.enabled);
    assert!(!config.business_hours.enabled);
    assert_eq!(config.channels.len(), 7);
    assert!(config.channels.iter().any(|c| c.code == "chatsat"));
    assert!(config.channel_states.iter().any(|s| s.id == "PAUSED"));
}

/// Overriding an array section replaces the seeded defaults.
#[test]
fn channel_states_array_replaces_defaults() {
    let toml = r#"
[[channel_states]]
id = "READY"
name = "Ready"
category = "available"

[[channel_states]]
id = "BREAK"
name = "Break"
category = "paused"
"#;
    let config = load_and_validate_str(toml).expect("should validate");
    assert_eq!(config.channel_states.len(), 2);
    assert_eq!(config.channel_states[1].id, "BREAK");
}

/// Dotted keys merged after the file behave like `ATENEA_*` overrides.
#[test]
fn env_style_override_wins_over_toml() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let toml_content = r#"
[gateway]
bearer_token = "from-toml"
"#;

    let config: AteneaConfig = Figment::new()
        .merge(Serialized::defaults(AteneaConfig::default()))
        .merge(Toml::string(toml_content))
        .merge(("gateway.bearer_token", "from-env"))
        .extract()
        .expect("should merge env override");

    assert_eq!(config.gateway.bearer_token.as_deref(), Some("from-env"));
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: AteneaConfig = Figment::new()
        .merge(Serialized::defaults(AteneaConfig::default()))
        .merge(Toml::file("/nonexistent/path/atenea.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.service.name, "atenea");
}

/// Serialized defaults survive a TOML round trip.
#[test]
fn defaults_serialize_to_loadable_toml() {
    let rendered = toml::to_string(&AteneaConfig::default()).expect("defaults serialize");
    let reloaded = load_and_validate_str(&rendered).expect("rendered defaults validate");
    assert_eq!(reloaded.channels.len(), 7);
}

/// Unexpected top-level section is rejected by deny_unknown_fields.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[logging]
level = "debug"
"#;

    let err = load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("logging"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Unknown schedule day is a type error, not a silent default.
#[test]
fn unknown_day_is_rejected() {
    let toml = r#"
[[business_hours.days]]
day = "funday"
start = "08:00"
end = "12:00"
"#;
    assert!(load_config_from_str(toml).is_err());
}

// ============================================================================
// Diagnostic tests
// ============================================================================

#[test]
fn diagnostic_prot_suggests_port() {
    let valid_keys = &["host", "port", "bearer_token", "request_timeout_secs"];
    assert_eq!(suggest_key("prot", valid_keys), Some("port".to_string()));
}

/// Error output from load_and_validate_str includes the unknown key name.
#[test]
fn diagnostic_error_includes_unknown_key() {
    let toml = r#"
[gateway]
prot = 3000
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "prot"
                && suggestion.as_deref() == Some("port")
                && valid_keys.contains("bearer_token")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error for 'prot' with suggestion 'port', got: {errors:?}"
    );
}

/// Invalid type (string where number expected) produces clear message.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[dispatch]
timeout_secs = "ten"
"#;

    let err = load_config_from_str(toml).expect_err("should reject invalid type");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("invalid type") || err_str.contains("timeout_secs"),
        "error should mention type mismatch, got: {err_str}"
    );
}

/// ConfigError can be rendered using miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "prot".to_string(),
        table: "[gateway]".to_string(),
        suggestion: Some("port".to_string()),
        valid_keys: "host, port, bearer_token".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some(), "should have diagnostic code");
    let help = error.help().expect("should have help text").to_string();
    assert!(help.contains("did you mean `port`"), "got: {help}");

    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    handler
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("prot"), "rendered report should mention the key");
}

/// Validation errors surface through the high-level entry point.
#[test]
fn validation_catches_zero_dispatch_timeout() {
    let toml = r#"
[dispatch]
timeout_secs = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("zero timeout should fail");
    assert!(errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("dispatch.timeout_secs"))
    }));
}

/// Loading from an explicit path honors the file and reports its errors.
#[test]
#[serial_test::serial]
fn load_from_path_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atenea.toml");
    std::fs::write(&path, "[gateway]\nport = 9090\n").unwrap();
    let config = load_and_validate_path(&path).expect("file config should validate");
    assert_eq!(config.gateway.port, 9090);

    std::fs::write(&path, "[gateway]\nprot = 9090\n").unwrap();
    let errors = load_and_validate_path(&path).expect_err("typo should fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::UnknownKey { key, .. } if key == "prot"))
    );
}

/// A typo in the second `[[channel_states]]` entry is pointed at in the file.
#[test]
#[serial_test::serial]
fn typo_in_array_table_is_located_in_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atenea.toml");
    let content = r#"[[channel_states]]
id = "READY"
name = "Ready"
category = "available"

[[channel_states]]
id = "BREAK"
name = "Break"
catgory = "paused"
"#;
    std::fs::write(&path, content).unwrap();

    let errors = load_and_validate_path(&path).expect_err("typo should fail");
    let span = errors.iter().find_map(|e| match e {
        ConfigError::UnknownKey { key, table, span, .. }
            if key == "catgory" && table == "[[channel_states]]" =>
        {
            Some(*span)
        }
        _ => None,
    });
    let span = span
        .expect("unknown key reported for [[channel_states]]")
        .expect("span located in the file");
    assert_eq!(&content[span.offset()..span.offset() + span.len()], "catgory");
}
