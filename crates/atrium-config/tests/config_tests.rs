// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Atrium configuration system.

use atrium_config::diagnostic::ConfigError;
use atrium_config::model::AtriumConfig;
use atrium_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_atrium_config() {
    let toml = r#"
[log]
level = "debug"

[server]
host = "0.0.0.0"
port = 9090
api_token = "agent-token"
admin_token = "admin-token"
request_timeout_secs = 5

[storage]
database_path = "/tmp/atrium-test.db"
wal_mode = false
busy_timeout_ms = 250

[engine]
recency_window_hours = 48
sweep_interval_secs = 0
max_capacity_limit = 20

[identity]
country_code = "351"
area_code_len = 2
mobile_digit = "9"

[[work_groups]]
name = "sales"
channels = ["line-1", "line-2"]
capacity = 5

[[work_groups]]
name = "billing"
channels = ["line-3"]
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should load");
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.server.api_token.as_deref(), Some("agent-token"));
    assert_eq!(config.server.admin_token.as_deref(), Some("admin-token"));
    assert_eq!(config.storage.database_path, "/tmp/atrium-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.storage.busy_timeout_ms, 250);
    assert_eq!(config.engine.recency_window_hours, 48);
    assert_eq!(config.engine.sweep_interval_secs, 0);
    assert_eq!(config.identity.country_code, "351");

    let specs = config.work_group_specs();
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].channels, vec!["line-1", "line-2"]);
    assert_eq!(specs[0].capacity, 5);
    assert_eq!(specs[1].capacity, 0);
}

/// An empty file yields the compiled defaults.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_and_validate_str("").expect("defaults should validate");
    assert_eq!(config.server.port, 8480);
    assert!(config.server.api_token.is_none());
    assert_eq!(config.engine.recency_window_hours, 24);
    assert_eq!(config.engine.sweep_interval_secs, 60);
    assert_eq!(config.identity.mobile_digit, "9");
}

/// Unknown field in [engine] is reported with a suggestion.
#[test]
fn unknown_engine_key_gets_suggestion() {
    let toml = r#"
[engine]
recency_windw_hours = 12
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion, .. }
                if key == "recency_windw_hours"
                    && suggestion.as_deref() == Some("recency_window_hours")
        )
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

/// Unknown top-level section is rejected.
#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[telemetry]
enabled = true
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown section");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("telemetry"),
        "error should mention the unknown section, got: {err_str}"
    );
}

/// Wrong value type surfaces as InvalidType.
#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[server]
port = "eighty"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject string port");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("port"))),
        "got: {errors:?}"
    );
}

/// A work group without a name is a missing key.
#[test]
fn work_group_requires_name() {
    let toml = r#"
[[work_groups]]
channels = ["line-1"]
"#;

    let errors = load_and_validate_str(toml).expect_err("name is required");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::MissingKey { key, .. } if key == "name")),
        "got: {errors:?}"
    );
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_errors_are_collected() {
    let toml = r#"
[engine]
max_capacity_limit = 3

[[work_groups]]
name = "sales"
channels = []
capacity = 4
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert_eq!(errors.len(), 2, "got: {errors:?}");
}

/// Tokens never appear in the rendered configuration.
#[test]
fn rendered_config_masks_tokens() {
    let mut config = AtriumConfig::default();
    config.server.api_token = Some("s3cret".to_string());
    let rendered = config.to_redacted_toml().unwrap();
    assert!(!rendered.contains("s3cret"));
    assert!(rendered.contains("[REDACTED]"));
}

/// The normalizer follows the [identity] section.
#[test]
fn identity_section_drives_normalizer() {
    let config = load_and_validate_str("[identity]\ncountry_code = \"351\"\n").unwrap();
    let key = config.phone_normalizer().normalize("21912345678").unwrap();
    assert_eq!(key.as_str(), "3512112345678");
}
