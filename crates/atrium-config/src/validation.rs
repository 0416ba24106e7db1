// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as unique work group names, capacity ranges, and identity rules.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::AtriumConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &AtriumConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if config.server.request_timeout_secs == 0 {
        fail("server.request_timeout_secs must be at least 1".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.engine.recency_window_hours == 0 {
        fail("engine.recency_window_hours must be at least 1".to_string());
    }

    let identity = &config.identity;
    if identity.country_code.is_empty()
        || !identity.country_code.chars().all(|c| c.is_ascii_digit())
    {
        fail(format!(
            "identity.country_code must be digits only, got `{}`",
            identity.country_code
        ));
    }

    let mut mobile = identity.mobile_digit.chars();
    match (mobile.next(), mobile.next()) {
        (Some(c), None) if c.is_ascii_digit() => {}
        _ => fail(format!(
            "identity.mobile_digit must be a single digit, got `{}`",
            identity.mobile_digit
        )),
    }

    let max = config.engine.max_capacity_limit;
    let mut seen_names = HashSet::new();
    for (i, wg) in config.work_groups.iter().enumerate() {
        if wg.name.trim().is_empty() {
            fail(format!("work_groups[{i}].name must not be empty"));
        } else if !seen_names.insert(wg.name.as_str()) {
            fail(format!(
                "duplicate work group name `{}` in [[work_groups]] array",
                wg.name
            ));
        }

        if wg.channels.iter().all(|c| c.trim().is_empty()) {
            fail(format!(
                "work group `{}` must list at least one channel",
                wg.name
            ));
        }

        if wg.capacity > max {
            fail(format!(
                "work group `{}` capacity {} exceeds engine.max_capacity_limit {max}",
                wg.name, wg.capacity
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorkGroupConfig;

    fn group(name: &str, channels: &[&str], capacity: u32) -> WorkGroupConfig {
        WorkGroupConfig {
            name: name.to_string(),
            channels: channels.iter().map(|c| c.to_string()).collect(),
            capacity,
        }
    }

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&AtriumConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = AtriumConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn duplicate_work_groups_are_rejected() {
        let mut config = AtriumConfig::default();
        config.work_groups = vec![group("sales", &["line-1"], 0), group("sales", &["line-2"], 0)];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "duplicate work group name `sales`"));
    }

    #[test]
    fn work_group_without_channels_is_rejected() {
        let mut config = AtriumConfig::default();
        config.work_groups = vec![group("billing", &[], 0)];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "at least one channel"));
    }

    #[test]
    fn capacity_above_max_is_rejected() {
        let mut config = AtriumConfig::default();
        config.engine.max_capacity_limit = 10;
        config.work_groups = vec![group("sales", &["line-1"], 11)];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "exceeds engine.max_capacity_limit 10"));
    }

    #[test]
    fn identity_rules_are_checked() {
        let mut config = AtriumConfig::default();
        config.identity.country_code = "+55".to_string();
        config.identity.mobile_digit = "99".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "identity.country_code"));
        assert!(has_message(&errors, "identity.mobile_digit"));
    }

    #[test]
    fn collects_every_error() {
        let mut config = AtriumConfig::default();
        config.server.host = "".to_string();
        config.engine.recency_window_hours = 0;
        config.storage.database_path = " ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
