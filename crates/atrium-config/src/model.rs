// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Atrium claim engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use atrium_core::PhoneNormalizer;
use atrium_core::types::WorkGroupSpec;
use serde::{Deserialize, Serialize};

/// Top-level Atrium configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AtriumConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Claim engine tuning.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Phone number canonicalization rules.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Work groups and the channels they serve.
    #[serde(default)]
    pub work_groups: Vec<WorkGroupConfig>,
}

impl AtriumConfig {
    /// Build the phone normalizer described by `[identity]`.
    pub fn phone_normalizer(&self) -> PhoneNormalizer {
        PhoneNormalizer::new(
            self.identity.country_code.clone(),
            self.identity.area_code_len,
            self.identity.mobile_digit.chars().next().unwrap_or('9'),
        )
    }

    /// Render the effective configuration as TOML with bearer tokens masked.
    pub fn to_redacted_toml(&self) -> Result<String, toml::ser::Error> {
        let mut shown = self.clone();
        for token in [&mut shown.server.api_token, &mut shown.server.admin_token] {
            if token.is_some() {
                *token = Some("[REDACTED]".to_string());
            }
        }
        toml::to_string_pretty(&shown)
    }

    /// Work groups in the form the store directory expects.
    pub fn work_group_specs(&self) -> Vec<WorkGroupSpec> {
        self.work_groups
            .iter()
            .map(|wg| WorkGroupSpec {
                name: wg.name.clone(),
                channels: wg.channels.clone(),
                capacity: wg.capacity,
            })
            .collect()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token required on agent-facing routes. `None` rejects every request.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Bearer token required on admin routes (capacity config, agent provisioning).
    #[serde(default)]
    pub admin_token: Option<String>,

    /// Per-request deadline in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_token: None,
            admin_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8480
}

fn default_request_timeout_secs() -> u64 {
    15
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

    /// How long SQLite waits on a lock held by another process, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("atrium").join("atrium.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("atrium.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Claim engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// A conversation is a candidate only if its last message is this recent.
    #[serde(default = "default_recency_window_hours")]
    pub recency_window_hours: u32,

    /// Interval of the background orphan sweep in seconds. 0 disables it;
    /// the sweep at the start of every claim always runs.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Largest per-agent capacity limit an admin may configure.
    #[serde(default = "default_max_capacity_limit")]
    pub max_capacity_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recency_window_hours: default_recency_window_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
            max_capacity_limit: default_max_capacity_limit(),
        }
    }
}

fn default_recency_window_hours() -> u32 {
    24
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_max_capacity_limit() -> u32 {
    50
}

/// Phone canonicalization rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Country calling code prefixed to numbers that lack it.
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Number of area code digits after the country code.
    #[serde(default = "default_area_code_len")]
    pub area_code_len: usize,

    /// Optional mobile digit that follows the area code.
    #[serde(default = "default_mobile_digit")]
    pub mobile_digit: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            country_code: default_country_code(),
            area_code_len: default_area_code_len(),
            mobile_digit: default_mobile_digit(),
        }
    }
}

fn default_country_code() -> String {
    "55".to_string()
}

fn default_area_code_len() -> usize {
    2
}

fn default_mobile_digit() -> String {
    "9".to_string()
}

/// A work group ("carteira") definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkGroupConfig {
    /// Unique work group name.
    pub name: String,

    /// Channel (line) identifiers whose conversations belong to this group.
    #[serde(default)]
    pub channels: Vec<String>,

    /// Initial per-agent capacity limit. 0 means unlimited.
    #[serde(default)]
    pub capacity: u32,
}
