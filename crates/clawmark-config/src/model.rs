// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Clawmark.
//!
//! Sections use `#[serde(deny_unknown_fields)]` to reject unrecognized keys
//! at startup. Channel sections are the exception: their per-adapter
//! settings are free-form and interpreted by the adapter itself.

use std::collections::BTreeMap;

use clawmark_core::Target;
use serde::{Deserialize, Serialize};

/// Top-level Clawmark configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClawmarkConfig {
    /// Process-level settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Routing resolver settings.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Site-declared target fetch settings.
    #[serde(default)]
    pub declaration: DeclarationConfig,

    /// Retry sweep settings.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Static channels and rules.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// Process-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
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

    /// Enable WAL mode for SQLite.
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
        .map(|p| p.join("clawmark").join("clawmark.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("clawmark.db"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Routing resolver configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Target used when nothing more specific applies. Its `labels` and
    /// `assignees` are also applied to targets derived from GitHub URLs.
    #[serde(default = "default_target")]
    pub default_target: Target,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_target: default_target(),
        }
    }
}

fn default_target() -> Target {
    Target::new(
        clawmark_core::types::target_types::GITHUB_ISSUE,
        serde_json::Value::Object(serde_json::Map::new()),
    )
}

/// Site-declared target fetch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeclarationConfig {
    /// Whether declarations are fetched at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Path of the manifest under the source URL's origin.
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,

    /// Fetch timeout in seconds.
    #[serde(default = "default_declaration_timeout")]
    pub timeout_secs: u64,

    /// Cache lifetime for a valid declaration.
    #[serde(default = "default_positive_ttl")]
    pub positive_ttl_secs: u64,

    /// Cache lifetime for a missing, invalid, or unreachable declaration.
    #[serde(default = "default_negative_ttl")]
    pub negative_ttl_secs: u64,

    /// Permit fetching from, and declaring webhooks on, private IP literals.
    #[serde(default)]
    pub allow_private_hosts: bool,
}

impl Default for DeclarationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            manifest_path: default_manifest_path(),
            timeout_secs: default_declaration_timeout(),
            positive_ttl_secs: default_positive_ttl(),
            negative_ttl_secs: default_negative_ttl(),
            allow_private_hosts: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_manifest_path() -> String {
    "/.well-known/clawmark.json".to_string()
}

fn default_declaration_timeout() -> u64 {
    5
}

fn default_positive_ttl() -> u64 {
    300
}

fn default_negative_ttl() -> u64 {
    120
}

/// Retry sweep configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Seconds between sweeps when running `clawmark serve`.
    #[serde(default = "default_retry_interval")]
    pub interval_secs: u64,

    /// Base of the exponential backoff (`2^retries * base_delay_secs`).
    #[serde(default = "default_base_delay")]
    pub base_delay_secs: u64,

    /// Retry count at which an entry becomes `exhausted`.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_retry_interval(),
            base_delay_secs: default_base_delay(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_retry_interval() -> u64 {
    30
}

fn default_base_delay() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    3
}

/// Static dispatch configuration: named channels plus the rules that select them.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    #[serde(default)]
    pub rules: Vec<StaticRuleConfig>,

    #[serde(default)]
    pub channels: BTreeMap<String, ChannelConfig>,
}

/// A named channel: adapter type tag plus adapter-specific settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChannelConfig {
    pub adapter: String,

    #[serde(flatten)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

impl ChannelConfig {
    /// The adapter settings as a JSON object.
    pub fn settings_value(&self) -> serde_json::Value {
        serde_json::Value::Object(self.settings.clone())
    }
}

/// A static rule: when `criteria` holds, deliver to `channels`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StaticRuleConfig {
    #[serde(rename = "match", default)]
    pub criteria: RuleMatch,

    pub channels: Vec<String>,
}

/// Match fields of a static rule. Absent fields always hold.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuleMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<OneOrMany>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<OneOrMany>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<OneOrMany>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OneOrMany>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<OneOrMany>,
}

/// A single value or a list meaning "any of".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn contains(&self, value: &str) -> bool {
        self.values().iter().any(|v| v == value)
    }

    pub fn values(&self) -> &[String] {
        match self {
            OneOrMany::One(v) => std::slice::from_ref(v),
            OneOrMany::Many(values) => values,
        }
    }
}
