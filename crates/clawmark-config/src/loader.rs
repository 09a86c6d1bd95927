// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./clawmark.toml` > `~/.config/clawmark/clawmark.toml` >
//! `/etc/clawmark/clawmark.toml`, with `CLAWMARK_` environment overrides.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ClawmarkConfig;

const SYSTEM_CONFIG: &str = "/etc/clawmark/clawmark.toml";
const LOCAL_CONFIG: &str = "clawmark.toml";

/// Path of the per-user config file, if a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("clawmark/clawmark.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/clawmark/clawmark.toml`
/// 3. `~/.config/clawmark/clawmark.toml`
/// 4. `./clawmark.toml`
/// 5. `CLAWMARK_*` environment variables
pub fn load_config() -> Result<ClawmarkConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ClawmarkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ClawmarkConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ClawmarkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ClawmarkConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full layered Figment, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ClawmarkConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// `Env::split("_")` would turn `CLAWMARK_STORAGE_DATABASE_PATH` into
/// `storage.database.path`; mapping only the section prefix keeps
/// underscore-containing keys intact.
fn env_provider() -> Env {
    Env::prefixed("CLAWMARK_").map(|key| {
        let mapped = key
            .as_str()
            .replacen("server_", "server.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("declaration_", "declaration.", 1)
            .replacen("retry_", "retry.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.server.log_level, "info");
        assert!(config.dispatch.channels.is_empty());
    }

    #[test]
    fn env_overrides_nested_keys() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("clawmark.toml", "[retry]\nbase_delay_secs = 7\n")?;
            jail.set_env("CLAWMARK_STORAGE_DATABASE_PATH", "/tmp/env.db");
            jail.set_env("CLAWMARK_RETRY_MAX_RETRIES", "5");

            let config = load_config_from_path(Path::new("clawmark.toml")).unwrap();
            assert_eq!(config.storage.database_path, "/tmp/env.db");
            assert_eq!(config.retry.max_retries, 5);
            assert_eq!(config.retry.base_delay_secs, 7);
            Ok(())
        });
    }
}
