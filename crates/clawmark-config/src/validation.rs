// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde attributes cannot express. All errors are
//! collected; validation does not stop at the first failure.

use clawmark_core::DispatchEvent;

use crate::diagnostic::{ConfigError, suggest_key};
use crate::model::{ClawmarkConfig, OneOrMany};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &ClawmarkConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.server.log_level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "server.log_level `{}` must be one of {}",
            config.server.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let default_target = &config.routing.default_target;
    if default_target.target_type.trim().is_empty() {
        errors.push(ConfigError::validation(
            "routing.default_target.target_type must not be empty",
        ));
    }
    if !default_target.target_config.is_object() {
        errors.push(ConfigError::validation(
            "routing.default_target.target_config must be a table",
        ));
    }

    let declaration = &config.declaration;
    if !declaration.manifest_path.starts_with('/') {
        errors.push(ConfigError::validation(format!(
            "declaration.manifest_path `{}` must start with `/`",
            declaration.manifest_path
        )));
    }
    if declaration.timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "declaration.timeout_secs must be at least 1",
        ));
    }
    if declaration.negative_ttl_secs > declaration.positive_ttl_secs {
        errors.push(ConfigError::validation(format!(
            "declaration.negative_ttl_secs ({}) must not exceed positive_ttl_secs ({})",
            declaration.negative_ttl_secs, declaration.positive_ttl_secs
        )));
    }

    if config.retry.interval_secs == 0 {
        errors.push(ConfigError::validation(
            "retry.interval_secs must be at least 1",
        ));
    }
    if config.retry.base_delay_secs == 0 {
        errors.push(ConfigError::validation(
            "retry.base_delay_secs must be at least 1",
        ));
    }
    if config.retry.max_retries == 0 {
        errors.push(ConfigError::validation(
            "retry.max_retries must be at least 1",
        ));
    }

    for (name, channel) in &config.dispatch.channels {
        if channel.adapter.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "dispatch.channels.{name}.adapter must not be empty"
            )));
        }
    }

    for (i, rule) in config.dispatch.rules.iter().enumerate() {
        if rule.channels.is_empty() {
            errors.push(ConfigError::validation(format!(
                "dispatch.rules[{i}].channels must list at least one channel"
            )));
        }
        for channel in &rule.channels {
            if !config.dispatch.channels.contains_key(channel) {
                let known: Vec<&str> = config.dispatch.channels.keys().map(String::as_str).collect();
                errors.push(ConfigError::UnknownChannel {
                    rule: i,
                    channel: channel.clone(),
                    suggestion: suggest_key(channel, &known),
                    known: known.join(", "),
                });
            }
        }
        let events = rule.criteria.event.as_ref().map(OneOrMany::values).unwrap_or_default();
        for event in events {
            if event.parse::<DispatchEvent>().is_err() {
                let known: Vec<String> = DispatchEvent::ALL.iter().map(ToString::to_string).collect();
                let known: Vec<&str> = known.iter().map(String::as_str).collect();
                errors.push(ConfigError::UnknownEvent {
                    rule: i,
                    event: event.clone(),
                    suggestion: suggest_key(event, &known),
                    known: known.join(", "),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
