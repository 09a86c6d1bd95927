// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types live in `clawmark-core::types` so they can cross
//! the store trait boundary. Rule creation and editing inputs are defined
//! here since only this store offers rule CRUD.

use clawmark_core::ClawmarkError;
pub use clawmark_core::types::{
    AdapterMapping, DispatchEntry, FeedbackItem, NewDispatchEntry, RuleType, Target, UserRule,
};
use serde::{Deserialize, Serialize};

/// Input for creating a user routing rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUserRule {
    pub user_name: String,
    pub rule_type: RuleType,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(flatten)]
    pub target: Target,
    #[serde(default)]
    pub priority: i64,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// Partial update of a user routing rule. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserRulePatch {
    pub rule_type: Option<RuleType>,
    /// `Some(None)` clears the pattern.
    pub pattern: Option<Option<String>>,
    pub target: Option<Target>,
    pub priority: Option<i64>,
    pub enabled: Option<bool>,
}

/// Shape checks shared by rule creation and update.
pub fn validate_rule(
    rule_type: RuleType,
    pattern: Option<&str>,
    target: &Target,
) -> Result<(), ClawmarkError> {
    let has_pattern = pattern.is_some_and(|p| !p.trim().is_empty());
    if rule_type != RuleType::Default && !has_pattern {
        return Err(ClawmarkError::validation(
            "user rule",
            format!("{rule_type} rules require a pattern"),
        ));
    }
    if target.target_type.trim().is_empty() {
        return Err(ClawmarkError::validation("user rule", "target_type must not be empty"));
    }
    if !target.target_config.is_object() {
        return Err(ClawmarkError::validation(
            "user rule",
            "target_config must be a JSON object",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target() -> Target {
        Target::new("github-issue", json!({"repo": "coco-xyz/feedback"}))
    }

    #[test]
    fn pattern_required_except_for_default() {
        assert!(validate_rule(RuleType::UrlPattern, None, &target()).is_err());
        assert!(validate_rule(RuleType::TagMatch, Some("  "), &target()).is_err());
        assert!(validate_rule(RuleType::ContentType, Some("bug"), &target()).is_ok());
        assert!(validate_rule(RuleType::Default, None, &target()).is_ok());
    }

    #[test]
    fn target_must_be_well_formed() {
        let no_type = Target::new("", json!({}));
        assert!(validate_rule(RuleType::Default, None, &no_type).is_err());
        let not_object = Target::new("webhook", json!(["x"]));
        assert!(validate_rule(RuleType::Default, None, &not_object).is_err());
    }

    #[test]
    fn new_rule_deserializes_flattened_target() {
        let rule: NewUserRule = serde_json::from_value(json!({
            "user_name": "kevin",
            "rule_type": "url_pattern",
            "pattern": "github.com/coco-xyz/**",
            "target_type": "github-issue",
            "target_config": {"repo": "coco-xyz/feedback"},
            "priority": 10
        }))
        .unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.target.config_str("repo"), Some("coco-xyz/feedback"));
    }
}
