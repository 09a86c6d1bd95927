// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User routing rule CRUD.

use chrono::Utc;
use clawmark_core::ClawmarkError;
use rusqlite::{OptionalExtension, Row, params};

use super::{parse_json, parse_tag, parse_ts, to_json, ts};
use crate::database::Database;
use crate::models::{NewUserRule, Target, UserRule, UserRulePatch, validate_rule};

const RULE_COLUMNS: &str = "id, user_name, rule_type, pattern, target_type, target_config,
     priority, enabled, created_at, updated_at";

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<UserRule> {
    let rule_type: String = row.get(2)?;
    let config: String = row.get(5)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;
    Ok(UserRule {
        id: row.get(0)?,
        user_name: row.get(1)?,
        rule_type: parse_tag(2, &rule_type)?,
        pattern: row.get(3)?,
        target_type: row.get(4)?,
        target_config: parse_json(5, &config)?,
        priority: row.get(6)?,
        enabled: row.get(7)?,
        created_at: parse_ts(8, &created_at)?,
        updated_at: parse_ts(9, &updated_at)?,
    })
}

fn not_found(id: i64) -> ClawmarkError {
    ClawmarkError::NotFound {
        kind: "user rule".into(),
        id: id.to_string(),
    }
}

/// Create a rule. Non-`default` rules must carry a pattern.
pub async fn create_rule(db: &Database, rule: &NewUserRule) -> Result<UserRule, ClawmarkError> {
    validate_rule(rule.rule_type, rule.pattern.as_deref(), &rule.target)?;
    if rule.user_name.trim().is_empty() {
        return Err(ClawmarkError::validation("user rule", "user_name must not be empty"));
    }

    let rule = rule.clone();
    db.connection()
        .call(move |conn| {
            let now = Utc::now();
            let stamp = ts(&now);
            conn.execute(
                "INSERT INTO user_rules (user_name, rule_type, pattern, target_type, target_config,
                                         priority, enabled, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    rule.user_name,
                    rule.rule_type.to_string(),
                    rule.pattern,
                    rule.target.target_type,
                    to_json(&rule.target.target_config)?,
                    rule.priority,
                    rule.enabled,
                    stamp,
                ],
            )?;
            Ok(UserRule {
                id: conn.last_insert_rowid(),
                user_name: rule.user_name,
                rule_type: rule.rule_type,
                pattern: rule.pattern,
                target_type: rule.target.target_type,
                target_config: rule.target.target_config,
                priority: rule.priority,
                enabled: rule.enabled,
                created_at: now,
                updated_at: now,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_rule(db: &Database, id: i64) -> Result<Option<UserRule>, ClawmarkError> {
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {RULE_COLUMNS} FROM user_rules WHERE id = ?1");
            conn.query_row(&sql, params![id], rule_from_row).optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All rules owned by `user_name`, priority descending, then oldest first.
pub async fn rules_for_user(db: &Database, user_name: &str) -> Result<Vec<UserRule>, ClawmarkError> {
    let user_name = user_name.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {RULE_COLUMNS} FROM user_rules
                 WHERE user_name = ?1
                 ORDER BY priority DESC, id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rules = stmt
                .query_map(params![user_name], rule_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rules)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a partial update, re-validating the result.
pub async fn update_rule(
    db: &Database,
    id: i64,
    patch: &UserRulePatch,
) -> Result<UserRule, ClawmarkError> {
    let mut rule = get_rule(db, id).await?.ok_or_else(|| not_found(id))?;

    if let Some(rule_type) = patch.rule_type {
        rule.rule_type = rule_type;
    }
    if let Some(pattern) = &patch.pattern {
        rule.pattern = pattern.clone();
    }
    if let Some(target) = &patch.target {
        rule.target_type = target.target_type.clone();
        rule.target_config = target.target_config.clone();
    }
    if let Some(priority) = patch.priority {
        rule.priority = priority;
    }
    if let Some(enabled) = patch.enabled {
        rule.enabled = enabled;
    }
    validate_rule(
        rule.rule_type,
        rule.pattern.as_deref(),
        &Target::new(rule.target_type.clone(), rule.target_config.clone()),
    )?;

    let now = Utc::now();
    rule.updated_at = now;
    let row = rule.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE user_rules
                 SET rule_type = ?1, pattern = ?2, target_type = ?3, target_config = ?4,
                     priority = ?5, enabled = ?6, updated_at = ?7
                 WHERE id = ?8",
                params![
                    row.rule_type.to_string(),
                    row.pattern,
                    row.target_type,
                    to_json(&row.target_config)?,
                    row.priority,
                    row.enabled,
                    ts(&now),
                    row.id,
                ],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    if changed == 0 {
        return Err(not_found(id));
    }
    Ok(rule)
}

pub async fn delete_rule(db: &Database, id: i64) -> Result<(), ClawmarkError> {
    let changed = db
        .connection()
        .call(move |conn| conn.execute("DELETE FROM user_rules WHERE id = ?1", params![id]))
        .await
        .map_err(crate::database::map_tr_err)?;
    if changed == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RuleType;
    use crate::queries::test_support::setup_db;
    use serde_json::json;

    fn new_rule(user: &str, rule_type: RuleType, pattern: Option<&str>, priority: i64) -> NewUserRule {
        NewUserRule {
            user_name: user.into(),
            rule_type,
            pattern: pattern.map(str::to_string),
            target: Target::new("github-issue", json!({"repo": "coco-xyz/feedback"})),
            priority,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn rules_come_back_by_priority() {
        let (db, _dir) = setup_db().await;
        create_rule(&db, &new_rule("kevin", RuleType::TagMatch, Some("ux"), 1)).await.unwrap();
        create_rule(&db, &new_rule("kevin", RuleType::UrlPattern, Some("github.com/**"), 10))
            .await
            .unwrap();
        create_rule(&db, &new_rule("kevin", RuleType::Default, None, 0)).await.unwrap();
        create_rule(&db, &new_rule("jessie", RuleType::Default, None, 99)).await.unwrap();

        let rules = rules_for_user(&db, "kevin").await.unwrap();
        let priorities: Vec<i64> = rules.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![10, 1, 0]);
        assert_eq!(rules[0].rule_type, RuleType::UrlPattern);
        assert_eq!(rules[0].target_config["repo"], "coco-xyz/feedback");
    }

    #[tokio::test]
    async fn create_rejects_missing_pattern() {
        let (db, _dir) = setup_db().await;
        let err = create_rule(&db, &new_rule("kevin", RuleType::UrlPattern, None, 1))
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(rules_for_user(&db, "kevin").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_applies_patch_and_revalidates() {
        let (db, _dir) = setup_db().await;
        let rule = create_rule(&db, &new_rule("kevin", RuleType::ContentType, Some("bug"), 1))
            .await
            .unwrap();

        let disabled = update_rule(
            &db,
            rule.id,
            &UserRulePatch {
                enabled: Some(false),
                priority: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(!disabled.enabled);
        assert_eq!(disabled.priority, 5);
        assert_eq!(disabled.pattern.as_deref(), Some("bug"));

        let cleared = update_rule(
            &db,
            rule.id,
            &UserRulePatch {
                pattern: Some(None),
                ..Default::default()
            },
        )
        .await;
        assert!(cleared.is_err());
        let stored = get_rule(&db, rule.id).await.unwrap().unwrap();
        assert_eq!(stored.pattern.as_deref(), Some("bug"));
        assert!(!stored.enabled);
    }

    #[tokio::test]
    async fn delete_and_missing_rules() {
        let (db, _dir) = setup_db().await;
        let rule = create_rule(&db, &new_rule("kevin", RuleType::Default, None, 0)).await.unwrap();
        delete_rule(&db, rule.id).await.unwrap();
        assert!(matches!(
            delete_rule(&db, rule.id).await.unwrap_err(),
            ClawmarkError::NotFound { .. }
        ));
        assert!(matches!(
            update_rule(&db, rule.id, &UserRulePatch::default()).await.unwrap_err(),
            ClawmarkError::NotFound { .. }
        ));
    }
}
