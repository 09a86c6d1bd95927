// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch log operations.

use chrono::Utc;
use clawmark_core::{ClawmarkError, DispatchStatus, DispatchUpdate, ResetFilter};
use rusqlite::{Row, params};

use super::{parse_json, parse_tag, parse_ts, to_json, ts};
use crate::database::Database;
use crate::models::{DispatchEntry, NewDispatchEntry, Target};

const ENTRY_COLUMNS: &str = "id, item_id, event, target_type, target_config, method, status, retries,
     external_id, external_url, last_error, created_at, updated_at";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<DispatchEntry> {
    let event: String = row.get(2)?;
    let config: String = row.get(4)?;
    let method: String = row.get(5)?;
    let status: String = row.get(6)?;
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;
    Ok(DispatchEntry {
        id: row.get(0)?,
        item_id: row.get(1)?,
        event: parse_tag(2, &event)?,
        target: Target::new(row.get::<_, String>(3)?, parse_json(4, &config)?),
        method: parse_tag(5, &method)?,
        status: parse_tag(6, &status)?,
        retries: row.get(7)?,
        external_id: row.get(8)?,
        external_url: row.get(9)?,
        last_error: row.get(10)?,
        created_at: parse_ts(11, &created_at)?,
        updated_at: parse_ts(12, &updated_at)?,
    })
}

/// Insert a new entry in `pending` status.
pub async fn create_entry(
    db: &Database,
    entry: &NewDispatchEntry,
) -> Result<DispatchEntry, ClawmarkError> {
    let entry = entry.clone();
    db.connection()
        .call(move |conn| {
            let now = Utc::now();
            let stamp = ts(&now);
            conn.execute(
                "INSERT INTO dispatch_log (item_id, event, target_type, target_config, method,
                                           status, retries, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending', 0, ?6, ?6)",
                params![
                    entry.item_id,
                    entry.event.to_string(),
                    entry.target.target_type,
                    to_json(&entry.target.target_config)?,
                    entry.method.to_string(),
                    stamp,
                ],
            )?;
            Ok(DispatchEntry {
                id: conn.last_insert_rowid(),
                item_id: entry.item_id,
                event: entry.event,
                target: entry.target,
                method: entry.method,
                status: DispatchStatus::Pending,
                retries: 0,
                external_id: None,
                external_url: None,
                last_error: None,
                created_at: now,
                updated_at: now,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply an attempt outcome. External fields are only overwritten when the
/// update carries a new reference.
pub async fn update_entry(
    db: &Database,
    id: i64,
    update: &DispatchUpdate,
) -> Result<(), ClawmarkError> {
    let update = update.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            let stamp = ts(&Utc::now());
            let status = update.status.to_string();
            match &update.external {
                Some(external) => conn.execute(
                    "UPDATE dispatch_log
                     SET status = ?1, retries = ?2, last_error = ?3, updated_at = ?4,
                         external_id = ?5, external_url = ?6
                     WHERE id = ?7",
                    params![
                        status,
                        update.retries,
                        update.last_error,
                        stamp,
                        external.external_id,
                        external.external_url,
                        id,
                    ],
                ),
                None => conn.execute(
                    "UPDATE dispatch_log
                     SET status = ?1, retries = ?2, last_error = ?3, updated_at = ?4
                     WHERE id = ?5",
                    params![status, update.retries, update.last_error, stamp, id],
                ),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    if changed == 0 {
        return Err(ClawmarkError::NotFound {
            kind: "dispatch entry".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Get one entry by id.
pub async fn get_entry(db: &Database, id: i64) -> Result<Option<DispatchEntry>, ClawmarkError> {
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {ENTRY_COLUMNS} FROM dispatch_log WHERE id = ?1");
            let mut stmt = conn.prepare(&sql)?;
            match stmt.query_row(params![id], entry_from_row) {
                Ok(entry) => Ok(Some(entry)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Entries in `pending` or `failed`, oldest first.
pub async fn pending_entries(db: &Database) -> Result<Vec<DispatchEntry>, ClawmarkError> {
    db.connection()
        .call(|conn| {
            let sql = format!(
                "SELECT {ENTRY_COLUMNS} FROM dispatch_log
                 WHERE status IN ('pending', 'failed')
                 ORDER BY id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let entries = stmt
                .query_map([], entry_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Most recent entries, optionally for one item, newest first.
pub async fn list_entries(
    db: &Database,
    item_id: Option<&str>,
    limit: usize,
) -> Result<Vec<DispatchEntry>, ClawmarkError> {
    let item_id = item_id.map(str::to_string);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {ENTRY_COLUMNS} FROM dispatch_log
                 WHERE (?1 IS NULL OR item_id = ?1)
                 ORDER BY id DESC
                 LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let entries = stmt
                .query_map(params![item_id, limit], entry_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Move matching `failed`/`exhausted` entries back to `pending`, `retries = 0`.
pub async fn reset_entries(db: &Database, filter: &ResetFilter) -> Result<u64, ClawmarkError> {
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE dispatch_log
                 SET status = 'pending', retries = 0, updated_at = ?1
                 WHERE status IN ('failed', 'exhausted')
                   AND (?2 IS NULL OR id = ?2)
                   AND (?3 IS NULL OR item_id = ?3)",
                params![ts(&Utc::now()), filter.entry_id, filter.item_id],
            )?;
            Ok(changed as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;
    use clawmark_core::{DispatchEvent, ExternalRef, RoutingMethod};
    use serde_json::json;

    fn new_entry(item_id: &str) -> NewDispatchEntry {
        NewDispatchEntry {
            item_id: item_id.into(),
            event: DispatchEvent::ItemCreated,
            target: Target::new("github-issue", json!({"repo": "coco-xyz/clawmark"})),
            method: RoutingMethod::GithubAuto,
        }
    }

    fn update(status: DispatchStatus, retries: u32) -> DispatchUpdate {
        DispatchUpdate {
            status,
            retries,
            external: None,
            last_error: None,
        }
    }

    #[tokio::test]
    async fn create_then_get_roundtrip() {
        let (db, _dir) = setup_db().await;
        let created = create_entry(&db, &new_entry("i1")).await.unwrap();
        assert!(created.id > 0);
        assert_eq!(created.status, DispatchStatus::Pending);

        let loaded = get_entry(&db, created.id).await.unwrap().unwrap();
        assert_eq!(loaded.event, DispatchEvent::ItemCreated);
        assert_eq!(loaded.method, RoutingMethod::GithubAuto);
        assert_eq!(loaded.target.config_str("repo"), Some("coco-xyz/clawmark"));
        assert_eq!(loaded.retries, 0);
    }

    #[tokio::test]
    async fn update_keeps_external_ref_unless_replaced() {
        let (db, _dir) = setup_db().await;
        let id = create_entry(&db, &new_entry("i1")).await.unwrap().id;

        let sent = DispatchUpdate {
            status: DispatchStatus::Sent,
            retries: 0,
            external: Some(ExternalRef {
                external_id: "42".into(),
                external_url: Some("https://github.com/coco-xyz/clawmark/issues/42".into()),
            }),
            last_error: None,
        };
        update_entry(&db, id, &sent).await.unwrap();
        update_entry(&db, id, &update(DispatchStatus::Sent, 0)).await.unwrap();

        let loaded = get_entry(&db, id).await.unwrap().unwrap();
        assert_eq!(loaded.external_id.as_deref(), Some("42"));
        assert!(loaded.updated_at >= loaded.created_at);
    }

    #[tokio::test]
    async fn update_of_missing_entry_is_not_found() {
        let (db, _dir) = setup_db().await;
        let err = update_entry(&db, 999, &update(DispatchStatus::Sent, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ClawmarkError::NotFound { .. }));
    }

    #[tokio::test]
    async fn pending_excludes_terminal_statuses() {
        let (db, _dir) = setup_db().await;
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(create_entry(&db, &new_entry("i1")).await.unwrap().id);
        }
        update_entry(&db, ids[1], &update(DispatchStatus::Failed, 1)).await.unwrap();
        update_entry(&db, ids[2], &update(DispatchStatus::Sent, 0)).await.unwrap();
        update_entry(&db, ids[3], &update(DispatchStatus::Exhausted, 3)).await.unwrap();
        update_entry(&db, ids[4], &update(DispatchStatus::Cancelled, 1)).await.unwrap();

        let pending: Vec<i64> = pending_entries(&db).await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(pending, vec![ids[0], ids[1]]);
    }

    #[tokio::test]
    async fn reset_respects_filters_and_status() {
        let (db, _dir) = setup_db().await;
        let a = create_entry(&db, &new_entry("i1")).await.unwrap().id;
        let b = create_entry(&db, &new_entry("i1")).await.unwrap().id;
        let c = create_entry(&db, &new_entry("i2")).await.unwrap().id;
        let d = create_entry(&db, &new_entry("i1")).await.unwrap().id;
        update_entry(&db, a, &update(DispatchStatus::Failed, 2)).await.unwrap();
        update_entry(&db, b, &update(DispatchStatus::Exhausted, 3)).await.unwrap();
        update_entry(&db, c, &update(DispatchStatus::Exhausted, 3)).await.unwrap();
        update_entry(&db, d, &update(DispatchStatus::Sent, 0)).await.unwrap();

        let by_item = ResetFilter {
            entry_id: None,
            item_id: Some("i1".into()),
        };
        assert_eq!(reset_entries(&db, &by_item).await.unwrap(), 2);
        let b_entry = get_entry(&db, b).await.unwrap().unwrap();
        assert_eq!((b_entry.status, b_entry.retries), (DispatchStatus::Pending, 0));
        assert_eq!(get_entry(&db, d).await.unwrap().unwrap().status, DispatchStatus::Sent);

        let by_id = ResetFilter {
            entry_id: Some(c),
            item_id: None,
        };
        assert_eq!(reset_entries(&db, &by_id).await.unwrap(), 1);
        assert_eq!(reset_entries(&db, &by_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_filterable() {
        let (db, _dir) = setup_db().await;
        let first = create_entry(&db, &new_entry("i1")).await.unwrap().id;
        let second = create_entry(&db, &new_entry("i2")).await.unwrap().id;

        let all: Vec<i64> = list_entries(&db, None, 10).await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(all, vec![second, first]);
        let only_i1 = list_entries(&db, Some("i1"), 10).await.unwrap();
        assert_eq!(only_i1.len(), 1);
        assert_eq!(only_i1[0].id, first);
    }
}
