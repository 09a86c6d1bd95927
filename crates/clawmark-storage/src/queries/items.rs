// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feedback item persistence.

use clawmark_core::ClawmarkError;
use rusqlite::params;

use super::{parse_json, parse_ts, to_json, ts};
use crate::database::Database;
use crate::models::FeedbackItem;

/// Insert or replace an item by id.
pub async fn upsert_item(db: &Database, item: &FeedbackItem) -> Result<(), ClawmarkError> {
    let item = item.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO items (id, app_id, source_url, title, content, item_type, priority,
                                    status, tags, created_by, assignee, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(id) DO UPDATE SET
                    app_id = excluded.app_id,
                    source_url = excluded.source_url,
                    title = excluded.title,
                    content = excluded.content,
                    item_type = excluded.item_type,
                    priority = excluded.priority,
                    status = excluded.status,
                    tags = excluded.tags,
                    created_by = excluded.created_by,
                    assignee = excluded.assignee",
                params![
                    item.id,
                    item.app_id,
                    item.source_url,
                    item.title,
                    item.content,
                    item.item_type,
                    item.priority,
                    item.status,
                    to_json(&item.tags)?,
                    item.created_by,
                    item.assignee,
                    ts(&item.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get an item by id.
pub async fn get_item(db: &Database, id: &str) -> Result<Option<FeedbackItem>, ClawmarkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, app_id, source_url, title, content, item_type, priority, status,
                        tags, created_by, assignee, created_at
                 FROM items WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], |row| {
                let tags: String = row.get(8)?;
                let created_at: String = row.get(11)?;
                Ok(FeedbackItem {
                    id: row.get(0)?,
                    app_id: row.get(1)?,
                    source_url: row.get(2)?,
                    title: row.get(3)?,
                    content: row.get(4)?,
                    item_type: row.get(5)?,
                    priority: row.get(6)?,
                    status: row.get(7)?,
                    tags: parse_json(8, &tags)?,
                    created_by: row.get(9)?,
                    assignee: row.get(10)?,
                    created_at: parse_ts(11, &created_at)?,
                })
            });
            match result {
                Ok(item) => Ok(Some(item)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete an item. Dispatch log rows are kept; the retry sweep cancels them.
pub async fn delete_item(db: &Database, id: &str) -> Result<bool, ClawmarkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute("DELETE FROM items WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
