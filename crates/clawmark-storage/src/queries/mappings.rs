// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter mapping operations.

use chrono::Utc;
use clawmark_core::ClawmarkError;
use rusqlite::{Row, params};

use super::ts;
use crate::database::Database;
use crate::models::AdapterMapping;

fn mapping_from_row(row: &Row<'_>) -> rusqlite::Result<AdapterMapping> {
    Ok(AdapterMapping {
        item_id: row.get(0)?,
        adapter_type: row.get(1)?,
        channel: row.get(2)?,
        external_id: row.get(3)?,
        external_url: row.get(4)?,
    })
}

/// Upsert on `(item_id, adapter_type, channel)`.
pub async fn set_mapping(db: &Database, mapping: &AdapterMapping) -> Result<(), ClawmarkError> {
    let mapping = mapping.clone();
    db.connection()
        .call(move |conn| {
            let stamp = ts(&Utc::now());
            conn.execute(
                "INSERT INTO adapter_mappings (item_id, adapter_type, channel, external_id,
                                               external_url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(item_id, adapter_type, channel) DO UPDATE SET
                    external_id = excluded.external_id,
                    external_url = excluded.external_url,
                    updated_at = excluded.updated_at",
                params![
                    mapping.item_id,
                    mapping.adapter_type,
                    mapping.channel,
                    mapping.external_id,
                    mapping.external_url,
                    stamp,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_mapping(
    db: &Database,
    item_id: &str,
    adapter_type: &str,
    channel: &str,
) -> Result<Option<AdapterMapping>, ClawmarkError> {
    let key = (item_id.to_string(), adapter_type.to_string(), channel.to_string());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT item_id, adapter_type, channel, external_id, external_url
                 FROM adapter_mappings
                 WHERE item_id = ?1 AND adapter_type = ?2 AND channel = ?3",
            )?;
            match stmt.query_row(params![key.0, key.1, key.2], mapping_from_row) {
                Ok(mapping) => Ok(Some(mapping)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Every mapping recorded for an item.
pub async fn mappings_for_item(
    db: &Database,
    item_id: &str,
) -> Result<Vec<AdapterMapping>, ClawmarkError> {
    let item_id = item_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT item_id, adapter_type, channel, external_id, external_url
                 FROM adapter_mappings WHERE item_id = ?1
                 ORDER BY adapter_type, channel",
            )?;
            let mappings = stmt
                .query_map(params![item_id], mapping_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(mappings)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
