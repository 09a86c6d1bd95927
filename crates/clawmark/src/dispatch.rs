// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `clawmark dispatch`: route and deliver one event for an item read from
//! a JSON file.

use std::path::Path;

use clawmark_core::{ClawmarkError, DispatchContext, DispatchEvent, FeedbackItem};

use crate::app::App;

pub fn read_item(path: &Path) -> Result<FeedbackItem, ClawmarkError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ClawmarkError::Config(format!("failed to read item file {}: {e}", path.display()))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        ClawmarkError::Config(format!("invalid item file {}: {e}", path.display()))
    })
}

pub async fn run_dispatch(
    app: App,
    item: FeedbackItem,
    event: DispatchEvent,
    ctx: DispatchContext,
) -> Result<(), ClawmarkError> {
    let outcome = app.handle_event(event, &item, &ctx).await?;

    for delivery in &outcome.tracked {
        let entry = delivery
            .entry_id
            .map(|id| format!("#{id}"))
            .unwrap_or_else(|| "untracked".to_string());
        match (&delivery.error, &delivery.external) {
            (Some(err), _) => println!(
                "{entry} {} [{}] {}: {err}",
                delivery.target.target_type, delivery.method, delivery.status
            ),
            (None, Some(ext)) => println!(
                "{entry} {} [{}] {} {}",
                delivery.target.target_type,
                delivery.method,
                delivery.status,
                ext.external_url.as_deref().unwrap_or(&ext.external_id)
            ),
            (None, None) => println!(
                "{entry} {} [{}] {}",
                delivery.target.target_type, delivery.method, delivery.status
            ),
        }
    }
    for report in &outcome.broadcast {
        match &report.result {
            Ok(_) => println!("channel {} ({}) ok", report.channel, report.adapter_type),
            Err(err) => println!("channel {} ({}) failed: {err}", report.channel, report.adapter_type),
        }
    }
    app.store.close().await
}
