// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned domain values.

use chrono::Utc;
use clawmark_core::FeedbackItem;

/// A feedback item created by `kevin` on a GitHub issue page.
pub fn sample_item(id: &str) -> FeedbackItem {
    FeedbackItem {
        id: id.to_string(),
        app_id: "clawmark".to_string(),
        source_url: Some("https://github.com/coco-xyz/clawmark/issues/38".to_string()),
        title: "Button label is truncated".to_string(),
        content: "The submit button on the settings page cuts off its label.".to_string(),
        item_type: "issue".to_string(),
        priority: "high".to_string(),
        status: "open".to_string(),
        tags: vec!["ux".to_string()],
        created_by: "kevin".to_string(),
        assignee: None,
        created_at: Utc::now(),
    }
}
