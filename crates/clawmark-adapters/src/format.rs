// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text rendering shared by chat and email adapters.

use clawmark_core::{DispatchContext, DispatchEvent, FeedbackItem};

use crate::http::truncate_chars;

const PREVIEW_CHARS: usize = 500;

/// One-line summary of what happened.
pub fn headline(event: DispatchEvent, item: &FeedbackItem) -> String {
    match event {
        DispatchEvent::ItemCreated => format!("New {}: {}", item.item_type, item.title),
        DispatchEvent::ItemResolved => format!("Resolved: {}", item.title),
        DispatchEvent::ItemClosed => format!("Closed: {}", item.title),
        DispatchEvent::ItemReopened => format!("Reopened: {}", item.title),
        DispatchEvent::ItemAssigned => match &item.assignee {
            Some(who) => format!("Assigned to {who}: {}", item.title),
            None => format!("Assignment changed: {}", item.title),
        },
        DispatchEvent::DiscussionCreated => format!("New comment on: {}", item.title),
    }
}

/// Multi-line message body.
pub fn render_text(event: DispatchEvent, item: &FeedbackItem, ctx: &DispatchContext) -> String {
    let mut lines = vec![format!("[Clawmark] {}", headline(event, item))];
    lines.push(format!(
        "Priority: {} | Type: {} | Status: {} | By: {}",
        item.priority, item.item_type, item.status, item.created_by
    ));
    if !item.tags.is_empty() {
        lines.push(format!("Tags: {}", item.tags.join(", ")));
    }
    if let Some(url) = &item.source_url {
        lines.push(url.clone());
    }

    let detail = match event {
        DispatchEvent::ItemCreated => Some(item.content.as_str()),
        _ => ctx.message.as_deref(),
    };
    if let Some(detail) = detail.filter(|d| !d.trim().is_empty()) {
        lines.push(String::new());
        lines.push(truncate_chars(detail.trim(), PREVIEW_CHARS));
    }

    if let Some(actor) = &ctx.actor {
        lines.push(format!("(by {actor})"));
    }
    lines.join("\n")
}

/// Markdown issue body for tracker adapters.
pub fn issue_body(item: &FeedbackItem) -> String {
    let mut body = String::new();
    if !item.content.trim().is_empty() {
        body.push_str(item.content.trim());
        body.push_str("\n\n");
    }
    body.push_str("---\n");
    body.push_str(&format!("- **Type:** {}\n", item.item_type));
    body.push_str(&format!("- **Priority:** {}\n", item.priority));
    if let Some(url) = &item.source_url {
        body.push_str(&format!("- **Source:** {url}\n"));
    }
    if !item.tags.is_empty() {
        body.push_str(&format!("- **Tags:** {}\n", item.tags.join(", ")));
    }
    body.push_str(&format!("- **Reported by:** {}\n", item.created_by));
    body.push_str(&format!("- **Clawmark item:** `{}`\n", item.id));
    body
}
