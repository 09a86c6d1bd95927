// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `clawmark status` command implementation.
//!
//! Prints the channel health snapshot and the most recent dispatch log
//! entries. `--json` emits the same data for scripting.

use std::io::IsTerminal;

use clawmark_core::{ClawmarkError, DispatchEntry, DispatchStatus, HealthStatus};
use clawmark_dispatch::ChannelStatus;
use serde::Serialize;

use crate::app::App;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub channels: Vec<ChannelStatus>,
    pub entries: Vec<DispatchEntry>,
}

pub async fn run_status(
    app: App,
    item: Option<&str>,
    limit: usize,
    json: bool,
    plain: bool,
) -> Result<(), ClawmarkError> {
    let response = StatusResponse {
        channels: app.engine.status(),
        entries: app.store.list_dispatch_entries(item, limit).await?,
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_status(&response, use_color);
    }
    app.store.close().await
}

fn print_status(response: &StatusResponse, use_color: bool) {
    println!();
    println!("  clawmark status");
    println!("  {}", "-".repeat(35));

    if response.channels.is_empty() {
        println!("    Channels: none configured");
    } else {
        println!("    Channels:");
        for channel in &response.channels {
            println!("      {}", channel_line(channel, use_color));
        }
    }

    println!();
    if response.entries.is_empty() {
        println!("    Dispatches: none recorded");
    } else {
        println!("    Recent dispatches:");
        for entry in &response.entries {
            println!("      {}", entry_line(entry, use_color));
        }
    }
    println!();
}

fn channel_line(channel: &ChannelStatus, use_color: bool) -> String {
    match (&channel.health, use_color) {
        (HealthStatus::Healthy, true) => {
            use colored::Colorize;
            format!("{} {} ({})", "✓".green(), channel.name, channel.adapter_type)
        }
        (HealthStatus::Healthy, false) => {
            format!("[OK] {} ({})", channel.name, channel.adapter_type)
        }
        (HealthStatus::Unhealthy(reason), true) => {
            use colored::Colorize;
            format!(
                "{} {} ({}): {}",
                "✗".red(),
                channel.name,
                channel.adapter_type,
                reason.red()
            )
        }
        (HealthStatus::Unhealthy(reason), false) => {
            format!("[FAIL] {} ({}): {reason}", channel.name, channel.adapter_type)
        }
    }
}

fn entry_line(entry: &DispatchEntry, use_color: bool) -> String {
    let status = entry.status.to_string();
    let status = if use_color {
        use colored::Colorize;
        match entry.status {
            DispatchStatus::Sent => status.green().to_string(),
            DispatchStatus::Failed | DispatchStatus::Pending => status.yellow().to_string(),
            DispatchStatus::Exhausted | DispatchStatus::Cancelled => status.red().to_string(),
        }
    } else {
        status
    };

    let mut line = format!(
        "#{} {} {} -> {} [{}] {} (retries {})",
        entry.id,
        entry.item_id,
        entry.event,
        entry.target.target_type,
        entry.method,
        status,
        entry.retries
    );
    if let Some(url) = &entry.external_url {
        line.push_str(&format!(" {url}"));
    }
    if let Some(err) = &entry.last_error {
        line.push_str(&format!(" error: {err}"));
    }
    line
}
