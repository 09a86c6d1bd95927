// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `clawmark resolve`: show where an item would be routed.

use clawmark_core::{ClawmarkError, RoutingDecision};
use clawmark_routing::RoutingRequest;

use crate::app::App;

pub async fn run_resolve(
    app: App,
    request: RoutingRequest,
    all: bool,
    json: bool,
) -> Result<(), ClawmarkError> {
    let decisions = if all {
        app.resolver.resolve_targets(&request).await
    } else {
        vec![app.resolver.resolve_target(&request).await]
    };

    if json {
        let value = if all {
            serde_json::to_value(&decisions)
        } else {
            serde_json::to_value(&decisions[0])
        }
        .map_err(|e| ClawmarkError::Internal(format!("failed to encode decision: {e}")))?;
        println!(
            "{}",
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        for decision in &decisions {
            println!("{}", describe(decision));
        }
    }
    app.store.close().await
}

fn describe(decision: &RoutingDecision) -> String {
    let mut line = format!(
        "{} -> {} {}",
        decision.method, decision.target.target_type, decision.target.target_config
    );
    if let Some(rule) = decision.matched_rule {
        line.push_str(&format!(" (rule #{rule})"));
    }
    line
}
