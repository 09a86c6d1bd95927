// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `clawmark serve` and `clawmark sweep`.
//!
//! `serve` runs the retry sweep on a fixed interval until SIGINT/SIGTERM.
//! `sweep` runs it once and prints the report.

use std::time::Duration;

use clawmark_core::ClawmarkError;
use clawmark_dispatch::{RetrySweeper, SweepOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::App;
use crate::shutdown;

pub async fn run_serve(app: App) -> Result<(), ClawmarkError> {
    info!("starting clawmark serve");

    for channel in app.engine.status() {
        debug!(channel = %channel.name, adapter = %channel.adapter_type, health = ?channel.health, "channel");
    }

    let cancel = shutdown::install_signal_handler();
    let interval = Duration::from_secs(app.config.retry.interval_secs);
    sweep_loop(&app.sweeper(), interval, cancel).await;

    app.store.close().await?;
    info!("clawmark serve shutdown complete");
    Ok(())
}

/// Sweep every `interval` until `cancel` fires. Sweep errors are logged and
/// the loop keeps going.
pub async fn sweep_loop(sweeper: &RetrySweeper, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // Skip the first immediate tick.
    ticker.tick().await;

    info!(interval_secs = interval.as_secs(), "retry sweep scheduled");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match sweeper.retry_failed().await {
                    Ok(SweepOutcome::Completed(report)) => {
                        debug!(scanned = report.scanned, sent = report.sent, "sweep tick");
                    }
                    Ok(SweepOutcome::Skipped) => {
                        debug!("previous sweep still running");
                    }
                    Err(e) => {
                        warn!(error = %e, "retry sweep failed (non-fatal)");
                    }
                }
            }
            _ = cancel.cancelled() => {
                info!("retry sweep shutting down");
                break;
            }
        }
    }
}

pub async fn run_sweep(app: App, json: bool) -> Result<(), ClawmarkError> {
    let outcome = app.sweeper().retry_failed().await?;
    match outcome {
        SweepOutcome::Completed(report) if json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        SweepOutcome::Completed(report) => {
            println!(
                "scanned {}, waiting {}, sent {}, failed {}, exhausted {}, cancelled {}",
                report.scanned,
                report.skipped,
                report.sent,
                report.failed,
                report.exhausted,
                report.cancelled
            );
        }
        SweepOutcome::Skipped => println!("sweep already running"),
    }
    app.store.close().await
}
