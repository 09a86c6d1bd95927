// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry sweep over the dispatch log.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use clawmark_adapters::truncate_chars;
use clawmark_config::model::RetryConfig;
use clawmark_core::{ClawmarkError, DispatchEntry, DispatchStatus, DispatchUpdate};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backoff::is_due;
use crate::engine::{DispatchEngine, MAX_ERROR_CHARS};

/// Backoff base and exhaustion threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            base_delay: Duration::from_secs(config.base_delay_secs),
            max_retries: config.max_retries,
        }
    }
}

/// Counts from one completed sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Non-terminal entries looked at.
    pub scanned: usize,
    /// Entries still inside their backoff window or with a send in flight.
    pub skipped: usize,
    pub sent: usize,
    pub failed: usize,
    pub exhausted: usize,
    pub cancelled: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Another sweep was already running.
    Skipped,
    Completed(SweepReport),
}

enum Attempt {
    InFlight,
    Sent,
    Failed,
    Exhausted,
    Cancelled,
}

/// Redelivers failed entries with exponential backoff. At most one sweep
/// runs at a time.
pub struct RetrySweeper {
    engine: Arc<DispatchEngine>,
    policy: RetryPolicy,
    busy: AtomicBool,
}

/// Clears the busy flag on drop, including on panic or cancellation.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RetrySweeper {
    pub fn new(engine: Arc<DispatchEngine>, policy: RetryPolicy) -> Self {
        Self {
            engine,
            policy,
            busy: AtomicBool::new(false),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn retry_failed(&self) -> Result<SweepOutcome, ClawmarkError> {
        self.retry_failed_at(Utc::now()).await
    }

    /// Run one sweep, judging backoff against `now`.
    pub async fn retry_failed_at(&self, now: DateTime<Utc>) -> Result<SweepOutcome, ClawmarkError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("retry sweep already running, skipping");
            return Ok(SweepOutcome::Skipped);
        }
        let _guard = BusyGuard(&self.busy);

        let entries = self.engine.store().get_pending_dispatches().await?;
        let mut report = SweepReport {
            scanned: entries.len(),
            ..Default::default()
        };

        let due: Vec<&DispatchEntry> = entries
            .iter()
            .filter(|e| is_due(e.retries, e.updated_at, now, self.policy.base_delay))
            .collect();
        report.skipped = entries.len() - due.len();

        let attempts = join_all(due.into_iter().map(|entry| self.retry_entry(entry))).await;
        for attempt in attempts {
            match attempt {
                Attempt::InFlight => report.skipped += 1,
                Attempt::Sent => report.sent += 1,
                Attempt::Failed => report.failed += 1,
                Attempt::Exhausted => report.exhausted += 1,
                Attempt::Cancelled => report.cancelled += 1,
            }
        }

        if report.scanned > report.skipped {
            info!(
                scanned = report.scanned,
                sent = report.sent,
                failed = report.failed,
                exhausted = report.exhausted,
                cancelled = report.cancelled,
                "retry sweep complete"
            );
        }
        Ok(SweepOutcome::Completed(report))
    }

    async fn retry_entry(&self, entry: &DispatchEntry) -> Attempt {
        let Some(_claim) = self.engine.claim(entry.id) else {
            debug!(entry_id = entry.id, "send in flight, not retrying");
            return Attempt::InFlight;
        };
        // A send that finished between the scan and the claim has already recorded its outcome.
        match self.engine.store().get_dispatch_entry(entry.id).await {
            Ok(Some(current))
                if current.status == entry.status && current.updated_at == entry.updated_at => {}
            Ok(_) => {
                debug!(entry_id = entry.id, "entry changed since scan, not retrying");
                return Attempt::InFlight;
            }
            Err(e) => {
                warn!(entry_id = entry.id, error = %e, "failed to reload entry for retry");
                return Attempt::Failed;
            }
        }

        let item = match self.engine.store().get_item(&entry.item_id).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                warn!(entry_id = entry.id, item_id = %entry.item_id, "item not found, cancelling dispatch");
                self.engine
                    .record(
                        entry.id,
                        &DispatchUpdate {
                            status: DispatchStatus::Cancelled,
                            retries: entry.retries,
                            external: None,
                            last_error: Some("item not found".to_string()),
                        },
                    )
                    .await;
                return Attempt::Cancelled;
            }
            Err(e) => {
                // Leave the entry untouched; the next sweep tries again.
                warn!(entry_id = entry.id, error = %e, "failed to load item for retry");
                return Attempt::Failed;
            }
        };

        match self.engine.redeliver(entry, &item).await {
            Err(e) if e.is_configuration() => {
                warn!(
                    entry_id = entry.id,
                    target_type = %entry.target.target_type,
                    error = %e,
                    "target unusable, not retrying until reset"
                );
                self.engine
                    .record(
                        entry.id,
                        &DispatchUpdate {
                            status: DispatchStatus::Exhausted,
                            retries: entry.retries,
                            external: None,
                            last_error: Some(truncate_chars(&e.to_string(), MAX_ERROR_CHARS)),
                        },
                    )
                    .await;
                Attempt::Exhausted
            }
            Ok(external) => {
                debug!(entry_id = entry.id, target_type = %entry.target.target_type, "retry delivered");
                self.engine
                    .record(
                        entry.id,
                        &DispatchUpdate {
                            status: DispatchStatus::Sent,
                            retries: entry.retries,
                            external,
                            last_error: None,
                        },
                    )
                    .await;
                Attempt::Sent
            }
            Err(e) => {
                let retries = entry.retries.saturating_add(1);
                let exhausted = retries >= self.policy.max_retries;
                let status = if exhausted {
                    DispatchStatus::Exhausted
                } else {
                    DispatchStatus::Failed
                };
                warn!(
                    entry_id = entry.id,
                    target_type = %entry.target.target_type,
                    retries,
                    %status,
                    error = %e,
                    "retry failed"
                );
                self.engine
                    .record(
                        entry.id,
                        &DispatchUpdate {
                            status,
                            retries,
                            external: None,
                            last_error: Some(truncate_chars(&e.to_string(), MAX_ERROR_CHARS)),
                        },
                    )
                    .await;
                if exhausted {
                    Attempt::Exhausted
                } else {
                    Attempt::Failed
                }
            }
        }
    }
}
