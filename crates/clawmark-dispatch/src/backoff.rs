// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential retry backoff.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// `2^retries * base`, saturating.
pub fn backoff_delay(retries: u32, base: Duration) -> Duration {
    base.saturating_mul(2u32.saturating_pow(retries))
}

/// Whether an entry last touched at `updated_at` may be retried at `now`.
///
/// An `updated_at` in the future is never due.
pub fn is_due(retries: u32, updated_at: DateTime<Utc>, now: DateTime<Utc>, base: Duration) -> bool {
    match (now - updated_at).to_std() {
        Ok(elapsed) => elapsed >= backoff_delay(retries, base),
        Err(_) => false,
    }
}
