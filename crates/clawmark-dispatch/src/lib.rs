// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch engine for Clawmark.
//!
//! [`DispatchEngine`] holds the channel table built from `[dispatch]` and
//! performs static, ad-hoc, and tracked delivery. [`RetrySweeper`] replays
//! failed dispatch log entries with exponential backoff.

pub mod backoff;
pub mod engine;
pub mod retry;
pub mod rules;

pub use backoff::{backoff_delay, is_due};
pub use engine::{
    ChannelStatus, DeliveryReport, DispatchEngine, LoadSummary, TargetOutcome, TrackedDelivery,
};
pub use retry::{RetryPolicy, RetrySweeper, SweepOutcome, SweepReport};
pub use rules::matching_channels;
