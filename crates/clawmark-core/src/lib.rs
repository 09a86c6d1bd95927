// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Clawmark routing and delivery.
//!
//! This crate provides the error type, domain types, and the trait seams
//! (delivery adapters, persistent stores) shared by every other crate in
//! the workspace.

pub mod error;
pub mod traits;
pub mod types;

pub use error::ClawmarkError;
pub use traits::{AdapterFactory, DeliveryAdapter, DispatchStore, RuleStore};
pub use types::{
    AdapterMapping, DispatchContext, DispatchEntry, DispatchEvent, DispatchStatus, DispatchUpdate,
    ExternalRef, FeedbackItem, HealthStatus, NewDispatchEntry, ResetFilter, RoutingDecision,
    RoutingMethod, RuleType, Target, UserRule,
};
