// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the delivery core and its collaborators.
//!
//! Adapters and stores use `#[async_trait]` so they can be held as
//! `Arc<dyn ...>` by the dispatch engine.

pub mod adapter;
pub mod store;

pub use adapter::{AdapterFactory, DeliveryAdapter};
pub use store::{DispatchStore, RuleStore};
