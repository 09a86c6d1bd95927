// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Clawmark integration tests.
//!
//! Provides mock adapters and an in-memory store for fast, deterministic,
//! CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockAdapter`] / [`MockAdapterFactory`] - delivery adapters with captured sends and injectable failures
//! - [`InMemoryStore`] - dispatch log, mappings, items, and user rules in memory
//! - [`sample_item`] - a ready-made feedback item

pub mod fixtures;
pub mod memory_store;
pub mod mock_adapter;

pub use fixtures::sample_item;
pub use memory_store::InMemoryStore;
pub use mock_adapter::{MockAdapter, MockAdapterFactory, SentRecord};
