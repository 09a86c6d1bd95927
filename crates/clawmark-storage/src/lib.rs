// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Clawmark.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed operations for feedback
//! items, the dispatch log, adapter mappings, and per-user routing rules.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod store;

pub use database::Database;
pub use models::{NewUserRule, UserRulePatch, validate_rule};
pub use store::SqliteStore;
