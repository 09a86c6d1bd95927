// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence operations consumed by the dispatch engine and resolver.

use async_trait::async_trait;

use crate::error::ClawmarkError;
use crate::types::{
    AdapterMapping, DispatchEntry, DispatchUpdate, FeedbackItem, NewDispatchEntry, ResetFilter,
    UserRule,
};

/// Dispatch log, item lookup, and adapter mapping storage.
#[async_trait]
pub trait DispatchStore: Send + Sync + 'static {
    /// Insert a new entry in `pending` status and return it.
    async fn create_dispatch_entry(
        &self,
        entry: &NewDispatchEntry,
    ) -> Result<DispatchEntry, ClawmarkError>;

    /// Apply an attempt outcome and bump `updated_at`.
    async fn update_dispatch_entry(
        &self,
        id: i64,
        update: &DispatchUpdate,
    ) -> Result<(), ClawmarkError>;

    async fn get_dispatch_entry(&self, id: i64) -> Result<Option<DispatchEntry>, ClawmarkError>;

    /// Entries that are not in a terminal status, oldest first.
    async fn get_pending_dispatches(&self) -> Result<Vec<DispatchEntry>, ClawmarkError>;

    async fn get_item(&self, item_id: &str) -> Result<Option<FeedbackItem>, ClawmarkError>;

    /// Upsert keyed by `(item_id, adapter_type, channel)`.
    async fn set_adapter_mapping(&self, mapping: &AdapterMapping) -> Result<(), ClawmarkError>;

    async fn get_adapter_mapping(
        &self,
        item_id: &str,
        adapter_type: &str,
        channel: &str,
    ) -> Result<Option<AdapterMapping>, ClawmarkError>;

    /// Move matching `failed`/`exhausted` entries back to `pending` with
    /// `retries = 0`. Returns the number of entries reset.
    async fn reset_dispatch_entries(&self, filter: &ResetFilter) -> Result<u64, ClawmarkError>;
}

/// Per-user routing rules.
#[async_trait]
pub trait RuleStore: Send + Sync + 'static {
    /// All rules owned by `user_name`, sorted by priority descending.
    async fn get_user_rules(&self, user_name: &str) -> Result<Vec<UserRule>, ClawmarkError>;
}
