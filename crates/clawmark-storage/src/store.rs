// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the dispatch and rule store traits.

use async_trait::async_trait;
use clawmark_config::model::StorageConfig;
use clawmark_core::{
    AdapterMapping, ClawmarkError, DispatchEntry, DispatchStore, DispatchUpdate, FeedbackItem,
    NewDispatchEntry, ResetFilter, RuleStore, UserRule,
};
use tracing::debug;

use crate::database::Database;
use crate::models::{NewUserRule, UserRulePatch};
use crate::queries;

/// SQLite-backed store. Cloning shares the underlying connection.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the database described by `config`.
    pub async fn open(config: &StorageConfig) -> Result<Self, ClawmarkError> {
        let db = Database::open_with(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite store initialized");
        Ok(Self { db })
    }

    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn close(&self) -> Result<(), ClawmarkError> {
        self.db.close().await
    }

    // --- Items ---

    pub async fn insert_item(&self, item: &FeedbackItem) -> Result<(), ClawmarkError> {
        queries::items::upsert_item(&self.db, item).await
    }

    pub async fn delete_item(&self, item_id: &str) -> Result<bool, ClawmarkError> {
        queries::items::delete_item(&self.db, item_id).await
    }

    // --- Dispatch log ---

    pub async fn list_dispatch_entries(
        &self,
        item_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<DispatchEntry>, ClawmarkError> {
        queries::dispatch::list_entries(&self.db, item_id, limit).await
    }

    pub async fn adapter_mappings_for_item(
        &self,
        item_id: &str,
    ) -> Result<Vec<AdapterMapping>, ClawmarkError> {
        queries::mappings::mappings_for_item(&self.db, item_id).await
    }

    // --- User rules ---

    pub async fn create_user_rule(&self, rule: &NewUserRule) -> Result<UserRule, ClawmarkError> {
        queries::rules::create_rule(&self.db, rule).await
    }

    pub async fn get_user_rule(&self, id: i64) -> Result<Option<UserRule>, ClawmarkError> {
        queries::rules::get_rule(&self.db, id).await
    }

    pub async fn update_user_rule(
        &self,
        id: i64,
        patch: &UserRulePatch,
    ) -> Result<UserRule, ClawmarkError> {
        queries::rules::update_rule(&self.db, id, patch).await
    }

    pub async fn delete_user_rule(&self, id: i64) -> Result<(), ClawmarkError> {
        queries::rules::delete_rule(&self.db, id).await
    }
}

#[async_trait]
impl DispatchStore for SqliteStore {
    async fn create_dispatch_entry(
        &self,
        entry: &NewDispatchEntry,
    ) -> Result<DispatchEntry, ClawmarkError> {
        queries::dispatch::create_entry(&self.db, entry).await
    }

    async fn update_dispatch_entry(
        &self,
        id: i64,
        update: &DispatchUpdate,
    ) -> Result<(), ClawmarkError> {
        queries::dispatch::update_entry(&self.db, id, update).await
    }

    async fn get_dispatch_entry(&self, id: i64) -> Result<Option<DispatchEntry>, ClawmarkError> {
        queries::dispatch::get_entry(&self.db, id).await
    }

    async fn get_pending_dispatches(&self) -> Result<Vec<DispatchEntry>, ClawmarkError> {
        queries::dispatch::pending_entries(&self.db).await
    }

    async fn get_item(&self, item_id: &str) -> Result<Option<FeedbackItem>, ClawmarkError> {
        queries::items::get_item(&self.db, item_id).await
    }

    async fn set_adapter_mapping(&self, mapping: &AdapterMapping) -> Result<(), ClawmarkError> {
        queries::mappings::set_mapping(&self.db, mapping).await
    }

    async fn get_adapter_mapping(
        &self,
        item_id: &str,
        adapter_type: &str,
        channel: &str,
    ) -> Result<Option<AdapterMapping>, ClawmarkError> {
        queries::mappings::get_mapping(&self.db, item_id, adapter_type, channel).await
    }

    async fn reset_dispatch_entries(&self, filter: &ResetFilter) -> Result<u64, ClawmarkError> {
        queries::dispatch::reset_entries(&self.db, filter).await
    }
}

#[async_trait]
impl RuleStore for SqliteStore {
    async fn get_user_rules(&self, user_name: &str) -> Result<Vec<UserRule>, ClawmarkError> {
        queries::rules::rules_for_user(&self.db, user_name).await
    }
}
