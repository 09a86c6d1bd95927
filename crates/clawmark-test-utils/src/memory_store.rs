// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory implementation of the store traits.
//!
//! Mirrors the SQLite store's semantics closely enough for engine tests:
//! entries get increasing ids, mappings upsert on their key, and rules come
//! back sorted by priority descending.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clawmark_core::{
    AdapterMapping, ClawmarkError, DispatchEntry, DispatchStatus, DispatchStore, DispatchUpdate,
    FeedbackItem, NewDispatchEntry, ResetFilter, RuleStore, UserRule,
};
use tokio::sync::Mutex;

type MappingKey = (String, String, String);

#[derive(Default)]
struct Inner {
    items: HashMap<String, FeedbackItem>,
    entries: Vec<DispatchEntry>,
    mappings: HashMap<MappingKey, AdapterMapping>,
    rules: Vec<UserRule>,
}

/// Store backed by plain collections behind a mutex.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    fail_rules: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_item(&self, item: FeedbackItem) {
        self.inner.lock().await.items.insert(item.id.clone(), item);
    }

    pub async fn remove_item(&self, item_id: &str) {
        self.inner.lock().await.items.remove(item_id);
    }

    pub async fn add_rule(&self, rule: UserRule) {
        self.inner.lock().await.rules.push(rule);
    }

    /// Make `get_user_rules` return a storage error.
    pub fn set_rules_failing(&self, failing: bool) {
        self.fail_rules.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of every dispatch entry, in creation order.
    pub async fn entries(&self) -> Vec<DispatchEntry> {
        self.inner.lock().await.entries.clone()
    }

    pub async fn entry(&self, id: i64) -> Option<DispatchEntry> {
        self.inner
            .lock()
            .await
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    pub async fn mappings(&self) -> Vec<AdapterMapping> {
        self.inner.lock().await.mappings.values().cloned().collect()
    }

    /// Overwrite an entry's `updated_at`, for backoff tests.
    pub async fn set_updated_at(&self, id: i64, at: DateTime<Utc>) {
        if let Some(entry) = self.inner.lock().await.entries.iter_mut().find(|e| e.id == id) {
            entry.updated_at = at;
        }
    }

    /// Force an entry into a given state, for sweep tests.
    pub async fn force_state(&self, id: i64, status: DispatchStatus, retries: u32) {
        if let Some(entry) = self.inner.lock().await.entries.iter_mut().find(|e| e.id == id) {
            entry.status = status;
            entry.retries = retries;
        }
    }
}

#[async_trait]
impl DispatchStore for InMemoryStore {
    async fn create_dispatch_entry(
        &self,
        entry: &NewDispatchEntry,
    ) -> Result<DispatchEntry, ClawmarkError> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let created = DispatchEntry {
            id: inner.entries.len() as i64 + 1,
            item_id: entry.item_id.clone(),
            event: entry.event,
            target: entry.target.clone(),
            method: entry.method,
            status: DispatchStatus::Pending,
            retries: 0,
            external_id: None,
            external_url: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        inner.entries.push(created.clone());
        Ok(created)
    }

    async fn update_dispatch_entry(
        &self,
        id: i64,
        update: &DispatchUpdate,
    ) -> Result<(), ClawmarkError> {
        let mut inner = self.inner.lock().await;
        let entry = inner
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| ClawmarkError::NotFound {
                kind: "dispatch entry".into(),
                id: id.to_string(),
            })?;
        entry.status = update.status;
        entry.retries = update.retries;
        if let Some(external) = &update.external {
            entry.external_id = Some(external.external_id.clone());
            entry.external_url = external.external_url.clone();
        }
        entry.last_error = update.last_error.clone();
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn get_dispatch_entry(&self, id: i64) -> Result<Option<DispatchEntry>, ClawmarkError> {
        Ok(self.entry(id).await)
    }

    async fn get_pending_dispatches(&self) -> Result<Vec<DispatchEntry>, ClawmarkError> {
        Ok(self
            .inner
            .lock()
            .await
            .entries
            .iter()
            .filter(|e| !e.status.is_terminal())
            .cloned()
            .collect())
    }

    async fn get_item(&self, item_id: &str) -> Result<Option<FeedbackItem>, ClawmarkError> {
        Ok(self.inner.lock().await.items.get(item_id).cloned())
    }

    async fn set_adapter_mapping(&self, mapping: &AdapterMapping) -> Result<(), ClawmarkError> {
        let key = (
            mapping.item_id.clone(),
            mapping.adapter_type.clone(),
            mapping.channel.clone(),
        );
        self.inner.lock().await.mappings.insert(key, mapping.clone());
        Ok(())
    }

    async fn get_adapter_mapping(
        &self,
        item_id: &str,
        adapter_type: &str,
        channel: &str,
    ) -> Result<Option<AdapterMapping>, ClawmarkError> {
        let key = (item_id.to_string(), adapter_type.to_string(), channel.to_string());
        Ok(self.inner.lock().await.mappings.get(&key).cloned())
    }

    async fn reset_dispatch_entries(&self, filter: &ResetFilter) -> Result<u64, ClawmarkError> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let mut count = 0;
        for entry in inner.entries.iter_mut() {
            let resettable = matches!(entry.status, DispatchStatus::Failed | DispatchStatus::Exhausted);
            let id_ok = filter.entry_id.is_none_or(|id| id == entry.id);
            let item_ok = filter.item_id.as_deref().is_none_or(|item| item == entry.item_id);
            if resettable && id_ok && item_ok {
                entry.status = DispatchStatus::Pending;
                entry.retries = 0;
                entry.updated_at = now;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl RuleStore for InMemoryStore {
    async fn get_user_rules(&self, user_name: &str) -> Result<Vec<UserRule>, ClawmarkError> {
        if self.fail_rules.load(Ordering::SeqCst) {
            return Err(ClawmarkError::Internal("rule store unavailable".into()));
        }
        let mut rules: Vec<UserRule> = self
            .inner
            .lock()
            .await
            .rules
            .iter()
            .filter(|r| r.user_name == user_name)
            .cloned()
            .collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(rules)
    }
}
