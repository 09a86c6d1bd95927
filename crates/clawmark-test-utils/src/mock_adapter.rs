// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock delivery adapter for deterministic testing.
//!
//! Every adapter built by one [`MockAdapterFactory`] shares a single send
//! log and failure switches, so transient ad-hoc adapters can be observed
//! after the engine drops them.
//!
//! Recognized config keys:
//! - `key`: value returned by `channel_key()` (defaults to the name)
//! - `invalid`: when present, `validate()` fails with this message
//! - `fail`: when `true`, every send fails

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use clawmark_core::{
    AdapterFactory, ClawmarkError, DeliveryAdapter, DispatchContext, DispatchEvent, ExternalRef,
    FeedbackItem,
};
use serde_json::Value;
use tokio::sync::Mutex;

/// One captured `send` call.
#[derive(Debug, Clone)]
pub struct SentRecord {
    pub channel: String,
    pub event: DispatchEvent,
    pub item_id: String,
    pub config: Value,
    pub linked: Option<ExternalRef>,
}

#[derive(Debug, Default)]
struct MockState {
    sent: Mutex<Vec<SentRecord>>,
    fail_all: AtomicBool,
    fail_next: AtomicUsize,
    next_id: AtomicU64,
}

/// A mock adapter that records sends and returns synthetic external refs.
pub struct MockAdapter {
    name: String,
    adapter_type: String,
    config: Value,
    state: Arc<MockState>,
}

impl MockAdapter {
    /// Create a standalone mock adapter with its own log.
    pub fn new(name: &str, adapter_type: &str, config: Value) -> Self {
        Self {
            name: name.to_string(),
            adapter_type: adapter_type.to_string(),
            config,
            state: Arc::new(MockState::default()),
        }
    }

    pub async fn sent(&self) -> Vec<SentRecord> {
        self.state.sent.lock().await.clone()
    }
}

#[async_trait]
impl DeliveryAdapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn adapter_type(&self) -> &str {
        &self.adapter_type
    }

    fn channel_key(&self) -> String {
        self.config
            .get("key")
            .and_then(Value::as_str)
            .unwrap_or(self.name.as_str())
            .to_string()
    }

    fn validate(&self) -> Result<(), ClawmarkError> {
        match self.config.get("invalid").and_then(Value::as_str) {
            Some(reason) => Err(ClawmarkError::validation(&self.adapter_type, reason)),
            None => Ok(()),
        }
    }

    async fn send(
        &self,
        event: DispatchEvent,
        item: &FeedbackItem,
        ctx: &DispatchContext,
    ) -> Result<Option<ExternalRef>, ClawmarkError> {
        self.state.sent.lock().await.push(SentRecord {
            channel: self.name.clone(),
            event,
            item_id: item.id.clone(),
            config: self.config.clone(),
            linked: ctx.linked.clone(),
        });

        let fail_once = self
            .state
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let fail_config = self.config.get("fail").and_then(Value::as_bool) == Some(true);
        if fail_once || fail_config || self.state.fail_all.load(Ordering::SeqCst) {
            return Err(ClawmarkError::transport(format!(
                "mock {} delivery failed",
                self.name
            )));
        }

        if !event.is_creation() {
            return Ok(None);
        }
        let n = self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Some(ExternalRef {
            external_id: n.to_string(),
            external_url: Some(format!("https://mock.invalid/{}/{n}", self.adapter_type)),
        }))
    }
}

/// Factory producing [`MockAdapter`]s that share one log.
#[derive(Clone)]
pub struct MockAdapterFactory {
    adapter_type: String,
    state: Arc<MockState>,
}

impl MockAdapterFactory {
    pub fn new(adapter_type: &str) -> Self {
        Self {
            adapter_type: adapter_type.to_string(),
            state: Arc::new(MockState::default()),
        }
    }

    /// All sends made by adapters from this factory, in call order.
    pub async fn sent(&self) -> Vec<SentRecord> {
        self.state.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.state.sent.lock().await.len()
    }

    pub async fn clear_sent(&self) {
        self.state.sent.lock().await.clear();
    }

    /// Make every subsequent send fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.state.fail_all.store(failing, Ordering::SeqCst);
    }

    /// Fail the next `n` sends, then succeed.
    pub fn fail_next(&self, n: usize) {
        self.state.fail_next.store(n, Ordering::SeqCst);
    }
}

impl AdapterFactory for MockAdapterFactory {
    fn adapter_type(&self) -> &str {
        &self.adapter_type
    }

    fn create(&self, name: &str, config: &Value) -> Result<Arc<dyn DeliveryAdapter>, ClawmarkError> {
        Ok(Arc::new(MockAdapter {
            name: name.to_string(),
            adapter_type: self.adapter_type.clone(),
            config: config.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_item;
    use serde_json::json;

    #[tokio::test]
    async fn creation_returns_external_ref() {
        let adapter = MockAdapter::new("ops", "webhook", json!({}));
        let item = sample_item("item-1");
        let created = adapter
            .send(DispatchEvent::ItemCreated, &item, &DispatchContext::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.external_id, "1");

        let resolved = adapter
            .send(DispatchEvent::ItemResolved, &item, &DispatchContext::default())
            .await
            .unwrap();
        assert!(resolved.is_none());
        assert_eq!(adapter.sent().await.len(), 2);
    }

    #[tokio::test]
    async fn factory_adapters_share_the_log() {
        let factory = MockAdapterFactory::new("github-issue");
        let a = factory.create("a", &json!({})).unwrap();
        let b = factory.create("b", &json!({"key": "org/repo"})).unwrap();
        assert_eq!(b.channel_key(), "org/repo");

        let item = sample_item("item-1");
        a.send(DispatchEvent::ItemCreated, &item, &DispatchContext::default()).await.unwrap();
        b.send(DispatchEvent::ItemCreated, &item, &DispatchContext::default()).await.unwrap();
        let channels: Vec<_> = factory.sent().await.into_iter().map(|r| r.channel).collect();
        assert_eq!(channels, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn fail_next_then_recover() {
        let factory = MockAdapterFactory::new("slack");
        let adapter = factory.create("chat", &json!({})).unwrap();
        factory.fail_next(1);
        let item = sample_item("item-1");
        let ctx = DispatchContext::default();
        assert!(adapter.send(DispatchEvent::ItemCreated, &item, &ctx).await.is_err());
        assert!(adapter.send(DispatchEvent::ItemCreated, &item, &ctx).await.is_ok());
    }

    #[test]
    fn invalid_config_fails_validation() {
        let adapter = MockAdapter::new("bad", "slack", json!({"invalid": "missing webhook_url"}));
        let err = adapter.validate().unwrap_err();
        assert!(err.is_configuration());
    }
}
