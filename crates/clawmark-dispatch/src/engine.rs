// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dispatch engine.
//!
//! Owns the configured channels and static rules and performs three kinds
//! of delivery:
//!
//! - [`DispatchEngine::dispatch`]: static rules to named channels, untracked
//! - [`DispatchEngine::dispatch_to_target`]: one resolved target through a
//!   transient adapter, falling back to static rules when the target is unusable
//! - [`DispatchEngine::dispatch_to_targets`]: many resolved targets, each
//!   tracked by a dispatch log entry created before any network call
//!
//! Every send first looks up the adapter mapping for the item so update
//! events reach the external resource created earlier, and every successful
//! creation upserts that mapping. Store failures are logged, never returned.
//!
//! A tracked entry is claimed while its send is in flight; the retry sweep
//! leaves claimed entries alone. A target that fails with a configuration
//! error is recorded as `exhausted` so it waits for an explicit reset.

use std::collections::BTreeMap;
use std::sync::Arc;

use clawmark_adapters::{AdapterCatalog, truncate_chars};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use clawmark_config::model::{DispatchConfig, StaticRuleConfig};
use clawmark_core::types::target_types;
use clawmark_core::{
    AdapterMapping, ClawmarkError, DeliveryAdapter, DispatchContext, DispatchEntry, DispatchEvent,
    DispatchStatus, DispatchStore, DispatchUpdate, ExternalRef, FeedbackItem, HealthStatus,
    NewDispatchEntry, ResetFilter, RoutingDecision, RoutingMethod, Target,
};
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::rules::matching_channels;

/// Longest `last_error` persisted on a dispatch log entry.
pub const MAX_ERROR_CHARS: usize = 500;

/// A configured, validated channel.
pub struct Channel {
    pub name: String,
    pub adapter_type: String,
    pub config: Value,
    pub adapter: Arc<dyn DeliveryAdapter>,
}

/// A channel dropped at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedChannel {
    pub name: String,
    pub adapter_type: String,
    pub reason: String,
}

/// Result of one [`DispatchEngine::load`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub channels_loaded: usize,
    pub channels_dropped: usize,
    pub rules_added: usize,
}

/// Outcome of one send.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub channel: String,
    pub adapter_type: String,
    pub result: Result<Option<ExternalRef>, String>,
}

impl DeliveryReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcome of [`DispatchEngine::dispatch_to_target`].
#[derive(Debug, Clone)]
pub enum TargetOutcome {
    /// The target was usable and a send was attempted.
    Delivered(DeliveryReport),
    /// The target could not be built or validated; static rules ran instead.
    FellBack {
        reason: String,
        reports: Vec<DeliveryReport>,
    },
}

/// Outcome of one target in [`DispatchEngine::dispatch_to_targets`].
#[derive(Debug, Clone)]
pub struct TrackedDelivery {
    /// `None` when the log entry could not be created.
    pub entry_id: Option<i64>,
    pub target: Target,
    pub method: RoutingMethod,
    pub status: DispatchStatus,
    pub external: Option<ExternalRef>,
    pub error: Option<String>,
}

/// Health of one channel for the status snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStatus {
    pub name: String,
    pub adapter_type: String,
    pub health: HealthStatus,
}

pub struct DispatchEngine {
    catalog: AdapterCatalog,
    store: Arc<dyn DispatchStore>,
    channels: BTreeMap<String, Channel>,
    dropped: Vec<DroppedChannel>,
    rules: Vec<StaticRuleConfig>,
    in_flight: DashMap<i64, ()>,
}

/// Marks a dispatch log entry as being sent. Released on drop.
pub(crate) struct InFlight<'a> {
    claims: &'a DashMap<i64, ()>,
    id: i64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.claims.remove(&self.id);
    }
}

impl DispatchEngine {
    pub fn new(catalog: AdapterCatalog, store: Arc<dyn DispatchStore>) -> Self {
        Self {
            catalog,
            store,
            channels: BTreeMap::new(),
            dropped: Vec::new(),
            rules: Vec::new(),
            in_flight: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn DispatchStore> {
        &self.store
    }

    /// Add channels and rules. Earlier rules are kept; a channel name seen
    /// again is rebuilt from the new settings.
    pub fn load(&mut self, config: &DispatchConfig) -> LoadSummary {
        let mut summary = LoadSummary::default();

        for (name, channel) in &config.channels {
            let settings = channel.settings_value();
            let built = self
                .catalog
                .create(&channel.adapter, name, &settings)
                .and_then(|adapter| adapter.validate().map(|()| adapter));

            self.dropped.retain(|d| &d.name != name);
            match built {
                Ok(adapter) => {
                    debug!(channel = %name, adapter = %channel.adapter, "channel loaded");
                    self.channels.insert(
                        name.clone(),
                        Channel {
                            name: name.clone(),
                            adapter_type: channel.adapter.clone(),
                            config: settings,
                            adapter,
                        },
                    );
                    summary.channels_loaded += 1;
                }
                Err(e) => {
                    warn!(channel = %name, adapter = %channel.adapter, error = %e, "dropping invalid channel");
                    self.channels.remove(name);
                    self.dropped.push(DroppedChannel {
                        name: name.clone(),
                        adapter_type: channel.adapter.clone(),
                        reason: e.to_string(),
                    });
                    summary.channels_dropped += 1;
                }
            }
        }

        self.rules.extend(config.rules.iter().cloned());
        summary.rules_added = config.rules.len();

        info!(
            loaded = summary.channels_loaded,
            dropped = summary.channels_dropped,
            rules = self.rules.len(),
            "dispatch configuration loaded"
        );
        summary
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    pub fn rules(&self) -> &[StaticRuleConfig] {
        &self.rules
    }

    /// Whether a send for this log entry is currently running.
    pub fn is_in_flight(&self, entry_id: i64) -> bool {
        self.in_flight.contains_key(&entry_id)
    }

    /// Claim an entry for sending. `None` if another send holds it.
    pub(crate) fn claim(&self, entry_id: i64) -> Option<InFlight<'_>> {
        match self.in_flight.entry(entry_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(InFlight {
                    claims: &self.in_flight,
                    id: entry_id,
                })
            }
        }
    }

    /// Deliver to every channel selected by the static rules, concurrently.
    ///
    /// Failures are logged and reported; they never stop other channels.
    pub async fn dispatch(
        &self,
        event: DispatchEvent,
        item: &FeedbackItem,
        ctx: &DispatchContext,
    ) -> Vec<DeliveryReport> {
        let selected = matching_channels(&self.rules, event, item);
        let channels: Vec<&Channel> = selected
            .iter()
            .filter_map(|name| {
                let channel = self.channels.get(name);
                if channel.is_none() {
                    debug!(channel = %name, "rule references an unavailable channel");
                }
                channel
            })
            .collect();

        if channels.is_empty() {
            debug!(%event, item_id = %item.id, "no static channel matched");
            return Vec::new();
        }

        let sends = channels.into_iter().map(|channel| async move {
            let result = self
                .deliver(channel.adapter.as_ref(), &channel.name, event, item, ctx)
                .await;
            if let Err(e) = &result {
                warn!(channel = %channel.name, %event, item_id = %item.id, error = %e, "static dispatch failed");
            }
            DeliveryReport {
                channel: channel.name.clone(),
                adapter_type: channel.adapter_type.clone(),
                result: result.map_err(|e| e.to_string()),
            }
        });
        join_all(sends).await
    }

    /// Deliver to one resolved target, or to the static channels if the
    /// target cannot be built or fails validation.
    pub async fn dispatch_to_target(
        &self,
        event: DispatchEvent,
        item: &FeedbackItem,
        target: &Target,
        ctx: &DispatchContext,
    ) -> TargetOutcome {
        let adapter = match self.build_target_adapter(target) {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!(
                    target_type = %target.target_type,
                    error = %e,
                    "target unusable, falling back to static dispatch"
                );
                let reports = self.dispatch(event, item, ctx).await;
                return TargetOutcome::FellBack {
                    reason: e.to_string(),
                    reports,
                };
            }
        };

        let key = adapter.channel_key();
        let result = self.deliver(adapter.as_ref(), &key, event, item, ctx).await;
        if let Err(e) = &result {
            warn!(target_type = %target.target_type, %event, item_id = %item.id, error = %e, "target dispatch failed");
        }
        TargetOutcome::Delivered(DeliveryReport {
            channel: key,
            adapter_type: target.target_type.clone(),
            result: result.map_err(|e| e.to_string()),
        })
    }

    /// Deliver to every resolved target with durable tracking.
    ///
    /// All log entries are created in `pending` before the first send. Each
    /// entry then becomes `sent` (retries 0), `failed` (retries 1), or
    /// `exhausted` (retries 1) when the target itself is unusable.
    pub async fn dispatch_to_targets(
        &self,
        event: DispatchEvent,
        item: &FeedbackItem,
        decisions: &[RoutingDecision],
        ctx: &DispatchContext,
    ) -> Vec<TrackedDelivery> {
        let mut entries = Vec::with_capacity(decisions.len());
        for decision in decisions {
            let new_entry = NewDispatchEntry {
                item_id: item.id.clone(),
                event,
                target: decision.target.clone(),
                method: decision.method,
            };
            let entry = match self.store.create_dispatch_entry(&new_entry).await {
                Ok(entry) => Some(entry.id),
                Err(e) => {
                    warn!(item_id = %item.id, target_type = %decision.target.target_type, error = %e, "failed to record dispatch entry");
                    None
                }
            };
            let claim = entry.and_then(|id| self.claim(id));
            entries.push((entry, claim));
        }

        let sends = decisions.iter().zip(entries).map(|(decision, (entry_id, claim))| async move {
            let result = self.deliver_to_target(event, item, &decision.target, ctx).await;
            let (status, external, error) = match result {
                Ok(external) => (DispatchStatus::Sent, external, None),
                Err(e) => {
                    let status = if e.is_configuration() {
                        DispatchStatus::Exhausted
                    } else {
                        DispatchStatus::Failed
                    };
                    warn!(
                        item_id = %item.id,
                        target_type = %decision.target.target_type,
                        method = %decision.method,
                        %status,
                        error = %e,
                        "tracked dispatch failed"
                    );
                    (status, None, Some(truncate_chars(&e.to_string(), MAX_ERROR_CHARS)))
                }
            };

            if let Some(id) = entry_id {
                let update = DispatchUpdate {
                    status,
                    retries: if status == DispatchStatus::Sent { 0 } else { 1 },
                    external: external.clone(),
                    last_error: error.clone(),
                };
                self.record(id, &update).await;
            }
            drop(claim);

            TrackedDelivery {
                entry_id,
                target: decision.target.clone(),
                method: decision.method,
                status,
                external,
                error,
            }
        });
        join_all(sends).await
    }

    /// Redeliver a logged entry's original event. Used by the retry sweep.
    pub async fn redeliver(
        &self,
        entry: &DispatchEntry,
        item: &FeedbackItem,
    ) -> Result<Option<ExternalRef>, ClawmarkError> {
        self.deliver_to_target(entry.event, item, &entry.target, &DispatchContext::default())
            .await
    }

    /// Channel health: loaded channels are healthy, dropped ones carry the reason.
    pub fn status(&self) -> Vec<ChannelStatus> {
        let mut statuses: Vec<ChannelStatus> = self
            .channels
            .values()
            .map(|c| ChannelStatus {
                name: c.name.clone(),
                adapter_type: c.adapter_type.clone(),
                health: HealthStatus::Healthy,
            })
            .chain(self.dropped.iter().map(|d| ChannelStatus {
                name: d.name.clone(),
                adapter_type: d.adapter_type.clone(),
                health: HealthStatus::Unhealthy(d.reason.clone()),
            }))
            .collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    /// Put matching `failed`/`exhausted` entries back to `pending`.
    pub async fn reset(&self, filter: &ResetFilter) -> Result<u64, ClawmarkError> {
        let count = self.store.reset_dispatch_entries(filter).await?;
        info!(
            entry_id = ?filter.entry_id,
            item_id = ?filter.item_id,
            count,
            "dispatch entries reset for retry"
        );
        Ok(count)
    }

    /// Build, validate, and send to a transient adapter. No fallback.
    async fn deliver_to_target(
        &self,
        event: DispatchEvent,
        item: &FeedbackItem,
        target: &Target,
        ctx: &DispatchContext,
    ) -> Result<Option<ExternalRef>, ClawmarkError> {
        let adapter = self.build_target_adapter(target)?;
        let key = adapter.channel_key();
        self.deliver(adapter.as_ref(), &key, event, item, ctx).await
    }

    fn build_target_adapter(&self, target: &Target) -> Result<Arc<dyn DeliveryAdapter>, ClawmarkError> {
        let config = self.inherit_credentials(target);
        let name = format!("adhoc:{}", target.target_type);
        let adapter = self.catalog.create(&target.target_type, &name, &config)?;
        adapter.validate()?;
        Ok(adapter)
    }

    /// Issue-tracker targets without a `token` borrow one from a configured
    /// channel of the same type.
    fn inherit_credentials(&self, target: &Target) -> Value {
        let mut config = target.target_config.clone();
        if !target_types::is_issue_tracker(&target.target_type) {
            return config;
        }
        let has_token = config
            .get("token")
            .and_then(Value::as_str)
            .is_some_and(|t| !t.trim().is_empty());
        if has_token {
            return config;
        }

        let donor = self.channels.values().find_map(|c| {
            (c.adapter_type == target.target_type)
                .then(|| c.config.get("token").and_then(Value::as_str))
                .flatten()
                .filter(|t| !t.trim().is_empty())
                .map(|t| (c.name.as_str(), t))
        });
        if let (Some((channel, token)), Some(map)) = (donor, config.as_object_mut()) {
            debug!(target_type = %target.target_type, channel, "inheriting credentials from channel");
            map.insert("token".to_string(), Value::String(token.to_string()));
        }
        config
    }

    /// Send with the item's existing mapping attached, then persist any new one.
    async fn deliver(
        &self,
        adapter: &dyn DeliveryAdapter,
        mapping_channel: &str,
        event: DispatchEvent,
        item: &FeedbackItem,
        ctx: &DispatchContext,
    ) -> Result<Option<ExternalRef>, ClawmarkError> {
        let adapter_type = adapter.adapter_type();
        let mut ctx = ctx.clone();
        match self
            .store
            .get_adapter_mapping(&item.id, adapter_type, mapping_channel)
            .await
        {
            Ok(Some(mapping)) => {
                ctx.linked = Some(ExternalRef {
                    external_id: mapping.external_id,
                    external_url: mapping.external_url,
                });
            }
            Ok(None) => {}
            Err(e) => {
                warn!(item_id = %item.id, adapter = adapter_type, error = %e, "failed to read adapter mapping");
            }
        }

        let external = adapter.send(event, item, &ctx).await?;

        if let Some(ext) = &external {
            let mapping = AdapterMapping {
                item_id: item.id.clone(),
                adapter_type: adapter_type.to_string(),
                channel: mapping_channel.to_string(),
                external_id: ext.external_id.clone(),
                external_url: ext.external_url.clone(),
            };
            if let Err(e) = self.store.set_adapter_mapping(&mapping).await {
                warn!(item_id = %item.id, adapter = adapter_type, error = %e, "failed to save adapter mapping");
            }
        }
        Ok(external)
    }

    pub(crate) async fn record(&self, id: i64, update: &DispatchUpdate) {
        if let Err(e) = self.store.update_dispatch_entry(id, update).await {
            warn!(entry_id = id, status = %update.status, error = %e, "failed to update dispatch entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawmark_config::model::{ChannelConfig, RuleMatch};
    use clawmark_test_utils::{InMemoryStore, MockAdapterFactory, sample_item};
    use serde_json::json;

    fn channel(adapter: &str, settings: Value) -> ChannelConfig {
        ChannelConfig {
            adapter: adapter.into(),
            settings: settings.as_object().cloned().unwrap_or_default(),
        }
    }

    fn engine_with(factory: &MockAdapterFactory) -> DispatchEngine {
        let mut catalog = AdapterCatalog::new();
        catalog.register(Arc::new(factory.clone()));
        DispatchEngine::new(catalog, Arc::new(InMemoryStore::new()))
    }

    #[test]
    fn invalid_and_unknown_channels_are_dropped() {
        let factory = MockAdapterFactory::new("webhook");
        let mut engine = engine_with(&factory);
        let mut config = DispatchConfig::default();
        config.channels.insert("good".into(), channel("webhook", json!({})));
        config.channels.insert("bad".into(), channel("webhook", json!({"invalid": "no url"})));
        config.channels.insert("mystery".into(), channel("pager", json!({})));

        let summary = engine.load(&config);
        assert_eq!(summary.channels_loaded, 1);
        assert_eq!(summary.channels_dropped, 2);

        let status = engine.status();
        let names: Vec<_> = status.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["bad", "good", "mystery"]);
        assert_eq!(status[1].health, HealthStatus::Healthy);
        assert!(matches!(&status[0].health, HealthStatus::Unhealthy(r) if r.contains("no url")));
        assert!(matches!(&status[2].health, HealthStatus::Unhealthy(r) if r.contains("pager")));
    }

    #[test]
    fn load_is_additive() {
        let factory = MockAdapterFactory::new("webhook");
        let mut engine = engine_with(&factory);

        let mut first = DispatchConfig::default();
        first.channels.insert("a".into(), channel("webhook", json!({})));
        first.rules.push(StaticRuleConfig {
            criteria: RuleMatch::default(),
            channels: vec!["a".into()],
        });
        engine.load(&first);

        let mut second = DispatchConfig::default();
        second.channels.insert("b".into(), channel("webhook", json!({})));
        second.rules.push(StaticRuleConfig {
            criteria: RuleMatch::default(),
            channels: vec!["b".into()],
        });
        engine.load(&second);

        assert_eq!(engine.rules().len(), 2);
        assert!(engine.channel("a").is_some());
        assert!(engine.channel("b").is_some());
    }

    #[test]
    fn reloading_a_dropped_channel_clears_it() {
        let factory = MockAdapterFactory::new("webhook");
        let mut engine = engine_with(&factory);

        let mut broken = DispatchConfig::default();
        broken.channels.insert("a".into(), channel("webhook", json!({"invalid": "x"})));
        engine.load(&broken);

        let mut fixed = DispatchConfig::default();
        fixed.channels.insert("a".into(), channel("webhook", json!({})));
        engine.load(&fixed);

        let status = engine.status();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].health, HealthStatus::Healthy);
    }

    #[test]
    fn token_is_inherited_for_issue_trackers_only() {
        let github = MockAdapterFactory::new("github-issue");
        let mut engine = engine_with(&github);
        let mut config = DispatchConfig::default();
        config
            .channels
            .insert("gh".into(), channel("github-issue", json!({"repo": "a/b", "token": "tok"})));
        engine.load(&config);

        let inherited = engine.inherit_credentials(&Target::new("github-issue", json!({"repo": "c/d"})));
        assert_eq!(inherited["token"], "tok");
        assert_eq!(inherited["repo"], "c/d");

        let explicit = engine.inherit_credentials(&Target::new(
            "github-issue",
            json!({"repo": "c/d", "token": "mine"}),
        ));
        assert_eq!(explicit["token"], "mine");

        let webhook = engine.inherit_credentials(&Target::new("webhook", json!({"url": "x"})));
        assert!(webhook.get("token").is_none());

        let gitlab = engine.inherit_credentials(&Target::new("gitlab-issue", json!({"project": "p/q"})));
        assert!(gitlab.get("token").is_none());
    }

    #[tokio::test]
    async fn dispatch_without_matching_rules_sends_nothing() {
        let factory = MockAdapterFactory::new("webhook");
        let engine = engine_with(&factory);
        let reports = engine
            .dispatch(DispatchEvent::ItemCreated, &sample_item("i1"), &DispatchContext::default())
            .await;
        assert!(reports.is_empty());
        assert_eq!(factory.sent_count().await, 0);
    }
}
