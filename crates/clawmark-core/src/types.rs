// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the resolver, adapters, stores, and dispatch engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Canonical adapter type tags.
pub mod target_types {
    pub const GITHUB_ISSUE: &str = "github-issue";
    pub const GITLAB_ISSUE: &str = "gitlab-issue";
    pub const WEBHOOK: &str = "webhook";
    pub const SLACK: &str = "slack";
    pub const LARK: &str = "lark";
    pub const TELEGRAM: &str = "telegram";
    pub const EMAIL: &str = "email";

    /// Issue-tracker adapters create an external resource per item and may
    /// inherit credentials from a configured channel of the same type.
    pub fn is_issue_tracker(target_type: &str) -> bool {
        matches!(target_type, GITHUB_ISSUE | GITLAB_ISSUE)
    }
}

/// A resolved delivery destination.
///
/// `target_config` is opaque to the resolver; only the adapter for
/// `target_type` interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub target_type: String,
    #[serde(default = "empty_object")]
    pub target_config: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Target {
    pub fn new(target_type: impl Into<String>, target_config: serde_json::Value) -> Self {
        Self {
            target_type: target_type.into(),
            target_config,
        }
    }

    /// Returns a string field from the target config.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.target_config.get(key).and_then(|v| v.as_str())
    }

    /// True when the config is an object with at least one key.
    pub fn has_config(&self) -> bool {
        self.target_config
            .as_object()
            .is_some_and(|map| !map.is_empty())
    }
}

/// Events emitted by the feedback layer that may trigger delivery.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum DispatchEvent {
    #[strum(serialize = "item.created")]
    #[serde(rename = "item.created")]
    ItemCreated,
    #[strum(serialize = "item.resolved")]
    #[serde(rename = "item.resolved")]
    ItemResolved,
    #[strum(serialize = "item.closed")]
    #[serde(rename = "item.closed")]
    ItemClosed,
    #[strum(serialize = "item.reopened")]
    #[serde(rename = "item.reopened")]
    ItemReopened,
    #[strum(serialize = "item.assigned")]
    #[serde(rename = "item.assigned")]
    ItemAssigned,
    #[strum(serialize = "discussion.created")]
    #[serde(rename = "discussion.created")]
    DiscussionCreated,
}

impl DispatchEvent {
    pub const ALL: [DispatchEvent; 6] = [
        DispatchEvent::ItemCreated,
        DispatchEvent::ItemResolved,
        DispatchEvent::ItemClosed,
        DispatchEvent::ItemReopened,
        DispatchEvent::ItemAssigned,
        DispatchEvent::DiscussionCreated,
    ];

    /// Creation-type events are the only ones that produce an external resource.
    pub fn is_creation(&self) -> bool {
        matches!(self, DispatchEvent::ItemCreated)
    }
}

/// A feedback item as seen by the delivery subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub id: String,
    pub app_id: String,
    #[serde(default)]
    pub source_url: Option<String>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub priority: String,
    pub status: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_by: String,
    #[serde(default)]
    pub assignee: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Pointer to a resource created in an external system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRef {
    pub external_id: String,
    pub external_url: Option<String>,
}

/// Per-call context passed alongside an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchContext {
    /// Who triggered the event.
    #[serde(default)]
    pub actor: Option<String>,
    /// Free-form message, e.g. the body of a new discussion entry.
    #[serde(default)]
    pub message: Option<String>,
    /// External resource previously created for this item by the same
    /// adapter/channel. Filled in by the dispatch engine before `send`.
    #[serde(default)]
    pub linked: Option<ExternalRef>,
}

/// How a target was chosen by the routing resolver.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RoutingMethod {
    TargetDeclaration,
    UserRule,
    GithubAuto,
    UserDefault,
    SystemDefault,
}

/// Outcome of routing resolution, kept for auditability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    #[serde(flatten)]
    pub target: Target,
    pub method: RoutingMethod,
    #[serde(default)]
    pub matched_rule: Option<i64>,
}

/// Kind of a per-user routing rule.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    UrlPattern,
    ContentType,
    TagMatch,
    Default,
}

/// A persisted per-user routing rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRule {
    pub id: i64,
    pub user_name: String,
    pub rule_type: RuleType,
    #[serde(default)]
    pub pattern: Option<String>,
    pub target_type: String,
    pub target_config: serde_json::Value,
    pub priority: i64,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRule {
    pub fn target(&self) -> Target {
        Target::new(self.target_type.clone(), self.target_config.clone())
    }
}

/// Lifecycle status of a dispatch log entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Pending,
    Sent,
    Failed,
    Exhausted,
    Cancelled,
}

impl DispatchStatus {
    /// Terminal entries are never picked up by the retry sweep.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DispatchStatus::Sent | DispatchStatus::Exhausted | DispatchStatus::Cancelled
        )
    }
}

/// A persisted record of one delivery's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchEntry {
    pub id: i64,
    pub item_id: String,
    pub event: DispatchEvent,
    #[serde(flatten)]
    pub target: Target,
    pub method: RoutingMethod,
    pub status: DispatchStatus,
    pub retries: u32,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub external_url: Option<String>,
    #[serde(default)]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create a dispatch log entry in `pending` status.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDispatchEntry {
    pub item_id: String,
    pub event: DispatchEvent,
    pub target: Target,
    pub method: RoutingMethod,
}

/// Mutation applied to a dispatch log entry after an attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchUpdate {
    pub status: DispatchStatus,
    pub retries: u32,
    pub external: Option<ExternalRef>,
    pub last_error: Option<String>,
}

/// Selects entries for the manual reset operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetFilter {
    pub entry_id: Option<i64>,
    pub item_id: Option<String>,
}

/// Durable link between an item and the resource an adapter created for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterMapping {
    pub item_id: String,
    pub adapter_type: String,
    pub channel: String,
    pub external_id: String,
    #[serde(default)]
    pub external_url: Option<String>,
}

/// Health status reported for a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    /// Channel is configured and passed validation.
    Healthy,
    /// Channel was dropped at load time.
    Unhealthy(String),
}
