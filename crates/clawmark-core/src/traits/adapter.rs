// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery adapter contract implemented by every notification channel.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ClawmarkError;
use crate::types::{DispatchContext, DispatchEvent, ExternalRef, FeedbackItem};

/// A delivery channel for one external system type.
///
/// `validate` is called before first use; an adapter that fails validation
/// is never sent to. `send` must bound its own runtime and reject instead of
/// hanging.
#[async_trait]
pub trait DeliveryAdapter: Send + Sync + 'static {
    /// Channel name (or a synthetic name for ad-hoc targets).
    fn name(&self) -> &str;

    /// Type tag, e.g. `github-issue`.
    fn adapter_type(&self) -> &str;

    /// Stable identity of the external destination (repo, URL, chat id).
    fn channel_key(&self) -> String;

    /// Pure configuration check.
    fn validate(&self) -> Result<(), ClawmarkError>;

    /// Deliver `event` for `item`.
    ///
    /// Creation-type events return the external resource when the remote
    /// system assigns one.
    async fn send(
        &self,
        event: DispatchEvent,
        item: &FeedbackItem,
        ctx: &DispatchContext,
    ) -> Result<Option<ExternalRef>, ClawmarkError>;
}

/// Constructor for adapters of a single type tag.
pub trait AdapterFactory: Send + Sync {
    /// The type tag this factory produces.
    fn adapter_type(&self) -> &str;

    /// Build an adapter from per-type configuration. Does not validate.
    fn create(
        &self,
        name: &str,
        config: &serde_json::Value,
    ) -> Result<Arc<dyn DeliveryAdapter>, ClawmarkError>;
}
