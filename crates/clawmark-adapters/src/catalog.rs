// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter catalog: type tag to constructor.
//!
//! The dispatch engine builds every channel and ad-hoc target through the
//! catalog. Tests swap in mock factories with [`AdapterCatalog::register`].

use std::collections::HashMap;
use std::sync::Arc;

use clawmark_core::{AdapterFactory, ClawmarkError, DeliveryAdapter};

use crate::email::EmailFactory;
use crate::github::GithubIssueFactory;
use crate::gitlab::GitlabIssueFactory;
use crate::lark::LarkFactory;
use crate::slack::SlackFactory;
use crate::telegram::TelegramFactory;
use crate::webhook::WebhookFactory;

/// Registry of adapter factories keyed by type tag.
#[derive(Default)]
pub struct AdapterCatalog {
    factories: HashMap<String, Arc<dyn AdapterFactory>>,
}

impl AdapterCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog with every built-in adapter registered.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register(Arc::new(GithubIssueFactory));
        catalog.register(Arc::new(GitlabIssueFactory));
        catalog.register(Arc::new(WebhookFactory));
        catalog.register(Arc::new(SlackFactory));
        catalog.register(Arc::new(LarkFactory));
        catalog.register(Arc::new(TelegramFactory));
        catalog.register(Arc::new(EmailFactory));
        catalog
    }

    /// Register a factory under its own type tag, replacing any previous one.
    pub fn register(&mut self, factory: Arc<dyn AdapterFactory>) {
        self.factories
            .insert(factory.adapter_type().to_string(), factory);
    }

    pub fn contains(&self, adapter_type: &str) -> bool {
        self.factories.contains_key(adapter_type)
    }

    /// Registered type tags, sorted.
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Build an (unvalidated) adapter.
    pub fn create(
        &self,
        adapter_type: &str,
        name: &str,
        config: &serde_json::Value,
    ) -> Result<Arc<dyn DeliveryAdapter>, ClawmarkError> {
        let factory = self.factories.get(adapter_type).ok_or_else(|| {
            ClawmarkError::Config(format!("unknown adapter type `{adapter_type}`"))
        })?;
        factory.create(name, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawmark_test_utils::MockAdapterFactory;
    use serde_json::json;

    #[test]
    fn builtins_cover_every_target_type() {
        let catalog = AdapterCatalog::with_builtins();
        assert_eq!(
            catalog.types(),
            vec!["email", "github-issue", "gitlab-issue", "lark", "slack", "telegram", "webhook"]
        );
    }

    #[test]
    fn unknown_type_is_config_error() {
        let catalog = AdapterCatalog::with_builtins();
        let err = catalog.create("pager", "p", &json!({})).err().unwrap();
        assert!(matches!(err, ClawmarkError::Config(msg) if msg.contains("pager")));
    }

    #[test]
    fn registered_mock_replaces_builtin() {
        let mut catalog = AdapterCatalog::with_builtins();
        catalog.register(Arc::new(MockAdapterFactory::new("slack")));
        let adapter = catalog.create("slack", "chat", &json!({})).unwrap();
        // The mock accepts an empty config; the real Slack adapter would not.
        assert!(adapter.validate().is_ok());
    }

    #[test]
    fn builtin_adapters_report_their_type() {
        let catalog = AdapterCatalog::with_builtins();
        let adapter = catalog
            .create("webhook", "ops", &json!({"url": "https://hooks.example.com"}))
            .unwrap();
        assert_eq!(adapter.adapter_type(), "webhook");
        assert_eq!(adapter.name(), "ops");
        assert_eq!(adapter.channel_key(), "https://hooks.example.com");
    }
}
