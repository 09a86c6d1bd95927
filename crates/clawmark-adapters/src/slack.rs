// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slack incoming-webhook adapter.

use std::sync::Arc;

use async_trait::async_trait;
use clawmark_core::types::target_types;
use clawmark_core::{
    AdapterFactory, ClawmarkError, DeliveryAdapter, DispatchContext, DispatchEvent, ExternalRef,
    FeedbackItem,
};
use serde::Deserialize;
use serde_json::json;

use crate::format;
use crate::http::{self, non_empty};

const SLACK_HOST: &str = "hooks.slack.com";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Overrides the webhook's default channel.
    #[serde(default)]
    pub channel: Option<String>,
}

pub struct SlackAdapter {
    name: String,
    config: SlackConfig,
    endpoint: String,
    client: reqwest::Client,
}

impl SlackAdapter {
    pub fn new(name: &str, config: SlackConfig) -> Result<Self, ClawmarkError> {
        Ok(Self {
            name: name.to_string(),
            endpoint: non_empty(&config.webhook_url).unwrap_or_default().to_string(),
            config,
            client: http::build_client()?,
        })
    }

    /// Overrides the delivery endpoint (for testing with wiremock).
    #[cfg(test)]
    pub fn with_endpoint(mut self, url: String) -> Self {
        self.endpoint = url;
        self
    }
}

#[async_trait]
impl DeliveryAdapter for SlackAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn adapter_type(&self) -> &str {
        target_types::SLACK
    }

    fn channel_key(&self) -> String {
        non_empty(&self.config.webhook_url).unwrap_or_default().to_string()
    }

    fn validate(&self) -> Result<(), ClawmarkError> {
        let Some(raw) = non_empty(&self.config.webhook_url) else {
            return Err(ClawmarkError::validation(target_types::SLACK, "missing `webhook_url`"));
        };
        match http::http_url(raw) {
            Some(url) if url.scheme() == "https" && url.host_str() == Some(SLACK_HOST) => Ok(()),
            _ => Err(ClawmarkError::validation(
                target_types::SLACK,
                format!("`webhook_url` must be an https URL on {SLACK_HOST}"),
            )),
        }
    }

    async fn send(
        &self,
        event: DispatchEvent,
        item: &FeedbackItem,
        ctx: &DispatchContext,
    ) -> Result<Option<ExternalRef>, ClawmarkError> {
        let mut body = json!({ "text": format::render_text(event, item, ctx) });
        if let Some(channel) = non_empty(&self.config.channel) {
            body["channel"] = json!(channel);
        }
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(http::request_failed)?;
        http::ensure_success(response, "Slack webhook").await?;
        Ok(None)
    }
}

pub struct SlackFactory;

impl AdapterFactory for SlackFactory {
    fn adapter_type(&self) -> &str {
        target_types::SLACK
    }

    fn create(
        &self,
        name: &str,
        config: &serde_json::Value,
    ) -> Result<Arc<dyn DeliveryAdapter>, ClawmarkError> {
        let config: SlackConfig = http::parse_config(target_types::SLACK, config)?;
        Ok(Arc::new(SlackAdapter::new(name, config)?))
    }
}
