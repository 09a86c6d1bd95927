// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lark / Feishu custom-bot webhook adapter.
//!
//! Lark answers HTTP 200 even for rejected messages; a non-zero `code` in
//! the response body is treated as a failure.

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

const LARK_HOSTS: &[&str] = &["open.feishu.cn", "open.larksuite.com"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LarkConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LarkReply {
    #[serde(default, alias = "StatusCode")]
    code: i64,
    #[serde(default, alias = "StatusMessage")]
    msg: Option<String>,
}

pub struct LarkAdapter {
    name: String,
    config: LarkConfig,
    endpoint: String,
    client: reqwest::Client,
}

impl LarkAdapter {
    pub fn new(name: &str, config: LarkConfig) -> Result<Self, ClawmarkError> {
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
impl DeliveryAdapter for LarkAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn adapter_type(&self) -> &str {
        target_types::LARK
    }

    fn channel_key(&self) -> String {
        non_empty(&self.config.webhook_url).unwrap_or_default().to_string()
    }

    fn validate(&self) -> Result<(), ClawmarkError> {
        let Some(raw) = non_empty(&self.config.webhook_url) else {
            return Err(ClawmarkError::validation(target_types::LARK, "missing `webhook_url`"));
        };
        let on_lark = http::http_url(raw).is_some_and(|url| {
            url.scheme() == "https" && url.host_str().is_some_and(|h| LARK_HOSTS.contains(&h))
        });
        if on_lark {
            Ok(())
        } else {
            Err(ClawmarkError::validation(
                target_types::LARK,
                format!("`webhook_url` must be an https URL on {}", LARK_HOSTS.join(" or ")),
            ))
        }
    }

    async fn send(
        &self,
        event: DispatchEvent,
        item: &FeedbackItem,
        ctx: &DispatchContext,
    ) -> Result<Option<ExternalRef>, ClawmarkError> {
        let body = json!({
            "msg_type": "text",
            "content": { "text": format::render_text(event, item, ctx) },
        });
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(http::request_failed)?;
        let response = http::ensure_success(response, "Lark webhook").await?;

        let reply: LarkReply = http::read_json(response, "Lark webhook").await?;
        if reply.code != 0 {
            return Err(ClawmarkError::transport(format!(
                "Lark webhook rejected message (code {}): {}",
                reply.code,
                reply.msg.unwrap_or_default()
            )));
        }
        Ok(None)
    }
}

pub struct LarkFactory;

impl AdapterFactory for LarkFactory {
    fn adapter_type(&self) -> &str {
        target_types::LARK
    }

    fn create(
        &self,
        name: &str,
        config: &serde_json::Value,
    ) -> Result<Arc<dyn DeliveryAdapter>, ClawmarkError> {
        let config: LarkConfig = http::parse_config(target_types::LARK, config)?;
        Ok(Arc::new(LarkAdapter::new(name, config)?))
    }
}
