// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram Bot API adapter (`sendMessage`).

use std::sync::Arc;

use async_trait::async_trait;
use clawmark_core::types::target_types;
use clawmark_core::{
    AdapterFactory, ClawmarkError, DeliveryAdapter, DispatchContext, DispatchEvent, ExternalRef,
    FeedbackItem,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::format;
use crate::http::{self, non_empty};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Numeric id or `@channelusername`.
    #[serde(default)]
    pub chat_id: Option<Value>,
    #[serde(default)]
    pub api_base: Option<String>,
}

impl TelegramConfig {
    fn chat_id(&self) -> Option<String> {
        match self.chat_id.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TelegramReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramAdapter {
    name: String,
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramAdapter {
    pub fn new(name: &str, config: TelegramConfig) -> Result<Self, ClawmarkError> {
        Ok(Self {
            name: name.to_string(),
            config,
            client: http::build_client()?,
        })
    }
}

#[async_trait]
impl DeliveryAdapter for TelegramAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn adapter_type(&self) -> &str {
        target_types::TELEGRAM
    }

    fn channel_key(&self) -> String {
        self.config.chat_id().unwrap_or_default()
    }

    fn validate(&self) -> Result<(), ClawmarkError> {
        if non_empty(&self.config.bot_token).is_none() {
            return Err(ClawmarkError::validation(target_types::TELEGRAM, "missing `bot_token`"));
        }
        if self.config.chat_id().is_none() {
            return Err(ClawmarkError::validation(target_types::TELEGRAM, "missing `chat_id`"));
        }
        if let Some(base) = non_empty(&self.config.api_base)
            && http::http_url(base).is_none()
        {
            return Err(ClawmarkError::validation(
                target_types::TELEGRAM,
                "`api_base` must be an http(s) URL",
            ));
        }
        Ok(())
    }

    async fn send(
        &self,
        event: DispatchEvent,
        item: &FeedbackItem,
        ctx: &DispatchContext,
    ) -> Result<Option<ExternalRef>, ClawmarkError> {
        let base = non_empty(&self.config.api_base)
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/');
        let token = non_empty(&self.config.bot_token).unwrap_or_default();
        let url = format!("{base}/bot{token}/sendMessage");
        let body = json!({
            "chat_id": self.config.chat_id(),
            "text": format::render_text(event, item, ctx),
            "disable_web_page_preview": true,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            // Errors would otherwise echo the token-bearing URL.
            .map_err(|e| http::request_failed(e.without_url()))?;
        let response = http::ensure_success(response, "Telegram sendMessage").await?;
        let reply: TelegramReply = http::read_json(response, "Telegram sendMessage").await?;
        if !reply.ok {
            return Err(ClawmarkError::transport(format!(
                "Telegram rejected message: {}",
                reply.description.unwrap_or_default()
            )));
        }
        Ok(None)
    }
}

pub struct TelegramFactory;

impl AdapterFactory for TelegramFactory {
    fn adapter_type(&self) -> &str {
        target_types::TELEGRAM
    }

    fn create(
        &self,
        name: &str,
        config: &serde_json::Value,
    ) -> Result<Arc<dyn DeliveryAdapter>, ClawmarkError> {
        let config: TelegramConfig = http::parse_config(target_types::TELEGRAM, config)?;
        Ok(Arc::new(TelegramAdapter::new(name, config)?))
    }
}
