// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generic JSON webhook adapter.
//!
//! Posts `{event, item, context, timestamp}`. When a `secret` is configured
//! the raw body is signed with HMAC-SHA256 and sent as
//! `X-Clawmark-Signature: sha256=<hex>`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use clawmark_core::types::target_types;
use clawmark_core::{
    AdapterFactory, ClawmarkError, DeliveryAdapter, DispatchContext, DispatchEvent, ExternalRef,
    FeedbackItem,
};
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tracing::debug;

use crate::http::{self, non_empty};

pub const SIGNATURE_HEADER: &str = "X-Clawmark-Signature";
pub const EVENT_HEADER: &str = "X-Clawmark-Event";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
}

pub struct WebhookAdapter {
    name: String,
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookAdapter {
    pub fn new(name: &str, config: WebhookConfig) -> Result<Self, ClawmarkError> {
        Ok(Self {
            name: name.to_string(),
            config,
            client: http::build_client()?,
        })
    }
}

/// Hex HMAC-SHA256 of `payload` under `secret`.
pub fn sign_payload(secret: &[u8], payload: &[u8]) -> Result<String, ClawmarkError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret)
        .map_err(|e| ClawmarkError::Internal(format!("HMAC key rejected: {e}")))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl DeliveryAdapter for WebhookAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn adapter_type(&self) -> &str {
        target_types::WEBHOOK
    }

    fn channel_key(&self) -> String {
        non_empty(&self.config.url).unwrap_or_default().to_string()
    }

    fn validate(&self) -> Result<(), ClawmarkError> {
        match non_empty(&self.config.url) {
            None => Err(ClawmarkError::validation(target_types::WEBHOOK, "missing `url`")),
            Some(url) if http::http_url(url).is_none() => Err(ClawmarkError::validation(
                target_types::WEBHOOK,
                "`url` must be an http(s) URL",
            )),
            Some(_) => Ok(()),
        }
    }

    async fn send(
        &self,
        event: DispatchEvent,
        item: &FeedbackItem,
        ctx: &DispatchContext,
    ) -> Result<Option<ExternalRef>, ClawmarkError> {
        let url = non_empty(&self.config.url).unwrap_or_default();
        let payload = json!({
            "event": event,
            "item": item,
            "context": {
                "actor": ctx.actor,
                "message": ctx.message,
                "linked": ctx.linked,
            },
            "timestamp": Utc::now().to_rfc3339(),
        });
        let body = serde_json::to_vec(&payload)
            .map_err(|e| ClawmarkError::Internal(format!("failed to encode webhook payload: {e}")))?;

        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(EVENT_HEADER, event.to_string());
        if let Some(secret) = non_empty(&self.config.secret) {
            let signature = sign_payload(secret.as_bytes(), &body)?;
            request = request.header(SIGNATURE_HEADER, format!("sha256={signature}"));
        }

        let response = request.body(body).send().await.map_err(http::request_failed)?;
        http::ensure_success(response, "webhook").await?;
        debug!(channel = %self.name, %event, "webhook delivered");
        Ok(None)
    }
}

pub struct WebhookFactory;

impl AdapterFactory for WebhookFactory {
    fn adapter_type(&self) -> &str {
        target_types::WEBHOOK
    }

    fn create(
        &self,
        name: &str,
        config: &serde_json::Value,
    ) -> Result<Arc<dyn DeliveryAdapter>, ClawmarkError> {
        let config: WebhookConfig = http::parse_config(target_types::WEBHOOK, config)?;
        Ok(Arc::new(WebhookAdapter::new(name, config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawmark_test_utils::sample_item;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(url: &str, secret: Option<&str>) -> WebhookAdapter {
        WebhookAdapter::new(
            "hook",
            WebhookConfig {
                url: Some(url.into()),
                secret: secret.map(String::from),
            },
        )
        .unwrap()
    }

    #[test]
    fn signature_is_stable_hex() {
        let a = sign_payload(b"secret", b"{}").unwrap();
        let b = sign_payload(b"secret", b"{}").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, sign_payload(b"other", b"{}").unwrap());
    }

    #[test]
    fn validate_requires_http_url() {
        assert!(adapter("https://hooks.example.com/in", None).validate().is_ok());
        assert!(adapter("mailto:x@y", None).validate().is_err());
        assert!(adapter("  ", None).validate().is_err());
    }

    #[tokio::test]
    async fn signed_payload_is_posted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/in"))
            .and(header(EVENT_HEADER, "item.created"))
            .and(header_exists(SIGNATURE_HEADER))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let result = adapter(&format!("{}/in", server.uri()), Some("s3cret"))
            .send(DispatchEvent::ItemCreated, &sample_item("i1"), &DispatchContext::default())
            .await
            .unwrap();
        assert!(result.is_none());

        let requests = server.received_requests().await.unwrap();
        let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(sent["event"], "item.created");
        assert_eq!(sent["item"]["id"], "i1");
        assert_eq!(sent["item"]["type"], "issue");

        let signature = requests[0]
            .headers
            .get(SIGNATURE_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let expected = sign_payload(b"s3cret", &requests[0].body).unwrap();
        assert_eq!(signature, format!("sha256={expected}"));
    }

    #[tokio::test]
    async fn server_error_rejects() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = adapter(&server.uri(), None)
            .send(DispatchEvent::ItemClosed, &sample_item("i1"), &DispatchContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
