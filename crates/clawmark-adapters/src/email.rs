// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP email adapter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clawmark_core::types::target_types;
use clawmark_core::{
    AdapterFactory, ClawmarkError, DeliveryAdapter, DispatchContext, DispatchEvent, ExternalRef,
    FeedbackItem,
};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use tracing::debug;

use crate::format;
use crate::http::non_empty;

/// Upper bound on one SMTP session.
pub const SMTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection security for the SMTP session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    #[default]
    Starttls,
    Tls,
    None,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default)]
    pub smtp_port: Option<u16>,
    #[serde(default)]
    pub security: SmtpSecurity,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Vec<String>,
}

pub struct EmailAdapter {
    name: String,
    config: EmailConfig,
}

impl EmailAdapter {
    pub fn new(name: &str, config: EmailConfig) -> Self {
        Self {
            name: name.to_string(),
            config,
        }
    }

    /// Builds the message for an event without sending it.
    pub fn build_message(
        &self,
        event: DispatchEvent,
        item: &FeedbackItem,
        ctx: &DispatchContext,
    ) -> Result<Message, ClawmarkError> {
        let from: Mailbox = non_empty(&self.config.from)
            .unwrap_or_default()
            .parse()
            .map_err(|e| ClawmarkError::validation(target_types::EMAIL, format!("bad `from`: {e}")))?;

        let mut builder = Message::builder()
            .from(from)
            .subject(format!("[Clawmark] {}", format::headline(event, item)))
            .header(ContentType::TEXT_PLAIN);
        for to in &self.config.to {
            let mailbox: Mailbox = to.trim().parse().map_err(|e| {
                ClawmarkError::validation(target_types::EMAIL, format!("bad recipient `{to}`: {e}"))
            })?;
            builder = builder.to(mailbox);
        }

        builder
            .body(format::render_text(event, item, ctx))
            .map_err(|e| ClawmarkError::Internal(format!("failed to build email: {e}")))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, ClawmarkError> {
        let host = non_empty(&self.config.smtp_host).unwrap_or_default();
        let smtp_err = |e: lettre::transport::smtp::Error| ClawmarkError::Transport {
            message: format!("SMTP setup failed: {e}"),
            source: Some(Box::new(e)),
        };

        let mut builder = match self.config.security {
            SmtpSecurity::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(smtp_err)?
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host).map_err(smtp_err)?,
            SmtpSecurity::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
        };
        if let Some(port) = self.config.smtp_port {
            builder = builder.port(port);
        }
        if let (Some(user), Some(pass)) = (
            non_empty(&self.config.username),
            self.config.password.as_deref(),
        ) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }
        Ok(builder.timeout(Some(SMTP_TIMEOUT)).build())
    }
}

#[async_trait]
impl DeliveryAdapter for EmailAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn adapter_type(&self) -> &str {
        target_types::EMAIL
    }

    fn channel_key(&self) -> String {
        self.config.to.join(",")
    }

    fn validate(&self) -> Result<(), ClawmarkError> {
        let fail = |msg: String| Err(ClawmarkError::validation(target_types::EMAIL, msg));
        if non_empty(&self.config.smtp_host).is_none() {
            return fail("missing `smtp_host`".into());
        }
        match non_empty(&self.config.from) {
            None => return fail("missing `from`".into()),
            Some(from) if from.parse::<Mailbox>().is_err() => {
                return fail(format!("`from` is not a valid address: {from}"));
            }
            Some(_) => {}
        }
        if self.config.to.is_empty() {
            return fail("`to` must list at least one recipient".into());
        }
        if let Some(bad) = self.config.to.iter().find(|to| to.trim().parse::<Mailbox>().is_err()) {
            return fail(format!("`to` contains an invalid address: {bad}"));
        }
        Ok(())
    }

    async fn send(
        &self,
        event: DispatchEvent,
        item: &FeedbackItem,
        ctx: &DispatchContext,
    ) -> Result<Option<ExternalRef>, ClawmarkError> {
        let message = self.build_message(event, item, ctx)?;
        let mailer = self.transport()?;
        mailer.send(message).await.map_err(|e| {
            if e.is_timeout() {
                ClawmarkError::Timeout {
                    duration: SMTP_TIMEOUT,
                }
            } else {
                ClawmarkError::Transport {
                    message: format!("SMTP delivery failed: {e}"),
                    source: Some(Box::new(e)),
                }
            }
        })?;
        debug!(channel = %self.name, %event, recipients = self.config.to.len(), "email sent");
        Ok(None)
    }
}

pub struct EmailFactory;

impl AdapterFactory for EmailFactory {
    fn adapter_type(&self) -> &str {
        target_types::EMAIL
    }

    fn create(
        &self,
        name: &str,
        config: &serde_json::Value,
    ) -> Result<Arc<dyn DeliveryAdapter>, ClawmarkError> {
        let config: EmailConfig = crate::http::parse_config(target_types::EMAIL, config)?;
        Ok(Arc::new(EmailAdapter::new(name, config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawmark_test_utils::sample_item;
    use serde_json::json;

    fn adapter(config: serde_json::Value) -> EmailAdapter {
        EmailAdapter::new("mail", serde_json::from_value(config).unwrap())
    }

    #[test]
    fn validate_checks_addresses() {
        let ok = adapter(json!({
            "smtp_host": "smtp.example.com",
            "from": "Clawmark <noreply@example.com>",
            "to": ["team@example.com"]
        }));
        assert!(ok.validate().is_ok());

        let no_to = adapter(json!({"smtp_host": "smtp.example.com", "from": "a@example.com"}));
        assert!(no_to.validate().is_err());

        let bad_to = adapter(json!({
            "smtp_host": "smtp.example.com",
            "from": "a@example.com",
            "to": ["not an address"]
        }));
        assert!(bad_to.validate().is_err());

        let no_host = adapter(json!({"from": "a@example.com", "to": ["b@example.com"]}));
        assert!(no_host.validate().is_err());
    }

    #[test]
    fn security_parses_lowercase() {
        let a = adapter(json!({"security": "tls"}));
        assert_eq!(a.config.security, SmtpSecurity::Tls);
        assert_eq!(adapter(json!({})).config.security, SmtpSecurity::Starttls);
    }

    #[test]
    fn message_carries_subject_and_recipients() {
        let a = adapter(json!({
            "smtp_host": "smtp.example.com",
            "from": "noreply@example.com",
            "to": ["a@example.com", "b@example.com"]
        }));
        let message = a
            .build_message(DispatchEvent::ItemCreated, &sample_item("i1"), &DispatchContext::default())
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: [Clawmark] New issue: Button label is truncated"));
        assert!(raw.contains("a@example.com"));
        assert!(raw.contains("b@example.com"));
        assert_eq!(message.envelope().to().len(), 2);
    }
}
