// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! GitHub Issues adapter.
//!
//! `item.created` opens an issue and returns its number and URL. Later
//! events act on the linked issue: comment, close, reopen, or assign. Events
//! for items without a linked issue are skipped.

use std::sync::Arc;

use async_trait::async_trait;
use clawmark_core::types::target_types;
use clawmark_core::{
    AdapterFactory, ClawmarkError, DeliveryAdapter, DispatchContext, DispatchEvent, ExternalRef,
    FeedbackItem,
};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::format;
use crate::http::{self, non_empty};

const DEFAULT_API_BASE: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";

/// Settings for a `github-issue` channel or target.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GithubIssueConfig {
    /// `owner/repo`.
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    number: u64,
    html_url: Option<String>,
}

pub struct GithubIssueAdapter {
    name: String,
    config: GithubIssueConfig,
    client: reqwest::Client,
}

impl GithubIssueAdapter {
    pub fn new(name: &str, config: GithubIssueConfig) -> Result<Self, ClawmarkError> {
        Ok(Self {
            name: name.to_string(),
            config,
            client: http::build_client()?,
        })
    }

    fn repo(&self) -> &str {
        non_empty(&self.config.repo).unwrap_or_default()
    }

    fn api_base(&self) -> &str {
        non_empty(&self.config.api_base)
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
    }

    fn headers(&self) -> Result<HeaderMap, ClawmarkError> {
        let token = non_empty(&self.config.token).unwrap_or_default();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ClawmarkError::Config(format!("invalid GitHub token header: {e}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    fn issue_url(&self, number: &str) -> String {
        format!("{}/repos/{}/issues/{number}", self.api_base(), self.repo())
    }

    async fn create_issue(&self, item: &FeedbackItem) -> Result<ExternalRef, ClawmarkError> {
        let url = format!("{}/repos/{}/issues", self.api_base(), self.repo());
        let mut body = json!({
            "title": item.title,
            "body": format::issue_body(item),
        });
        if !self.config.labels.is_empty() {
            body["labels"] = json!(self.config.labels);
        }
        if !self.config.assignees.is_empty() {
            body["assignees"] = json!(self.config.assignees);
        }

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(http::request_failed)?;
        let response = http::ensure_success(response, "GitHub create issue").await?;
        let issue: CreatedIssue = http::read_json(response, "GitHub create issue").await?;

        debug!(repo = self.repo(), number = issue.number, "created GitHub issue");
        Ok(ExternalRef {
            external_id: issue.number.to_string(),
            external_url: issue.html_url,
        })
    }

    async fn call(
        &self,
        method: reqwest::Method,
        url: String,
        body: serde_json::Value,
        what: &str,
    ) -> Result<(), ClawmarkError> {
        let response = self
            .client
            .request(method, &url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(http::request_failed)?;
        http::ensure_success(response, what).await?;
        Ok(())
    }
}

#[async_trait]
impl DeliveryAdapter for GithubIssueAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn adapter_type(&self) -> &str {
        target_types::GITHUB_ISSUE
    }

    fn channel_key(&self) -> String {
        self.repo().to_string()
    }

    fn validate(&self) -> Result<(), ClawmarkError> {
        let fail = |msg: &str| Err(ClawmarkError::validation(target_types::GITHUB_ISSUE, msg));
        let Some(repo) = non_empty(&self.config.repo) else {
            return fail("missing `repo`");
        };
        if !is_owner_repo(repo) {
            return fail("`repo` must have the form owner/repo");
        }
        if non_empty(&self.config.token).is_none() {
            return fail("missing `token`");
        }
        if let Some(base) = non_empty(&self.config.api_base)
            && http::http_url(base).is_none()
        {
            return fail("`api_base` must be an http(s) URL");
        }
        Ok(())
    }

    async fn send(
        &self,
        event: DispatchEvent,
        item: &FeedbackItem,
        ctx: &DispatchContext,
    ) -> Result<Option<ExternalRef>, ClawmarkError> {
        if event.is_creation() {
            if let Some(linked) = &ctx.linked {
                debug!(repo = self.repo(), issue = %linked.external_id, "item already has an issue");
                return Ok(Some(linked.clone()));
            }
            return self.create_issue(item).await.map(Some);
        }

        let Some(linked) = &ctx.linked else {
            debug!(repo = self.repo(), item_id = %item.id, %event, "no linked issue, skipping");
            return Ok(None);
        };
        let number = linked.external_id.as_str();

        match event {
            DispatchEvent::DiscussionCreated => {
                let text = format::render_text(event, item, ctx);
                self.call(
                    reqwest::Method::POST,
                    format!("{}/comments", self.issue_url(number)),
                    json!({ "body": text }),
                    "GitHub comment",
                )
                .await?;
            }
            DispatchEvent::ItemResolved | DispatchEvent::ItemClosed => {
                let reason = if event == DispatchEvent::ItemResolved {
                    "completed"
                } else {
                    "not_planned"
                };
                self.call(
                    reqwest::Method::PATCH,
                    self.issue_url(number),
                    json!({ "state": "closed", "state_reason": reason }),
                    "GitHub close issue",
                )
                .await?;
            }
            DispatchEvent::ItemReopened => {
                self.call(
                    reqwest::Method::PATCH,
                    self.issue_url(number),
                    json!({ "state": "open" }),
                    "GitHub reopen issue",
                )
                .await?;
            }
            DispatchEvent::ItemAssigned => {
                let Some(assignee) = item.assignee.as_deref() else {
                    return Ok(None);
                };
                self.call(
                    reqwest::Method::POST,
                    format!("{}/assignees", self.issue_url(number)),
                    json!({ "assignees": [assignee] }),
                    "GitHub assign issue",
                )
                .await?;
            }
            DispatchEvent::ItemCreated => {}
        }
        Ok(None)
    }
}

/// `owner/repo` with no empty halves and no further slashes.
pub(crate) fn is_owner_repo(value: &str) -> bool {
    let mut parts = value.split('/');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty()
    )
}

pub struct GithubIssueFactory;

impl AdapterFactory for GithubIssueFactory {
    fn adapter_type(&self) -> &str {
        target_types::GITHUB_ISSUE
    }

    fn create(
        &self,
        name: &str,
        config: &serde_json::Value,
    ) -> Result<Arc<dyn DeliveryAdapter>, ClawmarkError> {
        let config: GithubIssueConfig = http::parse_config(target_types::GITHUB_ISSUE, config)?;
        Ok(Arc::new(GithubIssueAdapter::new(name, config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawmark_test_utils::sample_item;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(api_base: &str) -> GithubIssueAdapter {
        GithubIssueAdapter::new(
            "gh",
            GithubIssueConfig {
                repo: Some("coco-xyz/clawmark".into()),
                token: Some("ghp_test".into()),
                api_base: Some(api_base.into()),
                labels: vec!["feedback".into()],
                assignees: vec![],
            },
        )
        .unwrap()
    }

    fn linked(n: &str) -> DispatchContext {
        DispatchContext {
            linked: Some(ExternalRef {
                external_id: n.into(),
                external_url: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn validate_requires_repo_and_token() {
        let missing_token = GithubIssueAdapter::new(
            "gh",
            GithubIssueConfig {
                repo: Some("a/b".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(missing_token.validate().is_err());

        let bad_repo = GithubIssueAdapter::new(
            "gh",
            GithubIssueConfig {
                repo: Some("just-a-name".into()),
                token: Some("t".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(bad_repo.validate().is_err());

        assert!(adapter("https://api.github.com").validate().is_ok());
    }

    #[test]
    fn owner_repo_shape() {
        assert!(is_owner_repo("a/b"));
        assert!(!is_owner_repo("a/"));
        assert!(!is_owner_repo("a/b/c"));
        assert!(!is_owner_repo("ab"));
    }

    #[tokio::test]
    async fn created_event_opens_issue() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/coco-xyz/clawmark/issues"))
            .and(header("authorization", "Bearer ghp_test"))
            .and(body_partial_json(json!({
                "title": "Button label is truncated",
                "labels": ["feedback"]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "number": 42,
                "html_url": "https://github.com/coco-xyz/clawmark/issues/42"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = adapter(&server.uri())
            .send(DispatchEvent::ItemCreated, &sample_item("i1"), &DispatchContext::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.external_id, "42");
        assert_eq!(
            created.external_url.as_deref(),
            Some("https://github.com/coco-xyz/clawmark/issues/42")
        );
    }

    #[tokio::test]
    async fn created_event_with_linked_issue_does_not_duplicate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let result = adapter(&server.uri())
            .send(DispatchEvent::ItemCreated, &sample_item("i1"), &linked("7"))
            .await
            .unwrap();
        assert_eq!(result.unwrap().external_id, "7");
    }

    #[tokio::test]
    async fn resolved_event_closes_linked_issue() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/repos/coco-xyz/clawmark/issues/7"))
            .and(body_partial_json(json!({"state": "closed", "state_reason": "completed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let result = adapter(&server.uri())
            .send(DispatchEvent::ItemResolved, &sample_item("i1"), &linked("7"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn unlinked_update_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = adapter(&server.uri())
            .send(DispatchEvent::ItemClosed, &sample_item("i1"), &DispatchContext::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn error_status_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("Validation Failed"))
            .mount(&server)
            .await;

        let err = adapter(&server.uri())
            .send(DispatchEvent::ItemCreated, &sample_item("i1"), &DispatchContext::default())
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("422"), "{msg}");
        assert!(msg.contains("Validation Failed"), "{msg}");
    }

    #[tokio::test]
    async fn malformed_create_response_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = adapter(&server.uri())
            .send(DispatchEvent::ItemCreated, &sample_item("i1"), &DispatchContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn factory_rejects_wrong_shapes() {
        let err = GithubIssueFactory
            .create("gh", &json!({"labels": "not-a-list"}))
            .err()
            .unwrap();
        assert!(matches!(err, ClawmarkError::Config(_)));
    }
}
