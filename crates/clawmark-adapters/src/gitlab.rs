// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! GitLab Issues adapter.
//!
//! Same lifecycle as the GitHub adapter against `/api/v4/projects/:id/issues`.
//! GitLab assigns by numeric user id, so `item.assigned` posts a note
//! instead of changing the assignee.

use std::sync::Arc;

use async_trait::async_trait;
use clawmark_core::types::target_types;
use clawmark_core::{
    AdapterFactory, ClawmarkError, DeliveryAdapter, DispatchContext, DispatchEvent, ExternalRef,
    FeedbackItem,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::format;
use crate::http::{self, non_empty};

const DEFAULT_BASE_URL: &str = "https://gitlab.com";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitlabIssueConfig {
    /// `group/project` path (nested groups allowed) or numeric project id.
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    iid: u64,
    web_url: Option<String>,
}

pub struct GitlabIssueAdapter {
    name: String,
    config: GitlabIssueConfig,
    client: reqwest::Client,
}

impl GitlabIssueAdapter {
    pub fn new(name: &str, config: GitlabIssueConfig) -> Result<Self, ClawmarkError> {
        Ok(Self {
            name: name.to_string(),
            config,
            client: http::build_client()?,
        })
    }

    fn project(&self) -> &str {
        non_empty(&self.config.project).unwrap_or_default()
    }

    fn issues_url(&self) -> String {
        let base = non_empty(&self.config.base_url)
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        let project: String = url::form_urlencoded::byte_serialize(self.project().as_bytes()).collect();
        format!("{base}/api/v4/projects/{project}/issues")
    }

    async fn call(
        &self,
        method: reqwest::Method,
        url: String,
        body: serde_json::Value,
        what: &str,
    ) -> Result<reqwest::Response, ClawmarkError> {
        let response = self
            .client
            .request(method, &url)
            .header("PRIVATE-TOKEN", non_empty(&self.config.token).unwrap_or_default())
            .json(&body)
            .send()
            .await
            .map_err(http::request_failed)?;
        http::ensure_success(response, what).await
    }

    async fn note(&self, iid: &str, body: String) -> Result<(), ClawmarkError> {
        self.call(
            reqwest::Method::POST,
            format!("{}/{iid}/notes", self.issues_url()),
            json!({ "body": body }),
            "GitLab note",
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DeliveryAdapter for GitlabIssueAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn adapter_type(&self) -> &str {
        target_types::GITLAB_ISSUE
    }

    fn channel_key(&self) -> String {
        self.project().to_string()
    }

    fn validate(&self) -> Result<(), ClawmarkError> {
        let fail = |msg: &str| Err(ClawmarkError::validation(target_types::GITLAB_ISSUE, msg));
        let Some(project) = non_empty(&self.config.project) else {
            return fail("missing `project`");
        };
        let numeric = project.chars().all(|c| c.is_ascii_digit());
        let path = project.contains('/') && project.split('/').all(|s| !s.is_empty());
        if !numeric && !path {
            return fail("`project` must be a group/project path or a numeric id");
        }
        if non_empty(&self.config.token).is_none() {
            return fail("missing `token`");
        }
        if let Some(base) = non_empty(&self.config.base_url)
            && http::http_url(base).is_none()
        {
            return fail("`base_url` must be an http(s) URL");
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
                return Ok(Some(linked.clone()));
            }
            let mut body = json!({
                "title": item.title,
                "description": format::issue_body(item),
            });
            if !self.config.labels.is_empty() {
                body["labels"] = json!(self.config.labels.join(","));
            }
            let response = self
                .call(reqwest::Method::POST, self.issues_url(), body, "GitLab create issue")
                .await?;
            let issue: CreatedIssue = http::read_json(response, "GitLab create issue").await?;
            debug!(project = self.project(), iid = issue.iid, "created GitLab issue");
            return Ok(Some(ExternalRef {
                external_id: issue.iid.to_string(),
                external_url: issue.web_url,
            }));
        }

        let Some(linked) = &ctx.linked else {
            debug!(project = self.project(), item_id = %item.id, %event, "no linked issue, skipping");
            return Ok(None);
        };
        let iid = linked.external_id.as_str();

        match event {
            DispatchEvent::DiscussionCreated | DispatchEvent::ItemAssigned => {
                self.note(iid, format::render_text(event, item, ctx)).await?;
            }
            DispatchEvent::ItemResolved | DispatchEvent::ItemClosed | DispatchEvent::ItemReopened => {
                let state_event = if event == DispatchEvent::ItemReopened {
                    "reopen"
                } else {
                    "close"
                };
                self.call(
                    reqwest::Method::PUT,
                    format!("{}/{iid}", self.issues_url()),
                    json!({ "state_event": state_event }),
                    "GitLab update issue",
                )
                .await?;
            }
            DispatchEvent::ItemCreated => {}
        }
        Ok(None)
    }
}

pub struct GitlabIssueFactory;

impl AdapterFactory for GitlabIssueFactory {
    fn adapter_type(&self) -> &str {
        target_types::GITLAB_ISSUE
    }

    fn create(
        &self,
        name: &str,
        config: &serde_json::Value,
    ) -> Result<Arc<dyn DeliveryAdapter>, ClawmarkError> {
        let config: GitlabIssueConfig = http::parse_config(target_types::GITLAB_ISSUE, config)?;
        Ok(Arc::new(GitlabIssueAdapter::new(name, config)?))
    }
}
