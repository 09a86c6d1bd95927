// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Site-declared delivery targets.
//!
//! A page can publish its preferred target in a manifest under its origin
//! (by default `/.well-known/clawmark.json`):
//!
//! ```json
//! { "adapter": "github-issue", "target": "coco-xyz/clawmark", "labels": ["feedback"] }
//! ```
//!
//! [`DeclarationFetcher`] fetches and validates that manifest and caches
//! the outcome per source URL: valid declarations for the positive TTL,
//! missing/invalid/unreachable ones for the shorter negative TTL. Nothing
//! here ever returns an error to the caller; failure reads as "no
//! declaration".

use std::time::{Duration, Instant};

use clawmark_config::model::DeclarationConfig;
use clawmark_core::Target;
use clawmark_core::types::target_types;
use dashmap::DashMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::guard;

/// Upper bound on `labels` / `assignees` entries taken from a manifest.
pub const MAX_LIST_ENTRIES: usize = 10;

#[derive(Debug, Clone)]
struct CacheEntry {
    declaration: Option<Target>,
    expires_at: Instant,
}

/// Fetches, validates, and caches site declarations.
pub struct DeclarationFetcher {
    client: reqwest::Client,
    config: DeclarationConfig,
    positive_ttl: Duration,
    negative_ttl: Duration,
    cache: DashMap<String, CacheEntry>,
}

impl DeclarationFetcher {
    pub fn new(config: DeclarationConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("clawmark/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            positive_ttl: Duration::from_secs(config.positive_ttl_secs),
            negative_ttl: Duration::from_secs(config.negative_ttl_secs),
            config,
            cache: DashMap::new(),
        }
    }

    /// Override the cache lifetimes.
    pub fn with_ttls(mut self, positive: Duration, negative: Duration) -> Self {
        self.positive_ttl = positive;
        self.negative_ttl = negative;
        self
    }

    /// The declared target for `source_url`, if the site publishes a valid one.
    pub async fn resolve(&self, source_url: &str) -> Option<Target> {
        if !self.config.enabled || source_url.trim().is_empty() {
            return None;
        }

        if let Some(entry) = self.cache.get(source_url)
            && entry.expires_at > Instant::now()
        {
            return entry.declaration.clone();
        }

        let declaration = self.fetch(source_url).await;
        let ttl = if declaration.is_some() {
            self.positive_ttl
        } else {
            self.negative_ttl
        };
        let now = Instant::now();
        self.cache.retain(|_, entry| entry.expires_at > now);
        self.cache.insert(
            source_url.to_string(),
            CacheEntry {
                declaration: declaration.clone(),
                expires_at: now + ttl,
            },
        );
        declaration
    }

    /// Drop any cached result for `source_url`.
    pub fn invalidate(&self, source_url: &str) {
        self.cache.remove(source_url);
    }

    /// Number of cached source URLs. Expired entries linger until the next fetch.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    async fn fetch(&self, source_url: &str) -> Option<Target> {
        let Some(origin) = guard::parse_public_http_url(source_url, self.config.allow_private_hosts)
        else {
            debug!(source_url, "declaration lookup skipped: unsupported or private source");
            return None;
        };
        let manifest_url = origin.join(&self.config.manifest_path).ok()?;

        let response = match self.client.get(manifest_url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %manifest_url, error = %e, "declaration fetch failed");
                return None;
            }
        };
        if !response.status().is_success() {
            debug!(url = %manifest_url, status = %response.status(), "no declaration published");
            return None;
        }

        let manifest: Value = match response.json().await {
            Ok(manifest) => manifest,
            Err(e) => {
                debug!(url = %manifest_url, error = %e, "declaration is not valid JSON");
                return None;
            }
        };

        let declaration = validate_declaration(&manifest, self.config.allow_private_hosts);
        if declaration.is_none() {
            debug!(url = %manifest_url, "declaration rejected by validation");
        }
        declaration
    }
}

/// Map a declared adapter name to its canonical type tag.
pub fn canonical_adapter(name: &str) -> Option<&'static str> {
    match name.trim().to_ascii_lowercase().as_str() {
        "github-issue" | "github-issues" | "github" => Some(target_types::GITHUB_ISSUE),
        "gitlab-issue" | "gitlab-issues" | "gitlab" => Some(target_types::GITLAB_ISSUE),
        "webhook" => Some(target_types::WEBHOOK),
        "slack" => Some(target_types::SLACK),
        "lark" | "feishu" => Some(target_types::LARK),
        _ => None,
    }
}

/// Validate a parsed manifest and turn it into a target.
pub fn validate_declaration(manifest: &Value, allow_private_hosts: bool) -> Option<Target> {
    let adapter = canonical_adapter(manifest.get("adapter")?.as_str()?)?;
    let mut config = Map::new();

    match adapter {
        target_types::GITHUB_ISSUE | target_types::GITLAB_ISSUE => {
            let target = manifest.get("target")?.as_str()?.trim();
            if !is_repo_slug(target) {
                return None;
            }
            let key = if adapter == target_types::GITHUB_ISSUE {
                "repo"
            } else {
                "project"
            };
            config.insert(key.to_string(), Value::String(target.to_string()));
            for list in ["labels", "assignees"] {
                if let Some(values) = string_list(manifest.get(list)) {
                    config.insert(list.to_string(), values);
                }
            }
        }
        _ => {
            let raw = manifest
                .get("url")
                .or_else(|| manifest.get("webhook_url"))?
                .as_str()?;
            let url = guard::parse_public_http_url(raw, allow_private_hosts)?;
            let key = if adapter == target_types::WEBHOOK {
                "url"
            } else {
                "webhook_url"
            };
            config.insert(key.to_string(), Value::String(url.to_string()));
        }
    }

    Some(Target::new(adapter, Value::Object(config)))
}

/// `owner/repo` with conservative character rules on both halves.
pub fn is_repo_slug(value: &str) -> bool {
    let Some((owner, repo)) = value.split_once('/') else {
        return false;
    };
    let valid = |s: &str| {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    valid(owner) && valid(repo)
}

fn string_list(value: Option<&Value>) -> Option<Value> {
    let items: Vec<Value> = value?
        .as_array()?
        .iter()
        .filter(|v| v.is_string())
        .take(MAX_LIST_ENTRIES)
        .cloned()
        .collect();
    Some(Value::Array(items))
}
