// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered target resolution.
//!
//! Priority, first match wins:
//! 1. site declaration (`target_declaration`)
//! 2. enabled non-default user rule, highest priority first (`user_rule`)
//! 3. GitHub repository in the source URL (`github_auto`)
//! 4. enabled `default` user rule (`user_default`)
//! 5. caller-supplied default (`system_default`)
//!
//! [`resolve_target`] and [`resolve_targets`] are pure. [`RoutingResolver`]
//! gathers their inputs from the rule store and the declaration fetcher.

use std::sync::Arc;

use clawmark_core::types::target_types;
use clawmark_core::{FeedbackItem, RoutingDecision, RoutingMethod, RuleStore, RuleType, Target, UserRule};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::declaration::DeclarationFetcher;
use crate::pattern::matches_url_pattern;
use crate::repo::extract_github_repo;

/// Everything the resolver looks at.
#[derive(Debug, Clone)]
pub struct RoutingInput {
    pub source_url: Option<String>,
    pub user_name: String,
    pub item_type: String,
    pub priority: String,
    pub tags: Vec<String>,
    pub declaration: Option<Target>,
    pub user_rules: Vec<UserRule>,
    pub default_target: Target,
}

/// Pick a single target for the input.
pub fn resolve_target(input: &RoutingInput) -> RoutingDecision {
    if let Some(decision) = declared(input) {
        return decision;
    }

    let rules = rules_by_priority(&input.user_rules);

    if let Some(rule) = rules.iter().find(|r| rule_matches(r, input)) {
        return from_rule(rule, RoutingMethod::UserRule);
    }

    if let Some(decision) = github_auto(input) {
        return decision;
    }

    if let Some(rule) = rules
        .iter()
        .find(|r| r.enabled && r.rule_type == RuleType::Default)
    {
        return from_rule(rule, RoutingMethod::UserDefault);
    }

    system_default(input)
}

/// Every relevant target, deduplicated by `(target_type, target_config)`.
///
/// Order: declaration, each matching user rule by priority, the GitHub
/// heuristic, then the user default (or the system default when the user
/// has none).
pub fn resolve_targets(input: &RoutingInput) -> Vec<RoutingDecision> {
    let rules = rules_by_priority(&input.user_rules);
    let mut candidates = Vec::new();

    candidates.extend(declared(input));
    candidates.extend(
        rules
            .iter()
            .filter(|r| rule_matches(r, input))
            .map(|r| from_rule(r, RoutingMethod::UserRule)),
    );
    candidates.extend(github_auto(input));

    match rules
        .iter()
        .find(|r| r.enabled && r.rule_type == RuleType::Default)
    {
        Some(rule) => candidates.push(from_rule(rule, RoutingMethod::UserDefault)),
        None => candidates.push(system_default(input)),
    }

    let mut unique: Vec<RoutingDecision> = Vec::with_capacity(candidates.len());
    for decision in candidates {
        if !unique.iter().any(|d| d.target == decision.target) {
            unique.push(decision);
        }
    }
    unique
}

fn declared(input: &RoutingInput) -> Option<RoutingDecision> {
    let declaration = input.declaration.as_ref()?;
    if declaration.target_type.is_empty() || !declaration.has_config() {
        return None;
    }
    Some(RoutingDecision {
        target: declaration.clone(),
        method: RoutingMethod::TargetDeclaration,
        matched_rule: None,
    })
}

fn rules_by_priority(rules: &[UserRule]) -> Vec<&UserRule> {
    let mut sorted: Vec<&UserRule> = rules.iter().collect();
    // Stable sort keeps store order among equal priorities.
    sorted.sort_by(|a, b| b.priority.cmp(&a.priority));
    sorted
}

fn rule_matches(rule: &UserRule, input: &RoutingInput) -> bool {
    if !rule.enabled {
        return false;
    }
    let Some(pattern) = rule.pattern.as_deref() else {
        return false;
    };
    match rule.rule_type {
        RuleType::UrlPattern => input
            .source_url
            .as_deref()
            .is_some_and(|url| matches_url_pattern(url, pattern)),
        RuleType::ContentType => input.item_type == pattern,
        RuleType::TagMatch => input.tags.iter().any(|t| t == pattern),
        RuleType::Default => false,
    }
}

fn from_rule(rule: &UserRule, method: RoutingMethod) -> RoutingDecision {
    RoutingDecision {
        target: rule.target(),
        method,
        matched_rule: Some(rule.id),
    }
}

fn github_auto(input: &RoutingInput) -> Option<RoutingDecision> {
    let repo = extract_github_repo(input.source_url.as_deref()?)?;

    let mut config = Map::new();
    config.insert("repo".to_string(), Value::String(repo.slug()));
    for key in ["labels", "assignees"] {
        if let Some(value) = input.default_target.target_config.get(key) {
            config.insert(key.to_string(), value.clone());
        }
    }

    Some(RoutingDecision {
        target: Target::new(target_types::GITHUB_ISSUE, Value::Object(config)),
        method: RoutingMethod::GithubAuto,
        matched_rule: None,
    })
}

fn system_default(input: &RoutingInput) -> RoutingDecision {
    RoutingDecision {
        target: input.default_target.clone(),
        method: RoutingMethod::SystemDefault,
        matched_rule: None,
    }
}

/// The item fields that drive routing.
#[derive(Debug, Clone, Default)]
pub struct RoutingRequest {
    pub source_url: Option<String>,
    pub user_name: String,
    pub item_type: String,
    pub priority: String,
    pub tags: Vec<String>,
}

impl RoutingRequest {
    /// Route on behalf of the item's creator.
    pub fn from_item(item: &FeedbackItem) -> Self {
        Self {
            source_url: item.source_url.clone(),
            user_name: item.created_by.clone(),
            item_type: item.item_type.clone(),
            priority: item.priority.clone(),
            tags: item.tags.clone(),
        }
    }
}

/// Gathers rules and declarations, then applies the pure resolver.
pub struct RoutingResolver {
    rules: Arc<dyn RuleStore>,
    declarations: Option<Arc<DeclarationFetcher>>,
    default_target: Target,
}

impl RoutingResolver {
    pub fn new(rules: Arc<dyn RuleStore>, default_target: Target) -> Self {
        Self {
            rules,
            declarations: None,
            default_target,
        }
    }

    /// Consult site declarations before user rules.
    pub fn with_declarations(mut self, fetcher: Arc<DeclarationFetcher>) -> Self {
        self.declarations = Some(fetcher);
        self
    }

    pub fn default_target(&self) -> &Target {
        &self.default_target
    }

    pub async fn resolve_target(&self, request: &RoutingRequest) -> RoutingDecision {
        let input = self.gather(request).await;
        let decision = resolve_target(&input);
        debug!(
            user = %request.user_name,
            method = %decision.method,
            target_type = %decision.target.target_type,
            "resolved routing target"
        );
        decision
    }

    pub async fn resolve_targets(&self, request: &RoutingRequest) -> Vec<RoutingDecision> {
        let input = self.gather(request).await;
        let decisions = resolve_targets(&input);
        debug!(
            user = %request.user_name,
            count = decisions.len(),
            "resolved routing targets"
        );
        decisions
    }

    async fn gather(&self, request: &RoutingRequest) -> RoutingInput {
        let declaration = match (&self.declarations, request.source_url.as_deref()) {
            (Some(fetcher), Some(url)) => fetcher.resolve(url).await,
            _ => None,
        };

        let user_rules = if request.user_name.is_empty() {
            Vec::new()
        } else {
            match self.rules.get_user_rules(&request.user_name).await {
                Ok(rules) => rules,
                Err(e) => {
                    warn!(user = %request.user_name, error = %e, "failed to load user rules, ignoring them");
                    Vec::new()
                }
            }
        };

        RoutingInput {
            source_url: request.source_url.clone(),
            user_name: request.user_name.clone(),
            item_type: request.item_type.clone(),
            priority: request.priority.clone(),
            tags: request.tags.clone(),
            declaration,
            user_rules,
            default_target: self.default_target.clone(),
        }
    }
}
