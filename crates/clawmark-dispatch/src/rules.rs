// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static rule evaluation.
//!
//! A channel is selected when any rule lists it and every field present in
//! that rule's `match` holds for the event and item.

use clawmark_config::model::{OneOrMany, RuleMatch, StaticRuleConfig};
use clawmark_core::{DispatchEvent, FeedbackItem};

fn holds(field: &Option<OneOrMany>, value: &str) -> bool {
    field.as_ref().is_none_or(|allowed| allowed.contains(value))
}

/// Whether every present field of `criteria` holds.
pub fn criteria_match(criteria: &RuleMatch, event: DispatchEvent, item: &FeedbackItem) -> bool {
    holds(&criteria.event, &event.to_string())
        && holds(&criteria.item_type, &item.item_type)
        && holds(&criteria.priority, &item.priority)
        && holds(&criteria.status, &item.status)
        && holds(&criteria.app_id, &item.app_id)
}

/// Channel names selected by `rules`, first occurrence order, no duplicates.
pub fn matching_channels(
    rules: &[StaticRuleConfig],
    event: DispatchEvent,
    item: &FeedbackItem,
) -> Vec<String> {
    let mut channels: Vec<String> = Vec::new();
    for rule in rules.iter().filter(|r| criteria_match(&r.criteria, event, item)) {
        for name in &rule.channels {
            if !channels.contains(name) {
                channels.push(name.clone());
            }
        }
    }
    channels
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawmark_test_utils::sample_item;

    fn rule(criteria: RuleMatch, channels: &[&str]) -> StaticRuleConfig {
        StaticRuleConfig {
            criteria,
            channels: channels.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn one(v: &str) -> Option<OneOrMany> {
        Some(OneOrMany::One(v.into()))
    }

    #[test]
    fn empty_match_matches_everything() {
        let rules = vec![rule(RuleMatch::default(), &["all"])];
        let item = sample_item("i1");
        assert_eq!(matching_channels(&rules, DispatchEvent::ItemClosed, &item), vec!["all"]);
    }

    #[test]
    fn fields_are_anded() {
        let criteria = RuleMatch {
            event: one("item.created"),
            priority: one("low"),
            ..Default::default()
        };
        let item = sample_item("i1"); // priority high
        assert!(!criteria_match(&criteria, DispatchEvent::ItemCreated, &item));
    }

    #[test]
    fn list_fields_are_any_of() {
        let criteria = RuleMatch {
            event: Some(OneOrMany::Many(vec!["item.resolved".into(), "item.created".into()])),
            item_type: Some(OneOrMany::Many(vec!["issue".into(), "question".into()])),
            ..Default::default()
        };
        let item = sample_item("i1");
        assert!(criteria_match(&criteria, DispatchEvent::ItemCreated, &item));
        assert!(!criteria_match(&criteria, DispatchEvent::ItemAssigned, &item));
    }

    #[test]
    fn rules_are_ored_and_deduplicated() {
        let rules = vec![
            rule(RuleMatch { priority: one("high"), ..Default::default() }, &["lark", "email"]),
            rule(RuleMatch { app_id: one("other-app"), ..Default::default() }, &["never"]),
            rule(RuleMatch { event: one("item.created"), ..Default::default() }, &["email", "github"]),
        ];
        let item = sample_item("i1");
        assert_eq!(
            matching_channels(&rules, DispatchEvent::ItemCreated, &item),
            vec!["lark", "email", "github"]
        );
    }

    #[test]
    fn status_field_is_checked() {
        let criteria = RuleMatch {
            status: one("resolved"),
            ..Default::default()
        };
        let mut item = sample_item("i1");
        assert!(!criteria_match(&criteria, DispatchEvent::ItemResolved, &item));
        item.status = "resolved".into();
        assert!(criteria_match(&criteria, DispatchEvent::ItemResolved, &item));
    }
}
