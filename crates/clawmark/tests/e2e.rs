// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: SQLite store, real adapters, HTTP endpoints mocked
//! with wiremock.

use std::sync::Arc;

use chrono::Utc;
use clawmark_adapters::AdapterCatalog;
use clawmark_config::model::{ChannelConfig, DispatchConfig, StorageConfig};
use clawmark_core::{
    DispatchContext, DispatchEvent, DispatchStatus, DispatchStore, RoutingMethod, RuleType, Target,
};
use clawmark_dispatch::{DispatchEngine, RetryPolicy, RetrySweeper, SweepOutcome};
use clawmark_routing::{RoutingRequest, RoutingResolver};
use clawmark_storage::{NewUserRule, SqliteStore};
use clawmark_test_utils::sample_item;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    store: Arc<SqliteStore>,
    engine: Arc<DispatchEngine>,
    resolver: RoutingResolver,
    _dir: TempDir,
}

async fn harness(dispatch: DispatchConfig) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let storage = StorageConfig {
        database_path: dir.path().join("e2e.db").display().to_string(),
        wal_mode: true,
    };
    let store = Arc::new(SqliteStore::open(&storage).await.unwrap());

    let mut engine = DispatchEngine::new(AdapterCatalog::with_builtins(), store.clone());
    engine.load(&dispatch);

    let resolver = RoutingResolver::new(store.clone(), Target::new("github-issue", json!({})));
    Harness {
        store,
        engine: Arc::new(engine),
        resolver,
        _dir: dir,
    }
}

fn github_channel(api_base: &str) -> DispatchConfig {
    let mut dispatch = DispatchConfig::default();
    let settings = json!({
        "repo": "coco-xyz/clawmark",
        "token": "ghp_channel_token",
        "api_base": api_base,
    });
    dispatch.channels.insert(
        "gh".into(),
        ChannelConfig {
            adapter: "github-issue".into(),
            settings: settings.as_object().cloned().unwrap(),
        },
    );
    dispatch
}

#[tokio::test]
async fn user_rule_target_creates_then_closes_one_issue() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/coco-xyz/feedback/issues"))
        .and(header("authorization", "Bearer ghp_channel_token"))
        .and(body_partial_json(json!({"title": "Button label is truncated"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "number": 77,
            "html_url": "https://github.com/coco-xyz/feedback/issues/77"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/repos/coco-xyz/feedback/issues/77"))
        .and(body_partial_json(json!({"state": "closed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(github_channel(&server.uri())).await;
    h.store
        .create_user_rule(&NewUserRule {
            user_name: "kevin".into(),
            rule_type: RuleType::UrlPattern,
            pattern: Some("github.com/coco-xyz/**".into()),
            target: Target::new(
                "github-issue",
                json!({"repo": "coco-xyz/feedback", "api_base": server.uri()}),
            ),
            priority: 10,
            enabled: true,
        })
        .await
        .unwrap();

    let item = sample_item("i1");
    h.store.insert_item(&item).await.unwrap();

    let decision = h.resolver.resolve_target(&RoutingRequest::from_item(&item)).await;
    assert_eq!(decision.method, RoutingMethod::UserRule);
    assert_eq!(decision.target.config_str("repo"), Some("coco-xyz/feedback"));

    let created = h
        .engine
        .dispatch_to_targets(
            DispatchEvent::ItemCreated,
            &item,
            std::slice::from_ref(&decision),
            &DispatchContext::default(),
        )
        .await;
    assert_eq!(created[0].status, DispatchStatus::Sent);

    let entry = h
        .store
        .get_dispatch_entry(created[0].entry_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.external_id.as_deref(), Some("77"));
    assert_eq!(
        entry.external_url.as_deref(),
        Some("https://github.com/coco-xyz/feedback/issues/77")
    );

    let mapping = h
        .store
        .get_adapter_mapping("i1", "github-issue", "coco-xyz/feedback")
        .await
        .unwrap()
        .expect("mapping recorded");
    assert_eq!(mapping.external_id, "77");

    let closed = h
        .engine
        .dispatch_to_targets(
            DispatchEvent::ItemClosed,
            &item,
            std::slice::from_ref(&decision),
            &DispatchContext {
                actor: Some("jessie".into()),
                ..Default::default()
            },
        )
        .await;
    assert_eq!(closed[0].status, DispatchStatus::Sent);
    // `expect(1)` on both mocks is verified when the server drops.
}

#[tokio::test]
async fn failed_webhook_is_redelivered_by_the_sweep() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("x-clawmark-event", "item.created"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(DispatchConfig::default()).await;
    let item = sample_item("i2");
    h.store.insert_item(&item).await.unwrap();

    let target = Target::new("webhook", json!({"url": format!("{}/hook", server.uri())}));
    let decisions = vec![clawmark_core::RoutingDecision {
        target,
        method: RoutingMethod::SystemDefault,
        matched_rule: None,
    }];
    let first = h
        .engine
        .dispatch_to_targets(DispatchEvent::ItemCreated, &item, &decisions, &DispatchContext::default())
        .await;
    assert_eq!(first[0].status, DispatchStatus::Failed);
    let id = first[0].entry_id.unwrap();

    let entry = h.store.get_dispatch_entry(id).await.unwrap().unwrap();
    assert_eq!(entry.retries, 1);
    assert!(entry.last_error.as_deref().is_some_and(|e| e.contains("503")));

    let sweeper = RetrySweeper::new(h.engine.clone(), RetryPolicy::default());
    let outcome = sweeper
        .retry_failed_at(Utc::now() + chrono::Duration::minutes(5))
        .await
        .unwrap();
    let SweepOutcome::Completed(report) = outcome else {
        panic!("sweep skipped");
    };
    assert_eq!(report.sent, 1);

    let entry = h.store.get_dispatch_entry(id).await.unwrap().unwrap();
    assert_eq!(entry.status, DispatchStatus::Sent);
    assert_eq!(entry.retries, 1);
    assert!(entry.last_error.is_none());
    assert!(h.store.get_pending_dispatches().await.unwrap().is_empty());
}

#[tokio::test]
async fn sweep_cancels_dispatches_for_deleted_items() {
    let h = harness(DispatchConfig::default()).await;
    let item = sample_item("i3");
    h.store.insert_item(&item).await.unwrap();

    let decisions = vec![clawmark_core::RoutingDecision {
        target: Target::new("webhook", json!({"url": "http://127.0.0.1:9/hook"})),
        method: RoutingMethod::UserDefault,
        matched_rule: None,
    }];
    let first = h
        .engine
        .dispatch_to_targets(DispatchEvent::ItemCreated, &item, &decisions, &DispatchContext::default())
        .await;
    assert_eq!(first[0].status, DispatchStatus::Failed);

    assert!(h.store.delete_item("i3").await.unwrap());
    let sweeper = RetrySweeper::new(h.engine.clone(), RetryPolicy::default());
    sweeper
        .retry_failed_at(Utc::now() + chrono::Duration::minutes(5))
        .await
        .unwrap();

    let entry = h
        .store
        .get_dispatch_entry(first[0].entry_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.status, DispatchStatus::Cancelled);
    assert_eq!(entry.last_error.as_deref(), Some("item not found"));
}
