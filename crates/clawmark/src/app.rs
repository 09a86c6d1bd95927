// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of store, resolver, and dispatch engine from configuration.

use std::sync::Arc;

use clawmark_adapters::AdapterCatalog;
use clawmark_config::ClawmarkConfig;
use clawmark_core::{ClawmarkError, DispatchContext, DispatchEvent, FeedbackItem};
use clawmark_dispatch::{DeliveryReport, DispatchEngine, RetryPolicy, RetrySweeper, TrackedDelivery};
use clawmark_routing::{DeclarationFetcher, RoutingRequest, RoutingResolver};
use clawmark_storage::SqliteStore;
use tracing::info;

/// Everything a subcommand needs, built once per process.
pub struct App {
    pub config: ClawmarkConfig,
    pub store: Arc<SqliteStore>,
    pub engine: Arc<DispatchEngine>,
    pub resolver: RoutingResolver,
}

/// Result of handling one event end to end.
#[derive(Debug)]
pub struct EventOutcome {
    pub tracked: Vec<TrackedDelivery>,
    pub broadcast: Vec<DeliveryReport>,
}

impl App {
    pub async fn build(config: ClawmarkConfig) -> Result<Self, ClawmarkError> {
        Self::build_with(config, AdapterCatalog::with_builtins()).await
    }

    pub async fn build_with(
        config: ClawmarkConfig,
        catalog: AdapterCatalog,
    ) -> Result<Self, ClawmarkError> {
        let store = Arc::new(SqliteStore::open(&config.storage).await?);

        let mut engine = DispatchEngine::new(catalog, store.clone());
        engine.load(&config.dispatch);

        let mut resolver = RoutingResolver::new(store.clone(), config.routing.default_target.clone());
        if config.declaration.enabled {
            let fetcher = DeclarationFetcher::new(config.declaration.clone());
            resolver = resolver.with_declarations(Arc::new(fetcher));
        }

        info!(
            database = %config.storage.database_path,
            channels = config.dispatch.channels.len(),
            rules = config.dispatch.rules.len(),
            declarations = config.declaration.enabled,
            "clawmark initialized"
        );

        Ok(Self {
            config,
            store,
            engine: Arc::new(engine),
            resolver,
        })
    }

    pub fn sweeper(&self) -> RetrySweeper {
        RetrySweeper::new(self.engine.clone(), RetryPolicy::from(&self.config.retry))
    }

    /// Persist the item, deliver to every resolved target with tracking, and
    /// broadcast to the static channels.
    pub async fn handle_event(
        &self,
        event: DispatchEvent,
        item: &FeedbackItem,
        ctx: &DispatchContext,
    ) -> Result<EventOutcome, ClawmarkError> {
        self.store.insert_item(item).await?;

        let decisions = self
            .resolver
            .resolve_targets(&RoutingRequest::from_item(item))
            .await;
        let (tracked, broadcast) = tokio::join!(
            self.engine.dispatch_to_targets(event, item, &decisions, ctx),
            self.engine.dispatch(event, item, ctx),
        );
        Ok(EventOutcome { tracked, broadcast })
    }
}
