// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Clawmark - routing and delivery of feedback events.
//!
//! This is the binary entry point.

mod app;
mod dispatch;
mod resolve;
mod retry;
mod serve;
mod shutdown;
mod status;

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use clawmark_config::ClawmarkConfig;
use clawmark_core::{ClawmarkError, DispatchContext, DispatchEvent, ResetFilter};
use clawmark_routing::RoutingRequest;
use tracing::error;

use crate::app::App;

/// Clawmark - routing and delivery of feedback events.
#[derive(Parser, Debug)]
#[command(name = "clawmark", version, about, long_about = None)]
struct Cli {
    /// Configuration file to load instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the retry sweep on its configured interval until interrupted.
    Serve,
    /// Run one retry sweep and exit.
    Sweep {
        #[arg(long)]
        json: bool,
    },
    /// Show which target(s) an item would be routed to.
    Resolve {
        /// Page the feedback was left on.
        #[arg(long)]
        url: Option<String>,
        /// Owner of the user rules to consult.
        #[arg(long, default_value = "")]
        user: String,
        #[arg(long = "type", default_value = "feedback")]
        item_type: String,
        #[arg(long, default_value = "normal")]
        priority: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Print every target from multi-target resolution.
        #[arg(long)]
        all: bool,
        #[arg(long)]
        json: bool,
    },
    /// Route and deliver one event for an item stored as JSON.
    Dispatch {
        /// Path to the item JSON.
        item: PathBuf,
        #[arg(long, default_value = "item.created")]
        event: DispatchEvent,
        #[arg(long)]
        actor: Option<String>,
        #[arg(long)]
        message: Option<String>,
    },
    /// Show channel health and recent dispatches.
    Status {
        /// Only show dispatches for this item.
        #[arg(long)]
        item: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        plain: bool,
    },
    /// Reset failed or exhausted dispatches to pending.
    #[command(group(ArgGroup::new("selector").required(true).args(["entry", "item"])))]
    Retry {
        #[arg(long)]
        entry: Option<i64>,
        #[arg(long)]
        item: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => clawmark_config::load_and_validate_path(path),
        None => clawmark_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            clawmark_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.server.log_level);

    let Some(command) = cli.command else {
        println!("clawmark: use --help for available commands");
        return;
    };

    if let Err(e) = run(command, config).await {
        error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: ClawmarkConfig) -> Result<(), ClawmarkError> {
    let app = App::build(config).await?;
    match command {
        Commands::Serve => serve::run_serve(app).await,
        Commands::Sweep { json } => serve::run_sweep(app, json).await,
        Commands::Resolve {
            url,
            user,
            item_type,
            priority,
            tags,
            all,
            json,
        } => {
            let request = RoutingRequest {
                source_url: url,
                user_name: user,
                item_type,
                priority,
                tags,
            };
            resolve::run_resolve(app, request, all, json).await
        }
        Commands::Dispatch {
            item,
            event,
            actor,
            message,
        } => {
            let item = dispatch::read_item(&item)?;
            let ctx = DispatchContext {
                actor,
                message,
                linked: None,
            };
            dispatch::run_dispatch(app, item, event, ctx).await
        }
        Commands::Status {
            item,
            limit,
            json,
            plain,
        } => status::run_status(app, item.as_deref(), limit, json, plain).await,
        Commands::Retry { entry, item } => {
            retry::run_retry(
                app,
                ResetFilter {
                    entry_id: entry,
                    item_id: item,
                },
            )
            .await
        }
    }
}

/// Logs go to stderr so `--json` output stays clean.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("clawmark={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
