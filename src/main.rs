use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use gag_relay::admin::{GroupAction, handle_group};
use gag_relay::channels::{BotApi, build_http_client};
use gag_relay::config::{DEFAULT_DB_PATH, RelayConfig};
use gag_relay::dispatch::Fanout;
use gag_relay::pipeline::ShareClassifier;
use gag_relay::store::LibSqlDirectory;
use gag_relay::watch::UpdateWatcher;

#[derive(Parser)]
#[command(name = "gag-relay", version, about = "Relay shared 9GAG posts to subscriber groups")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch for shared posts and deliver them (default).
    Run,
    /// Manage the groups that receive each category.
    Group {
        /// Recipient directory database.
        #[arg(long, env = "RELAY_DB_PATH", default_value = DEFAULT_DB_PATH)]
        db: PathBuf,
        #[command(subcommand)]
        action: GroupAction,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Group { db, action }) => {
            let directory = LibSqlDirectory::new_local(&db)
                .await
                .with_context(|| format!("Failed to open directory at {}", db.display()))?;
            println!("{}", handle_group(&directory, action).await?);
            Ok(())
        }
        None | Some(Commands::Run) => run_relay().await,
    }
}

async fn run_relay() -> anyhow::Result<()> {
    let config = RelayConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export TELEGRAM_BOT_TOKEN=123456:ABC...");
        std::process::exit(1);
    });

    // Keep the guard alive so the file writer flushes on exit.
    let _log_guard = init_tracing(config.log_dir.as_deref());

    eprintln!("🤖 Gag Relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Poll interval: {:?}", config.poll_interval);
    eprintln!(
        "   Error budget: {} ({:?})",
        config.error_limit, config.budget_policy
    );
    eprintln!("   Delivery concurrency: {}", config.max_concurrent_deliveries);

    // ── Shared HTTP client ──────────────────────────────────────────────
    let client =
        build_http_client(config.http_timeout).context("Failed to build HTTP client")?;
    let api = BotApi::new(config.api_base.clone(), config.bot_token.clone(), client.clone());

    // ── Recipient directory ─────────────────────────────────────────────
    let directory = LibSqlDirectory::new_local(&config.db_path)
        .await
        .with_context(|| format!("Failed to open directory at {}", config.db_path.display()))?;
    let groups = directory.list_groups().await?;
    eprintln!(
        "   Directory: {} ({} groups)",
        config.db_path.display(),
        groups.len()
    );
    if groups.is_empty() {
        tracing::warn!(
            "Recipient directory is empty; nothing will be delivered until `gag-relay group add` is run"
        );
    }

    // ── Pipeline ────────────────────────────────────────────────────────
    let classifier =
        Arc::new(ShareClassifier::new(client).with_probe_timeout(config.probe_timeout));
    let watcher = UpdateWatcher::new(api.clone(), classifier, config.watcher())?;

    let cancel = CancellationToken::new();
    let (batches, watcher_handle) = watcher.spawn(cancel.clone());
    let fanout_handle =
        Fanout::new(api, Arc::new(directory), config.max_concurrent_deliveries).spawn(batches);

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    // The fan-out finishes once the watcher closes the channel.
    watcher_handle.await.context("Update watcher task failed")?;
    fanout_handle.await.context("Fan-out task failed")?;

    tracing::info!("Relay stopped");
    Ok(())
}

/// Log to stderr, and also to a daily rolling file when `log_dir` is set.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "gag-relay.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}
