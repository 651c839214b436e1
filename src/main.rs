use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod error;
mod services;

use cli::{Cli, Mode};
use config::Config;
use services::init::{self, SyncContext};
use services::preview;
use services::startgg::{StartGgService, TournamentFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tournament_calendar_sync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let filter = TournamentFilter::from_config(
        &config.filter,
        cli.country.as_deref(),
        cli.games.as_deref(),
    );

    tracing::info!("Starting Tournament Calendar Sync");

    match cli.mode() {
        Mode::ApiOnly => {
            tracing::info!("Running API test without Discord");
            let source = StartGgService::new(&config)?;
            preview::run_preview(&source, &filter).await;
            tracing::info!("API test completed");
        }
        Mode::Test => {
            let ctx = SyncContext::init(config, filter.clone()).await?;
            tracing::info!("Running in TEST MODE - API test only");
            let source = StartGgService::new(&ctx.config)?;
            preview::run_preview(&source, &filter).await;
            tracing::info!("Test completed");
            ctx.shutdown();
        }
        Mode::Trigger => {
            let ctx = SyncContext::init(config, filter).await?;
            tracing::info!("Manual trigger mode - creating events now");
            ctx.run_sync_cycle().await;
            tracing::info!("Manual event creation completed");
            ctx.shutdown();
        }
        Mode::Clear => {
            let ctx = SyncContext::init(config, filter).await?;
            tracing::info!("Clear events mode - deleting all events now");
            ctx.run_clear_cycle().await;
            tracing::info!("Clear events completed");
            ctx.shutdown();
        }
        Mode::Scheduled => {
            let ctx = SyncContext::init(config, filter).await?;
            run_scheduled(ctx).await?;
        }
    }

    Ok(())
}

/// Run the twice-daily scheduler until Ctrl+C or SIGTERM.
async fn run_scheduled(ctx: SyncContext) -> anyhow::Result<()> {
    let ctx = Arc::new(ctx);
    let (shutdown_tx, _shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);

    let scheduler = init::spawn_scheduler(ctx.clone(), &shutdown_tx);

    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = ctrl_c => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await?;
    }

    tracing::info!("Shutdown signal received, stopping scheduler");
    let _ = shutdown_tx.send(());

    // A cycle in flight is allowed to finish its current calendar call.
    let shutdown_wait = Duration::from_secs(15);
    if tokio::time::timeout(shutdown_wait, scheduler).await.is_err() {
        tracing::warn!(
            "Scheduler did not exit within {}s",
            shutdown_wait.as_secs()
        );
    }

    match Arc::try_unwrap(ctx) {
        Ok(ctx) => ctx.shutdown(),
        Err(_) => tracing::warn!("Sync context still in use at shutdown"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
