use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tracing::{info, warn};

use crate::app::build_router;
use crate::config::config;
use crate::database::DatabaseManager;
use crate::media::LocalMediaStore;
use crate::notifications::{mailer_from_config, NotificationQueue};
use crate::state::AppState;

#[derive(Args, Default)]
pub struct ServeArgs {
    #[arg(long, help = "Port to listen on (overrides config)")]
    pub port: Option<u16>,

    #[arg(long, help = "Skip migrations even when enabled in config")]
    pub no_migrate: bool,
}

pub async fn handle(args: ServeArgs) -> anyhow::Result<()> {
    let config = config();
    info!(environment = ?config.environment, "Starting SheBuilds API");

    let pool = DatabaseManager::connect(&config.database).await?;
    if config.database.run_migrations && !args.no_migrate {
        DatabaseManager::migrate(&pool).await?;
    }

    let mailer = mailer_from_config(&config.mail)?;
    let (notifications, worker) = NotificationQueue::start(mailer);
    let media = Arc::new(LocalMediaStore::new(
        &config.storage.upload_dir,
        &config.storage.public_base_url,
        config.api.max_upload_size_bytes,
    ));

    let app = build_router(AppState::new(pool, notifications, media));

    let bind_addr = format!("0.0.0.0:{}", args.port.unwrap_or(config.api.port));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;
    info!(addr = %bind_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router held the last queue sender; the worker drains what is left and exits.
    if tokio::time::timeout(Duration::from_secs(10), worker).await.is_err() {
        warn!("Notification worker did not finish in time");
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
