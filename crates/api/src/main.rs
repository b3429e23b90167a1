//! Trichat API server

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trichat_api::{
    create_router,
    services::{LogNotifier, Notifier, WebhookNotifier},
    store::{MemoryStore, PgStore},
    AppState, Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;
    let bind_address = config.bind_address.clone();

    let notifier: Arc<dyn Notifier> = match &config.notification_webhook_url {
        Some(url) => {
            tracing::info!("Message notifications go to the configured webhook");
            Arc::new(WebhookNotifier::new(Some(url.clone())))
        }
        None => Arc::new(LogNotifier),
    };

    let state = match config.database_url.clone() {
        Some(database_url) => {
            let pool = trichat_shared::create_pool(&database_url, config.database_max_connections)
                .await
                .context("Failed to connect to database")?;
            trichat_shared::run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Connected to database, migrations applied");
            AppState::from_store(config, Arc::new(PgStore::new(pool)), notifier)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store, data is lost on restart");
            AppState::from_store(config, Arc::new(MemoryStore::new()), notifier)
        }
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!(address = %bind_address, "Trichat API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// `LOG_FORMAT=json` switches to structured output for log shipping
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,trichat_api=debug,tower_http=info".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
