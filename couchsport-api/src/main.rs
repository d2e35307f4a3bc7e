//! # Couchsport API Server
//!
//! HTTP server for Couchsport pages: accounts and cookie sessions, page
//! creation with image uploads, publication and ownership-checked edits.
//!
//! ## Usage
//!
//! ```bash
//! APP_ENV=dev cargo run -p couchsport-api
//! ```
//!
//! Without `COUCHSPORT__DATABASE__URL` the server keeps everything in memory.

use couchsport_api::{
    app::{build_router, AppState},
    config::Config,
};
use couchsport_shared::{
    db::{
        memory::MemoryRepository,
        migrations::run_migrations,
        pool::{close_pool, create_pool},
        postgres::PgRepository,
        repository::Repository,
    },
    images::storage::LocalFileStore,
};
use sqlx::PgPool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!(
        "Couchsport API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::load()?;

    let (repo, pool): (Arc<dyn Repository>, Option<PgPool>) = match config.pool_config() {
        Some(db_config) => {
            let pool = create_pool(db_config).await?;
            run_migrations(&pool).await?;
            (Arc::new(PgRepository::new(pool.clone())), Some(pool))
        }
        None => {
            tracing::warn!("No database configured, using the in-memory repository");
            (Arc::new(MemoryRepository::new()), None)
        }
    };

    let files = LocalFileStore::new(&config.uploads.dir, &config.uploads.url_prefix).await?;
    let bind_address = config.bind_address();

    let app = build_router(AppState::new(repo, Arc::new(files), config));

    let shutdown = CancellationToken::new();
    tokio::spawn(forward_shutdown_signal(shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tracing::info!("Server drained, shutting down");
    if let Some(pool) = pool {
        close_pool(pool).await;
    }

    Ok(())
}

/// Installs the global subscriber; `LOG_FORMAT=json` selects JSON output
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "couchsport_api=debug,couchsport_shared=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Cancels `token` on Ctrl-C or SIGTERM
async fn forward_shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections...");
    token.cancel();
}
