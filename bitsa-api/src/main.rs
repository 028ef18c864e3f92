//! # BITSA API Server
//!
//! Serves the BITSA backend over HTTP: accounts, blog posts, events with
//! RSVP, and the photo gallery.
//!
//! On startup the server loads configuration from the environment, connects
//! to PostgreSQL, applies pending migrations and starts listening. Ctrl+C or
//! SIGTERM triggers a graceful shutdown.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/bitsa JWT_SECRET=... cargo run -p bitsa-api
//! ```

use anyhow::Context;
use axum::{extract::Request, ServiceExt};
use bitsa_api::{
    app::{build_app, AppState},
    config::Config,
};
use bitsa_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig as PoolConfig},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "bitsa_api=debug,bitsa_shared=info,tower_http=debug";

/// `RUST_LOG` filter, text output unless `LOG_FORMAT=json`
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    init_tracing();

    tracing::info!(
        "BITSA API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(PoolConfig {
        max_connections: config.database.max_connections,
        ..PoolConfig::new(config.database.url.clone())
    })
    .await
    .context("Failed to connect to the database")?;

    run_migrations(&pool)
        .await
        .context("Failed to apply database migrations")?;

    let bind_address = config.bind_address();
    let app = build_app(AppState::new(pool.clone(), config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
}
