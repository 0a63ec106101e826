//! # Hearth API Server
//!
//! Household and recipe backend: accounts, household invitations, recipes
//! and per-user preferences.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/hearth \
//! JWT_SECRET=$(openssl rand -hex 32) \
//! cargo run -p hearth-api
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON log lines and `RUST_LOG` to override the
//! default filter.

use hearth_api::{
    app::{build_router, AppState},
    config::Config,
};
use hearth_shared::{
    db::{migrations, pool},
    store::PgStore,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "hearth_api=debug,hearth_shared=info,tower_http=info";

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Hearth API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let db = pool::create_pool(config.pool_config()).await?;

    migrations::run_migrations(&db).await?;
    tracing::info!(
        migrations = migrations::embedded_count(),
        "Database migrations applied"
    );

    let address = config.bind_address();
    let state = AppState::new(Arc::new(PgStore::new(db.clone())), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool::close_pool(db).await;
    tracing::info!("Server stopped");

    Ok(())
}
