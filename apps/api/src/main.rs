mod auth;
mod config;
mod db;
mod errors;
mod models;
mod routes;
mod state;
mod store;
mod survey;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgStore;
use crate::survey::registry::spawn_idle_sweeper;

const SESSION_SWEEP_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting survey API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let pool = create_pool(&config).await?;
    let store = PgStore::new(pool, config.tables.clone());
    store
        .ensure_schema()
        .await
        .context("Could not prepare survey tables")?;
    info!(
        "Using tables songs={} responses={} users={}",
        config.tables.songs, config.tables.responses, config.tables.users
    );

    let state = AppState::new(Arc::new(store), config.clone());

    // Idle sessions are only reclaimed by this sweep; expiry itself stays advisory
    spawn_idle_sweeper(
        state.sessions.clone(),
        state.session_retention(),
        std::time::Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS),
    );
    info!(
        "Session sweep every {SESSION_SWEEP_INTERVAL_SECS}s, retention {} minutes",
        config.session_retention_minutes
    );

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
