pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::db::Database;
use crate::services::{sweeper, Scheduler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
}

/// All HTTP routes over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/review/misses", post(routes::review::record_miss))
        .route("/api/review/queue", get(routes::review::queue))
        .route(
            "/api/review/items/:item_id/responses",
            post(routes::review::submit_response),
        )
        .route(
            "/api/review/items/:item_id/hint",
            post(routes::review::increment_hint),
        )
        .route("/api/review/stats", get(routes::review::stats))
        .route("/api/review/rebalance", post(routes::maintenance::rebalance))
        .route("/api/review/cleanup", post(routes::maintenance::cleanup))
        .with_state(state)
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let db = Arc::new(Database::connect(&config.database_url).await?);

    tracing::info!("Running migrations...");
    db.run_migrations().await?;

    let scheduler = Scheduler::from_store(db, config.scheduler.clone())?
        .with_storage_timeout(config.storage_timeout);
    let scheduler = Arc::new(scheduler);

    tracing::info!(
        every_secs = config.cleanup_interval.as_secs(),
        "Starting mastered-item sweep"
    );
    sweeper::spawn_cleanup_task(scheduler.clone(), config.cleanup_interval);

    let app = router(AppState { scheduler })
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.bind_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
