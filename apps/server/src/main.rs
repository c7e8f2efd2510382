// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Damage Locator Server - room damage measurement and placement.
//!
//! This server wraps the analysis pipeline in a REST API. It supports:
//!
//! - Analysis of inline detections or photos sent to a vision model
//! - Caching of results keyed by the request content
//! - Marker positions in either coordinate frame
//! - Manual measurement overrides
//!
//! # Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `POST /api/v1/analyze` - Full analysis (JSON)
//! - `GET /api/v1/analysis/:key` - Retrieve cached analysis
//! - `GET /api/v1/analysis/:key/positions` - Damage marker positions
//! - `PUT /api/v1/analysis/:key/damages/:id/measurement` - Manual size override

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

mod config;
mod error;
mod routes;
mod services;
mod types;

use config::Config;
use services::{DiskCache, HttpVisionClient};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<DiskCache>,
    pub config: Arc<Config>,
    pub vision: Option<Arc<HttpVisionClient>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,tower_http=debug,damage_locator_server=debug".into()),
        )
        .pretty()
        .init();

    let config = Config::from_env();

    tracing::info!(
        port = config.port,
        cache_dir = %config.cache_dir,
        max_request_size_mb = config.max_request_size_mb,
        worker_threads = config.worker_threads,
        vision_api = config.vision_api_url.as_deref().unwrap_or("<none>"),
        vision_request_delay_ms = config.vision_request_delay_ms,
        "Starting Damage Locator Server"
    );

    // Initialize rayon thread pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads)
        .build_global()
        .context("Failed to initialize rayon thread pool")?;

    let cache = Arc::new(DiskCache::new(&config.cache_dir).await);

    let vision = match &config.vision_api_url {
        Some(url) => Some(Arc::new(
            HttpVisionClient::new(
                url,
                config.vision_api_key.clone(),
                Duration::from_secs(config.request_timeout_secs),
            )
            .context("Failed to build vision client")?,
        )),
        None => {
            tracing::warn!("VISION_API_URL not set; only inline detections will be accepted");
            None
        }
    };

    let state = AppState {
        cache,
        config: Arc::new(config.clone()),
        vision,
    };

    let app = Router::new()
        // Root endpoint - API information
        .route("/", get(routes::health::info))
        // Health check
        .route("/api/v1/health", get(routes::health::check))
        // Analysis endpoints
        .route("/api/v1/analyze", post(routes::analyze::analyze))
        .route("/api/v1/analysis/:key", get(routes::analyze::get_analysis))
        .route(
            "/api/v1/analysis/:key/positions",
            get(routes::analyze::get_positions),
        )
        .route(
            "/api/v1/analysis/:key/damages/:id/measurement",
            put(routes::analyze::update_measurement),
        )
        // Middleware
        .layer(DefaultBodyLimit::max(config.max_request_size_mb * 1024 * 1024))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.request_timeout_secs,
                )))
                .layer(CompressionLayer::new()),
        )
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
