// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geofence-Tracker API Server
//!
//! Accepts location fixes from devices, records the ones inside the
//! configured boundary, and serves the recorded routes.

use geofence_tracker::{
    config::Config,
    db::LocationStore,
    services::{BoundaryLoader, BoundarySource},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Geofence-Tracker API");

    // Load the boundary once; failures degrade to an empty ring
    tracing::info!(path = %config.boundary_path.display(), "Loading boundary");
    let loader = BoundaryLoader::new(
        BoundarySource::File(config.boundary_path.clone()),
        config.boundary_stride,
    );
    let boundary = loader.load();
    if !boundary.is_usable() {
        tracing::warn!("No usable boundary; every fix will be dropped");
    }

    let store = LocationStore::new();

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store, boundary));

    // Build router
    let app = geofence_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("geofence_tracker=debug,info")),
        )
        .with(format)
        .init();
}
