// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use geofence_tracker::config::Config;
use geofence_tracker::db::LocationStore;
use geofence_tracker::models::GeoPoint;
use geofence_tracker::routes::create_router;
use geofence_tracker::services::BoundaryRing;
use geofence_tracker::AppState;
use std::sync::Arc;

/// Square boundary spanning lat/lon 0..10.
#[allow(dead_code)]
pub fn square_boundary() -> Arc<BoundaryRing> {
    Arc::new(BoundaryRing::from_points(vec![
        GeoPoint::new(0.0, 0.0),
        GeoPoint::new(0.0, 10.0),
        GeoPoint::new(10.0, 10.0),
        GeoPoint::new(10.0, 0.0),
    ]))
}

/// Create a test app over an in-memory store and the square boundary.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(LocationStore::new(), square_boundary())
}

#[allow(dead_code)]
pub fn create_test_app_with(
    store: LocationStore,
    boundary: Arc<BoundaryRing>,
) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(Config::default(), store, boundary));
    (create_router(state.clone()), state)
}

/// Read a JSON response body.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
