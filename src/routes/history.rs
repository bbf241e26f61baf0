// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stored history routes: raw points, segmented routes, and a live feed.

use crate::error::{AppError, Result};
use crate::models::{PathSegment, StoredLocationPoint};
use crate::routes::sessions::validate_user_id;
use crate::services::segmenter::{segment, segments_to_geojson};
use crate::time_utils::format_millis_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/users/{user_id}/points",
            get(get_points).delete(delete_points),
        )
        .route("/api/users/{user_id}/segments", get(get_segments))
        .route(
            "/api/users/{user_id}/segments.geojson",
            get(get_segments_geojson),
        )
        .route("/api/users/{user_id}/segments/live", get(live_segments))
}

// ─── Points ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PointResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp_ms: i64,
    pub recorded_at: Option<String>,
}

impl From<StoredLocationPoint> for PointResponse {
    fn from(p: StoredLocationPoint) -> Self {
        Self {
            latitude: p.latitude,
            longitude: p.longitude,
            timestamp_ms: p.timestamp_ms,
            recorded_at: format_millis_rfc3339(p.timestamp_ms),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PointsResponse {
    pub user_id: String,
    pub points: Vec<PointResponse>,
}

/// Stored points for a user, oldest first.
async fn get_points(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<PointsResponse>> {
    validate_user_id(&user_id)?;
    let points = state.store.points_for_user(&user_id).await?;
    Ok(Json(PointsResponse {
        user_id,
        points: points.into_iter().map(PointResponse::from).collect(),
    }))
}

#[derive(Debug, Serialize)]
pub struct DeletePointsResponse {
    pub deleted: usize,
}

/// Delete a user's entire history.
async fn delete_points(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<DeletePointsResponse>> {
    validate_user_id(&user_id)?;
    let deleted = state.store.delete_for_user(&user_id).await?;
    Ok(Json(DeletePointsResponse { deleted }))
}

// ─── Segments ────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct SegmentsQuery {
    /// Overrides the configured gap threshold
    pub gap_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SegmentsResponse {
    pub user_id: String,
    pub gap_ms: i64,
    pub segments: Vec<PathSegment>,
}

fn resolve_gap(state: &AppState, query: &SegmentsQuery) -> Result<i64> {
    match query.gap_ms {
        Some(gap) if gap < 0 => Err(AppError::BadRequest(
            "gap_ms must not be negative".to_string(),
        )),
        Some(gap) => Ok(gap),
        None => Ok(state.config.segment_gap_ms),
    }
}

/// Stored history split into continuous runs.
async fn get_segments(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<SegmentsQuery>,
) -> Result<Json<SegmentsResponse>> {
    validate_user_id(&user_id)?;
    let gap_ms = resolve_gap(&state, &query)?;
    let points = state.store.points_for_user(&user_id).await?;

    Ok(Json(SegmentsResponse {
        segments: segment(&points, gap_ms),
        user_id,
        gap_ms,
    }))
}

/// Segments as a GeoJSON feature collection, ready for a map layer.
async fn get_segments_geojson(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<SegmentsQuery>,
) -> Result<Json<geojson::FeatureCollection>> {
    validate_user_id(&user_id)?;
    let gap_ms = resolve_gap(&state, &query)?;
    let points = state.store.points_for_user(&user_id).await?;
    Ok(Json(segments_to_geojson(&segment(&points, gap_ms))))
}

/// Server-sent events: the full segment list, re-sent whenever the history changes.
async fn live_segments(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<SegmentsQuery>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>>> {
    validate_user_id(&user_id)?;
    let gap_ms = resolve_gap(&state, &query)?;
    let updates = state.store.watch_points(&user_id)?;

    tracing::debug!(user_id = %user_id, gap_ms, "Live segment stream opened");

    let events = updates.map(move |points| {
        Event::default().event("segments").json_data(SegmentsResponse {
            user_id: user_id.clone(),
            gap_ms,
            segments: segment(&points, gap_ms),
        })
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
