// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tracking session routes: start, stop, and fix ingestion.

use crate::error::{AppError, Result};
use crate::models::Fix;
use crate::services::{LocationPermission, SessionSummary, UpdateHint};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{delete, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Upper bound on fixes accepted in one request.
const MAX_FIXES_PER_REQUEST: usize = 1_000;
const MAX_USER_ID_LEN: usize = 128;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sessions", post(start_session))
        .route("/api/sessions/{user_id}", delete(stop_session))
        .route("/api/sessions/{user_id}/fixes", post(ingest_fixes))
}

/// Reject empty or oversized user identifiers. The id is otherwise opaque.
pub(crate) fn validate_user_id(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(AppError::BadRequest("user_id must not be empty".to_string()));
    }
    if user_id.len() > MAX_USER_ID_LEN {
        return Err(AppError::BadRequest(format!(
            "user_id must be at most {} bytes",
            MAX_USER_ID_LEN
        )));
    }
    Ok(())
}

// ─── Start / Stop ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub user_id: String,
    pub location_permission: LocationPermission,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub user_id: String,
    /// Cadence the device should request from its location provider
    pub update_hint: UpdateHint,
}

/// Start tracking, replacing any running session for the user.
async fn start_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartSessionRequest>,
) -> Result<Json<StartSessionResponse>> {
    validate_user_id(&req.user_id)?;
    let update_hint = state
        .sessions
        .start(&req.user_id, req.location_permission)
        .await?;

    Ok(Json(StartSessionResponse {
        user_id: req.user_id,
        update_hint,
    }))
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    /// False when no session was running
    pub stopped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SessionSummary>,
}

/// Stop tracking. Stopping an idle user succeeds with `stopped: false`.
async fn stop_session(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Json<StopSessionResponse> {
    let summary = state.sessions.stop(&user_id).await;
    Json(StopSessionResponse {
        stopped: summary.is_some(),
        summary,
    })
}

// ─── Fixes ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FixInput {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp_ms: i64,
}

impl From<FixInput> for Fix {
    fn from(input: FixInput) -> Self {
        Fix::new(input.latitude, input.longitude, input.timestamp_ms)
    }
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub fixes: Vec<FixInput>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub received: usize,
    /// Points queued for storage, in emission order
    pub emitted: Vec<Fix>,
}

/// Feed a batch of fixes, in order, to the user's session.
async fn ingest_fixes(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestResponse>> {
    validate_user_id(&user_id)?;
    if req.fixes.len() > MAX_FIXES_PER_REQUEST {
        return Err(AppError::BadRequest(format!(
            "At most {} fixes per request",
            MAX_FIXES_PER_REQUEST
        )));
    }

    let mut emitted = Vec::new();
    for input in &req.fixes {
        emitted.extend(state.sessions.ingest(&user_id, Fix::from(*input))?);
    }

    tracing::debug!(
        user_id = %user_id,
        received = req.fixes.len(),
        emitted = emitted.len(),
        "Ingested fixes"
    );

    Ok(Json(IngestResponse {
        received: req.fixes.len(),
        emitted,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_user_id() {
        assert!(validate_user_id("rider-1").is_ok());
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id("   ").is_err());
        assert!(validate_user_id(&"x".repeat(129)).is_err());
        assert!(validate_user_id(&"x".repeat(128)).is_ok());
    }

    #[test]
    fn test_permission_parses_snake_case() {
        let req: StartSessionRequest =
            serde_json::from_str(r#"{"user_id":"a","location_permission":"denied"}"#).unwrap();
        assert_eq!(req.location_permission, LocationPermission::Denied);
        assert!(serde_json::from_str::<StartSessionRequest>(
            r#"{"user_id":"a","location_permission":"maybe"}"#
        )
        .is_err());
    }
}
