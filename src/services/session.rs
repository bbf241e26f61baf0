// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tracking sessions.
//!
//! A session owns one ingestion machine and one FIFO writer task, so rows
//! reach the store in the order they were emitted. Write failures are
//! logged and counted, never retried (at-most-once per emitted point).

use crate::db::LocationStore;
use crate::error::{AppError, Result};
use crate::models::{Fix, StoredLocationPoint};
use crate::services::boundary::BoundaryRing;
use crate::services::ingestion::{IngestStats, IngestionMachine};
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Location permission as reported by the device when starting a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationPermission {
    Granted,
    Denied,
}

/// Cadence hint handed back to the device's location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpdateHint {
    pub interval_ms: u64,
    pub min_displacement_m: f64,
}

/// Final accounting for a stopped session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub user_id: String,
    pub started_at: String,
    pub stopped_at: String,
    pub ingest: IngestStats,
    pub written: u64,
    pub write_failures: u64,
}

#[derive(Debug, Default)]
struct WriteCounters {
    written: AtomicU64,
    failed: AtomicU64,
}

/// Serialized writer: one spawned task draining an unbounded FIFO queue.
struct PersistenceWriter {
    tx: mpsc::UnboundedSender<StoredLocationPoint>,
    task: JoinHandle<()>,
    counters: Arc<WriteCounters>,
}

impl PersistenceWriter {
    fn spawn(store: LocationStore) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<StoredLocationPoint>();
        let counters = Arc::new(WriteCounters::default());
        let task_counters = counters.clone();

        let task = tokio::spawn(async move {
            while let Some(point) = rx.recv().await {
                match store.insert(&point).await {
                    Ok(()) => {
                        task_counters.written.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        task_counters.failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            user_id = %point.user_id,
                            timestamp_ms = point.timestamp_ms,
                            error = %e,
                            "Failed to persist location point; dropping it"
                        );
                    }
                }
            }
        });

        Self {
            tx,
            task,
            counters,
        }
    }

    fn enqueue(&self, point: StoredLocationPoint) {
        if let Err(e) = self.tx.send(point) {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                user_id = %e.0.user_id,
                "Writer task is gone; dropping location point"
            );
        }
    }

    /// Close the queue and wait for every queued point to be written.
    async fn close(self) -> (u64, u64) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Location writer task failed");
        }
        (
            self.counters.written.load(Ordering::Relaxed),
            self.counters.failed.load(Ordering::Relaxed),
        )
    }
}

/// One user's active tracking session.
pub struct TrackingSession {
    user_id: String,
    machine: IngestionMachine,
    writer: PersistenceWriter,
    started_at: DateTime<Utc>,
}

impl TrackingSession {
    /// Start with a fresh track state. Must be called inside a Tokio runtime.
    pub fn start(user_id: &str, boundary: Arc<BoundaryRing>, store: LocationStore) -> Self {
        Self {
            user_id: user_id.to_string(),
            machine: IngestionMachine::new(boundary),
            writer: PersistenceWriter::spawn(store),
            started_at: Utc::now(),
        }
    }

    /// Classify a fix and queue whatever it emits for persistence.
    pub fn ingest(&mut self, fix: Fix) -> Vec<Fix> {
        let emitted = self.machine.ingest(fix);
        for f in &emitted {
            self.writer
                .enqueue(StoredLocationPoint::from_fix(&self.user_id, f));
        }
        emitted
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn stats(&self) -> IngestStats {
        self.machine.stats()
    }

    /// Drain pending writes and discard the in-memory track state.
    pub async fn finish(mut self) -> SessionSummary {
        self.machine.reset();
        let (written, write_failures) = self.writer.close().await;
        SessionSummary {
            user_id: self.user_id,
            started_at: format_utc_rfc3339(self.started_at),
            stopped_at: format_utc_rfc3339(Utc::now()),
            ingest: self.machine.stats(),
            written,
            write_failures,
        }
    }
}

/// Active sessions keyed by user.
pub struct SessionRegistry {
    sessions: DashMap<String, TrackingSession>,
    boundary: Arc<BoundaryRing>,
    store: LocationStore,
    hint: UpdateHint,
}

impl SessionRegistry {
    pub fn new(boundary: Arc<BoundaryRing>, store: LocationStore, hint: UpdateHint) -> Self {
        Self {
            sessions: DashMap::new(),
            boundary,
            store,
            hint,
        }
    }

    /// Start (or restart) tracking for a user.
    ///
    /// A denied permission ends any running session for the user and fails
    /// before a new one is created.
    pub async fn start(&self, user_id: &str, permission: LocationPermission) -> Result<UpdateHint> {
        if permission == LocationPermission::Denied {
            if let Some(summary) = self.stop(user_id).await {
                tracing::warn!(
                    user_id,
                    recorded = summary.ingest.recorded,
                    "Location permission revoked; session ended"
                );
            }
            tracing::warn!(user_id, "Refusing to start session without location permission");
            return Err(AppError::LocationPermissionDenied);
        }

        if let Some(previous) = self.stop(user_id).await {
            tracing::info!(
                user_id,
                recorded = previous.ingest.recorded,
                "Restarting session; previous session closed"
            );
        }

        let session = TrackingSession::start(user_id, self.boundary.clone(), self.store.clone());
        if let Some(raced) = self.sessions.insert(user_id.to_string(), session) {
            raced.finish().await;
        }

        tracing::info!(
            user_id,
            interval_ms = self.hint.interval_ms,
            min_displacement_m = self.hint.min_displacement_m,
            "Tracking session started"
        );
        Ok(self.hint)
    }

    /// Feed one fix to the user's session.
    pub fn ingest(&self, user_id: &str, fix: Fix) -> Result<Vec<Fix>> {
        let mut session = self
            .sessions
            .get_mut(user_id)
            .ok_or_else(|| AppError::NoActiveSession(user_id.to_string()))?;
        Ok(session.ingest(fix))
    }

    /// Stop the user's session. Safe to call when nothing is running.
    pub async fn stop(&self, user_id: &str) -> Option<SessionSummary> {
        let (_, session) = self.sessions.remove(user_id)?;
        let summary = session.finish().await;
        tracing::info!(
            user_id,
            received = summary.ingest.received,
            written = summary.written,
            write_failures = summary.write_failures,
            "Tracking session stopped"
        );
        Some(summary)
    }

    pub fn is_active(&self, user_id: &str) -> bool {
        self.sessions.contains_key(user_id)
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn stats(&self, user_id: &str) -> Option<IngestStats> {
        self.sessions.get(user_id).map(|s| s.stats())
    }

    pub fn boundary(&self) -> &BoundaryRing {
        &self.boundary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;

    fn square() -> Arc<BoundaryRing> {
        Arc::new(BoundaryRing::from_points(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 10.0),
            GeoPoint::new(10.0, 10.0),
            GeoPoint::new(10.0, 0.0),
        ]))
    }

    fn hint() -> UpdateHint {
        UpdateHint {
            interval_ms: 5_000,
            min_displacement_m: 10.0,
        }
    }

    #[tokio::test]
    async fn test_session_writes_in_emission_order() {
        let store = LocationStore::new();
        let mut session = TrackingSession::start("rider", square(), store.clone());

        session.ingest(Fix::new(5.0, 5.0, 10_000));
        session.ingest(Fix::new(5.0, 6.0, 15_000));
        let summary = session.finish().await;

        assert_eq!(summary.written, 3);
        assert_eq!(summary.write_failures, 0);
        let ts: Vec<i64> = store
            .points_for_user("rider")
            .await
            .unwrap()
            .iter()
            .map(|p| p.timestamp_ms)
            .collect();
        assert_eq!(ts, vec![9_000, 10_000, 15_000]);
    }

    #[tokio::test]
    async fn test_write_failures_are_counted_not_fatal() {
        let mut session =
            TrackingSession::start("rider", square(), LocationStore::new_offline());
        assert_eq!(session.ingest(Fix::new(5.0, 5.0, 0)).len(), 2);
        assert_eq!(session.ingest(Fix::new(5.0, 6.0, 5_000)).len(), 1);

        let summary = session.finish().await;
        assert_eq!(summary.written, 0);
        assert_eq!(summary.write_failures, 3);
        assert_eq!(summary.ingest.recorded, 2);
    }

    #[tokio::test]
    async fn test_denied_permission_is_distinct_error() {
        let registry = SessionRegistry::new(square(), LocationStore::new(), hint());
        let err = registry
            .start("rider", LocationPermission::Denied)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LocationPermissionDenied));
        assert!(!registry.is_active("rider"));
    }

    #[tokio::test]
    async fn test_denied_permission_ends_running_session() {
        let registry = SessionRegistry::new(square(), LocationStore::new(), hint());
        registry
            .start("rider", LocationPermission::Granted)
            .await
            .unwrap();
        assert!(registry.is_active("rider"));

        assert!(registry
            .start("rider", LocationPermission::Denied)
            .await
            .is_err());
        assert!(!registry.is_active("rider"));
    }

    #[tokio::test]
    async fn test_ingest_without_session() {
        let registry = SessionRegistry::new(square(), LocationStore::new(), hint());
        let err = registry
            .ingest("rider", Fix::new(5.0, 5.0, 0))
            .unwrap_err();
        assert!(matches!(err, AppError::NoActiveSession(ref u) if u == "rider"));
    }

    #[tokio::test]
    async fn test_restart_resets_track_state() {
        let registry = SessionRegistry::new(square(), LocationStore::new(), hint());
        registry
            .start("rider", LocationPermission::Granted)
            .await
            .unwrap();
        assert_eq!(registry.ingest("rider", Fix::new(5.0, 5.0, 0)).unwrap().len(), 2);
        assert_eq!(registry.ingest("rider", Fix::new(5.0, 5.0, 5_000)).unwrap().len(), 1);

        registry
            .start("rider", LocationPermission::Granted)
            .await
            .unwrap();
        assert_eq!(registry.stats("rider").unwrap().received, 0);
        // Fresh state: the next inside fix is snapped again.
        assert_eq!(registry.ingest("rider", Fix::new(5.0, 5.0, 10_000)).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let registry = SessionRegistry::new(square(), LocationStore::new(), hint());
        assert!(registry.stop("rider").await.is_none());

        registry
            .start("rider", LocationPermission::Granted)
            .await
            .unwrap();
        let summary = registry.stop("rider").await.unwrap();
        assert_eq!(summary.user_id, "rider");
        assert!(registry.stop("rider").await.is_none());
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_per_user() {
        let store = LocationStore::new();
        let registry = SessionRegistry::new(square(), store.clone(), hint());
        registry.start("a", LocationPermission::Granted).await.unwrap();
        registry.start("b", LocationPermission::Granted).await.unwrap();

        registry.ingest("a", Fix::new(5.0, 5.0, 0)).unwrap();
        registry.ingest("b", Fix::new(50.0, 5.0, 0)).unwrap();
        registry.stop("a").await;
        registry.stop("b").await;

        assert_eq!(store.points_for_user("a").await.unwrap().len(), 2);
        assert!(store.points_for_user("b").await.unwrap().is_empty());
    }
}
