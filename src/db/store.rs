// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location history store.
//!
//! Append-only rows per user, with:
//! - reads ordered by timestamp
//! - a live stream that re-emits the history on every change
//! - bulk delete per user

use crate::error::AppError;
use crate::models::StoredLocationPoint;
use dashmap::DashMap;
use futures_util::{stream, Stream};
use std::sync::Arc;
use tokio::sync::watch;

/// One user's rows plus a revision bumped on every change to them.
#[derive(Default)]
struct UserHistory {
    points: Vec<StoredLocationPoint>,
    revision: u64,
}

struct Shared {
    histories: DashMap<String, UserHistory>,
    /// Ticks after any user's rows change; live readers filter by revision.
    changes: watch::Sender<u64>,
}

impl Shared {
    fn touch(&self, history: &mut UserHistory) {
        history.revision += 1;
        self.changes.send_modify(|tick| *tick = tick.wrapping_add(1));
    }

    /// Rows ascending by timestamp, with the revision they were read at.
    fn snapshot(&self, user_id: &str) -> (u64, Vec<StoredLocationPoint>) {
        let (revision, mut points) = self
            .histories
            .get(user_id)
            .map(|h| (h.revision, h.points.clone()))
            .unwrap_or_default();
        points.sort_by_key(|p| p.timestamp_ms);
        (revision, points)
    }
}

/// In-memory location store handle. Clones share the same rows.
#[derive(Clone)]
pub struct LocationStore {
    inner: Option<Arc<Shared>>,
}

impl Default for LocationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationStore {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Some(Arc::new(Shared {
                histories: DashMap::new(),
                changes,
            })),
        }
    }

    /// Create a store whose every operation fails (for exercising write failures).
    pub fn new_offline() -> Self {
        Self { inner: None }
    }

    /// Helper to get the rows or return an error if offline.
    fn shared(&self) -> Result<&Arc<Shared>, AppError> {
        self.inner
            .as_ref()
            .ok_or_else(|| AppError::Database("Store not connected (offline mode)".to_string()))
    }

    /// Append one row.
    pub async fn insert(&self, point: &StoredLocationPoint) -> Result<(), AppError> {
        let shared = self.shared()?;
        let mut history = shared.histories.entry(point.user_id.clone()).or_default();
        history.points.push(point.clone());
        shared.touch(&mut history);
        Ok(())
    }

    /// All rows for a user, ascending by timestamp. Ties keep insertion order.
    pub async fn points_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<StoredLocationPoint>, AppError> {
        Ok(self.shared()?.snapshot(user_id).1)
    }

    /// Live view of a user's rows.
    ///
    /// Yields the current history immediately, then again after every insert
    /// or delete. Rapid changes may be coalesced into one snapshot. Watching
    /// a user with no rows stores nothing.
    pub fn watch_points(
        &self,
        user_id: &str,
    ) -> Result<impl Stream<Item = Vec<StoredLocationPoint>> + Send + 'static, AppError> {
        let shared = self.shared()?.clone();
        let receiver = shared.changes.subscribe();
        let user_id = user_id.to_string();

        Ok(stream::unfold(
            (shared, receiver, user_id, None),
            |(shared, mut receiver, user_id, seen)| async move {
                loop {
                    if seen.is_some() && receiver.changed().await.is_err() {
                        return None;
                    }
                    let (revision, points) = shared.snapshot(&user_id);
                    if seen != Some(revision) {
                        return Some((points, (shared, receiver, user_id, Some(revision))));
                    }
                }
            },
        ))
    }

    /// Delete every row for a user. Returns the number removed.
    pub async fn delete_for_user(&self, user_id: &str) -> Result<usize, AppError> {
        let shared = self.shared()?;
        let removed = match shared.histories.get_mut(user_id) {
            Some(mut history) => {
                let removed = history.points.len();
                history.points.clear();
                shared.touch(&mut history);
                removed
            }
            None => 0,
        };
        tracing::info!(user_id, removed, "Deleted location history");
        Ok(removed)
    }
}
