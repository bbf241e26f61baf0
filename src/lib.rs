// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geofence-Tracker: record location history only inside a boundary
//!
//! This crate provides the ingestion pipeline and its HTTP host: raw fixes
//! are tested against a polygonal boundary, out-of-zone fixes are dropped,
//! re-entries are snapped onto the boundary, and stored history is served
//! back as time-segmented routes.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::LocationStore;
use services::{BoundaryRing, SessionRegistry, UpdateHint};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: LocationStore,
    pub sessions: SessionRegistry,
}

impl AppState {
    /// Wire the session registry to the given boundary and store.
    pub fn new(config: Config, store: LocationStore, boundary: Arc<BoundaryRing>) -> Self {
        let hint = UpdateHint {
            interval_ms: config.update_interval_ms,
            min_displacement_m: config.min_displacement_m,
        };
        let sessions = SessionRegistry::new(boundary, store.clone(), hint);
        Self {
            config,
            store,
            sessions,
        }
    }
}
