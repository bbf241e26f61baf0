// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - the location ingestion pipeline.

pub mod boundary;
pub mod geofence;
pub mod ingestion;
pub mod segmenter;
pub mod session;

pub use boundary::{BoundaryLoader, BoundaryRing, BoundarySource};
pub use ingestion::{IngestStats, IngestionMachine, TrackState};
pub use session::{LocationPermission, SessionRegistry, SessionSummary, UpdateHint};
