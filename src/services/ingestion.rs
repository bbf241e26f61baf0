// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geofenced fix ingestion.
//!
//! Each fix is classified against the boundary and produces zero, one, or
//! two emitted fixes:
//! - outside: nothing is emitted and the track goes quiet
//! - inside after being outside: a snap point on the boundary, stamped one
//!   second before the fix, followed by the fix itself
//! - inside after being inside: the fix
//!
//! Leaving the zone emits no exit marker; only entries are snapped.

use crate::models::Fix;
use crate::services::boundary::BoundaryRing;
use crate::services::geofence;
use serde::Serialize;
use std::sync::Arc;

/// How far ahead of the entry fix the synthetic snap point is stamped.
pub const SNAP_LEAD_MS: i64 = 1_000;

/// Last classification of the track.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TrackState {
    /// Outside the boundary, or nothing seen yet.
    #[default]
    Outside,
    /// Inside the boundary; holds the most recent inside fix.
    Inside(Fix),
}

/// What a single step did with its fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Inside, continuing an inside run.
    Recorded,
    /// Inside after being outside; a snap point was emitted first.
    Entered,
    DroppedOutside,
    /// Boundary is empty or degenerate; state left unchanged.
    DroppedNoBoundary,
    /// Non-finite or out-of-range coordinates; state left unchanged.
    DroppedMalformed,
}

/// Result of feeding one fix to a [`TrackState`].
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: TrackState,
    pub emitted: Vec<Fix>,
    pub outcome: StepOutcome,
}

impl TrackState {
    /// Compute the next state and the fixes to emit, in emission order.
    pub fn step(self, fix: Fix, boundary: &BoundaryRing) -> Transition {
        if !boundary.is_usable() {
            return self.unchanged(StepOutcome::DroppedNoBoundary);
        }
        if !fix.point.is_valid() {
            return self.unchanged(StepOutcome::DroppedMalformed);
        }

        if !geofence::contains(fix.point, boundary, true) {
            return Transition {
                state: TrackState::Outside,
                emitted: Vec::new(),
                outcome: StepOutcome::DroppedOutside,
            };
        }

        let (emitted, outcome) = match self {
            TrackState::Inside(_) => (vec![fix], StepOutcome::Recorded),
            TrackState::Outside => match geofence::nearest_point(fix.point, boundary) {
                Some(edge) => {
                    let snap = Fix {
                        point: edge,
                        timestamp_ms: fix.timestamp_ms.saturating_sub(SNAP_LEAD_MS),
                    };
                    (vec![snap, fix], StepOutcome::Entered)
                }
                // A usable ring always has a nearest edge point.
                None => (vec![fix], StepOutcome::Recorded),
            },
        };

        Transition {
            state: TrackState::Inside(fix),
            emitted,
            outcome,
        }
    }

    fn unchanged(self, outcome: StepOutcome) -> Transition {
        Transition {
            state: self,
            emitted: Vec::new(),
            outcome,
        }
    }

    pub fn is_inside(&self) -> bool {
        matches!(self, TrackState::Inside(_))
    }
}

/// Per-session ingestion counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub received: u64,
    /// Real fixes emitted
    pub recorded: u64,
    /// Synthetic snap points emitted
    pub snapped: u64,
    pub dropped_outside: u64,
    pub dropped_no_boundary: u64,
    pub dropped_malformed: u64,
    /// Fixes whose timestamp was earlier than the previous fix's
    pub out_of_order: u64,
}

/// Owns the track state for one session. Not shared; callers serialize access.
#[derive(Debug)]
pub struct IngestionMachine {
    boundary: Arc<BoundaryRing>,
    state: TrackState,
    last_timestamp_ms: Option<i64>,
    stats: IngestStats,
}

impl IngestionMachine {
    pub fn new(boundary: Arc<BoundaryRing>) -> Self {
        Self {
            boundary,
            state: TrackState::Outside,
            last_timestamp_ms: None,
            stats: IngestStats::default(),
        }
    }

    /// Feed one fix and return the fixes to persist, in order.
    pub fn ingest(&mut self, fix: Fix) -> Vec<Fix> {
        self.stats.received += 1;
        if self
            .last_timestamp_ms
            .is_some_and(|last| fix.timestamp_ms < last)
        {
            self.stats.out_of_order += 1;
            tracing::debug!(
                timestamp_ms = fix.timestamp_ms,
                "Fix arrived out of order"
            );
        }
        self.last_timestamp_ms = Some(fix.timestamp_ms);

        let transition = self.state.step(fix, &self.boundary);
        match transition.outcome {
            StepOutcome::Recorded => self.stats.recorded += 1,
            StepOutcome::Entered => {
                self.stats.recorded += 1;
                self.stats.snapped += 1;
                tracing::debug!(
                    latitude = transition.emitted[0].point.latitude,
                    longitude = transition.emitted[0].point.longitude,
                    "Entered boundary; emitted snap point"
                );
            }
            StepOutcome::DroppedOutside => {
                if self.state.is_inside() {
                    tracing::debug!("Left boundary; recording paused");
                }
                self.stats.dropped_outside += 1;
            }
            StepOutcome::DroppedNoBoundary => {
                self.stats.dropped_no_boundary += 1;
                tracing::debug!("Dropped fix: boundary not available");
            }
            StepOutcome::DroppedMalformed => {
                self.stats.dropped_malformed += 1;
                tracing::debug!(
                    latitude = fix.point.latitude,
                    longitude = fix.point.longitude,
                    "Dropped malformed fix"
                );
            }
        }

        self.state = transition.state;
        transition.emitted
    }

    /// Forget the last inside fix and the out-of-order watermark.
    pub fn reset(&mut self) {
        self.state = TrackState::Outside;
        self.last_timestamp_ms = None;
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }
}
