// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stored location history and derived route segments.

use crate::models::point::{Fix, GeoPoint};
use serde::{Deserialize, Serialize};

/// A persisted location row. Rows are only ever inserted or bulk-deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLocationPoint {
    /// Opaque session user identifier
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
}

impl StoredLocationPoint {
    /// Tag an emitted fix with the owning user.
    pub fn from_fix(user_id: &str, fix: &Fix) -> Self {
        Self {
            user_id: user_id.to_string(),
            latitude: fix.point.latitude,
            longitude: fix.point.longitude,
            timestamp_ms: fix.timestamp_ms,
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// One continuous drawable run of points. Derived on read, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub points: Vec<GeoPoint>,
}

impl PathSegment {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
