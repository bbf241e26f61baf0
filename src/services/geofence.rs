// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Containment and nearest-edge queries against the boundary ring.
//!
//! Both queries use planar geometry with longitude as x and latitude as y.
//! A point within [`EDGE_TOLERANCE_DEG`] of an edge is treated as lying on
//! it, so a projected point classifies and projects the same as an exact one.

use crate::models::GeoPoint;
use crate::services::boundary::BoundaryRing;
use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::line_measures::Distance;
use geo::{Closest, ClosestPoint, Coord, Euclidean, Point, Polygon};

/// Distance from an edge, in degrees, below which a point counts as on it.
pub const EDGE_TOLERANCE_DEG: f64 = 1e-12;

fn is_on_edge(polygon: &Polygon<f64>, query: &Point<f64>) -> bool {
    Euclidean.distance(query, polygon.exterior()) <= EDGE_TOLERANCE_DEG
}

/// Whether `point` lies within the ring.
///
/// Points exactly on an edge, including the closing edge, count as inside
/// only when `include_boundary` is set. An unusable ring contains nothing.
pub fn contains(point: GeoPoint, ring: &BoundaryRing, include_boundary: bool) -> bool {
    let Some(polygon) = ring.polygon() else {
        return false;
    };

    let coord = Coord::from(point);
    let near_edge = || is_on_edge(polygon, &Point::from(coord));
    match polygon.coordinate_position(&coord) {
        CoordPos::OnBoundary => include_boundary,
        // Rounding can leave a point that lies on an edge just to either side of it.
        CoordPos::Inside if !include_boundary && near_edge() => false,
        CoordPos::Outside if include_boundary && near_edge() => true,
        CoordPos::Inside => true,
        CoordPos::Outside => false,
    }
}

/// Closest point on the ring's edges to `point`.
///
/// Deterministic for a given ring and point. A point already on an edge is
/// returned unchanged, so projecting twice gives the same point as projecting
/// once. Returns `None` for an unusable ring.
pub fn nearest_point(point: GeoPoint, ring: &BoundaryRing) -> Option<GeoPoint> {
    let polygon = ring.polygon()?;
    let query = Point::from(Coord::from(point));
    if is_on_edge(polygon, &query) {
        return Some(point);
    }

    match polygon.exterior().closest_point(&query) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => Some(p.into()),
        Closest::Indeterminate => None,
    }
}
