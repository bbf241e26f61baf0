// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Splits stored history into drawable segments.
//!
//! A gap longer than the threshold between consecutive points starts a new
//! segment, so a renderer never joins the last point before leaving the
//! boundary to the first point after re-entering it.

use crate::models::{PathSegment, StoredLocationPoint};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};

/// Default gap that splits segments.
pub const DEFAULT_GAP_THRESHOLD_MS: i64 = 30_000;

/// Partition points into segments ordered by timestamp.
///
/// Input order does not matter; points are sorted (stably) by timestamp first.
pub fn segment(points: &[StoredLocationPoint], gap_threshold_ms: i64) -> Vec<PathSegment> {
    let mut sorted: Vec<&StoredLocationPoint> = points.iter().collect();
    sorted.sort_by_key(|p| p.timestamp_ms);

    let mut segments: Vec<PathSegment> = Vec::new();
    let mut previous_ms: Option<i64> = None;

    for point in sorted {
        let starts_new = match previous_ms {
            None => true,
            Some(prev) => point.timestamp_ms.saturating_sub(prev) > gap_threshold_ms,
        };
        if starts_new {
            segments.push(PathSegment::default());
        }
        if let Some(current) = segments.last_mut() {
            current.points.push(point.point());
        }
        previous_ms = Some(point.timestamp_ms);
    }

    segments
}

/// Render segments as a GeoJSON feature collection.
///
/// Multi-point segments become `LineString`s and single points `Point`s.
pub fn segments_to_geojson(segments: &[PathSegment]) -> FeatureCollection {
    let features = segments
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_empty())
        .map(|(index, s)| {
            let mut positions: Vec<Vec<f64>> = s.points.iter().map(|p| p.to_lon_lat()).collect();
            let value = if positions.len() == 1 {
                Value::Point(positions.swap_remove(0))
            } else {
                Value::LineString(positions)
            };

            let mut properties = JsonObject::new();
            properties.insert("segment".to_string(), index.into());
            properties.insert("point_count".to_string(), s.len().into());

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(value)),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
