// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Boundary loading.
//!
//! The boundary arrives as a GeoJSON feature collection whose `Point`
//! features are the ring vertices in emission order. Source files can be
//! far denser than needed, so the loader keeps every Nth vertex and closes
//! the ring. Load failures degrade to an empty ring, which records nothing.

use crate::models::GeoPoint;
use geo::{Area, Coord, LineString, Polygon};
use geojson::GeoJson;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

/// Default downsampling stride.
pub const DEFAULT_STRIDE: usize = 10;

/// Closed ring of boundary vertices, immutable once built.
#[derive(Debug, Clone, Default)]
pub struct BoundaryRing {
    points: Vec<GeoPoint>,
    /// Present only when the ring encloses a nonzero area.
    polygon: Option<Polygon<f64>>,
}

impl BoundaryRing {
    /// The empty ring. Nothing is inside it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a ring from vertices, appending the first vertex if the ring is open.
    pub fn from_points(mut points: Vec<GeoPoint>) -> Self {
        let is_open = matches!((points.first(), points.last()), (Some(first), Some(last)) if first != last);
        if is_open {
            points.push(points[0]);
        }

        let polygon = enclosing_polygon(&points);
        Self { points, polygon }
    }

    /// Vertices including the closing point.
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the ring encloses a region. Unusable rings behave like the empty ring.
    pub fn is_usable(&self) -> bool {
        self.polygon.is_some()
    }

    pub(crate) fn polygon(&self) -> Option<&Polygon<f64>> {
        self.polygon.as_ref()
    }
}

/// Polygon over the distinct vertices, or `None` if they enclose no area.
fn enclosing_polygon(points: &[GeoPoint]) -> Option<Polygon<f64>> {
    let mut vertices: Vec<Coord<f64>> = points.iter().map(|p| Coord::from(*p)).collect();
    vertices.dedup();
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    if vertices.len() < 3 {
        return None;
    }

    let polygon = Polygon::new(LineString::from(vertices), vec![]);
    (polygon.unsigned_area() > 0.0).then_some(polygon)
}

/// Where boundary data comes from.
#[derive(Debug, Clone)]
pub enum BoundarySource {
    File(PathBuf),
    Inline(String),
}

impl BoundarySource {
    fn read(&self) -> Result<String, BoundaryError> {
        match self {
            BoundarySource::File(path) => fs::read_to_string(path)
                .map_err(|e| BoundaryError::IoError(format!("{}: {}", path.display(), e))),
            BoundarySource::Inline(json) => Ok(json.clone()),
        }
    }

    fn describe(&self) -> String {
        match self {
            BoundarySource::File(path) => path.display().to_string(),
            BoundarySource::Inline(_) => "<inline>".to_string(),
        }
    }
}

/// Loads the boundary once and hands out the cached ring afterwards.
///
/// Constructed explicitly by the process root; there is no global cache.
#[derive(Debug)]
pub struct BoundaryLoader {
    source: BoundarySource,
    stride: usize,
    cache: OnceLock<Arc<BoundaryRing>>,
}

impl BoundaryLoader {
    pub fn new(source: BoundarySource, stride: usize) -> Self {
        Self {
            source,
            stride: stride.max(1),
            cache: OnceLock::new(),
        }
    }

    /// Get the boundary, parsing it on first use.
    ///
    /// Never fails: a parse or IO error is logged and yields an empty ring.
    pub fn load(&self) -> Arc<BoundaryRing> {
        self.cache
            .get_or_init(|| {
                let ring = match self.try_load() {
                    Ok(ring) => ring,
                    Err(e) => {
                        tracing::error!(
                            source = %self.source.describe(),
                            error = %e,
                            "Failed to load boundary; no fixes will be recorded"
                        );
                        BoundaryRing::empty()
                    }
                };
                Arc::new(ring)
            })
            .clone()
    }

    /// Parse the source without touching the cache.
    pub fn try_load(&self) -> Result<BoundaryRing, BoundaryError> {
        let json = self.source.read()?;
        let ring = parse_boundary(&json, self.stride)?;

        if ring.is_usable() {
            tracing::info!(
                source = %self.source.describe(),
                vertices = ring.len(),
                stride = self.stride,
                "Loaded boundary"
            );
        } else {
            tracing::warn!(
                source = %self.source.describe(),
                vertices = ring.len(),
                "Boundary has fewer than 3 distinct vertices or no area; no fixes will be recorded"
            );
        }
        Ok(ring)
    }
}

/// Parse a feature collection into a ring, keeping every `stride`th point feature.
pub fn parse_boundary(json: &str, stride: usize) -> Result<BoundaryRing, BoundaryError> {
    let geojson: GeoJson = json
        .parse()
        .map_err(|e: geojson::Error| BoundaryError::ParseError(e.to_string()))?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(BoundaryError::NotFeatureCollection);
    };

    let retained: Vec<GeoPoint> = collection
        .features
        .iter()
        .filter_map(|feature| feature.geometry.as_ref())
        .filter_map(|geometry| match &geometry.value {
            geojson::Value::Point(position) => GeoPoint::from_lon_lat(position),
            _ => None,
        })
        .step_by(stride.max(1))
        .collect();

    Ok(BoundaryRing::from_points(retained))
}

/// Errors from boundary loading.
#[derive(Debug, thiserror::Error)]
pub enum BoundaryError {
    #[error("Failed to read file: {0}")]
    IoError(String),

    #[error("Failed to parse GeoJSON: {0}")]
    ParseError(String),

    #[error("Boundary source is not a FeatureCollection")]
    NotFeatureCollection,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point_collection(positions: &[[f64; 2]]) -> String {
        let features: Vec<_> = positions
            .iter()
            .map(|[lon, lat]| {
                json!({
                    "type": "Feature",
                    "properties": {},
                    "geometry": { "type": "Point", "coordinates": [lon, lat] }
                })
            })
            .collect();
        json!({ "type": "FeatureCollection", "features": features }).to_string()
    }

    /// 100 distinct vertices around a circle.
    fn circle_positions() -> Vec<[f64; 2]> {
        (0..100)
            .map(|i| {
                let angle = i as f64 * std::f64::consts::TAU / 100.0;
                [angle.cos(), angle.sin()]
            })
            .collect()
    }

    #[test]
    fn test_stride_keeps_first_and_closes_ring() {
        let ring = parse_boundary(&point_collection(&circle_positions()), 10).unwrap();

        assert_eq!(ring.len(), 11);
        assert_eq!(ring.points().first(), ring.points().last());
        assert!(ring.is_usable());
    }

    #[test]
    fn test_already_closed_ring_is_not_closed_twice() {
        let mut positions = circle_positions();
        positions[90] = positions[0];
        let ring = parse_boundary(&point_collection(&positions), 10).unwrap();

        assert_eq!(ring.len(), 10);
    }

    #[test]
    fn test_coordinates_are_swapped_into_lat_lon() {
        let json = point_collection(&[[-122.0, 37.0], [-121.0, 37.0], [-121.0, 38.0]]);
        let ring = parse_boundary(&json, 1).unwrap();

        assert_eq!(ring.points()[0], GeoPoint::new(37.0, -122.0));
        assert_eq!(ring.points()[2], GeoPoint::new(38.0, -121.0));
    }

    #[test]
    fn test_non_point_features_are_skipped() {
        let json = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": {}, "geometry": { "type": "Point", "coordinates": [0.0, 0.0] } },
                { "type": "Feature", "properties": {}, "geometry": null },
                { "type": "Feature", "properties": {}, "geometry": {
                    "type": "LineString", "coordinates": [[5.0, 5.0], [6.0, 6.0]] } },
                { "type": "Feature", "properties": {}, "geometry": { "type": "Point", "coordinates": [1.0, 0.0] } },
                { "type": "Feature", "properties": {}, "geometry": { "type": "Point", "coordinates": [1.0, 1.0] } }
            ]
        })
        .to_string();

        let ring = parse_boundary(&json, 1).unwrap();
        assert_eq!(ring.len(), 4);
        assert!(ring.points().iter().all(|p| p.latitude < 5.0));
    }

    #[test]
    fn test_two_vertices_is_not_usable() {
        let ring = parse_boundary(&point_collection(&[[0.0, 0.0], [1.0, 1.0]]), 1).unwrap();
        assert_eq!(ring.len(), 3);
        assert!(!ring.is_usable());
    }

    #[test]
    fn test_repeated_vertices_are_not_usable() {
        let a = GeoPoint::new(37.0, -122.0);
        let ring = BoundaryRing::from_points(vec![a, a, a, a]);
        assert!(!ring.is_usable());

        // Stride sampling can land on the same vertex repeatedly.
        let json = point_collection(&[[0.0, 0.0], [0.0, 0.0], [1.0, 0.0], [1.0, 0.0]]);
        assert!(!parse_boundary(&json, 1).unwrap().is_usable());
    }

    #[test]
    fn test_collinear_vertices_are_not_usable() {
        let ring = BoundaryRing::from_points(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(2.0, 2.0),
        ]);
        assert!(!ring.is_usable());
    }

    #[test]
    fn test_duplicates_do_not_hide_a_real_ring() {
        let ring = BoundaryRing::from_points(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 1.0),
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(1.0, 1.0),
        ]);
        assert!(ring.is_usable());
        assert_eq!(ring.len(), 6);
    }

    #[test]
    fn test_zero_stride_is_treated_as_one() {
        let json = point_collection(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]);
        let ring = parse_boundary(&json, 0).unwrap();
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = parse_boundary("{ not json", 10).unwrap_err();
        assert!(matches!(err, BoundaryError::ParseError(_)));
    }

    #[test]
    fn test_single_geometry_is_rejected() {
        let json = json!({ "type": "Point", "coordinates": [0.0, 0.0] }).to_string();
        let err = parse_boundary(&json, 10).unwrap_err();
        assert!(matches!(err, BoundaryError::NotFeatureCollection));
    }

    #[test]
    fn test_load_degrades_to_empty_ring() {
        let loader = BoundaryLoader::new(BoundarySource::Inline("garbage".to_string()), 10);
        let ring = loader.load();
        assert!(ring.is_empty());
        assert!(!ring.is_usable());

        let loader = BoundaryLoader::new(
            BoundarySource::File(PathBuf::from("does/not/exist.geojson")),
            10,
        );
        assert!(loader.load().is_empty());
        assert!(matches!(loader.try_load(), Err(BoundaryError::IoError(_))));
    }

    #[test]
    fn test_load_is_cached() {
        let loader = BoundaryLoader::new(
            BoundarySource::Inline(point_collection(&circle_positions())),
            10,
        );
        let first = loader.load();
        let second = loader.load();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 11);
    }

    #[test]
    fn test_empty_ring() {
        let ring = BoundaryRing::from_points(vec![]);
        assert!(ring.is_empty());
        assert!(!ring.is_usable());
    }
}
