// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geographic points and raw location fixes.

use geo::Coord;
use serde::{Deserialize, Serialize};

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a point from a GeoJSON position, which is ordered `[longitude, latitude]`.
    ///
    /// This is the only place the ordinate swap happens. Extra ordinates
    /// (altitude) are ignored; fewer than two yields `None`.
    pub fn from_lon_lat(position: &[f64]) -> Option<Self> {
        match position {
            [longitude, latitude, ..] => Some(Self::new(*latitude, *longitude)),
            _ => None,
        }
    }

    /// GeoJSON position for this point, `[longitude, latitude]`.
    pub fn to_lon_lat(&self) -> Vec<f64> {
        vec![self.longitude, self.latitude]
    }

    /// Whether both ordinates are finite and within WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Planar coordinate with `x = longitude`, `y = latitude`.
impl From<GeoPoint> for Coord<f64> {
    fn from(p: GeoPoint) -> Self {
        Coord {
            x: p.longitude,
            y: p.latitude,
        }
    }
}

impl From<Coord<f64>> for GeoPoint {
    fn from(c: Coord<f64>) -> Self {
        Self::new(c.y, c.x)
    }
}

impl From<geo::Point<f64>> for GeoPoint {
    fn from(p: geo::Point<f64>) -> Self {
        p.0.into()
    }
}

/// One raw sample from the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub point: GeoPoint,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
}

impl Fix {
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self {
            point: GeoPoint::new(latitude, longitude),
            timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lon_lat_swaps_ordinates() {
        let p = GeoPoint::from_lon_lat(&[-122.15, 37.32]).unwrap();
        assert_eq!(p.latitude, 37.32);
        assert_eq!(p.longitude, -122.15);
    }

    #[test]
    fn test_from_lon_lat_ignores_altitude() {
        let p = GeoPoint::from_lon_lat(&[-122.15, 37.32, 410.0]).unwrap();
        assert_eq!(p, GeoPoint::new(37.32, -122.15));
    }

    #[test]
    fn test_from_lon_lat_rejects_short_position() {
        assert!(GeoPoint::from_lon_lat(&[-122.15]).is_none());
        assert!(GeoPoint::from_lon_lat(&[]).is_none());
    }

    #[test]
    fn test_coord_conversion_uses_longitude_as_x() {
        let c: Coord<f64> = GeoPoint::new(1.0, 2.0).into();
        assert_eq!(c.x, 2.0);
        assert_eq!(c.y, 1.0);
        assert_eq!(GeoPoint::from(c), GeoPoint::new(1.0, 2.0));
    }

    #[test]
    fn test_is_valid() {
        assert!(GeoPoint::new(37.0, -122.0).is_valid());
        assert!(GeoPoint::new(-90.0, 180.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::INFINITY).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -180.5).is_valid());
    }
}
