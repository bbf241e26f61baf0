// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Every setting has a default so a bare `cargo run` works against the
//! bundled boundary file.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// GeoJSON feature collection holding the boundary vertices
    pub boundary_path: PathBuf,
    /// Keep every Nth boundary vertex
    pub boundary_stride: usize,
    /// Time gap that splits the stored history into separate segments
    pub segment_gap_ms: i64,
    /// Desired interval between fixes, passed to the device
    pub update_interval_ms: u64,
    /// Desired minimum displacement between fixes, passed to the device
    pub min_displacement_m: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            boundary_path: PathBuf::from("data/boundary.geojson"),
            boundary_stride: crate::services::boundary::DEFAULT_STRIDE,
            segment_gap_ms: crate::services::segmenter::DEFAULT_GAP_THRESHOLD_MS,
            update_interval_ms: 5_000,
            min_displacement_m: 10.0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();
        let config = Self {
            port: parse_var("PORT", defaults.port)?,
            boundary_path: env::var("BOUNDARY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.boundary_path),
            boundary_stride: parse_var("BOUNDARY_STRIDE", defaults.boundary_stride)?,
            segment_gap_ms: parse_var("SEGMENT_GAP_MS", defaults.segment_gap_ms)?,
            update_interval_ms: parse_var("UPDATE_INTERVAL_MS", defaults.update_interval_ms)?,
            min_displacement_m: parse_var("MIN_DISPLACEMENT_M", defaults.min_displacement_m)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.boundary_stride == 0 {
            return Err(ConfigError::Invalid(
                "BOUNDARY_STRIDE",
                "must be at least 1".to_string(),
            ));
        }
        if self.segment_gap_ms < 0 {
            return Err(ConfigError::Invalid(
                "SEGMENT_GAP_MS",
                "must not be negative".to_string(),
            ));
        }
        if !self.min_displacement_m.is_finite() || self.min_displacement_m < 0.0 {
            return Err(ConfigError::Invalid(
                "MIN_DISPLACEMENT_M",
                "must be a finite, non-negative distance".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid(name, e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
