// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod location;
pub mod point;

pub use location::{PathSegment, StoredLocationPoint};
pub use point::{Fix, GeoPoint};
