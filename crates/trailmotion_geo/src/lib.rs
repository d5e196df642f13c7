// SPDX-License-Identifier: MIT OR Apache-2.0
//! Geodesy helpers for trailmotion.
//!
//! This crate provides the stateless math the motion sequencer is built on:
//! - Initial bearing between two coordinates
//! - Great-circle (haversine) distance
//! - Cumulative distance and speed-derived duration along a polyline
//! - A [`Path`] with a precomputed prefix-distance array for
//!   distance-proportional interpolation and backward boundary search

pub mod point;
pub mod path;

pub use point::{
    bearing, cumulative_distance, distance, duration_for_speed, miles_to_meters, GeoPoint,
    EARTH_RADIUS_M, METERS_PER_MILE,
};
pub use path::{Interpolated, Path};
