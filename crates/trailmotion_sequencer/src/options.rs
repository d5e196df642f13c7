// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-segment motion configuration.

use crate::detect::{DetectionQueue, DetectionTarget, NEAR_POINT_RADIUS_M};
use crate::easing::Easing;
use serde::{Deserialize, Serialize};
use trailmotion_geo::Path;

/// What the stepper does after a detection target fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DetectPolicy {
    /// Stop scheduling frames; the segment stays paused at the detection
    /// point until resumed
    #[default]
    Halt,
    /// Keep animating
    Continue,
}

/// Motion options attached to a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionOptions {
    /// Run duration in milliseconds; derived from `speed` when unset or zero
    pub duration: Option<f64>,
    /// Speed in km/h
    pub speed: Option<f64>,
    /// Easing applied to the time ratio
    pub easing: Easing,
    /// Pan the view onto the moving point every frame
    pub follow_marker: bool,
    /// Pending proximity targets, watched head first
    pub detect: DetectionQueue,
    /// Behaviour after a target fires
    pub on_detect: DetectPolicy,
    /// Detection radius in meters
    pub detect_radius_m: f64,
}

impl Default for MotionOptions {
    fn default() -> Self {
        Self {
            duration: None,
            speed: None,
            easing: Easing::Linear,
            follow_marker: false,
            detect: DetectionQueue::new(),
            on_detect: DetectPolicy::Halt,
            detect_radius_m: NEAR_POINT_RADIUS_M,
        }
    }
}

impl MotionOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set speed in km/h
    pub fn with_speed(mut self, speed_kmh: f64) -> Self {
        self.speed = Some(speed_kmh);
        self
    }

    /// Set a fixed duration in milliseconds
    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration = Some(duration_ms);
        self
    }

    /// Set the easing curve
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Enable camera follow
    pub fn following_marker(mut self) -> Self {
        self.follow_marker = true;
        self
    }

    /// Queue a detection target
    pub fn detecting(mut self, target: DetectionTarget) -> Self {
        self.detect.push(target);
        self
    }

    /// Set the post-detection policy
    pub fn with_detect_policy(mut self, policy: DetectPolicy) -> Self {
        self.on_detect = policy;
        self
    }

    /// Set the detection radius in meters
    pub fn with_detect_radius(mut self, radius_m: f64) -> Self {
        self.detect_radius_m = radius_m;
        self
    }

    /// Duration in milliseconds, or `0` when unresolved
    pub fn duration_ms(&self) -> f64 {
        self.duration.unwrap_or(0.0)
    }

    /// Fill in a missing or zero duration from `speed` over `path`.
    ///
    /// Without a speed the duration becomes `0`.
    pub fn resolve_duration(&mut self, path: &Path) -> f64 {
        let duration = match self.duration {
            Some(d) if d != 0.0 => d,
            _ => self.speed.map_or(0.0, |speed| path.duration_for_speed(speed)),
        };
        self.duration = Some(duration);
        duration
    }

    /// Milliseconds needed to cover `chunk`, a prefix of `path`.
    ///
    /// Uses `speed` when set, otherwise the share of the resolved duration.
    pub fn chunk_duration(&self, chunk: &Path, path: &Path) -> f64 {
        match self.speed {
            Some(speed) => chunk.duration_for_speed(speed),
            None if path.length() > 0.0 => self.duration_ms() * chunk.length() / path.length(),
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use trailmotion_geo::GeoPoint;

    fn path() -> Path {
        Path::new(vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.01)])
    }

    #[test]
    fn test_resolve_duration_from_speed() {
        let mut options = MotionOptions::new().with_speed(36.0);
        let duration = options.resolve_duration(&path());
        assert_relative_eq!(duration, path().length() * 100.0, epsilon = 1e-6);
        assert_eq!(options.duration, Some(duration));
    }

    #[test]
    fn test_explicit_duration_wins() {
        let mut options = MotionOptions::new().with_speed(36.0).with_duration(5000.0);
        assert_eq!(options.resolve_duration(&path()), 5000.0);
    }

    #[test]
    fn test_no_speed_means_instant() {
        let mut options = MotionOptions::new();
        assert_eq!(options.resolve_duration(&path()), 0.0);
        assert_eq!(options.duration, Some(0.0));
    }

    #[test]
    fn test_chunk_duration_without_speed_is_proportional() {
        let full = path();
        let half = Path::new(vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.005)]);
        let options = MotionOptions::new().with_duration(1000.0);
        assert_relative_eq!(options.chunk_duration(&half, &full), 500.0, epsilon = 1e-6);
    }
}
