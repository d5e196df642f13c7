// SPDX-License-Identifier: MIT OR Apache-2.0
//! Proximity detection targets.
//!
//! A target is "passed" once the bearing from the moving point to the target
//! swings by more than 130 (and at most 340) degrees between two frames,
//! i.e. the point has crossed to the far side. A passed target is detected
//! as soon as the point is within the detection radius.
//!
//! The swing test is one-shot per target. A point that turns sharply while
//! still approaching can register a swing before actually passing; that is a
//! known approximation of the heuristic.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use trailmotion_geo::{bearing, distance, GeoPoint};
use uuid::Uuid;

/// Default radius within which a passed target is reported, in meters
pub const NEAR_POINT_RADIUS_M: f64 = 100.0;

/// Bearing swing (exclusive) above which a target counts as passed
const PASSED_SWING_MIN: f64 = 130.0;
/// Bearing swing (inclusive) up to which a target counts as passed
const PASSED_SWING_MAX: f64 = 340.0;

/// Unique identifier for a detection target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(pub Uuid);

impl TargetId {
    /// Create a new random target ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the moving point stands relative to a target
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ApproachState {
    /// No frame observed yet
    #[default]
    Unobserved,
    /// Approaching; bearing from the last frame
    Tracking {
        /// Bearing to the target on the previous frame
        previous_bearing: f64,
    },
    /// The bearing swung past the target
    Passed {
        /// Bearing to the target on the previous frame
        previous_bearing: f64,
    },
}

impl ApproachState {
    /// Bearing recorded on the previous frame
    pub fn previous_bearing(&self) -> Option<f64> {
        match *self {
            ApproachState::Unobserved => None,
            ApproachState::Tracking { previous_bearing } | ApproachState::Passed { previous_bearing } => {
                Some(previous_bearing)
            }
        }
    }

    /// Whether the point has crossed to the far side of the target
    pub fn has_passed(&self) -> bool {
        matches!(self, ApproachState::Passed { .. })
    }
}

/// A point of interest the animation reports passing near
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionTarget {
    /// Unique target ID
    #[serde(default)]
    pub id: TargetId,
    /// Target coordinate
    pub coordinate: GeoPoint,
    /// Optional caller-supplied label
    #[serde(default)]
    pub label: Option<String>,
    /// Detection progress
    #[serde(default)]
    pub state: ApproachState,
}

impl DetectionTarget {
    /// Create a new target
    pub fn new(coordinate: GeoPoint) -> Self {
        Self {
            id: TargetId::new(),
            coordinate,
            label: None,
            state: ApproachState::Unobserved,
        }
    }

    /// Set a label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Feed one frame's position. Returns true when the target is detected.
    pub fn observe(&mut self, position: GeoPoint, radius_m: f64) -> bool {
        let current = bearing(position, self.coordinate);
        let dist = distance(self.coordinate, position);

        if let ApproachState::Tracking { previous_bearing } = self.state {
            let swing = (current - previous_bearing).abs();
            if swing > PASSED_SWING_MIN && swing <= PASSED_SWING_MAX {
                tracing::trace!("Target {:?} passed (bearing swing {:.1})", self.id, swing);
                self.state = ApproachState::Passed { previous_bearing };
            }
        }

        let detected = self.state.has_passed() && dist < radius_m;
        if !detected {
            self.state = match self.state {
                ApproachState::Passed { .. } => ApproachState::Passed { previous_bearing: current },
                _ => ApproachState::Tracking { previous_bearing: current },
            };
        }
        detected
    }
}

/// FIFO of detection targets; only the head is watched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionQueue {
    targets: VecDeque<DetectionTarget>,
}

impl DetectionQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a target
    pub fn push(&mut self, target: DetectionTarget) {
        self.targets.push_back(target);
    }

    /// Target currently being watched
    pub fn head(&self) -> Option<&DetectionTarget> {
        self.targets.front()
    }

    /// Number of pending targets
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether no targets are pending
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Iterate pending targets, head first
    pub fn iter(&self) -> impl Iterator<Item = &DetectionTarget> {
        self.targets.iter()
    }

    /// Run detection against the head. A detected head is removed and
    /// returned, so each target fires at most once.
    pub fn observe_head(&mut self, position: GeoPoint, radius_m: f64) -> Option<DetectionTarget> {
        let head = self.targets.front_mut()?;
        if head.observe(position, radius_m) {
            self.targets.pop_front()
        } else {
            None
        }
    }
}

impl FromIterator<DetectionTarget> for DetectionQueue {
    fn from_iter<I: IntoIterator<Item = DetectionTarget>>(iter: I) -> Self {
        Self { targets: iter.into_iter().collect() }
    }
}
