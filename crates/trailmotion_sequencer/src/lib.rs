// SPDX-License-Identifier: MIT OR Apache-2.0
//! Polyline motion sequencer for trailmotion.
//!
//! This crate animates polylines along geographic paths:
//! - Frame-by-frame stepping with distance-proportional interpolation
//! - Camera follow
//! - Proximity/bearing detection of points of interest
//! - Starting a segment partway through its path
//! - Sequence-level controls: resume from an index, rewind, fast-forward,
//!   rewind by distance and live speed changes
//!
//! ## Architecture
//!
//! The sequencer is built on:
//! - A [`MotionContext`] bundling the host clock, map surface, next-frame
//!   scheduler and event queue
//! - [`Segment`]s, each owning a path, its options and its timing state
//! - A [`Sequence`] state machine that keeps at most one segment animating
//! - Serializable route files ([`SequenceConfig`])

pub mod easing;
pub mod detect;
pub mod options;
pub mod event;
pub mod context;
pub mod stepper;
pub mod segment;
pub mod sequence;
pub mod config;

pub use easing::Easing;
pub use detect::{ApproachState, DetectionQueue, DetectionTarget, TargetId, NEAR_POINT_RADIUS_M};
pub use options::{DetectPolicy, MotionOptions};
pub use event::{EventSource, MotionEvent, MotionEventKind};
pub use context::{
    Clock, FrameHandle, ManualClock, MapSurface, MotionContext, NullSurface, RecordingSurface,
    SurfaceLog, SystemClock,
};
pub use stepper::StepOutcome;
pub use segment::{Segment, SegmentId};
pub use sequence::{Sequence, SequenceId, SequenceState, DEFAULT_REWIND_MILES};
pub use config::{ConfigError, SegmentConfig, SequenceConfig};
