// SPDX-License-Identifier: MIT OR Apache-2.0
//! Motion events queued for the host.

use crate::detect::DetectionTarget;
use crate::segment::SegmentId;
use crate::sequence::SequenceId;
use serde::{Deserialize, Serialize};

/// Object an event was emitted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventSource {
    /// A single animated segment
    Segment(SegmentId),
    /// A sequence of segments
    Sequence(SequenceId),
}

/// Kind of motion event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MotionEventKind {
    /// Motion started (fresh or from a chunk)
    Started,
    /// Motion ended or was stopped
    Ended,
    /// Motion paused
    Paused,
    /// Motion resumed
    Resumed,
    /// The moving point passed near a detection target
    NearPoint(DetectionTarget),
}

impl MotionEventKind {
    /// Event name as used by the host map library
    pub fn name(&self) -> &'static str {
        match self {
            MotionEventKind::Started => "motion-start",
            MotionEventKind::Ended => "motion-end",
            MotionEventKind::Paused => "motion-pause",
            MotionEventKind::Resumed => "motion-resume",
            MotionEventKind::NearPoint(_) => "motion-near-point",
        }
    }
}

/// A queued motion event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionEvent {
    /// Emitter
    pub source: EventSource,
    /// What happened
    pub kind: MotionEventKind,
}

impl MotionEvent {
    /// Event emitted by a segment
    pub fn segment(id: SegmentId, kind: MotionEventKind) -> Self {
        Self { source: EventSource::Segment(id), kind }
    }

    /// Event emitted by a sequence
    pub fn sequence(id: SequenceId, kind: MotionEventKind) -> Self {
        Self { source: EventSource::Sequence(id), kind }
    }

    /// Segment that emitted the event, if any
    pub fn segment_id(&self) -> Option<SegmentId> {
        match self.source {
            EventSource::Segment(id) => Some(id),
            EventSource::Sequence(_) => None,
        }
    }

    /// Detection target carried by a near-point event
    pub fn near_point(&self) -> Option<&DetectionTarget> {
        match &self.kind {
            MotionEventKind::NearPoint(target) => Some(target),
            _ => None,
        }
    }
}
