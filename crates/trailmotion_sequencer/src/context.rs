// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host capabilities the motion code runs against.
//!
//! The map library that draws segments is reached through two traits:
//! - [`Clock`] supplies wall-clock milliseconds
//! - [`MapSurface`] receives the drawn sub-path, marker and camera moves
//!
//! [`MotionContext`] bundles them with the next-frame scheduler and the
//! pending event queue. Frames are the only suspension point: a step either
//! finishes or requests one more frame, and the host pumps due frames once
//! per display refresh.

use crate::event::MotionEvent;
use crate::segment::SegmentId;
use indexmap::IndexMap;
use std::cell::{Cell, Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;
use trailmotion_geo::GeoPoint;

/// Source of wall-clock time
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin
    fn now_ms(&self) -> f64;
}

/// Monotonic clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock starting at zero now
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Manually advanced clock; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current time
    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    /// Move time forward
    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Drawing and camera operations of the host map
pub trait MapSurface {
    /// Replace the drawn sub-path of a segment
    fn set_path(&mut self, segment: SegmentId, points: &[GeoPoint]);
    /// Move the segment's marker
    fn draw_marker(&mut self, segment: SegmentId, at: GeoPoint);
    /// Re-center the view
    fn pan_to(&mut self, at: GeoPoint);
}

/// Surface that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSurface;

impl MapSurface for NullSurface {
    fn set_path(&mut self, _segment: SegmentId, _points: &[GeoPoint]) {}
    fn draw_marker(&mut self, _segment: SegmentId, _at: GeoPoint) {}
    fn pan_to(&mut self, _at: GeoPoint) {}
}

/// Everything a [`RecordingSurface`] has seen
#[derive(Debug, Clone, Default)]
pub struct SurfaceLog {
    /// Latest drawn sub-path per segment
    pub paths: HashMap<SegmentId, Vec<GeoPoint>>,
    /// Latest marker position per segment
    pub markers: HashMap<SegmentId, GeoPoint>,
    /// Every pan, in order
    pub pans: Vec<GeoPoint>,
    /// Number of `set_path` calls
    pub path_updates: usize,
}

/// Surface that records calls; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    log: Rc<RefCell<SurfaceLog>>,
}

impl RecordingSurface {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the log
    pub fn log(&self) -> Ref<'_, SurfaceLog> {
        self.log.borrow()
    }

    /// Drawn sub-path of a segment
    pub fn path(&self, segment: SegmentId) -> Vec<GeoPoint> {
        self.log.borrow().paths.get(&segment).cloned().unwrap_or_default()
    }

    /// Marker position of a segment
    pub fn marker(&self, segment: SegmentId) -> Option<GeoPoint> {
        self.log.borrow().markers.get(&segment).copied()
    }

    /// Number of pans so far
    pub fn pan_count(&self) -> usize {
        self.log.borrow().pans.len()
    }
}

impl MapSurface for RecordingSurface {
    fn set_path(&mut self, segment: SegmentId, points: &[GeoPoint]) {
        let mut log = self.log.borrow_mut();
        log.paths.insert(segment, points.to_vec());
        log.path_updates += 1;
    }

    fn draw_marker(&mut self, segment: SegmentId, at: GeoPoint) {
        self.log.borrow_mut().markers.insert(segment, at);
    }

    fn pan_to(&mut self, at: GeoPoint) {
        self.log.borrow_mut().pans.push(at);
    }
}

/// Handle of a requested frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(u64);

impl FrameHandle {
    /// Raw handle value
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Clock, surface, frame scheduler and event queue for motion code
pub struct MotionContext {
    clock: Box<dyn Clock>,
    surface: Box<dyn MapSurface>,
    next_frame: u64,
    /// Requested frames not yet delivered
    pending_frames: IndexMap<FrameHandle, SegmentId>,
    /// Events emitted since the last `take_events`
    pending_events: Vec<MotionEvent>,
}

impl MotionContext {
    /// Create a context from host capabilities
    pub fn new(clock: impl Clock + 'static, surface: impl MapSurface + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            surface: Box::new(surface),
            next_frame: 1,
            pending_frames: IndexMap::new(),
            pending_events: Vec::new(),
        }
    }

    /// Headless context with a manual clock and a recording surface.
    ///
    /// The returned clock and surface share state with the context.
    pub fn manual() -> (Self, ManualClock, RecordingSurface) {
        let clock = ManualClock::new();
        let surface = RecordingSurface::new();
        (Self::new(clock.clone(), surface.clone()), clock, surface)
    }

    /// Current time in milliseconds
    pub fn now(&self) -> f64 {
        self.clock.now_ms()
    }

    /// Host surface
    pub fn surface_mut(&mut self) -> &mut dyn MapSurface {
        self.surface.as_mut()
    }

    /// Schedule a frame for `owner`
    pub fn request_frame(&mut self, owner: SegmentId) -> FrameHandle {
        let handle = FrameHandle(self.next_frame);
        self.next_frame += 1;
        self.pending_frames.insert(handle, owner);
        handle
    }

    /// Cancel a scheduled frame. Returns false if it was not pending.
    pub fn cancel_frame(&mut self, handle: FrameHandle) -> bool {
        self.pending_frames.shift_remove(&handle).is_some()
    }

    /// Whether `handle` is still waiting to be delivered
    pub fn is_pending(&self, handle: FrameHandle) -> bool {
        self.pending_frames.contains_key(&handle)
    }

    /// Number of scheduled frames
    pub fn pending_frame_count(&self) -> usize {
        self.pending_frames.len()
    }

    /// Take every due frame, oldest first. Frames requested while the batch
    /// is processed wait for the next call.
    pub fn take_due_frames(&mut self) -> Vec<(FrameHandle, SegmentId)> {
        self.pending_frames.drain(..).collect()
    }

    /// Take the due frames of a single owner
    pub fn take_frames_for(&mut self, owner: SegmentId) -> Vec<FrameHandle> {
        let mut taken = Vec::new();
        self.pending_frames.retain(|handle, o| {
            if *o == owner {
                taken.push(*handle);
                false
            } else {
                true
            }
        });
        taken
    }

    /// Queue an event
    pub fn emit(&mut self, event: MotionEvent) {
        tracing::debug!("{} from {:?}", event.kind.name(), event.source);
        self.pending_events.push(event);
    }

    /// Events emitted so far, without draining
    pub fn events(&self) -> &[MotionEvent] {
        &self.pending_events
    }

    /// Get pending events and clear them
    pub fn take_events(&mut self) -> Vec<MotionEvent> {
        std::mem::take(&mut self.pending_events)
    }
}

impl Default for MotionContext {
    fn default() -> Self {
        Self::new(SystemClock::new(), NullSurface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_is_shared() {
        let (ctx, clock, _) = MotionContext::manual();
        clock.advance(16.0);
        clock.advance(4.0);
        assert_eq!(ctx.now(), 20.0);
    }

    #[test]
    fn test_frame_request_and_cancel() {
        let mut ctx = MotionContext::default();
        let owner = SegmentId::new();
        let a = ctx.request_frame(owner);
        let b = ctx.request_frame(owner);
        assert_ne!(a, b);
        assert!(ctx.cancel_frame(a));
        assert!(!ctx.cancel_frame(a));
        assert_eq!(ctx.take_due_frames(), vec![(b, owner)]);
        assert_eq!(ctx.pending_frame_count(), 0);
    }

    #[test]
    fn test_take_frames_for_leaves_other_owners() {
        let mut ctx = MotionContext::default();
        let mine = SegmentId::new();
        let other = SegmentId::new();
        let a = ctx.request_frame(mine);
        let b = ctx.request_frame(other);
        assert_eq!(ctx.take_frames_for(mine), vec![a]);
        assert!(ctx.is_pending(b));
    }

    #[test]
    fn test_recording_surface_shares_log() {
        let surface = RecordingSurface::new();
        let mut handle = surface.clone();
        let id = SegmentId::new();
        handle.set_path(id, &[GeoPoint::new(1.0, 1.0)]);
        handle.pan_to(GeoPoint::new(2.0, 2.0));
        assert_eq!(surface.path(id).len(), 1);
        assert_eq!(surface.pan_count(), 1);
        assert_eq!(surface.log().path_updates, 1);
    }
}
