// SPDX-License-Identifier: MIT OR Apache-2.0
//! A single animated path.

use crate::context::{FrameHandle, MotionContext};
use crate::event::{MotionEvent, MotionEventKind};
use crate::options::MotionOptions;
use crate::stepper::{step, StepOutcome};
use serde::{Deserialize, Serialize};
use trailmotion_geo::{Interpolated, Path};
use uuid::Uuid;

/// Unique identifier for a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    /// Create a new random segment ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

/// One path animated frame by frame.
///
/// While a run is live the segment holds the handle of its next requested
/// frame. Frames delivered with any other handle are stale and ignored, so a
/// stopped or rewound segment never steps again by accident.
#[derive(Debug)]
pub struct Segment {
    pub(crate) id: SegmentId,
    pub(crate) path: Path,
    pub(crate) options: MotionOptions,
    /// Sub-path drawn so far
    pub(crate) rendered: Path,
    /// Leading points of `rendered` that are vertices of `path`
    drawn_vertices: usize,
    /// Milliseconds into the current run as of the last frame
    pub(crate) elapsed: Option<f64>,
    /// Virtual wall-clock time the current run started at
    pub(crate) run_start: Option<f64>,
    /// Next requested frame while animating
    pub(crate) animation: Option<FrameHandle>,
    /// Started has been emitted without a matching Ended
    started: bool,
}

impl Segment {
    /// Create a new segment
    pub fn new(path: impl Into<Path>, options: MotionOptions) -> Self {
        Self {
            id: SegmentId::new(),
            path: path.into(),
            options,
            rendered: Path::empty(),
            drawn_vertices: 0,
            elapsed: None,
            run_start: None,
            animation: None,
            started: false,
        }
    }

    /// Segment ID
    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// Full path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Motion options
    pub fn options(&self) -> &MotionOptions {
        &self.options
    }

    /// Mutable motion options
    pub fn options_mut(&mut self) -> &mut MotionOptions {
        &mut self.options
    }

    /// Sub-path drawn so far
    pub fn rendered(&self) -> &Path {
        &self.rendered
    }

    /// Milliseconds into the current run, as of the last frame
    pub fn elapsed(&self) -> Option<f64> {
        self.elapsed
    }

    /// Handle of the pending frame
    pub fn frame(&self) -> Option<FrameHandle> {
        self.animation
    }

    /// Whether a frame is pending
    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Whether a run is live or paused partway
    pub fn has_started(&self) -> bool {
        self.animation.is_some() || self.elapsed.is_some_and(|e| e != 0.0)
    }

    /// Fraction of the run completed, by time
    pub fn progress(&self) -> f64 {
        let duration = self.options.duration_ms();
        match self.elapsed {
            Some(elapsed) if duration > 0.0 => (elapsed / duration).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// Start animating from the beginning of the path
    pub fn start(&mut self, ctx: &mut MotionContext) -> &mut Self {
        self.begin(ctx);
        self
    }

    pub(crate) fn begin(&mut self, ctx: &mut MotionContext) -> Option<StepOutcome> {
        if self.animation.is_some() {
            return None;
        }
        self.options.resolve_duration(&self.path);
        self.elapsed = None;
        self.clear(ctx);

        self.run_start = Some(ctx.now());
        self.started = true;
        ctx.emit(MotionEvent::segment(self.id, MotionEventKind::Started));
        Some(step(self, ctx))
    }

    /// Start as if `chunk_duration_ms` of the run had already passed and
    /// `partial` (a prefix of the path) had already been drawn.
    ///
    /// Does nothing while animating.
    pub fn start_at_chunk(
        &mut self,
        partial: impl Into<Path>,
        chunk_duration_ms: f64,
        ctx: &mut MotionContext,
    ) -> &mut Self {
        self.begin_at_chunk(partial.into(), chunk_duration_ms, ctx);
        self
    }

    pub(crate) fn begin_at_chunk(
        &mut self,
        partial: Path,
        chunk_duration_ms: f64,
        ctx: &mut MotionContext,
    ) -> Option<StepOutcome> {
        if self.animation.is_some() {
            return None;
        }
        self.options.resolve_duration(&self.path);
        let seed = self.elapsed.unwrap_or(0.0);

        self.drawn_vertices = partial.len();
        self.rendered = partial;
        ctx.surface_mut().set_path(self.id, self.rendered.points());

        self.run_start = Some(ctx.now() - seed - chunk_duration_ms);
        self.started = true;
        tracing::debug!(
            "Segment {:?} starting at chunk ({} points, {:.0} ms in)",
            self.id,
            self.rendered.len(),
            seed + chunk_duration_ms
        );
        ctx.emit(MotionEvent::segment(self.id, MotionEventKind::Started));
        Some(step(self, ctx))
    }

    /// Pause, keeping the elapsed time for [`Segment::resume`]
    pub fn pause(&mut self, ctx: &mut MotionContext) -> &mut Self {
        if let Some(handle) = self.animation.take() {
            ctx.cancel_frame(handle);
            self.run_start = None;
            ctx.emit(MotionEvent::segment(self.id, MotionEventKind::Paused));
        }
        self
    }

    /// Resume a paused run
    pub fn resume(&mut self, ctx: &mut MotionContext) -> &mut Self {
        self.proceed(ctx);
        self
    }

    pub(crate) fn proceed(&mut self, ctx: &mut MotionContext) -> Option<StepOutcome> {
        if self.animation.is_some() {
            return None;
        }
        let elapsed = self.elapsed.filter(|e| *e != 0.0)?;
        self.options.resolve_duration(&self.path);

        self.run_start = Some(ctx.now() - elapsed);
        self.started = true;
        ctx.emit(MotionEvent::segment(self.id, MotionEventKind::Resumed));
        Some(step(self, ctx))
    }

    /// Stop the run and draw the whole path. Stopping twice is a no-op.
    pub fn stop(&mut self, ctx: &mut MotionContext) -> &mut Self {
        let was_running = self.started || self.animation.is_some();
        self.halt(ctx);
        if was_running {
            self.fill(ctx);
            ctx.emit(MotionEvent::segment(self.id, MotionEventKind::Ended));
        }
        self
    }

    /// Stop silently: cancel the pending frame and reset timing, leaving the
    /// drawing untouched and emitting nothing
    pub fn halt(&mut self, ctx: &mut MotionContext) -> &mut Self {
        if let Some(handle) = self.animation.take() {
            ctx.cancel_frame(handle);
        }
        self.elapsed = None;
        self.run_start = None;
        self.started = false;
        self
    }

    /// Pause if animating, otherwise resume or start
    pub fn toggle(&mut self, ctx: &mut MotionContext) -> &mut Self {
        if self.animation.is_some() {
            self.pause(ctx)
        } else if self.has_started() {
            self.resume(ctx)
        } else {
            self.start(ctx)
        }
    }

    /// Set speed in km/h and derive the duration from it
    pub fn set_speed(&mut self, speed_kmh: f64) -> &mut Self {
        self.options.speed = Some(speed_kmh);
        self.options.duration = Some(self.path.duration_for_speed(speed_kmh));
        self
    }

    /// Set a fixed duration in milliseconds
    pub fn set_duration(&mut self, duration_ms: f64) -> &mut Self {
        self.options.duration = Some(duration_ms);
        self
    }

    /// Draw the whole path
    pub fn fill(&mut self, ctx: &mut MotionContext) -> &mut Self {
        self.rendered = self.path.clone();
        self.drawn_vertices = self.rendered.len();
        ctx.surface_mut().set_path(self.id, self.rendered.points());
        self
    }

    /// Draw nothing
    pub fn clear(&mut self, ctx: &mut MotionContext) -> &mut Self {
        self.rendered.clear();
        self.drawn_vertices = 0;
        ctx.surface_mut().set_path(self.id, &[]);
        self
    }

    /// Deliver a frame. Returns `None` for a stale handle.
    pub fn on_frame(&mut self, handle: FrameHandle, ctx: &mut MotionContext) -> Option<StepOutcome> {
        if self.animation != Some(handle) {
            tracing::trace!("Segment {:?} ignoring stale frame {}", self.id, handle.value());
            return None;
        }
        self.animation = None;
        Some(step(self, ctx))
    }

    /// Deliver this segment's due frames, for segments driven on their own
    pub fn tick(&mut self, ctx: &mut MotionContext) -> Option<StepOutcome> {
        let mut outcome = None;
        for handle in ctx.take_frames_for(self.id) {
            if let Some(o) = self.on_frame(handle, ctx) {
                outcome = Some(o);
            }
        }
        outcome
    }

    /// Natural end of a run
    pub(crate) fn finish(&mut self, ctx: &mut MotionContext) {
        self.halt(ctx);
        self.fill(ctx);
        ctx.emit(MotionEvent::segment(self.id, MotionEventKind::Ended));
    }

    /// Extend the drawing along the path up to `at`
    pub(crate) fn render_traveled(&mut self, at: Interpolated, ctx: &mut MotionContext) {
        let keep = at.predecessor + 1;
        let reuse = self.drawn_vertices.min(keep);
        self.rendered.truncate(reuse);
        for point in &self.path.points()[reuse..keep] {
            self.rendered.push(*point);
        }
        self.drawn_vertices = keep;
        if self.rendered.last() != Some(at.point) {
            self.rendered.push(at.point);
        }
        ctx.surface_mut().set_path(self.id, self.rendered.points());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ManualClock;
    use approx::assert_relative_eq;
    use trailmotion_geo::GeoPoint;

    /// 10 points due east along the equator, 0.001 degrees apart
    fn segment(duration_ms: f64) -> Segment {
        let points: Vec<GeoPoint> = (0..10).map(|i| GeoPoint::new(0.0, i as f64 * 0.001)).collect();
        Segment::new(points, MotionOptions::new().with_duration(duration_ms))
    }

    fn drive(seg: &mut Segment, ctx: &mut MotionContext, clock: &ManualClock, ms: f64) -> Option<StepOutcome> {
        clock.advance(ms);
        seg.tick(ctx)
    }

    #[test]
    fn test_start_draws_and_requests_frame() {
        let (mut ctx, clock, surface) = MotionContext::manual();
        let mut seg = segment(1000.0);
        seg.start(&mut ctx);
        assert!(seg.is_animating());
        assert!(ctx.is_pending(seg.frame().unwrap()));

        drive(&mut seg, &mut ctx, &clock, 500.0);
        assert_relative_eq!(seg.elapsed().unwrap(), 500.0);
        let marker = surface.marker(seg.id()).unwrap();
        assert_relative_eq!(marker.lng, 0.0045, epsilon = 1e-9);
        // Five vertices plus the moving tip
        assert_eq!(surface.path(seg.id()).len(), 6);
    }

    #[test]
    fn test_run_finishes_with_full_path() {
        let (mut ctx, clock, surface) = MotionContext::manual();
        let mut seg = segment(1000.0);
        seg.start(&mut ctx);
        assert_eq!(drive(&mut seg, &mut ctx, &clock, 1000.0), Some(StepOutcome::Finished));
        assert!(!seg.is_animating());
        assert_eq!(seg.elapsed(), None);
        assert_eq!(surface.path(seg.id()).len(), 10);

        let names: Vec<_> = ctx.take_events().iter().map(|e| e.kind.name()).collect();
        assert_eq!(names, vec!["motion-start", "motion-end"]);
    }

    #[test]
    fn test_zero_duration_is_instant() {
        let (mut ctx, _clock, _surface) = MotionContext::manual();
        let mut seg = Segment::new(segment(0.0).path().clone(), MotionOptions::new());
        seg.start(&mut ctx);
        assert!(!seg.is_animating());
        assert_eq!(seg.rendered().len(), 10);
    }

    #[test]
    fn test_pause_resume_keeps_position() {
        let (mut ctx, clock, _surface) = MotionContext::manual();
        let mut seg = segment(1000.0);
        seg.start(&mut ctx);
        drive(&mut seg, &mut ctx, &clock, 300.0);
        seg.pause(&mut ctx);
        assert!(!seg.is_animating());
        assert_eq!(ctx.pending_frame_count(), 0);

        clock.advance(5000.0);
        seg.resume(&mut ctx);
        assert!(seg.is_animating());
        assert_relative_eq!(seg.elapsed().unwrap(), 300.0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut ctx, _clock, _surface) = MotionContext::manual();
        let mut seg = segment(1000.0);
        seg.stop(&mut ctx);
        assert!(ctx.take_events().is_empty());

        seg.start(&mut ctx);
        ctx.take_events();
        seg.stop(&mut ctx).stop(&mut ctx);
        let events = ctx.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, MotionEventKind::Ended);
        assert!(!seg.is_animating());
        assert_eq!(seg.rendered().len(), 10);
    }

    #[test]
    fn test_stale_frame_is_ignored() {
        let (mut ctx, clock, _surface) = MotionContext::manual();
        let mut seg = segment(1000.0);
        seg.start(&mut ctx);
        let stale = seg.frame().unwrap();
        seg.halt(&mut ctx);
        seg.clear(&mut ctx);

        clock.advance(100.0);
        assert_eq!(seg.on_frame(stale, &mut ctx), None);
        assert!(seg.rendered().is_empty());
        assert!(!seg.is_animating());
    }

    #[test]
    fn test_start_at_chunk_resumes_at_boundary() {
        let (mut ctx, _clock, surface) = MotionContext::manual();
        let mut seg = segment(900.0);
        let chunk = seg.path().head(4);
        // Chunk covers 3 of 9 legs: a third of the run
        seg.start_at_chunk(chunk, 300.0, &mut ctx);
        assert!(seg.is_animating());
        assert_relative_eq!(seg.elapsed().unwrap(), 300.0);
        assert_relative_eq!(surface.marker(seg.id()).unwrap().lng, 0.003, epsilon = 1e-9);
    }

    #[test]
    fn test_toggle_cycles() {
        let (mut ctx, clock, _surface) = MotionContext::manual();
        let mut seg = segment(1000.0);
        seg.toggle(&mut ctx);
        assert!(seg.is_animating());
        drive(&mut seg, &mut ctx, &clock, 100.0);
        seg.toggle(&mut ctx);
        assert!(!seg.is_animating());
        seg.toggle(&mut ctx);
        assert!(seg.is_animating());
    }
}
