// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-frame motion stepping.

use crate::context::MotionContext;
use crate::event::{MotionEvent, MotionEventKind};
use crate::options::DetectPolicy;
use crate::segment::Segment;

/// Result of one frame step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Drew a frame and requested the next one
    Continued,
    /// The run reached its end; the segment is stopped
    Finished,
    /// A detection target fired and the segment halted on it
    Detected,
}

/// Advance `segment` by one frame.
///
/// The position is derived from the wall-clock time elapsed since the
/// segment's current run started, so a late frame catches up instead of
/// slowing the animation down.
pub(crate) fn step(segment: &mut Segment, ctx: &mut MotionContext) -> StepOutcome {
    let Some(run_start) = segment.run_start else {
        // Nothing to step; treat like a completed run
        segment.finish(ctx);
        return StepOutcome::Finished;
    };

    let elapsed = ctx.now() - run_start;
    let duration = segment.options.duration_ms();
    let ratio = if duration != 0.0 { elapsed / duration } else { 1.0 };

    // NaN ratios (zero-by-zero after a speed change) also end the run
    if !(ratio < 1.0) {
        segment.finish(ctx);
        return StepOutcome::Finished;
    }

    let eased = segment.options.easing.apply(ratio);
    let Some(at) = segment.path.point_at_ratio(eased) else {
        segment.finish(ctx);
        return StepOutcome::Finished;
    };
    tracing::trace!("Segment {:?} at {:.3} ({:.1} ms)", segment.id, eased, elapsed);

    segment.render_traveled(at, ctx);
    ctx.surface_mut().draw_marker(segment.id, at.point);

    if segment.options.follow_marker {
        ctx.surface_mut().pan_to(at.point);
    }

    let radius = segment.options.detect_radius_m;
    if let Some(target) = segment.options.detect.observe_head(at.point, radius) {
        ctx.emit(MotionEvent::segment(segment.id, MotionEventKind::NearPoint(target)));

        if segment.options.on_detect == DetectPolicy::Halt {
            segment.elapsed = Some(elapsed);
            segment.run_start = None;
            segment.animation = None;
            return StepOutcome::Detected;
        }
    }

    segment.elapsed = Some(elapsed);
    segment.animation = Some(ctx.request_frame(segment.id));
    StepOutcome::Continued
}
