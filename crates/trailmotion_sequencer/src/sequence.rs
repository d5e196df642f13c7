// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequence of segments played back as one continuous path.
//!
//! The sequence is a small state machine: `Idle`, `Running` or `Paused`,
//! the latter two naming the active segment. Every transition goes through
//! [`Sequence::run_from`], which halts the previously active segment before
//! any drawing is touched, so at most one segment ever has a live frame.

use crate::context::MotionContext;
use crate::event::{MotionEvent, MotionEventKind};
use crate::segment::{Segment, SegmentId};
use crate::stepper::{step, StepOutcome};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use trailmotion_geo::{miles_to_meters, Path};
use uuid::Uuid;

/// Rewind distance used when none (or a non-positive one) is given
pub const DEFAULT_REWIND_MILES: f64 = 0.1;

/// Unique identifier for a sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceId(pub Uuid);

impl SequenceId {
    /// Create a new random sequence ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SequenceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceState {
    /// No active segment
    #[default]
    Idle,
    /// Active segment is stepping
    Running {
        /// Index of the active segment
        active: usize,
    },
    /// Active segment holds elapsed time but no live frame
    Paused {
        /// Index of the active segment
        active: usize,
    },
}

impl SequenceState {
    /// Index of the active segment
    pub fn active(&self) -> Option<usize> {
        match *self {
            SequenceState::Idle => None,
            SequenceState::Running { active } | SequenceState::Paused { active } => Some(active),
        }
    }

    /// Check if currently running
    pub fn is_running(&self) -> bool {
        matches!(self, SequenceState::Running { .. })
    }

    /// Check if currently paused
    pub fn is_paused(&self) -> bool {
        matches!(self, SequenceState::Paused { .. })
    }

    /// Check if idle
    pub fn is_idle(&self) -> bool {
        matches!(self, SequenceState::Idle)
    }
}

/// How the target segment of a transition begins
enum Entry {
    /// From an empty drawing
    Fresh,
    /// Partway, with `chunk` already drawn and its duration already spent
    Chunk { chunk: Path, duration_ms: f64 },
}

/// An ordered chain of segments animated one at a time
pub struct Sequence {
    /// Unique sequence ID
    pub id: SequenceId,
    /// Sequence name
    pub name: String,
    segments: IndexMap<SegmentId, Segment>,
    state: SequenceState,
    ctx: MotionContext,
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequence")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("segments", &self.segments)
            .field("pending_frames", &self.ctx.pending_frame_count())
            .finish_non_exhaustive()
    }
}

impl Sequence {
    /// Create an empty sequence driven by `ctx`
    pub fn new(name: impl Into<String>, ctx: MotionContext) -> Self {
        Self {
            id: SequenceId::new(),
            name: name.into(),
            segments: IndexMap::new(),
            state: SequenceState::Idle,
            ctx,
        }
    }

    /// Append a segment
    pub fn add_segment(&mut self, segment: Segment) -> SegmentId {
        let id = segment.id();
        self.segments.insert(id, segment);
        id
    }

    /// Remove a segment. Only allowed while idle.
    pub fn remove_segment(&mut self, id: SegmentId) -> Option<Segment> {
        if !self.state.is_idle() {
            tracing::warn!("Refusing to remove segment {:?} from a playing sequence", id);
            return None;
        }
        self.segments.shift_remove(&id)
    }

    /// Current state
    pub fn state(&self) -> SequenceState {
        self.state
    }

    /// Index of the active segment
    pub fn active_index(&self) -> Option<usize> {
        self.state.active()
    }

    /// Active segment
    pub fn active_segment(&self) -> Option<&Segment> {
        self.state.active().and_then(|i| self.segment(i))
    }

    /// Segment at `index`
    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get_index(index).map(|(_, s)| s)
    }

    /// Segment by ID
    pub fn segment_by_id(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(&id)
    }

    /// Position of a segment
    pub fn index_of(&self, id: SegmentId) -> Option<usize> {
        self.segments.get_index_of(&id)
    }

    /// All segments in order
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    /// Segment count
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether there are no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments with a live frame; never more than one
    pub fn animating_count(&self) -> usize {
        self.segments.values().filter(|s| s.is_animating()).count()
    }

    /// Total path length in meters
    pub fn total_length(&self) -> f64 {
        self.segments.values().map(|s| s.path().length()).sum()
    }

    /// Host context
    pub fn context(&self) -> &MotionContext {
        &self.ctx
    }

    /// Mutable host context
    pub fn context_mut(&mut self) -> &mut MotionContext {
        &mut self.ctx
    }

    /// Get pending events and clear them
    pub fn take_events(&mut self) -> Vec<MotionEvent> {
        self.ctx.take_events()
    }

    /// Start from the first segment. Only valid while idle.
    pub fn start(&mut self) -> &mut Self {
        if self.state.is_idle() && !self.is_empty() {
            self.reset_all();
            self.emit(MotionEventKind::Started);
            self.run_from(0, Entry::Fresh);
        }
        self
    }

    /// Start at segment `index`, drawing every earlier segment in full.
    ///
    /// An out-of-range index starts at 0. `fire_started` and `fire_ended`
    /// emit the skipped segments' start/end events for bookkeeping.
    pub fn start_at_index(&mut self, index: usize, fire_started: bool, fire_ended: bool) -> &mut Self {
        if self.is_empty() {
            return self;
        }
        let index = if index >= self.len() { 0 } else { index };
        tracing::debug!("Sequence {:?} starting at segment {}", self.id, index);

        self.deactivate();
        self.reset_all();

        for i in 0..index {
            let Some((_, seg)) = self.segments.get_index_mut(i) else { continue };
            seg.fill(&mut self.ctx);
            let id = seg.id();
            if fire_started {
                self.ctx.emit(MotionEvent::segment(id, MotionEventKind::Started));
            }
            if fire_ended {
                self.ctx.emit(MotionEvent::segment(id, MotionEventKind::Ended));
            }
        }

        self.emit(MotionEventKind::Started);
        self.run_from(index, Entry::Fresh);
        self
    }

    /// Pause the active segment
    pub fn pause(&mut self) -> &mut Self {
        if let SequenceState::Running { active } = self.state {
            if let Some((_, seg)) = self.segments.get_index_mut(active) {
                seg.pause(&mut self.ctx);
            }
            self.state = SequenceState::Paused { active };
            self.emit(MotionEventKind::Paused);
        }
        self
    }

    /// Resume the active segment.
    ///
    /// A segment that never got its first frame is started instead, which
    /// covers a resume issued before the initial frame was scheduled.
    pub fn resume(&mut self) -> &mut Self {
        let Some(active) = self.state.active() else {
            return self;
        };
        let Some((_, seg)) = self.segments.get_index_mut(active) else {
            return self;
        };

        let outcome = if seg.has_started() {
            seg.proceed(&mut self.ctx)
        } else {
            seg.begin(&mut self.ctx)
        };
        self.emit(MotionEventKind::Resumed);
        self.settle(active, outcome);
        self
    }

    /// Toggle between paused and running
    pub fn toggle(&mut self) -> &mut Self {
        match self.state {
            SequenceState::Idle => self.start(),
            SequenceState::Running { .. } => self.pause(),
            SequenceState::Paused { .. } => self.resume(),
        }
    }

    /// Stop playback and draw every segment in full
    pub fn stop(&mut self) -> &mut Self {
        if self.state.is_idle() {
            return self;
        }
        self.deactivate();
        for seg in self.segments.values_mut() {
            seg.fill(&mut self.ctx);
        }
        self.emit(MotionEventKind::Ended);
        self
    }

    /// Move back `count` segments (floored at the first) and start there
    /// from empty. `rewind(0)` restarts the active segment.
    pub fn rewind(&mut self, count: usize) -> &mut Self {
        let Some(current) = self.state.active() else {
            return self;
        };
        let target = current.saturating_sub(count);
        tracing::debug!("Sequence {:?} rewinding {} -> {}", self.id, current, target);

        self.deactivate();
        for i in (target..=current).rev() {
            if let Some((_, seg)) = self.segments.get_index_mut(i) {
                seg.clear(&mut self.ctx);
            }
        }

        self.emit(MotionEventKind::Started);
        self.run_from(target, Entry::Fresh);
        self
    }

    /// Move forward `count` segments (capped at the last), drawing the
    /// skipped segments in full, and start there from empty
    pub fn fast_forward(&mut self, count: usize) -> &mut Self {
        let Some(current) = self.state.active() else {
            return self;
        };
        let target = current.saturating_add(count).min(self.len().saturating_sub(1));
        tracing::debug!("Sequence {:?} fast-forwarding {} -> {}", self.id, current, target);

        self.deactivate();
        for i in current..=target {
            if let Some((_, seg)) = self.segments.get_index_mut(i) {
                seg.fill(&mut self.ctx);
            }
        }

        self.emit(MotionEventKind::Started);
        self.run_from(target, Entry::Fresh);
        self
    }

    /// Rewind by a travelled distance in miles.
    ///
    /// The distance is taken off the drawn sub-paths, walking backwards from
    /// the tip of the active segment into earlier segments as needed. The
    /// segment where the distance runs out restarts from the last vertex
    /// whose remaining drawn length exceeds what is left to recover. When no
    /// such vertex exists the rewind degrades to a restart of the active
    /// segment. Asking for more than the whole sequence has travelled
    /// restarts the sequence from its first segment.
    pub fn rewind_by_distance(&mut self, miles: f64) -> &mut Self {
        let Some(current) = self.state.active() else {
            return self;
        };
        let miles = if miles.is_finite() && miles > 0.0 { miles } else { DEFAULT_REWIND_MILES };
        let target_m = miles_to_meters(miles);

        let Some(active) = self.segment(current) else {
            return self;
        };
        let drawn = active.rendered().clone();
        let drawn_m = drawn.length();

        // Not enough distance anywhere: restart from the very beginning
        if current == 0 && drawn_m < target_m {
            return self.rewind(0);
        }

        // The active segment alone covers the distance
        if drawn_m >= target_m {
            let Some(boundary) = drawn.rewind_boundary(target_m) else {
                tracing::warn!("No rewind boundary within segment {}; restarting it", current);
                return self.rewind(0);
            };
            let chunk = drawn.head(boundary);
            let duration_ms = active.options().chunk_duration(&chunk, active.path());
            tracing::debug!(
                "Sequence {:?} rewinding {:.1} m within segment {} to vertex {}",
                self.id,
                target_m,
                current,
                boundary
            );

            self.deactivate();
            if let Some((_, seg)) = self.segments.get_index_mut(current) {
                seg.clear(&mut self.ctx);
            }
            self.emit(MotionEventKind::Started);
            self.run_from(current, Entry::Chunk { chunk, duration_ms });
            return self;
        }

        // Walk back through earlier segments until the deficit is covered
        let deficit = target_m - drawn_m;
        let mut consumed = 0.0;
        let mut drained = Vec::new();

        for i in (0..current).rev() {
            let Some(seg) = self.segment(i) else { break };
            let drawn = seg.rendered();
            if drawn.len() < 2 {
                tracing::warn!("Segment {} has no drawn distance to rewind into; restarting", i);
                return self.rewind(0);
            }

            if let Some(boundary) = drawn.rewind_boundary(deficit - consumed) {
                let chunk = drawn.head(boundary);
                let duration_ms = seg.options().chunk_duration(&chunk, seg.path());
                tracing::debug!(
                    "Sequence {:?} rewinding {:.1} m back into segment {} at vertex {}",
                    self.id,
                    target_m,
                    i,
                    boundary
                );

                self.deactivate();
                for j in std::iter::once(current).chain(drained) {
                    if let Some((_, seg)) = self.segments.get_index_mut(j) {
                        seg.clear(&mut self.ctx);
                    }
                }
                self.emit(MotionEventKind::Started);
                self.run_from(i, Entry::Chunk { chunk, duration_ms });
                return self;
            }

            consumed += drawn.length();
            drained.push(i);
        }

        tracing::warn!(
            "Rewind of {:.1} m exceeds the {:.1} m travelled; restarting the sequence",
            target_m,
            drawn_m + consumed
        );
        self.rewind(current)
    }

    /// Change every segment's speed (km/h).
    ///
    /// The active segment keeps its fractional position: its elapsed time is
    /// rescaled by `new_duration / old_duration`. A zero old duration makes
    /// that ratio non-finite, which ends the run on the next step.
    pub fn speed_change(&mut self, speed_kmh: f64) -> &mut Self {
        let Some(current) = self.state.active() else {
            return self;
        };
        let Some((_, active)) = self.segments.get_index_mut(current) else {
            return self;
        };

        let live = active.animation.take();
        if let Some(handle) = live {
            self.ctx.cancel_frame(handle);
        }
        let old_duration = active.options.duration_ms();
        let old_elapsed = active.elapsed;

        for seg in self.segments.values_mut() {
            seg.set_speed(speed_kmh);
        }

        let Some((_, active)) = self.segments.get_index_mut(current) else {
            return self;
        };
        let new_duration = active.options.duration_ms();
        let new_elapsed = old_elapsed.map(|e| e * new_duration / old_duration);
        tracing::debug!(
            "Sequence {:?} speed -> {} km/h ({:.0} ms -> {:.0} ms)",
            self.id,
            speed_kmh,
            old_duration,
            new_duration
        );

        if live.is_some() {
            active.run_start = Some(self.ctx.now() - new_elapsed.unwrap_or(0.0));
            let outcome = step(active, &mut self.ctx);
            self.settle(current, Some(outcome));
        } else {
            active.elapsed = new_elapsed;
        }
        self
    }

    /// Deliver due frames. Call once per display refresh.
    pub fn tick(&mut self) -> &mut Self {
        for (handle, owner) in self.ctx.take_due_frames() {
            let Some((index, _, seg)) = self.segments.get_full_mut(&owner) else {
                continue;
            };
            let outcome = seg.on_frame(handle, &mut self.ctx);
            if outcome.is_some() && self.state.active() == Some(index) {
                self.settle(index, outcome);
            }
        }
        self
    }

    fn emit(&mut self, kind: MotionEventKind) {
        self.ctx.emit(MotionEvent::sequence(self.id, kind));
    }

    /// Halt the active segment and go idle
    fn deactivate(&mut self) {
        if let Some(active) = self.state.active() {
            if let Some((_, seg)) = self.segments.get_index_mut(active) {
                seg.halt(&mut self.ctx);
            }
        }
        self.state = SequenceState::Idle;
    }

    /// Halt and clear every segment
    fn reset_all(&mut self) {
        for seg in self.segments.values_mut() {
            seg.halt(&mut self.ctx);
            seg.clear(&mut self.ctx);
        }
    }

    /// Activate segment `index`. The previously active segment is halted
    /// first, even when callers already did so.
    fn run_from(&mut self, index: usize, entry: Entry) {
        self.deactivate();
        let Some((_, seg)) = self.segments.get_index_mut(index) else {
            return;
        };
        let outcome = match entry {
            Entry::Fresh => seg.begin(&mut self.ctx),
            Entry::Chunk { chunk, duration_ms } => seg.begin_at_chunk(chunk, duration_ms, &mut self.ctx),
        };
        self.settle(index, outcome);
    }

    /// Update the state after the segment at `index` stepped. A finished
    /// segment hands over to the next one; the last one ends the sequence.
    fn settle(&mut self, mut index: usize, mut outcome: Option<StepOutcome>) {
        loop {
            match outcome {
                Some(StepOutcome::Continued) => {
                    self.state = SequenceState::Running { active: index };
                    return;
                }
                Some(StepOutcome::Detected) => {
                    self.state = SequenceState::Paused { active: index };
                    return;
                }
                None => {
                    let animating = self.segment(index).is_some_and(Segment::is_animating);
                    self.state = if animating {
                        SequenceState::Running { active: index }
                    } else {
                        SequenceState::Paused { active: index }
                    };
                    return;
                }
                Some(StepOutcome::Finished) => {
                    if index + 1 >= self.len() {
                        tracing::debug!("Sequence {:?} finished", self.id);
                        self.state = SequenceState::Idle;
                        self.emit(MotionEventKind::Ended);
                        return;
                    }
                    index += 1;
                    self.state = SequenceState::Idle;
                    let Some((_, seg)) = self.segments.get_index_mut(index) else {
                        return;
                    };
                    outcome = seg.begin(&mut self.ctx);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::MotionOptions;
    use crate::context::ManualClock;
    use trailmotion_geo::GeoPoint;

    /// Sequence of `n` segments, each 10 points 0.001 degrees apart along
    /// the equator, continuing where the previous one ended
    fn sequence(n: usize, duration_ms: f64) -> (Sequence, ManualClock) {
        let (ctx, clock, _surface) = MotionContext::manual();
        let mut seq = Sequence::new("test", ctx);
        for s in 0..n {
            let points: Vec<GeoPoint> = (0..10)
                .map(|i| GeoPoint::new(0.0, (s * 9 + i) as f64 * 0.001))
                .collect();
            seq.add_segment(Segment::new(points, MotionOptions::new().with_duration(duration_ms)));
        }
        (seq, clock)
    }

    #[test]
    fn test_start_runs_first_segment() {
        let (mut seq, _clock) = sequence(3, 1000.0);
        seq.start();
        assert_eq!(seq.state(), SequenceState::Running { active: 0 });
        assert_eq!(seq.animating_count(), 1);
    }

    #[test]
    fn test_finishing_segment_hands_over() {
        let (mut seq, clock) = sequence(2, 1000.0);
        seq.start();
        clock.advance(1000.0);
        seq.tick();
        assert_eq!(seq.state(), SequenceState::Running { active: 1 });
        assert_eq!(seq.segment(0).unwrap().rendered().len(), 10);

        clock.advance(1000.0);
        seq.tick();
        assert!(seq.state().is_idle());
        let last = seq.take_events().pop().unwrap();
        assert_eq!(last, MotionEvent::sequence(seq.id, MotionEventKind::Ended));
    }

    #[test]
    fn test_instant_segments_chain_without_recursion() {
        let (mut seq, _clock) = sequence(50, 0.0);
        seq.start();
        assert!(seq.state().is_idle());
        assert!(seq.segments().all(|s| s.rendered().len() == 10));
    }

    #[test]
    fn test_operations_without_active_segment_are_noops() {
        let (mut seq, _clock) = sequence(2, 1000.0);
        seq.resume().rewind(1).fast_forward(1).rewind_by_distance(1.0).speed_change(50.0).pause();
        assert!(seq.state().is_idle());
        assert!(seq.take_events().is_empty());
    }

    #[test]
    fn test_pause_and_resume() {
        let (mut seq, clock) = sequence(2, 1000.0);
        seq.start();
        clock.advance(250.0);
        seq.tick().pause();
        assert_eq!(seq.state(), SequenceState::Paused { active: 0 });
        assert_eq!(seq.animating_count(), 0);

        clock.advance(10_000.0);
        seq.resume();
        assert_eq!(seq.state(), SequenceState::Running { active: 0 });
        assert!((seq.active_segment().unwrap().elapsed().unwrap() - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_rewind_and_fast_forward_clamp() {
        let (mut seq, _clock) = sequence(4, 1000.0);
        seq.start_at_index(2, false, false);
        seq.rewind(10);
        assert_eq!(seq.active_index(), Some(0));
        assert!(seq.segment(1).unwrap().rendered().is_empty());

        seq.fast_forward(10);
        assert_eq!(seq.active_index(), Some(3));
        assert_eq!(seq.segment(2).unwrap().rendered().len(), 10);
        assert_eq!(seq.animating_count(), 1);
    }

    #[test]
    fn test_remove_segment_only_when_idle() {
        let (mut seq, _clock) = sequence(2, 1000.0);
        let id = seq.segment(1).unwrap().id();
        seq.start();
        assert!(seq.remove_segment(id).is_none());
        seq.stop();
        assert!(seq.remove_segment(id).is_some());
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn test_debug_shows_state_and_segments() {
        let (mut seq, _clock) = sequence(2, 1000.0);
        seq.start();
        let text = format!("{seq:?}");
        assert!(text.contains("name: \"test\""));
        assert!(text.contains("Running { active: 0 }"));
        assert!(text.contains("pending_frames: 1"));
    }

    #[test]
    fn test_stop_draws_everything() {
        let (mut seq, _clock) = sequence(3, 1000.0);
        seq.start().stop();
        assert!(seq.state().is_idle());
        assert!(seq.segments().all(|s| s.rendered().len() == 10));
        assert_eq!(seq.context().pending_frame_count(), 0);
    }
}
