//! Repaint scheduling for folio
//!
//! egui only runs `update()` when something wakes it: input, or an explicit
//! repaint request. The reader has two kinds of internal wake-ups that input
//! alone would miss:
//!
//! 1. **One-shot**: state changed outside an input event (a book finished
//!    loading, a scroll restore is waiting for layout to settle). Repaint on
//!    the next opportunity.
//! 2. **Timed**: a deadline such as the scroll-save debounce. Repaint once
//!    the deadline passes so the pending work can run.
//!
//! Everything else is left idle.

use std::time::{Duration, Instant};

/// Why this frame is being painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepaintReason {
    /// First frame.
    Init,
    /// User input (pointer, key, scroll).
    Input,
    /// App-requested one-shot repaint.
    StateChange,
    /// A scheduled deadline came due.
    Timer,
}

/// Tracks pending wake-ups and turns them into egui repaint requests.
///
/// Call [`RepaintController::begin_frame`] at the top of `update()` and
/// [`RepaintController::end_frame`] at the bottom.
pub struct RepaintController {
    needs_repaint: bool,
    wake_at: Option<Instant>,
    frame: u64,
    reason: RepaintReason,
}

impl Default for RepaintController {
    fn default() -> Self {
        Self::new()
    }
}

impl RepaintController {
    pub fn new() -> Self {
        Self {
            needs_repaint: false,
            wake_at: None,
            frame: 0,
            reason: RepaintReason::Init,
        }
    }

    /// Request a single repaint on the next opportunity.
    pub fn mark_needs_repaint(&mut self) {
        self.needs_repaint = true;
    }

    /// Request a repaint once `delay` has elapsed. The earliest pending
    /// deadline wins.
    pub fn wake_after(&mut self, delay: Duration) {
        self.wake_at_instant(Instant::now() + delay);
    }

    fn wake_at_instant(&mut self, at: Instant) {
        self.wake_at = Some(match self.wake_at {
            Some(existing) if existing <= at => existing,
            _ => at,
        });
    }

    pub fn reason(&self) -> RepaintReason {
        self.reason
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Call at the **start** of `update()`.
    pub fn begin_frame(&mut self, ctx: &egui::Context) {
        let had_input = ctx.input(|i| {
            !i.events.is_empty()
                || i.pointer.any_pressed()
                || i.pointer.any_released()
                || i.raw_scroll_delta != egui::Vec2::ZERO
                || i.pointer.is_moving()
        });
        self.reason = self.classify(had_input, Instant::now());
        self.needs_repaint = false;
    }

    fn classify(&mut self, had_input: bool, now: Instant) -> RepaintReason {
        let timer_due = self.wake_at.map_or(false, |at| at <= now);
        if timer_due {
            self.wake_at = None;
        }
        if self.frame == 0 {
            RepaintReason::Init
        } else if had_input {
            RepaintReason::Input
        } else if timer_due {
            RepaintReason::Timer
        } else {
            RepaintReason::StateChange
        }
    }

    /// Call at the **end** of `update()`.
    pub fn end_frame(&mut self, ctx: &egui::Context) {
        self.frame += 1;
        match self.next_request(Instant::now()) {
            Some(Duration::ZERO) => ctx.request_repaint(),
            Some(delay) => ctx.request_repaint_after(delay),
            None => {}
        }
    }

    /// How long until the next repaint should happen, if one is needed.
    fn next_request(&self, now: Instant) -> Option<Duration> {
        if self.needs_repaint {
            return Some(Duration::ZERO);
        }
        self.wake_at.map(|at| at.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_controller_requests_nothing() {
        let rc = RepaintController::new();
        assert_eq!(rc.next_request(Instant::now()), None);
    }

    #[test]
    fn test_one_shot_beats_timer() {
        let mut rc = RepaintController::new();
        rc.wake_after(Duration::from_millis(400));
        rc.mark_needs_repaint();
        assert_eq!(rc.next_request(Instant::now()), Some(Duration::ZERO));
    }

    #[test]
    fn test_earliest_deadline_wins() {
        let mut rc = RepaintController::new();
        let now = Instant::now();
        rc.wake_at_instant(now + Duration::from_millis(500));
        rc.wake_at_instant(now + Duration::from_millis(200));
        rc.wake_at_instant(now + Duration::from_millis(900));
        assert_eq!(rc.next_request(now), Some(Duration::from_millis(200)));
    }

    #[test]
    fn test_due_timer_is_consumed() {
        let mut rc = RepaintController::new();
        let now = Instant::now();
        rc.frame = 3;
        rc.wake_at_instant(now);
        assert_eq!(rc.classify(false, now + Duration::from_millis(1)), RepaintReason::Timer);
        assert_eq!(rc.next_request(now), None);
    }

    #[test]
    fn test_first_frame_is_init() {
        let mut rc = RepaintController::new();
        assert_eq!(rc.classify(true, Instant::now()), RepaintReason::Init);
    }
}
