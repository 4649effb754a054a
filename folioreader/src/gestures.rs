//! Tap and swipe interpretation for the reading view
//!
//! Both are plain state machines fed with positions and instants, so the
//! thresholds can be tested without a window.

use std::time::{Duration, Instant};

/// Taps closer together than this count once.
pub const TAP_DEBOUNCE: Duration = Duration::from_millis(300);

/// Share of the width, measured from each side, where a swipe may start.
pub const SWIPE_EDGE_ZONE: f32 = 0.5;

/// Minimum horizontal travel for a swipe, in points.
pub const SWIPE_MIN_DX: f32 = 60.0;

/// Horizontal travel must beat vertical travel by this factor.
pub const SWIPE_DOMINANCE: f32 = 1.5;

/// Travel below this is a tap, not a drag.
pub const TAP_SLOP: f32 = 8.0;

/// What sat under the pointer when a tap landed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TapTarget {
    /// Some text is currently selected.
    pub selection_active: bool,
    /// The tap hit a button, link or panel rather than the page.
    pub interactive: bool,
}

#[derive(Debug)]
pub struct TapFilter {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl Default for TapFilter {
    fn default() -> Self {
        Self::new(TAP_DEBOUNCE)
    }
}

impl TapFilter {
    pub fn new(window: Duration) -> Self {
        Self { window, last_accepted: None }
    }

    /// True when the tap should toggle the chapter bars.
    pub fn on_tap(&mut self, now: Instant, target: TapTarget) -> bool {
        if target.selection_active || target.interactive {
            return false;
        }
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Swipe {
    Next,
    Prev,
}

/// How a press-move-release sequence ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureEnd {
    Tap,
    Swipe(Swipe),
    /// Moved, but not enough (or not straight enough) for a swipe.
    Drag,
}

/// Classify a finished stroke. `start_x` and `width` decide the edge zone.
pub fn classify_swipe(start_x: f32, width: f32, dx: f32, dy: f32) -> Option<Swipe> {
    let zone = width * SWIPE_EDGE_ZONE;
    let from_edge = start_x <= zone || start_x >= width - zone;
    if !from_edge || dx.abs() < SWIPE_MIN_DX || dx.abs() < SWIPE_DOMINANCE * dy.abs() {
        return None;
    }
    Some(if dx < 0.0 { Swipe::Next } else { Swipe::Prev })
}

#[derive(Clone, Copy, Debug)]
struct Stroke {
    start: (f32, f32),
    last: (f32, f32),
    width: f32,
}

#[derive(Debug, Default)]
pub struct SwipeTracker {
    stroke: Option<Stroke>,
}

impl SwipeTracker {
    pub fn begin(&mut self, x: f32, y: f32, width: f32) {
        self.stroke = Some(Stroke { start: (x, y), last: (x, y), width });
    }

    pub fn update(&mut self, x: f32, y: f32) {
        if let Some(stroke) = self.stroke.as_mut() {
            stroke.last = (x, y);
        }
    }

    pub fn cancel(&mut self) {
        self.stroke = None;
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.stroke.is_some()
    }

    #[cfg(test)]
    pub fn end(&mut self) -> Option<Swipe> {
        match self.finish()? {
            GestureEnd::Swipe(swipe) => Some(swipe),
            _ => None,
        }
    }

    /// End the stroke and say what it was. `None` if no stroke was started.
    pub fn finish(&mut self) -> Option<GestureEnd> {
        let stroke = self.stroke.take()?;
        let dx = stroke.last.0 - stroke.start.0;
        let dy = stroke.last.1 - stroke.start.1;
        if dx.hypot(dy) < TAP_SLOP {
            return Some(GestureEnd::Tap);
        }
        Some(match classify_swipe(stroke.start.0, stroke.width, dx, dy) {
            Some(swipe) => GestureEnd::Swipe(swipe),
            None => GestureEnd::Drag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: TapTarget = TapTarget { selection_active: false, interactive: false };

    #[test]
    fn test_tap_toggles_once_per_window() {
        let mut filter = TapFilter::default();
        let t0 = Instant::now();
        assert!(filter.on_tap(t0, PAGE));
        assert!(!filter.on_tap(t0 + Duration::from_millis(150), PAGE));
        assert!(!filter.on_tap(t0 + Duration::from_millis(299), PAGE));
        assert!(filter.on_tap(t0 + Duration::from_millis(300), PAGE));
    }

    #[test]
    fn test_tap_ignored_on_selection_or_controls() {
        let mut filter = TapFilter::default();
        let t0 = Instant::now();
        assert!(!filter.on_tap(t0, TapTarget { selection_active: true, interactive: false }));
        assert!(!filter.on_tap(t0, TapTarget { selection_active: false, interactive: true }));
        // Rejected taps do not start the debounce window
        assert!(filter.on_tap(t0 + Duration::from_millis(10), PAGE));
    }

    #[test]
    fn test_swipe_direction() {
        assert_eq!(classify_swipe(900.0, 1000.0, -120.0, 10.0), Some(Swipe::Next));
        assert_eq!(classify_swipe(50.0, 1000.0, 120.0, -10.0), Some(Swipe::Prev));
    }

    #[test]
    fn test_swipe_thresholds() {
        assert_eq!(classify_swipe(900.0, 1000.0, -59.0, 0.0), None);
        assert_eq!(classify_swipe(900.0, 1000.0, -60.0, 0.0), Some(Swipe::Next));
        // Too diagonal
        assert_eq!(classify_swipe(900.0, 1000.0, -90.0, 61.0), None);
        assert_eq!(classify_swipe(900.0, 1000.0, -90.0, 60.0), Some(Swipe::Next));
    }

    #[test]
    fn test_tracker_strokes() {
        let mut tracker = SwipeTracker::default();
        assert_eq!(tracker.finish(), None);

        tracker.begin(700.0, 300.0, 800.0);
        tracker.update(650.0, 305.0);
        tracker.update(560.0, 310.0);
        assert_eq!(tracker.end(), Some(Swipe::Next));
        assert!(!tracker.is_active());

        tracker.begin(400.0, 300.0, 800.0);
        tracker.update(403.0, 302.0);
        assert_eq!(tracker.finish(), Some(GestureEnd::Tap));

        tracker.begin(400.0, 100.0, 800.0);
        tracker.update(420.0, 400.0);
        assert_eq!(tracker.finish(), Some(GestureEnd::Drag));

        tracker.begin(10.0, 10.0, 800.0);
        tracker.cancel();
        tracker.update(300.0, 10.0);
        assert_eq!(tracker.end(), None);
    }
}
