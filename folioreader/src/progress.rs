//! Reading progress: which chapter is open and how far into it the reader is
//!
//! Scroll offsets become a per-chapter fraction in `[0, 1]`. The fraction is
//! held in memory as soon as it changes and written to the store on a
//! trailing-edge debounce, so a crash loses at most one debounce window of
//! movement. Chapter changes, the window being hidden and exit all flush
//! synchronously through [`ProgressTracker::flush_now`].

use crate::config::keys;
use crate::restore::ScrollRestore;
use foliocore::storage::{self, SharedStore};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Offsets closer than this are the same scroll position.
const OFFSET_TOLERANCE: f32 = 0.5;

/// A trailing-edge timer: every `arm` pushes the deadline out again.
#[derive(Debug, Clone)]
pub struct Debounce {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(window: Duration) -> Self {
        Self { window, deadline: None }
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// True exactly once, on the first call at or after the deadline.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }
}

/// Fraction of the scrollable range covered by `offset`. Content that fits
/// in the viewport has nothing to scroll and always reports 0.
pub fn scroll_fraction(offset: f32, viewport_height: f32, content_height: f32) -> f32 {
    let max_scroll = content_height - viewport_height;
    if max_scroll > 0.0 {
        (offset / max_scroll).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

pub struct ProgressTracker {
    store: SharedStore,
    total: usize,
    current: usize,
    fraction: f32,
    positions: BTreeMap<usize, f32>,
    debounce: Debounce,
    restore: Option<ScrollRestore>,
    last_offset: Option<f32>,
}

impl ProgressTracker {
    pub fn new(store: SharedStore, debounce_window: Duration) -> Self {
        let mut positions: BTreeMap<usize, f32> = storage::load_or_default(&*store, keys::SCROLL_POSITIONS);
        positions.retain(|ordinal, fraction| {
            let valid = fraction.is_finite() && (0.0..=1.0).contains(fraction);
            if !valid {
                log::warn!("ignoring saved scroll position {fraction} for chapter {ordinal}");
            }
            valid
        });
        Self {
            store,
            total: 0,
            current: 0,
            fraction: 0.0,
            positions,
            debounce: Debounce::new(debounce_window),
            restore: None,
            last_offset: None,
        }
    }

    /// Read the persisted chapter for a book of `total_chapters`. A value
    /// outside the book (it got shorter, or the record is corrupt) becomes 0.
    /// The chapter's saved fraction is queued for restoration.
    pub fn initialize(&mut self, total_chapters: usize) -> usize {
        self.total = total_chapters;
        let saved: usize = storage::load_or_default(&*self.store, keys::CHAPTER_INDEX);
        self.current = if total_chapters > 0 && saved >= total_chapters {
            log::info!("saved chapter {saved} is past the end of a {total_chapters}-chapter book, starting over");
            0
        } else {
            saved
        };
        self.enter_chapter();
        self.current
    }

    /// Turn a raw scroll offset into the current chapter's fraction. The value
    /// is live immediately; its write waits for the debounce.
    pub fn record_scroll(&mut self, offset: f32, viewport_height: f32, content_height: f32, now: Instant) -> f32 {
        self.fraction = scroll_fraction(offset, viewport_height, content_height);
        self.debounce.arm(now);
        self.fraction
    }

    /// Feed one frame of the reading view. While a restore is pending this
    /// drives it and returns the offset to scroll to once layout settles;
    /// otherwise it records the offset if it moved.
    pub fn observe_frame(&mut self, offset: f32, viewport_height: f32, content_height: f32, now: Instant) -> Option<f32> {
        if let Some(restore) = self.restore.as_mut() {
            let target = restore.observe(viewport_height, content_height)?;
            self.restore = None;
            self.last_offset = Some(target);
            return Some(target);
        }

        let moved = self
            .last_offset
            .map_or(true, |last| (last - offset).abs() > OFFSET_TOLERANCE);
        if moved {
            self.last_offset = Some(offset);
            self.record_scroll(offset, viewport_height, content_height, now);
        }
        None
    }

    /// Write the fraction if the debounce has run out. Otherwise report how
    /// long until it will, so the caller can schedule a wake-up.
    pub fn poll(&mut self, now: Instant) -> Option<Duration> {
        if self.debounce.fire(now) {
            self.persist_fraction();
            None
        } else {
            self.debounce.remaining(now)
        }
    }

    /// Write the current chapter's fraction right away.
    pub fn flush_now(&mut self) {
        self.debounce.cancel();
        self.persist_fraction();
    }

    /// Switch to chapter `ordinal`. Out-of-range ordinals are ignored.
    pub fn set_chapter(&mut self, ordinal: usize) -> bool {
        if ordinal >= self.total {
            return false;
        }
        self.flush_now();
        self.current = ordinal;
        if let Err(e) = storage::save(&*self.store, keys::CHAPTER_INDEX, &ordinal) {
            log::warn!("could not save chapter index: {e}");
        }
        self.enter_chapter();
        true
    }

    /// Switch to chapter `ordinal` and land at `fraction` instead of the
    /// chapter's saved position.
    pub fn jump_to(&mut self, ordinal: usize, fraction: f32) -> bool {
        if !self.set_chapter(ordinal) {
            return false;
        }
        self.fraction = fraction.clamp(0.0, 1.0);
        self.restore = Some(ScrollRestore::new(self.fraction));
        true
    }

    pub fn go_next(&mut self) -> bool {
        self.set_chapter(self.current + 1)
    }

    pub fn go_prev(&mut self) -> bool {
        match self.current.checked_sub(1) {
            Some(previous) => self.set_chapter(previous),
            None => false,
        }
    }

    /// Re-apply the current fraction after the content reflows (font size
    /// change), so the reader stays at the same place in the text.
    pub fn relayout(&mut self) {
        self.restore = Some(ScrollRestore::new(self.fraction));
    }

    pub fn current_chapter(&self) -> usize {
        self.current
    }

    pub fn total_chapters(&self) -> usize {
        self.total
    }

    pub fn chapter_fraction(&self) -> f32 {
        self.fraction
    }

    /// The last persisted fraction for a chapter, 0 if it was never read.
    pub fn saved_fraction(&self, ordinal: usize) -> f32 {
        self.positions.get(&ordinal).copied().unwrap_or(0.0)
    }

    pub fn restore_pending(&self) -> bool {
        self.restore.is_some()
    }

    #[cfg(test)]
    pub fn save_pending(&self) -> bool {
        self.debounce.is_armed()
    }

    pub fn book_progress(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        (self.current as f32 + self.fraction) / self.total as f32
    }

    fn enter_chapter(&mut self) {
        self.fraction = self.saved_fraction(self.current);
        self.restore = Some(ScrollRestore::new(self.fraction));
        self.last_offset = None;
    }

    fn persist_fraction(&mut self) {
        self.positions.insert(self.current, self.fraction);
        if let Err(e) = storage::save(&*self.store, keys::SCROLL_POSITIONS, &self.positions) {
            log::warn!("could not save scroll position: {e}");
        }
    }
}
