//! Deferred scroll restoration
//!
//! A saved scroll fraction only means something once the chapter's content
//! height is known, and that height is only known after layout. A
//! [`ScrollRestore`] watches the laid-out height frame by frame and yields the
//! target offset once the height stops changing.

/// Give up waiting for a stable height after this many frames.
const MAX_WAIT_FRAMES: u32 = 10;

/// Heights closer than this are the same layout.
const HEIGHT_TOLERANCE: f32 = 0.5;

#[derive(Clone, Debug, PartialEq)]
pub struct ScrollRestore {
    fraction: f32,
    last_height: Option<f32>,
    frames: u32,
}

impl ScrollRestore {
    pub fn new(fraction: f32) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
            last_height: None,
            frames: 0,
        }
    }

    #[cfg(test)]
    pub fn fraction(&self) -> f32 {
        self.fraction
    }

    /// Feed one frame's layout. Returns the scroll offset to apply once the
    /// content height has held still for two consecutive frames.
    pub fn observe(&mut self, viewport_height: f32, content_height: f32) -> Option<f32> {
        self.frames += 1;
        let stable = self
            .last_height
            .map_or(false, |h| (h - content_height).abs() < HEIGHT_TOLERANCE);
        self.last_height = Some(content_height);

        if stable || self.frames >= MAX_WAIT_FRAMES {
            let max_scroll = (content_height - viewport_height).max(0.0);
            Some(self.fraction * max_scroll)
        } else {
            None
        }
    }
}
