// Turns one detected hand into a pointer target and a click decision.
// This is the only real math in the app: an exponential filter over the
// fingertip and a thumb-index pinch test.

use crate::detector::{HandLandmarks, landmarks};
use crate::pointer;
use crate::session::Tuning;
use crate::types::Point;

/// Exponential smoothing: `smoothed = f * current + (1 - f) * previous`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Smoother {
    prev: Point, // starts at (0,0)
}

impl Smoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample; returns the new smoothed value and remembers it.
    pub fn update(&mut self, current: Point, factor: f32) -> Point {
        let smoothed = Point::new(
            factor * current.x + (1.0 - factor) * self.prev.x,
            factor * current.y + (1.0 - factor) * self.prev.y,
        );
        self.prev = smoothed;
        smoothed
    }
}

/// Pinch distance in frame pixels between thumb tip and index tip.
pub fn pinch_distance(thumb: Point, index: Point) -> f32 {
    thumb.distance(index)
}

/// Click iff the pinch is strictly tighter than the threshold.
pub fn is_click(distance: f32, threshold: f32) -> bool {
    distance < threshold
}

/// What the loop should do for this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decision {
    /// Index fingertip in frame pixels.
    pub fingertip: Point,
    /// Smoothed fingertip in frame pixels; where the cursor indicator is drawn.
    pub smoothed: Point,
    /// Absolute OS pointer target in screen pixels.
    pub screen_target: (i32, i32),
    pub pinch_distance: f32,
    pub click: bool,
}

/// Per-session gesture state: just the smoothing filter.
/// A fresh tracker is made every time the loop starts.
#[derive(Debug, Default)]
pub struct GestureTracker {
    smoother: Smoother,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide pointer motion and click for `hand` seen in a `width` x `height` frame.
    pub fn decide(
        &mut self,
        hand: &HandLandmarks,
        width: usize,
        height: usize,
        tuning: &Tuning,
        screen: (i32, i32),
    ) -> Decision {
        let fingertip = hand.pixel(landmarks::INDEX_FINGER_TIP, width, height);
        let thumb = hand.pixel(landmarks::THUMB_TIP, width, height);

        let smoothed = self.smoother.update(fingertip, tuning.smoothing);

        let screen_target = if tuning.smooth_pointer && width > 0 && height > 0 {
            pointer::to_screen(smoothed.x / width as f32, smoothed.y / height as f32, screen)
        } else {
            let tip = hand.index_tip();
            pointer::to_screen(tip.x, tip.y, screen)
        };

        let distance = pinch_distance(thumb, fingertip);

        Decision {
            fingertip,
            smoothed,
            screen_target,
            pinch_distance: distance,
            click: is_click(distance, tuning.click_threshold),
        }
    }
}
