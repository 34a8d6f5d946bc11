//! State shared between the control panel (UI thread) and the gesture loop.
//!
//! The panel owns an `Arc<SessionState>` and hands a clone to every worker it
//! spawns. The running flag is a plain atomic: the worker polls it once per
//! iteration, so a stop request may let one in-flight frame finish.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub const SMOOTHING_MIN: f32 = 0.1;
pub const SMOOTHING_MAX: f32 = 0.9;
pub const THRESHOLD_MIN: f32 = 10.0;
pub const THRESHOLD_MAX: f32 = 100.0;

/// Values the user tunes live from the panel; read by the loop every frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tuning {
    /// Weight of the newest sample in the exponential filter, in (0, 1).
    pub smoothing: f32,
    /// Pinch distance (camera pixels) under which a click fires.
    pub click_threshold: f32,
    /// Draw the hand skeleton on the preview. Visual only.
    pub show_landmarks: bool,
    /// Drive the OS pointer from the smoothed position instead of the raw fingertip.
    pub smooth_pointer: bool,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            smoothing: 0.5,
            click_threshold: 30.0,
            show_landmarks: true,
            smooth_pointer: true,
        }
    }
}

impl Tuning {
    pub fn set_smoothing(&mut self, v: f32) {
        self.smoothing = v.clamp(SMOOTHING_MIN, SMOOTHING_MAX);
    }

    pub fn set_click_threshold(&mut self, v: f32) {
        self.click_threshold = v.clamp(THRESHOLD_MIN, THRESHOLD_MAX);
    }
}

#[derive(Debug, Default)]
pub struct SessionState {
    running: AtomicBool,
    tuning: Mutex<Tuning>,
}

impl SessionState {
    pub fn new(tuning: Tuning) -> Self {
        Self { running: AtomicBool::new(false), tuning: Mutex::new(tuning) }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    /// Copy of the current tuning; the lock is held only for the copy.
    pub fn tuning(&self) -> Tuning {
        *self.tuning.lock()
    }

    pub fn update_tuning(&self, f: impl FnOnce(&mut Tuning)) {
        let mut guard = self.tuning.lock();
        f(&mut *guard);
    }
}
