//! The control panel: live preview on top, a strip of controls underneath.
//!
//! Everything here runs on the UI thread. The gesture worker is reached only
//! through `SessionState` (stop flag + tuning) and the `LoopInbox` channels.

use crate::camera;
use crate::config::Config;
use crate::draw::{self, Drawer};
use crate::error::Error;
use crate::gesture_loop::{self, LoopEvent, LoopInbox, LoopOutput, STATUS_NO_CAMERA};
use crate::session::{self, SessionState};
use crate::types::{FrameBuffer, Rect};
use minifb::Key;
use std::sync::Arc;
use std::thread::JoinHandle;

pub const PANEL_H: usize = 130;

pub const STATUS_READY: &str = "Ready to start virtual mouse control";
pub const STATUS_RUNNING: &str = "Virtual mouse is running... Move your hand!";
pub const STATUS_STOPPED: &str = "Virtual mouse stopped";
const INSTRUCTIONS: &str =
    "Point to move, pinch to click. S start  X stop  L landmarks  [ ] smoothing  -/= threshold  Q quit";

const BG: u32 = 0x00_2D_37_48;
const STRIP: u32 = 0x00_4A_55_68;
const TEXT: u32 = 0x00_FF_FF_FF;
const MUTED: u32 = 0x00_A0_AE_C0;
const GREEN: u32 = 0x00_48_BB_78;
const RED: u32 = 0x00_F5_65_65;
const DISABLED: u32 = 0x00_71_80_96;

const SMOOTHING_STEP: f32 = 0.05;
const THRESHOLD_STEP: f32 = 5.0;

/// Horizontal slider track mapping x positions to a value range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Slider {
    pub track: Rect,
    pub min: f32,
    pub max: f32,
}

impl Slider {
    /// Value under window x, clamped to the track ends.
    pub fn value_at(&self, x: i32) -> f32 {
        let t = (x - self.track.x) as f32 / (self.track.w - 1).max(1) as f32;
        self.min + t.clamp(0.0, 1.0) * (self.max - self.min)
    }

    /// Window x of the knob for `value`.
    pub fn knob_x(&self, value: f32) -> i32 {
        let t = ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        self.track.x + (t * (self.track.w - 1) as f32).round() as i32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Drag {
    Smoothing,
    Threshold,
}

/// Where every widget sits, for a strip starting at window y = `top`.
#[derive(Clone, Copy, Debug)]
pub struct Layout {
    pub preview: Rect,
    pub start: Rect,
    pub stop: Rect,
    pub landmarks: Rect,
    pub smoothing: Slider,
    pub threshold: Slider,
    pub status: Rect,
    pub instructions_y: i32,
}

impl Layout {
    pub fn new(width: usize, preview_h: usize) -> Self {
        let top = preview_h as i32;
        let w = width as i32;
        Self {
            preview: Rect::new(0, 0, w, top),
            start: Rect::new(10, top + 10, 110, 24),
            stop: Rect::new(130, top + 10, 110, 24),
            landmarks: Rect::new(260, top + 15, 14, 14),
            smoothing: Slider {
                track: Rect::new(100, top + 48, 180, 12),
                min: session::SMOOTHING_MIN,
                max: session::SMOOTHING_MAX,
            },
            threshold: Slider {
                track: Rect::new(w - 200, top + 48, 180, 12),
                min: session::THRESHOLD_MIN,
                max: session::THRESHOLD_MAX,
            },
            status: Rect::new(10, top + 72, w - 20, 20),
            instructions_y: top + 106,
        }
    }
}

/// Panel state minus the window, so it can be driven without a display.
pub struct PanelCore {
    cfg: Config,
    session: Arc<SessionState>,
    out: LoopOutput,
    inbox: LoopInbox,
    worker: Option<JoinHandle<()>>,
    /// Number of the current (or last) worker; bumped on every start.
    run: u64,
    camera_available: bool,
    status: String,
    preview: FrameBuffer,
}

impl PanelCore {
    pub fn new(cfg: Config) -> Self {
        let session = Arc::new(SessionState::new(cfg.tuning));
        let (out, inbox) = gesture_loop::channel();
        let preview = FrameBuffer::blank(cfg.worker.width as usize, cfg.worker.height as usize);
        Self {
            cfg,
            session,
            out,
            inbox,
            worker: None,
            run: 0,
            camera_available: true,
            status: STATUS_READY.to_string(),
            preview,
        }
    }

    /// Open the camera once so the idle panel has a picture (or an error).
    pub fn load_preview(&mut self) {
        let w = &self.cfg.worker;
        match camera::grab_preview(w.camera_index, w.width, w.height) {
            Ok(frame) => self.update_frame(frame),
            Err(e) => {
                log::error!("{e}");
                self.camera_available = false;
                self.status = STATUS_NO_CAMERA.to_string();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// (start enabled, stop enabled)
    pub fn controls_enabled(&self) -> (bool, bool) {
        let running = self.is_running();
        (self.camera_available && !running, running)
    }

    pub fn start(&mut self) {
        if !self.camera_available {
            self.status = STATUS_NO_CAMERA.to_string();
            return;
        }
        if self.is_running() {
            return;
        }
        // A worker from the previous run may still be finishing its last frame.
        self.join_worker();
        self.discard_pending();

        self.run += 1;
        self.session.set_running(true);
        match gesture_loop::spawn(
            self.cfg.worker.clone(),
            self.run,
            self.session.clone(),
            self.out.clone(),
        ) {
            Ok(handle) => {
                self.worker = Some(handle);
                self.status = STATUS_RUNNING.to_string();
                log::info!("virtual mouse started");
            }
            Err(e) => {
                self.session.set_running(false);
                log::error!("{e}");
                self.status = format!("Error: {e}");
            }
        }
    }

    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        self.session.set_running(false);
        self.status = STATUS_STOPPED.to_string();
        log::info!("virtual mouse stop requested");
    }

    /// Show a frame from the worker.
    pub fn update_frame(&mut self, frame: FrameBuffer) {
        self.preview = frame;
    }

    /// Drain everything the worker has sent since the last call.
    pub fn pump(&mut self) {
        if let Some(frame) = self.inbox.frames.try_iter().last() {
            self.update_frame(frame);
        }
        while let Ok(event) = self.inbox.events.try_recv() {
            match event {
                // A late status from a worker that was just told to stop must
                // not overwrite "stopped".
                LoopEvent::Status(s) if self.is_running() => self.status = s,
                LoopEvent::Status(_) => {}
                LoopEvent::Stopped { run, exit } if run == self.run => {
                    self.join_worker();
                    if let Some(msg) = exit.status() {
                        self.status = msg;
                    }
                }
                LoopEvent::Stopped { run, .. } => {
                    log::debug!("ignoring stop from earlier run {run}");
                }
            }
        }
    }

    /// Throw away whatever a finished worker left in the channels.
    fn discard_pending(&mut self) {
        let frames = self.inbox.frames.try_iter().count();
        let events = self.inbox.events.try_iter().count();
        if frames + events > 0 {
            log::debug!("discarded {frames} frame(s) and {events} event(s) from the last run");
        }
    }

    /// Stop the worker and wait for it, so the camera is released.
    pub fn close(&mut self) {
        self.stop();
        self.join_worker();
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("gesture thread panicked");
            }
        }
    }

    fn nudge_smoothing(&self, delta: f32) {
        self.session.update_tuning(|t| t.set_smoothing(t.smoothing + delta));
    }

    fn nudge_threshold(&self, delta: f32) {
        self.session.update_tuning(|t| t.set_click_threshold(t.click_threshold + delta));
    }

    fn toggle_landmarks(&self) {
        self.session.update_tuning(|t| t.show_landmarks = !t.show_landmarks);
    }

    /// Paint preview + control strip into `screen`.
    pub fn render(&self, screen: &mut FrameBuffer, layout: &Layout) {
        for p in screen.pixels.iter_mut() {
            *p = BG;
        }
        blit(screen, &self.preview);

        let strip = Rect::new(0, layout.preview.h, screen.width as i32, PANEL_H as i32);
        draw::fill_rect(screen, strip, STRIP);

        let (start_on, stop_on) = self.controls_enabled();
        draw_button(screen, layout.start, "Start", GREEN, start_on);
        draw_button(screen, layout.stop, "Stop", RED, stop_on);

        let tuning = self.session.tuning();
        draw::fill_rect(screen, layout.landmarks, BG);
        draw::stroke_rect(screen, layout.landmarks, TEXT);
        if tuning.show_landmarks {
            let inner = Rect::new(layout.landmarks.x + 3, layout.landmarks.y + 3, 8, 8);
            draw::fill_rect(screen, inner, GREEN);
        }
        draw::draw_text_5x7(screen, layout.landmarks.x + 20, layout.landmarks.y + 4, "Show Hand Landmarks", TEXT);

        draw_slider(screen, &layout.smoothing, "Smoothing:", tuning.smoothing, &format!("{:.2}", tuning.smoothing));
        draw_slider(screen, &layout.threshold, "Threshold:", tuning.click_threshold, &format!("{:.0}", tuning.click_threshold));

        draw::fill_rect(screen, layout.status, BG);
        draw::stroke_rect(screen, layout.status, MUTED);
        draw::draw_text_5x7(screen, layout.status.x + 6, layout.status.y + 7, &self.status, GREEN);

        draw::draw_text_5x7(screen, 10, layout.instructions_y, INSTRUCTIONS, MUTED);
    }
}

/// Copy `src` into the top-left of `dst`, clipped.
fn blit(dst: &mut FrameBuffer, src: &FrameBuffer) {
    let w = src.width.min(dst.width);
    let h = src.height.min(dst.height);
    for y in 0..h {
        let s = y * src.width;
        let d = y * dst.width;
        dst.pixels[d..d + w].copy_from_slice(&src.pixels[s..s + w]);
    }
}

fn draw_button(fb: &mut FrameBuffer, r: Rect, label: &str, color: u32, enabled: bool) {
    draw::fill_rect(fb, r, if enabled { color } else { DISABLED });
    draw::stroke_rect(fb, r, TEXT);
    let tx = r.x + (r.w - draw::text_width(label)) / 2;
    draw::draw_text_5x7(fb, tx, r.y + (r.h - 7) / 2, label, TEXT);
}

fn draw_slider(fb: &mut FrameBuffer, s: &Slider, label: &str, value: f32, shown: &str) {
    draw::draw_text_5x7(fb, s.track.x - draw::text_width(label) - 8, s.track.y + 3, label, TEXT);
    let groove = Rect::new(s.track.x, s.track.y + s.track.h / 2 - 1, s.track.w, 3);
    draw::fill_rect(fb, groove, MUTED);
    let kx = s.knob_x(value);
    draw::fill_rect(fb, Rect::new(kx - 3, s.track.y, 7, s.track.h), TEXT);
    draw::draw_text_5x7(fb, s.track.x + s.track.w + 6, s.track.y + 3, shown, TEXT);
}

/// The window plus its core. Owns the UI thread's event loop.
pub struct ControlPanel {
    drawer: Drawer,
    core: PanelCore,
    layout: Layout,
    screen: FrameBuffer,
    mouse_was_down: bool,
    drag: Option<Drag>,
}

impl ControlPanel {
    pub fn new(cfg: Config) -> Result<Self, Error> {
        let mut core = PanelCore::new(cfg);
        core.load_preview();

        let width = core.preview.width.max(640);
        let preview_h = core.preview.height;
        let height = preview_h + PANEL_H;
        let drawer = Drawer::new("Virtual Mouse Control", width, height)?;

        Ok(Self {
            drawer,
            core,
            layout: Layout::new(width, preview_h),
            screen: FrameBuffer::blank(width, height),
            mouse_was_down: false,
            drag: None,
        })
    }

    /// Run until the window is closed or Q/ESC is pressed.
    pub fn run(mut self) -> Result<(), Error> {
        while self.drawer.is_open() && !self.drawer.quit_pressed() {
            self.handle_keys();
            self.handle_mouse();
            self.core.pump();

            self.core.render(&mut self.screen, &self.layout);
            if let Err(e) = self.drawer.present(&self.screen) {
                // Window torn down under us; treat like a close.
                log::warn!("{e}");
                break;
            }
        }
        self.core.close();
        log::info!("control panel closed");
        Ok(())
    }

    fn handle_keys(&mut self) {
        let d = &self.drawer;
        if d.pressed_once(Key::S) {
            self.core.start();
        }
        if d.pressed_once(Key::X) {
            self.core.stop();
        }
        if d.pressed_once(Key::L) {
            self.core.toggle_landmarks();
        }
        if d.pressed_repeat(Key::LeftBracket) {
            self.core.nudge_smoothing(-SMOOTHING_STEP);
        }
        if d.pressed_repeat(Key::RightBracket) {
            self.core.nudge_smoothing(SMOOTHING_STEP);
        }
        if d.pressed_repeat(Key::Minus) {
            self.core.nudge_threshold(-THRESHOLD_STEP);
        }
        if d.pressed_repeat(Key::Equal) {
            self.core.nudge_threshold(THRESHOLD_STEP);
        }
    }

    fn handle_mouse(&mut self) {
        let down = self.drawer.left_mouse_down();
        let pressed = down && !self.mouse_was_down;
        self.mouse_was_down = down;

        if !down {
            self.drag = None;
            return;
        }
        let Some((mx, my)) = self.drawer.mouse_pos() else { return };

        if pressed {
            let l = self.layout;
            let (start_on, stop_on) = self.core.controls_enabled();
            if l.start.contains(mx, my) && start_on {
                self.core.start();
            } else if l.stop.contains(mx, my) && stop_on {
                self.core.stop();
            } else if l.landmarks.contains(mx, my) {
                self.core.toggle_landmarks();
            } else if l.smoothing.track.contains(mx, my) {
                self.drag = Some(Drag::Smoothing);
            } else if l.threshold.track.contains(mx, my) {
                self.drag = Some(Drag::Threshold);
            }
        }

        match self.drag {
            Some(Drag::Smoothing) => {
                let v = self.layout.smoothing.value_at(mx);
                self.core.session.update_tuning(|t| t.set_smoothing(v));
            }
            Some(Drag::Threshold) => {
                let v = self.layout.threshold.value_at(mx).round();
                self.core.session.update_tuning(|t| t.set_click_threshold(v));
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Args;
    use crate::gesture_loop::LoopExit;
    use clap::Parser;
    use std::thread;
    use std::time::Duration;

    fn core() -> PanelCore {
        let args = Args::try_parse_from(["finger-mouse"]).unwrap();
        PanelCore::new(Config::from_args(&args).unwrap())
    }

    #[test]
    fn slider_maps_track_to_range() {
        let s = Slider { track: Rect::new(100, 0, 181, 10), min: 10.0, max: 100.0 };
        assert_eq!(s.value_at(100), 10.0);
        assert_eq!(s.value_at(280), 100.0);
        assert_eq!(s.value_at(190), 55.0);
        assert_eq!(s.value_at(0), 10.0);
        assert_eq!(s.value_at(999), 100.0);
        assert_eq!(s.knob_x(55.0), 190);
    }

    #[test]
    fn widgets_do_not_overlap() {
        let l = Layout::new(640, 480);
        let rects = [l.start, l.stop, l.landmarks, l.smoothing.track, l.threshold.track, l.status];
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                let overlap = a.x < b.x + b.w && b.x < a.x + a.w && a.y < b.y + b.h && b.y < a.y + a.h;
                assert!(!overlap, "{a:?} overlaps {b:?}");
            }
        }
        assert!(l.instructions_y + 7 <= (480 + PANEL_H) as i32);
    }

    #[test]
    fn idle_panel_offers_start_only() {
        let c = core();
        assert_eq!(c.status(), STATUS_READY);
        assert_eq!(c.controls_enabled(), (true, false));
    }

    #[test]
    fn missing_camera_blocks_start() {
        let mut c = core();
        c.camera_available = false;
        c.start();
        assert!(!c.is_running());
        assert_eq!(c.status(), STATUS_NO_CAMERA);
        assert_eq!(c.controls_enabled(), (false, false));
    }

    #[test]
    fn late_status_after_stop_is_ignored() {
        let mut c = core();
        c.session.set_running(true);
        c.stop();
        c.out.event(LoopEvent::Status("Click detected!".into()));
        c.pump();
        assert_eq!(c.status(), STATUS_STOPPED);
    }

    #[test]
    fn running_status_comes_from_the_worker() {
        let mut c = core();
        c.session.set_running(true);
        c.out.event(LoopEvent::Status("Hand detected - Moving mouse cursor".into()));
        c.pump();
        assert_eq!(c.status(), "Hand detected - Moving mouse cursor");
        assert_eq!(c.controls_enabled(), (false, true));
    }

    #[test]
    fn stream_end_returns_panel_to_stopped() {
        let mut c = core();
        c.out.event(LoopEvent::Stopped {
            run: 0,
            exit: LoopExit::StreamEnded("Fetch frame: gone".into()),
        });
        c.pump();
        assert!(!c.is_running());
        assert!(c.status().starts_with("Camera stream ended"));
        assert_eq!(c.controls_enabled(), (true, false));
    }

    #[test]
    fn stop_from_earlier_run_leaves_current_worker_alone() {
        let mut c = core();
        // Run 1 stopped but its event was not pumped before run 2 started.
        c.out.event(LoopEvent::Stopped {
            run: 1,
            exit: LoopExit::StreamEnded("Fetch frame: gone".into()),
        });
        c.run = 2;
        c.session.set_running(true);
        c.status = STATUS_RUNNING.to_string();
        let s = c.session.clone();
        c.worker = Some(thread::spawn(move || {
            while s.is_running() {
                thread::sleep(Duration::from_millis(1));
            }
        }));

        c.pump();
        assert!(c.worker.is_some());
        assert!(c.is_running());
        assert_eq!(c.status(), STATUS_RUNNING);

        c.close();
        assert!(c.worker.is_none());
    }

    #[test]
    fn leftovers_from_last_run_are_discarded() {
        let mut c = core();
        c.out.frame(FrameBuffer::blank(640, 480));
        c.out.event(LoopEvent::Status("Click detected!".into()));
        c.out.event(LoopEvent::Stopped { run: 0, exit: LoopExit::Requested });
        c.discard_pending();
        assert!(c.inbox.frames.try_recv().is_err());
        assert!(c.inbox.events.try_recv().is_err());
    }

    #[test]
    fn newest_frame_wins() {
        let mut c = core();
        let mut f = FrameBuffer::blank(640, 480);
        f.pixels[0] = 0x00_12_34_56;
        c.out.frame(f.clone());
        c.pump();
        assert_eq!(c.preview, f);
    }

    #[test]
    fn render_fills_whole_window() {
        let c = core();
        let layout = Layout::new(640, 480);
        let mut screen = FrameBuffer::blank(640, 480 + PANEL_H);
        c.render(&mut screen, &layout);
        // Strip background shows below the preview.
        assert_eq!(screen.pixels[(480 + 2) * 640 + 600], STRIP);
    }
}
