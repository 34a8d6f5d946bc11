//! The background worker: camera → hand detector → pointer, once per frame.
//!
//! The worker never touches the window. Annotated frames and status lines go
//! back to the UI thread over crossbeam channels; the panel drains them on
//! its own schedule. The loop polls `SessionState::is_running` at the top of
//! every iteration, so a stop request lets at most the in-flight frame finish.

use crate::camera::{CameraCapture, FrameSource};
use crate::detector::{BridgeConfig, HandDetector, MediaPipeDetector};
use crate::draw;
use crate::error::Error;
use crate::pointer::{EnigoPointer, PointerSink};
use crate::session::SessionState;
use crate::tracker::GestureTracker;
use crate::types::FrameBuffer;
use crate::vision;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const STATUS_CLICK: &str = "Click detected!";
pub const STATUS_MOVING: &str = "Hand detected - Moving mouse cursor";
pub const STATUS_NO_CAMERA: &str = "Error: Cannot open camera";

/// Why a worker thread ended.
#[derive(Clone, Debug, PartialEq)]
pub enum LoopExit {
    /// The running flag was cleared.
    Requested,
    /// Frame capture failed: camera unplugged or stream over.
    StreamEnded(String),
    /// Camera, detector or pointer backend could not be brought up.
    StartupFailed(String),
    /// The detector bridge stopped answering.
    DetectorFailed(String),
}

impl LoopExit {
    /// Status line for the panel, if this exit deserves one beyond "stopped".
    pub fn status(&self) -> Option<String> {
        match self {
            LoopExit::Requested => None,
            LoopExit::StreamEnded(e) => Some(format!("Camera stream ended: {e}")),
            LoopExit::StartupFailed(msg) => Some(msg.clone()),
            LoopExit::DetectorFailed(e) => Some(format!("Hand detector stopped: {e}")),
        }
    }
}

/// Messages from the worker that must not be dropped.
#[derive(Clone, Debug, PartialEq)]
pub enum LoopEvent {
    Status(String),
    /// Last message of worker number `run`; the panel ignores stops from older runs.
    Stopped { run: u64, exit: LoopExit },
}

/// Worker-side ends of the hand-off channels.
#[derive(Clone)]
pub struct LoopOutput {
    frames: Sender<FrameBuffer>,
    events: Sender<LoopEvent>,
}

/// UI-side ends of the hand-off channels.
pub struct LoopInbox {
    pub frames: Receiver<FrameBuffer>,
    pub events: Receiver<LoopEvent>,
}

/// One slot for frames (the UI only wants the newest), unbounded for events.
pub fn channel() -> (LoopOutput, LoopInbox) {
    let (frames_tx, frames_rx) = bounded(1);
    let (events_tx, events_rx) = unbounded();
    (
        LoopOutput { frames: frames_tx, events: events_tx },
        LoopInbox { frames: frames_rx, events: events_rx },
    )
}

impl LoopOutput {
    /// Offer a finished frame to the UI. A busy or closed window just misses it.
    pub fn frame(&self, frame: FrameBuffer) {
        match self.frames.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => log::trace!("ui busy, frame dropped"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    pub fn event(&self, event: LoopEvent) {
        // Receiver gone means the window is gone; nothing left to tell.
        let _ = self.events.send(event);
    }
}

/// Everything the worker needs to bring up its own devices.
#[derive(Clone, Debug)]
pub struct LoopConfig {
    pub camera_index: u32,
    pub width: u32,
    pub height: u32,
    pub bridge: BridgeConfig,
    /// Pause after each frame.
    pub interval: Duration,
}

/// Frames-per-second counter; yields a value once per second.
struct FpsCounter {
    since: Instant,
    frames: u32,
    last: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self { since: Instant::now(), frames: 0, last: 0.0 }
    }

    fn tick(&mut self) -> f32 {
        self.frames += 1;
        let now = Instant::now();
        let elapsed = now.duration_since(self.since);
        if elapsed >= Duration::from_secs(1) {
            self.last = self.frames as f32 / elapsed.as_secs_f32();
            log::debug!("gesture loop FPS: {:.1}", self.last);
            self.frames = 0;
            self.since = now;
        }
        self.last
    }
}

/// Spawn a worker thread. It opens the camera, detector and pointer itself and
/// drops them (releasing the camera) before it exits.
pub fn spawn(
    cfg: LoopConfig,
    run: u64,
    session: Arc<SessionState>,
    out: LoopOutput,
) -> Result<JoinHandle<()>, Error> {
    thread::Builder::new()
        .name("gesture-loop".into())
        .spawn(move || {
            let exit = match open_devices(&cfg) {
                Ok((mut camera, mut detector, mut pointer)) => {
                    run_loop(&mut camera, &mut detector, &mut pointer, &session, &out, cfg.interval)
                }
                Err(exit) => exit,
            };
            session.set_running(false);
            log::info!("gesture loop {run} exited: {exit:?}");
            out.event(LoopEvent::Stopped { run, exit });
        })
        .map_err(|e| Error::Worker(format!("spawn gesture thread: {e}")))
}

fn open_devices(
    cfg: &LoopConfig,
) -> Result<(CameraCapture, MediaPipeDetector, EnigoPointer), LoopExit> {
    let camera = CameraCapture::new(cfg.camera_index, cfg.width, cfg.height).map_err(|e| {
        log::error!("{e}");
        LoopExit::StartupFailed(STATUS_NO_CAMERA.to_string())
    })?;
    let detector = MediaPipeDetector::spawn(&cfg.bridge).map_err(|e| {
        log::error!("{e}");
        LoopExit::StartupFailed(format!("Error: {e}"))
    })?;
    let pointer = EnigoPointer::new().map_err(|e| {
        log::error!("{e}");
        LoopExit::StartupFailed(format!("Error: {e}"))
    })?;
    Ok((camera, detector, pointer))
}

/// The gesture loop proper. Returns once the running flag is seen cleared,
/// capture fails, or the detector dies.
pub fn run_loop<S, D, P>(
    source: &mut S,
    detector: &mut D,
    pointer: &mut P,
    session: &SessionState,
    out: &LoopOutput,
    interval: Duration,
) -> LoopExit
where
    S: FrameSource,
    D: HandDetector,
    P: PointerSink,
{
    let mut tracker = GestureTracker::new();
    let mut fps = FpsCounter::new();
    let mut last_status: Option<&'static str> = None;
    let screen = pointer.screen_size();

    while session.is_running() {
        // 1) Capture + mirror, so moving right moves right on screen.
        let mut frame = match source.next_frame() {
            Ok(f) => f,
            Err(e) => {
                log::warn!("{e}");
                return LoopExit::StreamEnded(e.to_string());
            }
        };
        vision::mirror_in_place(&mut frame);

        // 2) Landmarks. No hand → skip straight to the display.
        let hands = match detector.detect(&frame) {
            Ok(h) => h,
            Err(e) => {
                log::error!("{e}");
                return LoopExit::DetectorFailed(e.to_string());
            }
        };

        let tuning = session.tuning();
        if let Some(hand) = hands.first() {
            if tuning.show_landmarks {
                for h in &hands {
                    draw::draw_hand_skeleton(&mut frame, h);
                }
            }

            // 3–5) Pointer target, smoothing, pinch.
            let decision = tracker.decide(hand, frame.width, frame.height, &tuning, screen);
            let (sx, sy) = decision.screen_target;
            if let Err(e) = pointer.move_to(sx, sy) {
                log::warn!("{e}");
            }

            let status = if decision.click {
                if let Err(e) = pointer.click() {
                    log::warn!("{e}");
                }
                log::debug!("click at ({sx},{sy}), pinch {:.1}px", decision.pinch_distance);
                let tip = decision.fingertip;
                draw::draw_text_scaled(&mut frame, tip.x as i32, tip.y as i32, "CLICKED!", draw::CURSOR_COLOR, 2);
                STATUS_CLICK
            } else {
                STATUS_MOVING
            };
            if last_status != Some(status) {
                out.event(LoopEvent::Status(status.to_string()));
                last_status = Some(status);
            }

            // 6) Cursor indicator at the smoothed position.
            draw::draw_cursor_indicator(&mut frame, decision.smoothed);
        }

        let rate = fps.tick();
        draw::draw_text_5x7(&mut frame, 8, 8, &format!("FPS: {rate:.1}"), 0x00_FF_FF_FF);
        out.frame(frame);

        // 7) Bound the loop rate.
        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }

    LoopExit::Requested
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{HandLandmarks, Landmark, landmarks};
    use crate::session::Tuning;
    use std::collections::VecDeque;

    /// Serves `frames` then reports end-of-stream. Can clear the running flag
    /// while a given capture is in flight, like a Stop click landing mid-frame.
    struct FakeCamera {
        frames: VecDeque<FrameBuffer>,
        captured: usize,
        stop_during: Option<(usize, Arc<SessionState>)>,
    }

    impl FakeCamera {
        fn new(n: usize) -> Self {
            let frames = (0..n).map(|_| FrameBuffer::blank(640, 480)).collect();
            Self { frames, captured: 0, stop_during: None }
        }
    }

    impl FrameSource for FakeCamera {
        fn next_frame(&mut self) -> Result<FrameBuffer, Error> {
            self.captured += 1;
            if let Some((n, session)) = &self.stop_during {
                if self.captured == *n {
                    session.set_running(false);
                }
            }
            self.frames
                .pop_front()
                .ok_or_else(|| Error::CameraFrame("end of stream".into()))
        }
    }

    /// Returns the same hands for every frame.
    struct FakeDetector(Vec<HandLandmarks>);

    impl HandDetector for FakeDetector {
        fn detect(&mut self, _frame: &FrameBuffer) -> Result<Vec<HandLandmarks>, Error> {
            Ok(self.0.clone())
        }
    }

    struct FailingDetector;

    impl HandDetector for FailingDetector {
        fn detect(&mut self, _frame: &FrameBuffer) -> Result<Vec<HandLandmarks>, Error> {
            Err(Error::Detector("bridge closed its output".into()))
        }
    }

    #[derive(Default)]
    struct RecordingPointer {
        moves: Vec<(i32, i32)>,
        clicks: usize,
    }

    impl PointerSink for RecordingPointer {
        fn screen_size(&self) -> (i32, i32) {
            (1920, 1080)
        }
        fn move_to(&mut self, x: i32, y: i32) -> Result<(), Error> {
            self.moves.push((x, y));
            Ok(())
        }
        fn click(&mut self) -> Result<(), Error> {
            self.clicks += 1;
            Ok(())
        }
    }

    /// Hand with index/thumb tips at the given pixel positions of a 640x480 frame.
    fn hand_px(index: (f32, f32), thumb: (f32, f32)) -> HandLandmarks {
        let mut lms = [Landmark::default(); landmarks::COUNT];
        lms[landmarks::INDEX_FINGER_TIP] = Landmark { x: index.0 / 640.0, y: index.1 / 480.0, z: 0.0 };
        lms[landmarks::THUMB_TIP] = Landmark { x: thumb.0 / 640.0, y: thumb.1 / 480.0, z: 0.0 };
        HandLandmarks { landmarks: lms, confidence: 0.9, handedness: "Right".into() }
    }

    fn running(tuning: Tuning) -> Arc<SessionState> {
        let s = Arc::new(SessionState::new(tuning));
        s.set_running(true);
        s
    }

    fn events(inbox: &LoopInbox) -> Vec<LoopEvent> {
        inbox.events.try_iter().collect()
    }

    #[test]
    fn pinch_clicks_and_reports() {
        let session = running(Tuning::default());
        let (out, inbox) = channel();
        let mut cam = FakeCamera::new(3);
        let mut det = FakeDetector(vec![hand_px((110.0, 105.0), (100.0, 100.0))]);
        let mut ptr = RecordingPointer::default();

        let exit = run_loop(&mut cam, &mut det, &mut ptr, &session, &out, Duration::ZERO);

        assert!(matches!(exit, LoopExit::StreamEnded(_)));
        assert_eq!(ptr.moves.len(), 3);
        assert_eq!(ptr.clicks, 3);
        // Status is only sent when it changes.
        assert_eq!(events(&inbox), vec![LoopEvent::Status(STATUS_CLICK.into())]);
    }

    #[test]
    fn open_hand_moves_without_clicking() {
        let session = running(Tuning::default());
        let (out, inbox) = channel();
        let mut cam = FakeCamera::new(2);
        let mut det = FakeDetector(vec![hand_px((140.0, 140.0), (100.0, 100.0))]);
        let mut ptr = RecordingPointer::default();

        run_loop(&mut cam, &mut det, &mut ptr, &session, &out, Duration::ZERO);

        assert_eq!(ptr.moves.len(), 2);
        assert_eq!(ptr.clicks, 0);
        assert_eq!(events(&inbox), vec![LoopEvent::Status(STATUS_MOVING.into())]);
    }

    #[test]
    fn no_hand_still_updates_display() {
        let session = running(Tuning::default());
        let (out, inbox) = channel();
        let mut cam = FakeCamera::new(1);
        let mut det = FakeDetector(Vec::new());
        let mut ptr = RecordingPointer::default();

        run_loop(&mut cam, &mut det, &mut ptr, &session, &out, Duration::ZERO);

        assert!(ptr.moves.is_empty());
        assert_eq!(ptr.clicks, 0);
        assert!(inbox.frames.try_recv().is_ok());
        assert!(events(&inbox).is_empty());
    }

    #[test]
    fn stop_lets_in_flight_frame_finish_then_exits() {
        let session = running(Tuning::default());
        let (out, _inbox) = channel();
        let mut cam = FakeCamera::new(10);
        cam.stop_during = Some((2, session.clone()));
        let mut det = FakeDetector(vec![hand_px((300.0, 200.0), (100.0, 100.0))]);
        let mut ptr = RecordingPointer::default();

        let exit = run_loop(&mut cam, &mut det, &mut ptr, &session, &out, Duration::ZERO);

        assert_eq!(exit, LoopExit::Requested);
        // Frame 2 was already being captured when stop arrived; no frame 3.
        assert_eq!(cam.captured, 2);
        assert_eq!(ptr.moves.len(), 2);
    }

    #[test]
    fn stopped_session_never_captures() {
        let session = Arc::new(SessionState::new(Tuning::default()));
        let (out, _inbox) = channel();
        let mut cam = FakeCamera::new(5);
        let mut ptr = RecordingPointer::default();

        let exit = run_loop(&mut cam, &mut FakeDetector(Vec::new()), &mut ptr, &session, &out, Duration::ZERO);

        assert_eq!(exit, LoopExit::Requested);
        assert_eq!(cam.captured, 0);
    }

    #[test]
    fn detector_failure_ends_the_loop() {
        let session = running(Tuning::default());
        let (out, _inbox) = channel();
        let mut cam = FakeCamera::new(5);
        let mut ptr = RecordingPointer::default();

        let exit = run_loop(&mut cam, &mut FailingDetector, &mut ptr, &session, &out, Duration::ZERO);

        assert!(matches!(exit, LoopExit::DetectorFailed(_)));
        assert_eq!(cam.captured, 1);
        assert!(exit.status().is_some());
    }

    #[test]
    fn overlay_toggle_is_visual_only() {
        let hand = hand_px((320.0, 240.0), (318.0, 239.0));
        let mut results = Vec::new();
        for show in [true, false] {
            let session = running(Tuning { show_landmarks: show, ..Tuning::default() });
            let (out, inbox) = channel();
            let mut ptr = RecordingPointer::default();
            run_loop(&mut FakeCamera::new(4), &mut FakeDetector(vec![hand.clone()]), &mut ptr, &session, &out, Duration::ZERO);
            let frame = inbox.frames.try_recv().unwrap();
            results.push((ptr.moves, ptr.clicks, frame));
        }
        assert_eq!(results[0].0, results[1].0);
        assert_eq!(results[0].1, results[1].1);
        // ...but the pictures differ.
        assert_ne!(results[0].2, results[1].2);
    }

    #[test]
    fn closed_window_does_not_stall_the_loop() {
        let session = running(Tuning::default());
        let (out, inbox) = channel();
        drop(inbox);
        let mut ptr = RecordingPointer::default();
        let exit = run_loop(&mut FakeCamera::new(3), &mut FakeDetector(Vec::new()), &mut ptr, &session, &out, Duration::ZERO);
        assert!(matches!(exit, LoopExit::StreamEnded(_)));
    }
}
