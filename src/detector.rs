//! Hand landmark detection through an external MediaPipe process.
//!
//! The crate never runs inference itself. [`MediaPipeDetector`] starts
//! `tools/hand_bridge.py` as a child process, streams raw RGB frames to its
//! stdin and reads one JSON line of landmarks back per frame.
//!
//! Wire format per request: three little-endian `u32` (width, height,
//! channels = 3) followed by `width * height * 3` bytes of RGB. The bridge
//! prints `READY` once at startup.

use crate::error::Error;
use crate::types::{FrameBuffer, Point};
use crate::vision;
use serde::Deserialize;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// Hand landmark indices (MediaPipe hand landmark model convention).
/// Only the two fingertips the pointer reads are named; the skeleton uses raw indices.
pub mod landmarks {
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_FINGER_TIP: usize = 8;

    pub const COUNT: usize = 21;
}

/// Bones of the hand skeleton, as landmark index pairs (MediaPipe HAND_CONNECTIONS).
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    // palm
    (0, 1), (0, 5), (5, 9), (9, 13), (13, 17), (0, 17),
    // thumb
    (1, 2), (2, 3), (3, 4),
    // index
    (5, 6), (6, 7), (7, 8),
    // middle
    (9, 10), (10, 11), (11, 12),
    // ring
    (13, 14), (14, 15), (15, 16),
    // pinky
    (17, 18), (18, 19), (19, 20),
];

/// A single landmark, normalized to the image: (0,0) top-left, (1,1) bottom-right.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    /// Depth relative to the wrist; unused by the pointer logic.
    pub z: f32,
}

/// One detected hand with all 21 landmarks.
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarks {
    pub landmarks: [Landmark; landmarks::COUNT],
    pub confidence: f32,
    /// "Left" or "Right", as reported by the model.
    pub handedness: String,
}

impl HandLandmarks {
    pub fn index_tip(&self) -> Landmark {
        self.landmarks[landmarks::INDEX_FINGER_TIP]
    }

    /// Landmark `i` in pixel coordinates of a `width` x `height` frame.
    pub fn pixel(&self, i: usize, width: usize, height: usize) -> Point {
        let lm = self.landmarks[i];
        Point::new(lm.x * width as f32, lm.y * height as f32)
    }
}

/// Anything that can find hands in a frame.
pub trait HandDetector {
    /// Hands found in `frame`, best first. An empty vec means "no hand", not an error.
    fn detect(&mut self, frame: &FrameBuffer) -> Result<Vec<HandLandmarks>, Error>;
}

/* ---------- JSON reply from the bridge ---------- */

#[derive(Deserialize, Debug)]
struct LandmarkJson {
    x: f32,
    y: f32,
    #[serde(default)]
    z: f32,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    handedness: String,
    score: f32,
    landmarks: Vec<LandmarkJson>,
}

#[derive(Deserialize, Debug)]
struct DetectionReply {
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// Turn one reply line into hands, dropping malformed ones.
/// Detection confidence is the bridge's job (`--min-confidence`); the
/// handedness score here only orders the hands.
fn parse_reply(line: &str) -> Result<Vec<HandLandmarks>, Error> {
    let reply: DetectionReply = serde_json::from_str(line.trim())
        .map_err(|e| Error::Detector(format!("bad reply {:?}: {e}", line.trim())))?;

    if let Some(err) = reply.error {
        log::warn!("hand bridge reported: {err}");
        return Ok(Vec::new());
    }

    let mut hands = Vec::with_capacity(reply.hands.len());
    for hand in reply.hands {
        if hand.landmarks.len() != landmarks::COUNT {
            log::warn!("expected {} landmarks, got {}", landmarks::COUNT, hand.landmarks.len());
            continue;
        }
        let mut lms = [Landmark::default(); landmarks::COUNT];
        for (slot, lm) in lms.iter_mut().zip(&hand.landmarks) {
            *slot = Landmark { x: lm.x, y: lm.y, z: lm.z };
        }
        log::trace!(
            "hand: {} ({:.2}), index tip ({:.3},{:.3},{:.3})",
            hand.handedness, hand.score,
            lms[landmarks::INDEX_FINGER_TIP].x, lms[landmarks::INDEX_FINGER_TIP].y, lms[landmarks::INDEX_FINGER_TIP].z
        );
        hands.push(HandLandmarks {
            landmarks: lms,
            confidence: hand.score,
            handedness: hand.handedness,
        });
    }
    hands.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    Ok(hands)
}

/// Where to find the bridge process and the detection confidence it runs with.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    pub python: PathBuf,
    pub script: PathBuf,
    pub min_confidence: f32,
}

/// MediaPipe Hands running in a Python child process.
pub struct MediaPipeDetector {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl MediaPipeDetector {
    /// Start the bridge and wait for its `READY` line.
    pub fn spawn(cfg: &BridgeConfig) -> Result<Self, Error> {
        if !cfg.script.exists() {
            return Err(Error::Detector(format!(
                "bridge script not found at {}",
                cfg.script.display()
            )));
        }

        log::info!("starting hand bridge: {} {}", cfg.python.display(), cfg.script.display());

        let mut process = Command::new(&cfg.python)
            .arg(&cfg.script)
            .arg("--min-confidence")
            .arg(cfg.min_confidence.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::Detector(format!("spawn {}: {e}", cfg.python.display())))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| Error::Detector("bridge stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| Error::Detector("bridge stdout unavailable".into()))?;
        let mut stdout = BufReader::new(stdout);

        let mut ready = String::new();
        stdout.read_line(&mut ready)?;
        if ready.trim() != "READY" {
            let _ = process.kill();
            return Err(Error::Detector(format!(
                "bridge did not signal ready, got {:?}",
                ready.trim()
            )));
        }

        log::info!("hand bridge ready");
        Ok(Self { process, stdin, stdout })
    }
}

impl HandDetector for MediaPipeDetector {
    fn detect(&mut self, frame: &FrameBuffer) -> Result<Vec<HandLandmarks>, Error> {
        if frame.width == 0 || frame.height == 0 {
            return Ok(Vec::new());
        }

        let rgb = vision::to_rgb_image(frame);
        self.stdin.write_all(&(frame.width as u32).to_le_bytes())?;
        self.stdin.write_all(&(frame.height as u32).to_le_bytes())?;
        self.stdin.write_all(&3u32.to_le_bytes())?;
        self.stdin.write_all(rgb.as_raw())?;
        self.stdin.flush()?;

        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(Error::Detector("bridge closed its output".into()));
        }
        parse_reply(&line)
    }
}

impl Drop for MediaPipeDetector {
    fn drop(&mut self) {
        // Kill the bridge when the gesture loop lets go of it.
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

/// Default bridge script location, relative to the working directory.
pub fn default_script_path() -> PathBuf {
    Path::new("tools").join("hand_bridge.py")
}
