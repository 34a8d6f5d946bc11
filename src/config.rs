// Command-line options and the validated config built from them.

use crate::detector::{self, BridgeConfig};
use crate::error::Error;
use crate::gesture_loop::LoopConfig;
use crate::session::{self, Tuning};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "finger-mouse",
    version,
    about = "Move and click the mouse with your index finger in front of a webcam"
)]
pub struct Args {
    /// Camera device index
    #[arg(short, long, default_value_t = 0)]
    pub camera: u32,

    /// Requested capture width
    #[arg(long, default_value_t = 640)]
    pub width: u32,

    /// Requested capture height
    #[arg(long, default_value_t = 480)]
    pub height: u32,

    /// Initial smoothing factor (weight of the newest fingertip sample)
    #[arg(short, long, default_value_t = 0.5)]
    pub smoothing: f32,

    /// Initial click threshold: thumb-index distance in camera pixels
    #[arg(short = 't', long, default_value_t = 30.0)]
    pub click_threshold: f32,

    /// Start with the hand skeleton overlay hidden
    #[arg(long)]
    pub hide_landmarks: bool,

    /// Drive the pointer from the raw fingertip instead of the smoothed one
    #[arg(long)]
    pub raw_pointer: bool,

    /// Pause between frames, in milliseconds
    #[arg(long, default_value_t = 30)]
    pub interval_ms: u64,

    /// Python interpreter with mediapipe installed
    #[arg(long, default_value = "python3")]
    pub python: PathBuf,

    /// MediaPipe bridge script
    #[arg(long, default_value_os_t = detector::default_script_path())]
    pub bridge: PathBuf,

    /// Minimum hand detection confidence (0..1)
    #[arg(long, default_value_t = 0.7)]
    pub min_confidence: f32,

    /// List cameras and exit
    #[arg(long)]
    pub list_cameras: bool,

    /// Check camera, hand detector and pointer backend, then exit
    #[arg(long)]
    pub check: bool,
}

/// Validated settings for one run of the app.
#[derive(Clone, Debug)]
pub struct Config {
    pub worker: LoopConfig,
    pub tuning: Tuning,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self, Error> {
        if args.width == 0 || args.height == 0 {
            return Err(Error::Config(format!(
                "capture size must be non-zero, got {}x{}",
                args.width, args.height
            )));
        }
        if !(0.0..=1.0).contains(&args.min_confidence) {
            return Err(Error::Config(format!(
                "min confidence must be within 0..1, got {}",
                args.min_confidence
            )));
        }

        let mut tuning = Tuning {
            show_landmarks: !args.hide_landmarks,
            smooth_pointer: !args.raw_pointer,
            ..Tuning::default()
        };
        tuning.set_smoothing(args.smoothing);
        tuning.set_click_threshold(args.click_threshold);
        if tuning.smoothing != args.smoothing {
            log::warn!(
                "smoothing {} clamped to {} (range {}..{})",
                args.smoothing, tuning.smoothing, session::SMOOTHING_MIN, session::SMOOTHING_MAX
            );
        }
        if tuning.click_threshold != args.click_threshold {
            log::warn!(
                "click threshold {} clamped to {} (range {}..{})",
                args.click_threshold, tuning.click_threshold, session::THRESHOLD_MIN, session::THRESHOLD_MAX
            );
        }

        Ok(Self {
            worker: LoopConfig {
                camera_index: args.camera,
                width: args.width,
                height: args.height,
                bridge: BridgeConfig {
                    python: args.python.clone(),
                    script: args.bridge.clone(),
                    min_confidence: args.min_confidence,
                },
                interval: Duration::from_millis(args.interval_ms),
            },
            tuning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("finger-mouse").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_the_panel() {
        let cfg = Config::from_args(&parse(&[])).unwrap();
        assert_eq!(cfg.tuning, Tuning::default());
        assert_eq!((cfg.worker.width, cfg.worker.height), (640, 480));
        assert_eq!(cfg.worker.interval, Duration::from_millis(30));
        assert_eq!(cfg.worker.bridge.script, detector::default_script_path());
    }

    #[test]
    fn tuning_flags_are_clamped() {
        let cfg = Config::from_args(&parse(&["-s", "0.99", "-t", "500", "--raw-pointer", "--hide-landmarks"])).unwrap();
        assert_eq!(cfg.tuning.smoothing, session::SMOOTHING_MAX);
        assert_eq!(cfg.tuning.click_threshold, session::THRESHOLD_MAX);
        assert!(!cfg.tuning.smooth_pointer);
        assert!(!cfg.tuning.show_landmarks);
    }

    #[test]
    fn rejects_nonsense() {
        assert!(Config::from_args(&parse(&["--width", "0"])).is_err());
        assert!(Config::from_args(&parse(&["--min-confidence", "2"])).is_err());
    }
}
