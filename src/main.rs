// What you SEE:
// • A window with the mirrored webcam on top and a control strip below.
// • Start: your index fingertip drives the mouse; a green disc tracks it on the preview.
// • Pinch thumb + index together to click ("CLICKED!" flashes at the fingertip).
// • Sliders tune smoothing and pinch distance; the checkbox hides the hand skeleton.
// • Stop (or X) hands the mouse back. Q / ESC / closing the window quits.

mod camera;
mod config;
mod detector;
mod draw;
mod error;
mod gesture_loop;
mod panel;
mod pointer;
mod session;
mod tracker;
mod types;
mod vision;

use clap::Parser;
use config::{Args, Config};
use detector::MediaPipeDetector;
use error::Error;
use panel::ControlPanel;
use pointer::{EnigoPointer, PointerSink};

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.list_cameras {
        let cams = camera::list_cameras()?;
        if cams.is_empty() {
            println!("No cameras found");
        }
        for cam in cams {
            println!("{cam}");
        }
        return Ok(());
    }

    let cfg = Config::from_args(&args)?;

    if args.check {
        if !check(&cfg) {
            std::process::exit(1);
        }
        return Ok(());
    }

    ControlPanel::new(cfg)?.run()
}

/// Bring up every external capability once and report which ones work.
fn check(cfg: &Config) -> bool {
    let w = &cfg.worker;
    let mut ok = true;

    match camera::grab_preview(w.camera_index, w.width, w.height) {
        Ok(frame) => println!("camera    ok   {}x{}", frame.width, frame.height),
        Err(e) => {
            println!("camera    FAIL {e}");
            ok = false;
        }
    }

    match MediaPipeDetector::spawn(&w.bridge) {
        Ok(_) => println!("detector  ok   {}", w.bridge.script.display()),
        Err(e) => {
            println!("detector  FAIL {e}");
            ok = false;
        }
    }

    match EnigoPointer::new() {
        Ok(p) => {
            let (sw, sh) = p.screen_size();
            println!("pointer   ok   display {sw}x{sh}");
        }
        Err(e) => {
            println!("pointer   FAIL {e}");
            ok = false;
        }
    }

    ok
}
