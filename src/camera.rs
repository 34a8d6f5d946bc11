// Opens a webcam and converts frames into a buffer suitable for the window.
// Visual expectation: when the gesture loop calls `next_frame()`, you get a
// Vec<u32> where each pixel is 0x00RRGGBB, ready to draw on and push to the screen.

use crate::error::Error;
use crate::types::FrameBuffer;
use crate::vision;

// Bring in nokhwa types for camera control.
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
        Resolution,
    },
};

/// Anything the gesture loop can pull frames from.
/// The real implementation is [`CameraCapture`]; tests feed canned frames.
pub trait FrameSource {
    /// Blocks until the next frame is ready. An error means the stream is over.
    fn next_frame(&mut self) -> Result<FrameBuffer, Error>;
}

// A small wrapper around nokhwa::Camera so the gesture loop stays clean.
// Dropping it closes the stream and releases the device.
pub struct CameraCapture {
    cam: Camera,
}

impl CameraCapture {
    /// Try to open camera `index` at a target resolution (falls back if not exact).
    /// On success, nothing is shown on screen yet — we just hold an open stream.
    pub fn new(index: u32, width: u32, height: u32) -> Result<Self, Error> {
        let idx = CameraIndex::Index(index);

        let fmt = CameraFormat::new(
            Resolution::new(width, height),
            FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
            30,                // target FPS
        );

        // Ask for RGB frames, closest to what we requested.
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(idx, req)
            .map_err(|e| Error::CameraInit(format!("Create camera: {e}")))?;

        cam.open_stream()
            .map_err(|e| Error::CameraInit(format!("Open stream: {e}")))?;

        // The actual stream might choose a slightly different resolution.
        let actual = cam.resolution();
        log::info!(
            "camera {index} streaming at {}x{} (requested {width}x{height})",
            actual.width(),
            actual.height()
        );

        Ok(Self { cam })
    }
}

impl FrameSource for CameraCapture {
    /// Grab one frame from the camera and convert it to 0x00RRGGBB pixels.
    fn next_frame(&mut self) -> Result<FrameBuffer, Error> {
        // Blocks until a new frame is ready.
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;

        let rgb_img = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))?;

        Ok(vision::from_rgb_image(&rgb_img))
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        if let Err(e) = self.cam.stop_stream() {
            log::debug!("camera stop_stream: {e}");
        }
        log::info!("camera released");
    }
}

/// Human-readable list of the cameras the platform backend can see.
pub fn list_cameras() -> Result<Vec<String>, Error> {
    let cams = nokhwa::query(ApiBackend::Auto)
        .map_err(|e| Error::CameraInit(format!("Query cameras: {e}")))?;
    Ok(cams
        .iter()
        .map(|c| format!("{}: {}", c.index(), c.human_name()))
        .collect())
}

/// Open the camera, grab one mirrored frame for the idle preview, then let it go.
/// This is the "camera available" precondition for starting the gesture loop.
pub fn grab_preview(index: u32, width: u32, height: u32) -> Result<FrameBuffer, Error> {
    let mut cam = CameraCapture::new(index, width, height)?;
    let mut frame = cam.next_frame()?;
    vision::mirror_in_place(&mut frame);
    Ok(frame)
}
