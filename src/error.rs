// Crate-wide error type. Every variant states *where* things went wrong;
// the control panel turns any of them into a one-line status message.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Window init error: {0}")]
    WindowInit(String), // Creating the window failed
    #[error("Window update error: {0}")]
    WindowUpdate(String), // Updating the window buffer failed
    #[error("Camera init error: {0}")]
    CameraInit(String), // Opening/starting the camera failed
    #[error("Camera frame error: {0}")]
    CameraFrame(String), // Grabbing/decoding a frame failed
    #[error("Hand detector error: {0}")]
    Detector(String), // Bridge process failed to start or answer
    #[error("Pointer error: {0}")]
    Pointer(String), // Mouse injection backend failed
    #[error("Worker error: {0}")]
    Worker(String), // Gesture thread could not be started
    #[error("Config error: {0}")]
    Config(String), // Command-line values out of range
}

impl From<std::io::Error> for Error {
    // Only the detector bridge does raw I/O (pipes to the child process).
    fn from(e: std::io::Error) -> Self {
        Error::Detector(e.to_string())
    }
}
