// OS mouse injection. The gesture loop only sees the `PointerSink` trait;
// `EnigoPointer` is the real backend.

use crate::error::Error;
use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};

/// Something that can move and click the system pointer, in screen pixels.
pub trait PointerSink {
    /// Size of the main display in pixels.
    fn screen_size(&self) -> (i32, i32);
    /// Absolute move to (x, y).
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), Error>;
    /// Left click at the current position.
    fn click(&mut self) -> Result<(), Error>;
}

pub struct EnigoPointer {
    enigo: Enigo,
    screen: (i32, i32),
}

impl EnigoPointer {
    pub fn new() -> Result<Self, Error> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| Error::Pointer(format!("Connect input backend: {e}")))?;
        let screen = enigo
            .main_display()
            .map_err(|e| Error::Pointer(format!("Query display size: {e}")))?;
        log::info!("pointer backend ready, main display {}x{}", screen.0, screen.1);
        Ok(Self { enigo, screen })
    }
}

impl PointerSink for EnigoPointer {
    fn screen_size(&self) -> (i32, i32) {
        self.screen
    }

    fn move_to(&mut self, x: i32, y: i32) -> Result<(), Error> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| Error::Pointer(format!("Move to ({x},{y}): {e}")))
    }

    fn click(&mut self) -> Result<(), Error> {
        self.enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| Error::Pointer(format!("Click: {e}")))
    }
}

/// Map a normalized (0..1) position to screen pixels, kept on the display.
pub fn to_screen(nx: f32, ny: f32, screen: (i32, i32)) -> (i32, i32) {
    let (sw, sh) = screen;
    let x = (nx * sw as f32) as i32;
    let y = (ny * sh as f32) as i32;
    (x.clamp(0, (sw - 1).max(0)), y.clamp(0, (sh - 1).max(0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_normalized_to_pixels() {
        assert_eq!(to_screen(0.5, 0.25, (1920, 1080)), (960, 270));
        assert_eq!(to_screen(0.0, 0.0, (1920, 1080)), (0, 0));
    }

    #[test]
    fn stays_on_screen() {
        // Landmarks can land slightly outside the frame.
        assert_eq!(to_screen(1.0, 1.0, (1920, 1080)), (1919, 1079));
        assert_eq!(to_screen(-0.1, 1.3, (1920, 1080)), (0, 1079));
    }
}
