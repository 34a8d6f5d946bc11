// Window + software drawing utilities.
// Visual effects provided here:
// 1) A window that shows the camera preview above the control strip.
// 2) Shapes for the overlay: hand skeleton, cursor disc + ring, panel widgets.
// 3) A tiny 5x7 bitmap font to render status and labels.

use crate::detector::{HAND_CONNECTIONS, HandLandmarks};
use crate::error::Error;
use crate::types::{FrameBuffer, Point, Rect};
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

pub struct Drawer {
    window: Window, // the on-screen window you see
}

impl Drawer {
    /// Create a window of the given size.
    /// Visual: a new empty window appears with your chosen title.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        // The UI thread only redraws and drains messages; no need to spin.
        window.set_target_fps(60);
        Ok(Self { window })
    }

    /// Push the pixels for this frame to the screen.
    /// Visual: the window immediately displays the new image.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }

    /// Returns false when the user closes the window (so we can stop the loop).
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// ESC or Q quits.
    pub fn quit_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape) || self.window.is_key_down(Key::Q)
    }

    /// Current mouse position in window pixel coordinates (clamped to the window).
    pub fn mouse_pos(&self) -> Option<(i32, i32)> {
        self.window
            .get_mouse_pos(MouseMode::Clamp)
            .map(|(x, y)| (x.max(0.0) as i32, y.max(0.0) as i32))
    }

    pub fn left_mouse_down(&self) -> bool {
        self.window.get_mouse_down(MouseButton::Left)
    }

    /// True once per key press (no auto-repeat).
    pub fn pressed_once(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }

    /// True on press and then on every auto-repeat while held.
    pub fn pressed_repeat(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::Yes)
    }
}

/* ---------- Software drawing: pixels, lines, shapes ---------- */

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
#[inline]
fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Draw a thin line between (x0,y0) and (x1,y1) using Bresenham.
pub fn draw_line(fb: &mut FrameBuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
    let (mut x0, mut y0, x1, y1) = (x0, y0, x1, y1);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_pixel(fb, x0, y0, color);
        if x0 == x1 && y0 == y1 { break; }
        let e2 = 2 * err;
        if e2 >= dy { err += dy; x0 += sx; }
        if e2 <= dx { err += dx; y0 += sy; }
    }
}

/// Solid rectangle, clipped to the frame.
pub fn fill_rect(fb: &mut FrameBuffer, r: Rect, color: u32) {
    for y in r.y..r.y + r.h {
        for x in r.x..r.x + r.w {
            put_pixel(fb, x, y, color);
        }
    }
}

/// 1-pixel rectangle outline.
pub fn stroke_rect(fb: &mut FrameBuffer, r: Rect, color: u32) {
    let (x1, y1) = (r.x + r.w - 1, r.y + r.h - 1);
    draw_line(fb, r.x, r.y, x1, r.y, color);
    draw_line(fb, r.x, y1, x1, y1, color);
    draw_line(fb, r.x, r.y, r.x, y1, color);
    draw_line(fb, x1, r.y, x1, y1, color);
}

/// Filled disc centered at (cx,cy).
pub fn fill_circle(fb: &mut FrameBuffer, cx: i32, cy: i32, radius: i32, color: u32) {
    let r2 = radius * radius;
    for y in -radius..=radius {
        for x in -radius..=radius {
            if x * x + y * y <= r2 {
                put_pixel(fb, cx + x, cy + y, color);
            }
        }
    }
}

/// Ring of the given outer radius and thickness.
pub fn stroke_circle(fb: &mut FrameBuffer, cx: i32, cy: i32, radius: i32, thickness: i32, color: u32) {
    let outer = radius * radius;
    let inner = (radius - thickness).max(0).pow(2);
    for y in -radius..=radius {
        for x in -radius..=radius {
            let d = x * x + y * y;
            if d <= outer && d > inner {
                put_pixel(fb, cx + x, cy + y, color);
            }
        }
    }
}

/* ---------- Overlay: skeleton + cursor indicator ---------- */

pub const SKELETON_BONE: u32 = 0x00_FF_FF_FF; // white bones
pub const SKELETON_JOINT: u32 = 0x00_FF_30_30; // red joints
pub const CURSOR_COLOR: u32 = 0x00_00_FF_00; // green disc + ring

/// Draw bones and joints of one hand onto the frame.
/// Visual: a white stick-figure hand with red dots on every joint.
pub fn draw_hand_skeleton(fb: &mut FrameBuffer, hand: &HandLandmarks) {
    let (w, h) = (fb.width, fb.height);
    for (a, b) in HAND_CONNECTIONS {
        let pa = hand.pixel(a, w, h);
        let pb = hand.pixel(b, w, h);
        // Two parallel strokes read better than one at 640x480.
        draw_line(fb, pa.x as i32, pa.y as i32, pb.x as i32, pb.y as i32, SKELETON_BONE);
        draw_line(fb, pa.x as i32 + 1, pa.y as i32, pb.x as i32 + 1, pb.y as i32, SKELETON_BONE);
    }
    for i in 0..hand.landmarks.len() {
        let p = hand.pixel(i, w, h);
        fill_circle(fb, p.x as i32, p.y as i32, 3, SKELETON_JOINT);
    }
}

/// Cursor indicator at the smoothed fingertip: filled disc r=10, ring r=15.
pub fn draw_cursor_indicator(fb: &mut FrameBuffer, at: Point) {
    let (cx, cy) = (at.x as i32, at.y as i32);
    fill_circle(fb, cx, cy, 10, CURSOR_COLOR);
    stroke_circle(fb, cx, cy, 15, 2, CURSOR_COLOR);
}

/* ---------- 5x7 bitmap font ---------- */

/// Return a 5x7 glyph bitmap for a limited character set.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    // Helper macro to define a glyph quickly
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch {
        // Digits 0..9
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        // Uppercase A..Z
        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        // Punctuation
        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        ',' => g!(0b00000,0b00000,0b00000,0b00000,0b00110,0b00100,0b01000),
        '!' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00000,0b00100),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),
        '_' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b11111),
        '+' => g!(0b00000,0b00100,0b00100,0b11111,0b00100,0b00100,0b00000),
        '=' => g!(0b00000,0b00000,0b11111,0b00000,0b11111,0b00000,0b00000),
        '/' => g!(0b00001,0b00001,0b00010,0b00100,0b01000,0b10000,0b10000),
        '(' => g!(0b00010,0b00100,0b01000,0b01000,0b01000,0b00100,0b00010),
        ')' => g!(0b01000,0b00100,0b00010,0b00010,0b00010,0b00100,0b01000),
        '[' => g!(0b01110,0b01000,0b01000,0b01000,0b01000,0b01000,0b01110),
        ']' => g!(0b01110,0b00010,0b00010,0b00010,0b00010,0b00010,0b01110),
        '>' => g!(0b01000,0b00100,0b00010,0b00001,0b00010,0b00100,0b01000),
        '\'' => g!(0b00100,0b00100,0b01000,0b00000,0b00000,0b00000,0b00000),

        _ => None,
    }
}

/// Draw a single 5x7 character at (x,y), each font pixel a `scale` x `scale` block.
/// Visual: a glyph with a 1-pixel black shadow for contrast.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32, scale: i32) {
    let Some(rows) = glyph5x7(ch.to_ascii_uppercase()) else { return };
    // Shadow pass first, then the glyph itself on top.
    for (offset, c) in [(scale.max(1), 0x00000000), (0, color)] {
        for (ry, rowbits) in rows.iter().enumerate() {
            for rx in 0..5 {
                if (rowbits & (1 << (4 - rx))) != 0 {
                    let px = x + rx * scale + offset;
                    let py = y + ry as i32 * scale + offset;
                    fill_rect(fb, Rect::new(px, py, scale, scale), c);
                }
            }
        }
    }
}

/// Draw a text string using 5x7 glyphs (lowercase is drawn as uppercase).
pub fn draw_text_5x7(fb: &mut FrameBuffer, x: i32, y: i32, text: &str, color: u32) {
    draw_text_scaled(fb, x, y, text, color, 1);
}

/// Like [`draw_text_5x7`] with every font pixel blown up `scale` times.
pub fn draw_text_scaled(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32, scale: i32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color, scale);
        x += 6 * scale; // 5 pixels glyph width + 1 pixel spacing
    }
}

/// Pixel width of `text` at scale 1.
pub fn text_width(text: &str) -> i32 {
    text.chars().count() as i32 * 6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawing_off_frame_is_clipped() {
        let mut fb = FrameBuffer::blank(8, 8);
        fill_circle(&mut fb, -20, -20, 5, 0xFF);
        draw_line(&mut fb, -10, 3, 20, 3, 0x11);
        assert!(fb.pixels[3 * 8..4 * 8].iter().all(|&p| p == 0x11));
        assert_eq!(fb.pixels.iter().filter(|&&p| p == 0xFF).count(), 0);
    }

    #[test]
    fn ring_leaves_centre_untouched() {
        let mut fb = FrameBuffer::blank(40, 40);
        stroke_circle(&mut fb, 20, 20, 15, 2, CURSOR_COLOR);
        assert_eq!(fb.pixels[20 * 40 + 20], 0);
        assert_eq!(fb.pixels[20 * 40 + 35], CURSOR_COLOR);
    }

    #[test]
    fn status_messages_are_fully_drawable() {
        for msg in [
            "Ready to start virtual mouse control",
            "Virtual mouse is running... Move your hand!",
            "Hand detected - Moving mouse cursor",
            "Click detected!",
            "Error: Cannot open camera",
            "CLICKED!",
            "[S] start  [X] stop  [L] landmarks  [ ] smoothing  -/= threshold  Q quit",
        ] {
            for ch in msg.chars() {
                assert!(glyph5x7(ch.to_ascii_uppercase()).is_some(), "missing glyph {ch:?}");
            }
        }
    }

    #[test]
    fn text_lands_where_asked() {
        let mut fb = FrameBuffer::blank(20, 10);
        draw_text_5x7(&mut fb, 0, 0, "I", 0x00_FF_FF_FF);
        // Top row of 'I' is 01110.
        assert_eq!(fb.pixels[1], 0x00_FF_FF_FF);
        assert_eq!(fb.pixels[0], 0);
    }
}
