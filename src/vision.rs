// Pixel-level helpers between the camera and the detector.
// Visual expectation: after `mirror_in_place` the preview behaves like a mirror,
// moving your hand right moves it right on screen.
use crate::types::FrameBuffer;
use image::{ImageBuffer, Rgb, RgbImage};

/// Flip the frame left<->right, row by row.
pub fn mirror_in_place(fb: &mut FrameBuffer) {
    if fb.width == 0 {
        return;
    }
    for row in fb.pixels.chunks_exact_mut(fb.width) {
        row.reverse();
    }
}

/// Pack an RGB image into 0x00RRGGBB pixels for the window.
pub fn from_rgb_image(img: &RgbImage) -> FrameBuffer {
    let (w, h) = img.dimensions();
    let mut out = Vec::with_capacity((w as usize) * (h as usize));
    for pixel in img.pixels() {
        let r = pixel[0] as u32;
        let g = pixel[1] as u32;
        let b = pixel[2] as u32;
        out.push((r << 16) | (g << 8) | b);
    }
    FrameBuffer { width: w as usize, height: h as usize, pixels: out }
}

/// Unpack 0x00RRGGBB pixels back into an RGB image (what the hand detector eats).
pub fn to_rgb_image(fb: &FrameBuffer) -> RgbImage {
    ImageBuffer::from_fn(fb.width as u32, fb.height as u32, |x, y| {
        let px = fb.pixels[y as usize * fb.width + x as usize];
        Rgb([((px >> 16) & 0xFF) as u8, ((px >> 8) & 0xFF) as u8, (px & 0xFF) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_reverses_each_row() {
        let mut fb = FrameBuffer { width: 3, height: 2, pixels: vec![1, 2, 3, 4, 5, 6] };
        mirror_in_place(&mut fb);
        assert_eq!(fb.pixels, vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn rgb_packing_keeps_channel_order() {
        let fb = FrameBuffer { width: 2, height: 1, pixels: vec![0x00_11_22_33, 0x00_AA_BB_CC] };
        let img = to_rgb_image(&fb);
        assert_eq!(img.get_pixel(0, 0).0, [0x11, 0x22, 0x33]);
        assert_eq!(img.get_pixel(1, 0).0, [0xAA, 0xBB, 0xCC]);
        assert_eq!(from_rgb_image(&img), fb);
    }
}
