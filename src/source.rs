// ============================================================================
// SOURCE IMAGE — decoded input bitmap plus a cache-identity token
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// A decoded RGBA input image carrying an opaque identity token.
///
/// The processor's SAT cache is keyed on `(id, tile_size)`. Identity — not
/// pixel content — is the equality test: wrapping the same pixels twice
/// yields two distinct tokens and therefore a cache miss, the same way
/// re-decoding a file did in the processor this engine descends from.
pub struct SourceImage {
    id: u64,
    pixels: RgbaImage,
}

impl SourceImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
            pixels,
        }
    }

    /// The cache-identity token. Unique per `SourceImage`, never reused.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Copy the centered `size`×`size` square of `image` into `out` as tightly
/// packed RGBA8 rows. Regions outside the image (possible only when a side
/// is shorter than the tile) are left transparent black.
///
/// `out` is resized to exactly `size² * 4` bytes; its capacity only ever
/// grows across calls.
pub fn crop_centered_into(image: &RgbaImage, size: u32, out: &mut Vec<u8>) {
    let row_bytes = size as usize * 4;
    out.clear();
    out.resize(row_bytes * size as usize, 0);

    let off_x = (image.width() as i64 - size as i64) / 2;
    let off_y = (image.height() as i64 - size as i64) / 2;

    // Horizontal overlap between the crop window and the image, in crop space.
    let x0 = (-off_x).max(0) as u32;
    let x1 = (image.width() as i64 - off_x).clamp(0, size as i64) as u32;
    if x1 <= x0 {
        return;
    }

    let src = image.as_raw();
    let src_row_bytes = image.width() as usize * 4;
    for y in 0..size {
        let sy = y as i64 + off_y;
        if sy < 0 || sy >= image.height() as i64 {
            continue;
        }
        let src_start = sy as usize * src_row_bytes + (x0 as i64 + off_x) as usize * 4;
        let dst_start = y as usize * row_bytes + x0 as usize * 4;
        let span = (x1 - x0) as usize * 4;
        out[dst_start..dst_start + span].copy_from_slice(&src[src_start..src_start + span]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_ids_are_unique() {
        let a = SourceImage::new(RgbaImage::new(4, 4));
        let b = SourceImage::new(RgbaImage::new(4, 4));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn crop_takes_the_centered_square() {
        // 6×4 image with a distinct value per pixel; crop to 4.
        let mut img = RgbaImage::new(6, 4);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = image::Rgba([(y * 6 + x) as u8, 0, 0, 255]);
        }
        let mut out = Vec::new();
        crop_centered_into(&img, 4, &mut out);
        // Crop offset is (1, 0): out(0,0) should be source pixel (1, 0).
        assert_eq!(out[0], 1);
        // out(3,3) should be source pixel (4, 3) = 3*6+4 = 22.
        let last = (3 * 4 + 3) * 4;
        assert_eq!(out[last], 22);
    }

    #[test]
    fn crop_pads_undersized_images_with_zeros() {
        let img = RgbaImage::from_pixel(1, 1, image::Rgba([9, 9, 9, 255]));
        let mut out = Vec::new();
        crop_centered_into(&img, 2, &mut out);
        assert_eq!(out.len(), 2 * 2 * 4);
        // Exactly one pixel of the 2×2 crop is covered by the 1×1 image.
        let covered = out.chunks(4).filter(|p| p[0] == 9).count();
        assert_eq!(covered, 1);
    }
}
