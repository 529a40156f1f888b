// ============================================================================
// SAT — summed-area-table construction and tile-size math
// ============================================================================
//
// The SAT is a (size+1)×(size+1) grid of RGBA float accumulators where
// entry (j, i) holds the sum of the RGB channels of every source pixel with
// row < j and column < i. Row 0 and column 0 are all zero, which lets the
// GPU compute the summed color over any axis-aligned rectangle with four
// lookups and no bounds special-casing.

use rayon::prelude::*;

/// Working resolution for an image: the largest power of two that fits the
/// shorter side, never below 2. Every GPU object for a given image is sized
/// from this single value.
pub fn tile_size_for(width: u32, height: u32) -> u32 {
    let min_side = width.min(height).max(1);
    1 << min_side.ilog2().max(1)
}

/// Exponent of the (power-of-two) tile size.
pub fn tile_exponent(size: u32) -> u32 {
    size.ilog2()
}

/// Clamp a requested granularity level into the tile's valid range `[0, exp]`.
pub fn clamp_granularity(n: i32, exp: u32) -> u32 {
    n.clamp(0, exp as i32) as u32
}

/// Edge length in pixels of one halftone grid cell at clamped granularity
/// `n`: `2^(exp - n)`. `n = 0` is one giant cell, `n = exp` is per-pixel.
pub fn step_for(exp: u32, n: u32) -> u32 {
    1 << (exp - n)
}

/// Build the RGB prefix-sum table from tightly packed RGBA8 pixels into
/// `out`, which must hold at least `(size+1)² * 4` floats.
///
/// Two passes, both with sequential memory access: a horizontal running sum
/// per row into a temporary buffer (rows are independent, so that sweep is
/// parallel), then a vertical accumulation of rows into `out`. The alpha
/// lane is carried as zero throughout. The table reaches several megabytes
/// for large tiles, which is why access order matters here.
pub fn build_sat_rgb_into(pixels: &[u8], size: usize, out: &mut [f32]) {
    let p1 = size + 1;
    let len = p1 * p1 * 4;
    debug_assert!(size > 0, "SAT size must be non-zero");
    debug_assert!(pixels.len() >= size * size * 4, "pixel buffer too short");
    debug_assert!(out.len() >= len, "SAT output buffer too short");

    let out = &mut out[..len];
    out.fill(0.0);
    let mut temp = vec![0.0f32; len];

    // Horizontal pass: temp(j, i) = sum of pixel row j-1, columns 0..i-1.
    // Output row 0 stays zero, so the first chunk is skipped.
    temp.par_chunks_mut(p1 * 4)
        .enumerate()
        .skip(1)
        .for_each(|(j, row)| {
            let src = &pixels[(j - 1) * size * 4..j * size * 4];
            let (mut sr, mut sg, mut sb) = (0.0f32, 0.0f32, 0.0f32);
            for i in 1..=size {
                let di = (i - 1) * 4;
                sr += src[di] as f32;
                sg += src[di + 1] as f32;
                sb += src[di + 2] as f32;
                let ti = i * 4;
                row[ti] = sr;
                row[ti + 1] = sg;
                row[ti + 2] = sb;
            }
        });

    // Vertical pass: out(j, i) = out(j-1, i) + temp(j, i). Rows carry a
    // dependency, so this sweep stays sequential.
    for j in 1..=size {
        let cur = j * p1 * 4;
        let up = (j - 1) * p1 * 4;
        for i in 0..=size {
            let k = i * 4;
            out[cur + k] = out[up + k] + temp[cur + k];
            out[cur + k + 1] = out[up + k + 1] + temp[cur + k + 1];
            out[cur + k + 2] = out[up + k + 2] + temp[cur + k + 2];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_size_is_floor_power_of_two() {
        assert_eq!(tile_size_for(256, 256), 256);
        assert_eq!(tile_size_for(300, 500), 256);
        assert_eq!(tile_size_for(511, 1024), 256);
        assert_eq!(tile_size_for(512, 100), 64);
    }

    #[test]
    fn tile_size_never_below_two() {
        assert_eq!(tile_size_for(1, 1), 2);
        assert_eq!(tile_size_for(3, 9000), 2);
        assert_eq!(tile_size_for(0, 0), 2);
    }

    #[test]
    fn step_mapping_extremes() {
        let exp = tile_exponent(256);
        assert_eq!(step_for(exp, clamp_granularity(0, exp)), 256);
        assert_eq!(step_for(exp, clamp_granularity(8, exp)), 1);
        // Out-of-range requests clamp before mapping.
        assert_eq!(step_for(exp, clamp_granularity(-3, exp)), 256);
        assert_eq!(step_for(exp, clamp_granularity(99, exp)), 1);
    }
}
