// tests/test_sat.rs — SAT construction invariants, checked by brute force.
//
// The table must satisfy: for any rectangle (x0,y0)-(x1,y1) inside the tile,
// SAT[y1,x1] - SAT[y0,x1] - SAT[y1,x0] + SAT[y0,x0] equals the plain sum of
// source pixel values over that rectangle.

use halftone::sat::build_sat_rgb_into;

/// Deterministic xorshift so failures reproduce.
struct Rng(u32);

impl Rng {
    fn next(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }
}

fn random_pixels(size: usize, rng: &mut Rng) -> Vec<u8> {
    (0..size * size * 4).map(|_| (rng.next() & 0xff) as u8).collect()
}

fn brute_rect_sum(pixels: &[u8], size: usize, ch: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
    let mut sum = 0.0;
    for y in y0..y1 {
        for x in x0..x1 {
            sum += pixels[(y * size + x) * 4 + ch] as f64;
        }
    }
    sum
}

fn sat_at(sat: &[f32], p1: usize, ch: usize, x: usize, y: usize) -> f64 {
    sat[(y * p1 + x) * 4 + ch] as f64
}

#[test]
fn zero_row_and_column_by_construction() {
    let mut rng = Rng(0xbeef);
    let size = 8;
    let pixels = random_pixels(size, &mut rng);
    let mut sat = vec![1.0f32; (size + 1) * (size + 1) * 4];
    build_sat_rgb_into(&pixels, size, &mut sat);

    let p1 = size + 1;
    for i in 0..=size {
        for ch in 0..4 {
            assert_eq!(sat_at(&sat, p1, ch, i, 0), 0.0, "row 0 at column {i}");
            assert_eq!(sat_at(&sat, p1, ch, 0, i), 0.0, "column 0 at row {i}");
        }
    }
}

#[test]
fn rectangle_sums_match_brute_force() {
    let mut rng = Rng(0x5eed);
    for size in [4usize, 8] {
        let pixels = random_pixels(size, &mut rng);
        let mut sat = vec![0.0f32; (size + 1) * (size + 1) * 4];
        build_sat_rgb_into(&pixels, size, &mut sat);
        let p1 = size + 1;

        // Every rectangle in a tile this small is cheap to enumerate.
        for y0 in 0..=size {
            for y1 in y0..=size {
                for x0 in 0..=size {
                    for x1 in x0..=size {
                        for ch in 0..3 {
                            let via_sat = sat_at(&sat, p1, ch, x1, y1)
                                - sat_at(&sat, p1, ch, x1, y0)
                                - sat_at(&sat, p1, ch, x0, y1)
                                + sat_at(&sat, p1, ch, x0, y0);
                            let brute = brute_rect_sum(&pixels, size, ch, x0, y0, x1, y1);
                            assert_eq!(
                                via_sat, brute,
                                "size {size} ch {ch} rect ({x0},{y0})-({x1},{y1})"
                            );
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn alpha_lane_is_always_zero() {
    let mut rng = Rng(0xa11a);
    let size = 8;
    let pixels = random_pixels(size, &mut rng);
    let mut sat = vec![7.0f32; (size + 1) * (size + 1) * 4];
    build_sat_rgb_into(&pixels, size, &mut sat);
    for (i, v) in sat.iter().enumerate() {
        if i % 4 == 3 {
            assert_eq!(*v, 0.0, "alpha at index {i}");
        }
    }
}

#[test]
fn full_tile_sum_matches_total() {
    let size = 16;
    // Constant mid-gray: total per channel is size² * 128.
    let pixels = vec![128u8; size * size * 4];
    let mut sat = vec![0.0f32; (size + 1) * (size + 1) * 4];
    build_sat_rgb_into(&pixels, size, &mut sat);
    let p1 = size + 1;
    let total = sat_at(&sat, p1, 0, size, size);
    assert_eq!(total, (size * size * 128) as f64);
}

#[test]
fn oversized_output_buffer_is_tolerated() {
    // The engine reuses a grow-only scratch buffer, so the builder must not
    // care about trailing slack in `out`.
    let size = 4;
    let pixels = vec![10u8; size * size * 4];
    let mut sat = vec![3.0f32; (size + 8) * (size + 8) * 4];
    build_sat_rgb_into(&pixels, size, &mut sat);
    let p1 = size + 1;
    assert_eq!(sat_at(&sat, p1, 0, size, size), (size * size * 10) as f64);
}
