// ============================================================================
// PARAMETERS — per-render value object and stage selection
// ============================================================================

/// Neighborhood sampled around each grid cell in Pass 1 is a fixed 5×5.
pub const NEIGHBOR_SIZE: i32 = 5;

/// Numeric conditioning constant shared by both passes: Pass 1 divides the
/// signed dot field by this before storing it in the float target, Pass 2
/// multiplies it back out.
pub const FIELD_SCALE: f32 = 20.0;

/// Everything the halftone pipeline needs for one render call.
///
/// Supplied fresh per call — the engine never retains a copy. The engine
/// clamps `n`/`n2` to the current tile's exponent but performs no other
/// validation; in particular `luma_to_alpha_edge0 <= luma_to_alpha_edge1`
/// is the caller's responsibility.
#[derive(Clone, Debug, PartialEq)]
pub struct HalftoneParams {
    /// Coarse dot-grid exponent: cell edge is `2^(log2(size) - n)` pixels.
    pub n: i32,
    /// Fine dot-grid exponent for the secondary field.
    pub n2: i32,
    /// Cross-fade between the two granularities, 0 = coarse only.
    pub blend_value: f32,
    /// Secondary dot-center offset in cell units, 0..=1.5.
    pub offset2: f32,
    /// Overall dot radius multiplier.
    pub base_scale: f32,
    /// Percentage of each cell left empty between dots, 0..=100.
    pub gap_percent: f32,
    /// Field level at which dots merge in Pass 2.
    pub threshold: f32,
    /// Edge softening width.
    pub soft: f32,
    /// Multiplier narrowing or widening the softened edge band.
    pub soft_fineness: f32,
    /// Contrast applied to cell averages, -100..=100.
    pub contrast: f32,
    /// Apply contrast to luminance only, preserving hue.
    pub contrast_only_luma: bool,
    /// Background color, hex-encoded ("#112233").
    pub bg_color: String,
    /// 0 = tint every dot with `mono_color`, 1 = full source color.
    pub use_color_blend: f32,
    /// Dot tint used when `use_color_blend` is below 1.
    pub mono_color: String,
    /// Final Pass-2 step: map brightness to transparency (bright → clear).
    pub luma_to_alpha: bool,
    /// Luma band for the alpha ramp: `alpha = 1 - smoothstep(edge0, edge1, luma)`.
    pub luma_to_alpha_edge0: f32,
    pub luma_to_alpha_edge1: f32,
}

impl Default for HalftoneParams {
    fn default() -> Self {
        Self {
            n: 2,
            n2: 3,
            blend_value: 0.3,
            offset2: 0.3,
            base_scale: 0.9,
            gap_percent: 10.0,
            threshold: 1.0,
            soft: 0.1,
            soft_fineness: 1.0,
            contrast: 0.0,
            contrast_only_luma: false,
            bg_color: "#111111".to_string(),
            use_color_blend: 1.0,
            mono_color: "#ffffff".to_string(),
            luma_to_alpha: false,
            luma_to_alpha_edge0: 0.0,
            luma_to_alpha_edge1: 1.0,
        }
    }
}

/// How far the pipeline runs and what gets presented.
///
/// The three non-final stages are debug checkpoints: each one stops the
/// pipeline early and blits the intermediate buffer instead of the composite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderStage {
    /// Centered square crop of the input, straight to the output surface.
    Source,
    /// The CPU prefix-sum table, normalized into visible range.
    Sat,
    /// The raw Pass-1 field/color target.
    Pass1,
    /// Both passes, composited over the background color.
    #[default]
    Final,
}

/// Decode a `#rrggbb` hex color to normalized RGB. Tolerates a missing `#`;
/// malformed components decode as 0 (matching the original tool's lenience).
pub fn hex_to_rgb(hex: &str) -> [f32; 3] {
    let h = hex.strip_prefix('#').unwrap_or(hex);
    let channel = |range: std::ops::Range<usize>| -> f32 {
        h.get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .unwrap_or(0) as f32
            / 255.0
    };
    [channel(0..2), channel(2..4), channel(4..6)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_decode_basics() {
        assert_eq!(hex_to_rgb("#000000"), [0.0, 0.0, 0.0]);
        assert_eq!(hex_to_rgb("#ffffff"), [1.0, 1.0, 1.0]);
        assert_eq!(hex_to_rgb("ff0000"), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn hex_decode_malformed_components_are_zero() {
        assert_eq!(hex_to_rgb("#zzff00"), [0.0, 1.0, 0.0]);
        assert_eq!(hex_to_rgb("#ff"), [1.0, 0.0, 0.0]);
        assert_eq!(hex_to_rgb(""), [0.0, 0.0, 0.0]);
    }
}
