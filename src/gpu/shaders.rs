// ============================================================================
// GPU SHADERS — all WGSL code kept inline for containment
// ============================================================================
//
// Two kinds of programs live here:
//
//   1. **Blit programs** (BLIT_SHADER, BLIT_SAT_SHADER) — fixed, created once
//      at processor construction, never hot-reloaded. They copy a texture to
//      the output surface, optionally flipping vertically; the SAT variant
//      additionally scales the unbounded prefix-sum magnitudes into [0,1].
//
//   2. **Default pass programs** — the halftone field generator (Pass 1) and
//      compositor (Pass 2) the crate ships with. The processor treats pass
//      sources as opaque caller-supplied text; these are merely the default
//      `ShaderSources`, and double as executable documentation of the
//      uniform contract. Replacements must keep the same bind-group layout
//      and uniform struct layouts.

/// The three caller-replaceable programs: a shared vertex stage and the two
/// pass fragment stages. The blit programs are not part of this set.
#[derive(Clone, Debug)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment_pass1: String,
    pub fragment_pass2: String,
}

impl Default for ShaderSources {
    fn default() -> Self {
        Self {
            vertex: DEFAULT_VERTEX.to_string(),
            fragment_pass1: DEFAULT_PASS1.to_string(),
            fragment_pass2: DEFAULT_PASS2.to_string(),
        }
    }
}

// ============================================================================
// BLIT — plain copy with optional vertical flip
// ============================================================================
pub const BLIT_SHADER: &str = r#"
struct BlitUniforms {
    flip_y: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
};

@group(0) @binding(0) var<uniform> u: BlitUniforms;
@group(0) @binding(1) var src_tex: texture_2d<f32>;
@group(0) @binding(2) var src_samp: sampler;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) a_position: vec2<f32>) -> VsOut {
    var out: VsOut;
    out.uv = vec2<f32>(a_position.x, -a_position.y) * 0.5 + vec2<f32>(0.5);
    out.pos = vec4<f32>(a_position, 0.0, 1.0);
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let t = vec2<f32>(in.uv.x, mix(in.uv.y, 1.0 - in.uv.y, u.flip_y));
    return textureSample(src_tex, src_samp, t);
}
"#;

// ============================================================================
// BLIT SAT — normalize a raw float SAT into displayable range, then copy
// ============================================================================
pub const BLIT_SAT_SHADER: &str = r#"
struct BlitSatUniforms {
    scale: f32,
    flip_y: f32,
    _pad0: f32,
    _pad1: f32,
};

@group(0) @binding(0) var<uniform> u: BlitSatUniforms;
@group(0) @binding(1) var src_tex: texture_2d<f32>;
@group(0) @binding(2) var src_samp: sampler;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) a_position: vec2<f32>) -> VsOut {
    var out: VsOut;
    out.uv = vec2<f32>(a_position.x, -a_position.y) * 0.5 + vec2<f32>(0.5);
    out.pos = vec4<f32>(a_position, 0.0, 1.0);
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let t = vec2<f32>(in.uv.x, mix(in.uv.y, 1.0 - in.uv.y, u.flip_y));
    let s = textureSample(src_tex, src_samp, t);
    let n = clamp(s.rgb * u.scale, vec3<f32>(0.0), vec3<f32>(1.0));
    return vec4<f32>(n, 1.0);
}
"#;

// ============================================================================
// DEFAULT VERTEX — full-screen quad shared by both passes
// ============================================================================
//
// `a_position` is the single vertex attribute: a clip-space quad covering
// [-1,1]². The uv flip puts uv.y = 0 at the top of the target so uv space
// coincides with texture row space.
pub const DEFAULT_VERTEX: &str = r#"
struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) a_position: vec2<f32>) -> VsOut {
    var out: VsOut;
    out.uv = vec2<f32>(a_position.x, -a_position.y) * 0.5 + vec2<f32>(0.5);
    out.pos = vec4<f32>(a_position, 0.0, 1.0);
    return out;
}
"#;

// ============================================================================
// DEFAULT PASS 1 — dot field generation from the SAT
// ============================================================================
//
// For each of the two granularities, every fragment scans the surrounding
// cell neighborhood, derives each cell's average color from four SAT
// lookups, and accumulates a signed distance-style field (positive inside a
// dot). The two fields and cell colors are cross-faded by `blend_value`.
// The field is divided by `field_scale` before storage; Pass 2 multiplies
// it back out.
pub const DEFAULT_PASS1: &str = r#"
struct Pass1Uniforms {
    size: f32,
    size_p1: f32,
    step1: f32,
    step2: f32,
    area1: f32,
    area2: f32,
    radius_scale1: f32,
    radius_scale2: f32,
    field_scale: f32,
    blend_value: f32,
    offset2: f32,
    contrast: f32,
    contrast_only_luma: u32,
    neighbor_radius1: i32,
    neighbor_radius2: i32,
    _pad: u32,
};

@group(0) @binding(0) var<uniform> u: Pass1Uniforms;
@group(0) @binding(1) var sat_tex: texture_2d<f32>;

const LUMA: vec3<f32> = vec3<f32>(0.299, 0.587, 0.114);

fn sat_at(p: vec2<i32>) -> vec3<f32> {
    let q = clamp(p, vec2<i32>(0), vec2<i32>(i32(u.size)));
    return textureLoad(sat_tex, q, 0).rgb;
}

// Four-point inclusion-exclusion over the zero-padded prefix table.
fn rect_sum(x0: i32, y0: i32, x1: i32, y1: i32) -> vec3<f32> {
    return sat_at(vec2<i32>(x1, y1)) - sat_at(vec2<i32>(x0, y1))
         - sat_at(vec2<i32>(x1, y0)) + sat_at(vec2<i32>(x0, y0));
}

fn apply_contrast(c: vec3<f32>) -> vec3<f32> {
    let k = 1.0 + u.contrast / 100.0;
    if (u.contrast_only_luma != 0u) {
        let l = dot(c, LUMA);
        let l2 = clamp((l - 0.5) * k + 0.5, 0.0, 1.0);
        return clamp(c + vec3<f32>(l2 - l), vec3<f32>(0.0), vec3<f32>(1.0));
    }
    return clamp((c - vec3<f32>(0.5)) * k + vec3<f32>(0.5), vec3<f32>(0.0), vec3<f32>(1.0));
}

// Field and own-cell color for one granularity. `shift_cells` offsets the
// dot lattice (the secondary grid's center offset); `nr` is the neighbor
// radius, 0 when the grid is a single cell.
fn level_field(px: vec2<f32>, step_px: f32, area: f32, radius_scale: f32,
               nr: i32, shift_cells: f32) -> vec4<f32> {
    let shift = shift_cells * step_px;
    let ci = floor((px - vec2<f32>(shift)) / step_px);
    var field = -1.0e6;
    var own = vec3<f32>(0.0);
    for (var dy = -nr; dy <= nr; dy = dy + 1) {
        for (var dx = -nr; dx <= nr; dx = dx + 1) {
            let c = ci + vec2<f32>(f32(dx), f32(dy));
            let x0 = clamp(i32(round(c.x * step_px + shift)), 0, i32(u.size));
            let y0 = clamp(i32(round(c.y * step_px + shift)), 0, i32(u.size));
            let x1 = clamp(i32(round((c.x + 1.0) * step_px + shift)), 0, i32(u.size));
            let y1 = clamp(i32(round((c.y + 1.0) * step_px + shift)), 0, i32(u.size));
            if (x1 <= x0 || y1 <= y0) {
                continue;
            }
            let avg = clamp(rect_sum(x0, y0, x1, y1) / area, vec3<f32>(0.0), vec3<f32>(1.0));
            let col = apply_contrast(avg);
            let radius = radius_scale * (1.0 - dot(col, LUMA));
            let center = (c + vec2<f32>(0.5)) * step_px + vec2<f32>(shift);
            field = max(field, radius - distance(px, center));
            if (dx == 0 && dy == 0) {
                own = col;
            }
        }
    }
    return vec4<f32>(own, field);
}

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let px = uv * u.size;
    let f1 = level_field(px, u.step1, u.area1, u.radius_scale1, u.neighbor_radius1, 0.0);
    let f2 = level_field(px, u.step2, u.area2, u.radius_scale2, u.neighbor_radius2, u.offset2 * 0.5);
    let color = mix(f1.rgb, f2.rgb, u.blend_value);
    let field = mix(f1.a, f2.a, u.blend_value);
    return vec4<f32>(color, field / u.field_scale);
}
"#;

// ============================================================================
// DEFAULT PASS 2 — threshold, soften, and composite over the background
// ============================================================================
pub const DEFAULT_PASS2: &str = r#"
struct Pass2Uniforms {
    bg_color: vec3<f32>,
    field_scale: f32,
    mono_color: vec3<f32>,
    threshold: f32,
    soft: f32,
    soft_fineness: f32,
    use_color_blend: f32,
    luma_to_alpha: u32,
    luma_to_alpha_edge0: f32,
    luma_to_alpha_edge1: f32,
    _pad0: f32,
    _pad1: f32,
};

@group(0) @binding(0) var<uniform> u: Pass2Uniforms;
@group(0) @binding(1) var pass1_tex: texture_2d<f32>;
@group(0) @binding(2) var pass1_samp: sampler;

const LUMA: vec3<f32> = vec3<f32>(0.299, 0.587, 0.114);

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let s = textureSample(pass1_tex, pass1_samp, uv);
    let field = s.a * u.field_scale;

    // threshold shifts the field's zero crossing; soft * fineness widens the
    // smoothstep band around it.
    let w = max(u.soft * u.soft_fineness, 1e-4);
    let mask = smoothstep(1.0 - w, 1.0 + w, field + u.threshold);

    let dot_color = mix(u.mono_color, s.rgb, u.use_color_blend);
    let color = mix(u.bg_color, dot_color, mask);

    var alpha = 1.0;
    if (u.luma_to_alpha != 0u) {
        let l = dot(color, LUMA);
        let e1 = max(u.luma_to_alpha_edge1, u.luma_to_alpha_edge0 + 1e-4);
        alpha = 1.0 - smoothstep(u.luma_to_alpha_edge0, e1, l);
    }
    return vec4<f32>(color, alpha);
}
"#;
