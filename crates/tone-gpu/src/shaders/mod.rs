//! WGSL sources for the two tone-mapping render programs.
//!
//! Each program is [`COMMON`] followed by its fragment stage. The math
//! mirrors `tone_core::tone` step for step, including the hard-step case
//! of `smooth_edge` at zero softness.

#![allow(dead_code)] // Used by the wgpu backend

/// Vertex stage, bindings and shared helpers.
pub const COMMON: &str = r#"
struct Geometry {
    tex_size: vec2<f32>,
    target_size: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@group(0) @binding(0) var src_tex: texture_2d<f32>;
@group(0) @binding(1) var src_sampler: sampler;
@group(0) @binding(2) var<uniform> geometry: Geometry;

// Letterboxed full-screen quad, two triangles.
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    var quad = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>( 1.0,  1.0),
    );
    let p = quad[index];

    let tex_aspect = geometry.tex_size.x / max(geometry.tex_size.y, 1.0);
    let target_aspect = geometry.target_size.x / max(geometry.target_size.y, 1.0);
    var scale = vec2<f32>(1.0, 1.0);
    if tex_aspect > target_aspect {
        scale.y = target_aspect / tex_aspect;
    } else {
        scale.x = tex_aspect / target_aspect;
    }

    var out: VertexOutput;
    out.position = vec4<f32>(p * scale, 0.0, 1.0);
    out.uv = 0.5 * (p + vec2<f32>(1.0, 1.0));
    return out;
}

fn luminance(c: vec3<f32>) -> f32 {
    return dot(c, vec3<f32>(0.2126, 0.7152, 0.0722));
}

fn smooth_edge(lo: f32, hi: f32, x: f32) -> f32 {
    if hi <= lo {
        return select(1.0, 0.0, x < lo);
    }
    let k = clamp((x - lo) / (hi - lo), 0.0, 1.0);
    return k * k * (3.0 - 2.0 * k);
}

fn brightness_contrast(c: vec3<f32>, brightness: f32, contrast: f32) -> vec3<f32> {
    let mid = vec3<f32>(0.5);
    let out = (c - mid) * (1.0 + contrast) + mid + vec3<f32>(brightness * 0.5);
    return clamp(out, vec3<f32>(0.0), vec3<f32>(1.0));
}
"#;

/// Duotone fragment stage.
pub const DUOTONE: &str = r#"
struct Duotone {
    shadow: vec3<f32>,
    strength: f32,
    highlight: vec3<f32>,
    brightness: f32,
    contrast: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}

@group(0) @binding(3) var<uniform> params: Duotone;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let src = textureSample(src_tex, src_sampler, input.uv).rgb;
    let lum = luminance(src);
    let duo = mix(params.shadow, params.highlight, lum);
    let blended = mix(src, duo, clamp(params.strength, 0.0, 1.0));
    return vec4<f32>(brightness_contrast(blended, params.brightness, params.contrast), 1.0);
}
"#;

/// Tritone fragment stage.
pub const TRITONE: &str = r#"
struct Tritone {
    color_a: vec3<f32>,
    threshold1: f32,
    color_b: vec3<f32>,
    threshold2: f32,
    color_c: vec3<f32>,
    softness: f32,
    strength: f32,
    brightness: f32,
    contrast: f32,
    orig_mix: f32,
}

@group(0) @binding(3) var<uniform> params: Tritone;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let src = textureSample(src_tex, src_sampler, input.uv).rgb;
    let lum = luminance(src);
    let s = params.softness;
    let t1 = params.threshold1;
    let t2 = params.threshold2;

    let w_a = 1.0 - smooth_edge(t1 - s, t1 + s, lum);
    let w_c = smooth_edge(t2 - s, t2 + s, lum);
    let w_b = clamp(1.0 - w_a - w_c, 0.0, 1.0);
    var mapped = params.color_a * w_a + params.color_b * w_b + params.color_c * w_c;

    let near_black = 1.0 - smooth_edge(0.0, s * 2.0, lum);
    let near_white = smooth_edge(1.0 - s * 2.0, 1.0, lum);
    let bw = vec3<f32>(near_white) * max(near_black, near_white);
    mapped = mix(mapped, bw, params.orig_mix);

    let blended = mix(src, mapped, clamp(params.strength, 0.0, 1.0));
    return vec4<f32>(brightness_contrast(blended, params.brightness, params.contrast), 1.0);
}
"#;

/// Full source of the program for `mode`.
pub fn program_source(mode: tone_core::ToneMode) -> String {
    let fragment = match mode {
        tone_core::ToneMode::Duotone => DUOTONE,
        tone_core::ToneMode::Tritone => TRITONE,
    };
    format!("{COMMON}{fragment}")
}
