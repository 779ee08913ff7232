//! Per-draw inputs shared by every backend.
//!
//! [`DrawUniforms`] is the backend-neutral form. The `#[repr(C)]` structs
//! below are its GPU layout, matching the WGSL declarations in the shader
//! sources byte for byte (std140-style: every `vec3` padded to 16 bytes).

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use tone_core::viewport::{quad_scale, ViewportGeometry};
use tone_core::{DuotoneParams, Size, ToneConfig, ToneMode, TritoneParams};

/// Everything one draw call reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawUniforms {
    /// Active program and its parameters, already clamped.
    pub config: ToneConfig,
    /// Source texture size.
    pub tex_size: Size,
    /// Render target size.
    pub target_size: Size,
    /// Viewport, anchored at the target origin.
    pub viewport: Size,
}

impl DrawUniforms {
    /// Uniforms for drawing `config` with `geometry`; the viewport covers
    /// the whole target.
    pub fn new(config: &ToneConfig, geometry: &ViewportGeometry) -> Self {
        Self {
            config: config.sanitized(),
            tex_size: geometry.source,
            target_size: geometry.target,
            viewport: geometry.target,
        }
    }

    /// Program to bind.
    pub fn mode(&self) -> ToneMode {
        self.config.mode()
    }

    /// Letterbox scale the vertex stage applies to the unit quad.
    pub fn quad_scale(&self) -> Vec2 {
        quad_scale(self.tex_size, self.target_size)
    }
}

// =============================================================================
// GPU layouts
// =============================================================================

/// `struct Geometry` in the vertex stage.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct GeometryUniform {
    pub tex_size: [f32; 2],
    pub target_size: [f32; 2],
}

impl From<&DrawUniforms> for GeometryUniform {
    fn from(u: &DrawUniforms) -> Self {
        Self {
            tex_size: [u.tex_size.width as f32, u.tex_size.height as f32],
            target_size: [u.target_size.width as f32, u.target_size.height as f32],
        }
    }
}

/// `struct Duotone` in the duotone fragment stage.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct DuotoneUniform {
    pub shadow: [f32; 3],
    pub strength: f32,
    pub highlight: [f32; 3],
    pub brightness: f32,
    pub contrast: f32,
    pub _pad: [f32; 3],
}

impl From<&DuotoneParams> for DuotoneUniform {
    fn from(p: &DuotoneParams) -> Self {
        Self {
            shadow: p.shadow.to_array(),
            strength: p.strength,
            highlight: p.highlight.to_array(),
            brightness: p.brightness,
            contrast: p.contrast,
            _pad: [0.0; 3],
        }
    }
}

/// `struct Tritone` in the tritone fragment stage.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct TritoneUniform {
    pub color_a: [f32; 3],
    pub threshold1: f32,
    pub color_b: [f32; 3],
    pub threshold2: f32,
    pub color_c: [f32; 3],
    pub softness: f32,
    pub strength: f32,
    pub brightness: f32,
    pub contrast: f32,
    pub orig_mix: f32,
}

impl From<&TritoneParams> for TritoneUniform {
    fn from(p: &TritoneParams) -> Self {
        Self {
            color_a: p.color_a.to_array(),
            threshold1: p.threshold1,
            color_b: p.color_b.to_array(),
            threshold2: p.threshold2,
            color_c: p.color_c.to_array(),
            softness: p.softness,
            strength: p.strength,
            brightness: p.brightness,
            contrast: p.contrast,
            orig_mix: p.orig_mix,
        }
    }
}
