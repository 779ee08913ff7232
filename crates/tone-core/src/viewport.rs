//! Aspect-preserving fit of a source image onto a display surface.
//!
//! Two independent pieces of geometry are computed here:
//!
//! - **Display sizing** ([`fit`]): how large the visible surface should be,
//!   in CSS pixels and in backing-store pixels, for a given host width and
//!   device pixel ratio. The image is never upscaled for display.
//! - **Quad scale** ([`quad_scale`]): the non-uniform scale applied to the
//!   full-screen quad in the vertex stage so the texture keeps its aspect
//!   ratio inside any target (letterbox, no crop).
//!
//! ```text
//! texAspect > targetAspect           texAspect <= targetAspect
//! ┌──────────────┐                   ┌───┬────────┬───┐
//! │░░░░░░░░░░░░░░│                   │░░░│        │░░░│
//! │    image     │  scale=(1, t/a)   │░░░│ image  │░░░│  scale=(a/t, 1)
//! │░░░░░░░░░░░░░░│                   │░░░│        │░░░│
//! └──────────────┘                   └───┴────────┴───┘
//! ```

use glam::Vec2;

use crate::config::ViewportConfig;

/// Integer pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Creates a size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height. Zero height is treated as one.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Number of pixels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True when either side is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// As `[width, height]`.
    pub const fn to_array(self) -> [u32; 2] {
        [self.width, self.height]
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Result of sizing the visible surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayFit {
    /// Layout size in CSS (device-independent) pixels.
    pub css: Size,
    /// Backing-store size in physical pixels.
    pub pixels: Size,
}

/// Sizes the visible surface for `source`.
///
/// `host_width` is the width available in CSS pixels, `device_scale` the
/// device pixel ratio. Non-finite or non-positive inputs fall back to 1.
///
/// # Example
///
/// ```rust
/// use tone_core::config::ViewportConfig;
/// use tone_core::viewport::{fit, Size};
///
/// let cfg = ViewportConfig::default();
/// let out = fit(Size::new(4000, 2000), 1400.0, 2.0, &cfg);
/// assert_eq!(out.css, Size::new(1000, 500));
/// assert_eq!(out.pixels, Size::new(2000, 1000));
/// ```
pub fn fit(source: Size, host_width: f32, device_scale: f32, cfg: &ViewportConfig) -> DisplayFit {
    let host = positive_or_one(host_width).max(1.0);
    let dpr = positive_or_one(device_scale);

    let cap = if host < cfg.mobile_breakpoint {
        cfg.max_width_mobile
    } else {
        cfg.max_width_desktop
    };
    let max_css_w = host.min(cap);
    let src_w = source.width.max(1) as f32;
    let src_h = source.height.max(1) as f32;
    let scale = (max_css_w / src_w).min(1.0);

    let css_w = (src_w * scale).round();
    let css_h = (src_h * scale).round();

    DisplayFit {
        css: Size::new(to_px(css_w), to_px(css_h)),
        pixels: Size::new(to_px(css_w * dpr), to_px(css_h * dpr)),
    }
}

/// Vertex-stage scale that letterboxes a `texture` inside `target`.
///
/// One component is always exactly 1; the other is at most 1.
pub fn quad_scale(texture: Size, target: Size) -> Vec2 {
    let tex_aspect = texture.aspect();
    let target_aspect = target.aspect();
    if tex_aspect > target_aspect {
        Vec2::new(1.0, target_aspect / tex_aspect)
    } else {
        Vec2::new(tex_aspect / target_aspect, 1.0)
    }
}

/// Complete geometry for one draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportGeometry {
    /// Source image size.
    pub source: Size,
    /// Render target size in physical pixels (also the viewport).
    pub target: Size,
    /// Display size in CSS pixels (equals `target` for offscreen targets).
    pub css: Size,
    /// Letterbox scale applied to the unit quad.
    pub scale: Vec2,
}

impl ViewportGeometry {
    /// Geometry for the visible surface.
    pub fn for_display(source: Size, host_width: f32, device_scale: f32, cfg: &ViewportConfig) -> Self {
        let DisplayFit { css, pixels } = fit(source, host_width, device_scale, cfg);
        Self {
            source,
            target: pixels,
            css,
            scale: quad_scale(source, pixels),
        }
    }

    /// Geometry for an arbitrary offscreen target.
    pub fn for_target(source: Size, target: Size) -> Self {
        Self {
            source,
            target,
            css: target,
            scale: quad_scale(source, target),
        }
    }
}

fn positive_or_one(v: f32) -> f32 {
    if v.is_finite() && v > 0.0 { v } else { 1.0 }
}

fn to_px(v: f32) -> u32 {
    (v.round() as u32).max(1)
}
