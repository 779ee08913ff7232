//! CPU backend using rayon for parallelization.
//!
//! A software rendition of the GPU programs: the same letterboxed quad,
//! nearest-texel sampling with clamp-to-edge, per-pixel tone mapping via
//! [`ToneConfig::apply`], and round-to-nearest unorm8 output. Framebuffers
//! are stored bottom row first, as a GL default framebuffer would be, so
//! readbacks are [`RowOrder::BottomUp`].

use std::collections::HashMap;

use glam::Vec2;
use rayon::prelude::*;
use tone_core::{flip_rows, RowOrder, Rgb, Size, SourceImage, ToneConfig};
use tracing::{debug, trace};

use super::{RenderBackend, RenderLimits, Target, TargetId};
use crate::uniforms::DrawUniforms;
use crate::{RenderError, RenderResult};

/// Largest texture side, matching common GPU limits.
pub(crate) const MAX_TEXTURE_DIM: u32 = 16384;

const CLEAR: [u8; 4] = [0, 0, 0, 255];

/// Source texture in RAM.
struct CpuTexture {
    texels: Vec<u8>,
    size: Size,
}

impl CpuTexture {
    /// Nearest texel at normalized `uv`, clamped to the edge.
    fn sample(&self, uv: Vec2) -> Rgb {
        let w = self.size.width as usize;
        let h = self.size.height as usize;
        let x = ((uv.x * w as f32).floor().max(0.0) as usize).min(w - 1);
        let y = ((uv.y * h as f32).floor().max(0.0) as usize).min(h - 1);
        let i = (y * w + x) * 4;
        Rgb::new(self.texels[i] as f32, self.texels[i + 1] as f32, self.texels[i + 2] as f32) / 255.0
    }
}

/// RGBA8 framebuffer, bottom row first.
struct Framebuffer {
    pixels: Vec<u8>,
    size: Size,
}

impl Framebuffer {
    fn new(size: Size) -> Self {
        Self { pixels: CLEAR.repeat(size.area() as usize), size }
    }
}

/// Software rasterizer implementing [`RenderBackend`].
pub struct CpuBackend {
    limits: RenderLimits,
    texture: Option<CpuTexture>,
    surface: Option<Framebuffer>,
    targets: HashMap<TargetId, Framebuffer>,
    next_id: u64,
}

impl CpuBackend {
    pub fn new() -> Self {
        // Get system RAM (fallback to 4GB if detection fails)
        let available = sys_info::mem_info()
            .map(|m| m.avail * 1024)
            .unwrap_or(4 * 1024 * 1024 * 1024);

        Self::with_limits(RenderLimits { max_texture_dim: MAX_TEXTURE_DIM, available_memory: available })
    }

    /// Backend with explicit limits.
    pub fn with_limits(limits: RenderLimits) -> Self {
        Self {
            limits,
            texture: None,
            surface: None,
            targets: HashMap::new(),
            next_id: 1,
        }
    }

    fn framebuffer(&self, target: Target) -> RenderResult<&Framebuffer> {
        match target {
            Target::Surface => self
                .surface
                .as_ref()
                .ok_or_else(|| RenderError::OperationFailed("surface not configured".into())),
            Target::Offscreen(id) => self.targets.get(&id).ok_or(RenderError::UnknownTarget(id)),
        }
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "CPU"
    }

    fn limits(&self) -> &RenderLimits {
        &self.limits
    }

    fn readback_order(&self) -> RowOrder {
        RowOrder::BottomUp
    }

    fn upload_texture(&mut self, image: &SourceImage, flip_y: bool) -> RenderResult<()> {
        let size = image.size();
        self.limits.check(size)?;
        let texels = if flip_y {
            flip_rows(image.pixels(), size.width, size.height, 4)?
        } else {
            image.pixels().to_vec()
        };
        self.texture = Some(CpuTexture { texels, size });
        debug!(%size, flip_y, "texture uploaded");
        Ok(())
    }

    fn release_texture(&mut self) {
        if self.texture.take().is_some() {
            debug!("texture released");
        }
    }

    fn has_texture(&self) -> bool {
        self.texture.is_some()
    }

    fn configure_surface(&mut self, size: Size) -> RenderResult<()> {
        self.limits.check(size)?;
        if self.surface.as_ref().map(|s| s.size) != Some(size) {
            self.surface = Some(Framebuffer::new(size));
        }
        Ok(())
    }

    fn surface_size(&self) -> Option<Size> {
        self.surface.as_ref().map(|s| s.size)
    }

    fn create_target(&mut self, size: Size) -> RenderResult<TargetId> {
        self.limits.check(size)?;
        let id = TargetId(self.next_id);
        self.next_id += 1;
        self.targets.insert(id, Framebuffer::new(size));
        debug!(%id, %size, "target created");
        Ok(id)
    }

    fn destroy_target(&mut self, id: TargetId) {
        if self.targets.remove(&id).is_some() {
            debug!(%id, "target destroyed");
        }
    }

    fn target_count(&self) -> usize {
        self.targets.len()
    }

    fn draw(&mut self, target: Target, uniforms: &DrawUniforms) -> RenderResult<()> {
        let texture = self.texture.as_ref().ok_or(RenderError::NoTexture)?;
        let fb = match target {
            Target::Surface => self
                .surface
                .as_mut()
                .ok_or_else(|| RenderError::OperationFailed("surface not configured".into()))?,
            Target::Offscreen(id) => self.targets.get_mut(&id).ok_or(RenderError::UnknownTarget(id))?,
        };
        trace!(?target, mode = %uniforms.mode(), size = %fb.size, "cpu draw");
        rasterize(fb, texture, uniforms);
        Ok(())
    }

    fn read_pixels(&mut self, target: Target) -> RenderResult<Vec<u8>> {
        Ok(self.framebuffer(target)?.pixels.clone())
    }
}

/// Clears `fb` and draws the letterboxed, tone-mapped quad into it.
fn rasterize(fb: &mut Framebuffer, texture: &CpuTexture, uniforms: &DrawUniforms) {
    let width = fb.size.width as usize;
    let vp_w = uniforms.viewport.width.min(fb.size.width) as usize;
    let vp_h = uniforms.viewport.height.min(fb.size.height) as usize;
    let vp = Vec2::new(uniforms.viewport.width as f32, uniforms.viewport.height as f32);
    let scale = uniforms.quad_scale();
    let config = uniforms.config;

    fb.pixels
        .par_chunks_mut(width * 4)
        .enumerate()
        .for_each(|(row, line)| {
            for (col, px) in line.chunks_exact_mut(4).enumerate() {
                let rgba = if row < vp_h && col < vp_w {
                    let centre = Vec2::new(col as f32 + 0.5, row as f32 + 0.5);
                    shade(centre / vp * 2.0 - Vec2::ONE, scale, texture, &config)
                } else {
                    None
                };
                px.copy_from_slice(&rgba.unwrap_or(CLEAR));
            }
        });
}

/// Color at normalized device position `ndc`, or `None` outside the quad.
#[inline]
fn shade(ndc: Vec2, scale: Vec2, texture: &CpuTexture, config: &ToneConfig) -> Option<[u8; 4]> {
    if ndc.x.abs() > scale.x || ndc.y.abs() > scale.y {
        return None;
    }
    let uv = 0.5 * (ndc / scale + Vec2::ONE);
    let out = config.apply(texture.sample(uv));
    let [r, g, b] = out.to_array().map(to_unorm8);
    Some([r, g, b, 255])
}

#[inline]
fn to_unorm8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use tone_core::viewport::ViewportGeometry;
    use tone_core::DuotoneParams;

    // Zero strength passes the source through untouched.
    fn passthrough() -> ToneConfig {
        ToneConfig::Duotone(DuotoneParams { strength: 0.0, ..DuotoneParams::identity() })
    }

    fn uniforms(tex: Size, target: Size) -> DrawUniforms {
        DrawUniforms::new(&passthrough(), &ViewportGeometry::for_target(tex, target))
    }

    #[test]
    fn draw_requires_texture() {
        let mut b = CpuBackend::new();
        let id = b.create_target(Size::new(2, 2)).unwrap();
        let u = uniforms(Size::new(2, 2), Size::new(2, 2));
        assert!(matches!(b.draw(Target::Offscreen(id), &u), Err(RenderError::NoTexture)));
    }

    #[test]
    fn unknown_target() {
        let mut b = CpuBackend::new();
        let img = SourceImage::from_rgba8(1, 1, vec![255; 4]).unwrap();
        b.upload_texture(&img, true).unwrap();
        let u = uniforms(Size::new(1, 1), Size::new(1, 1));
        let id = TargetId(42);
        assert!(matches!(b.draw(Target::Offscreen(id), &u), Err(RenderError::UnknownTarget(_))));
        assert!(b.read_pixels(Target::Surface).is_err());
    }

    #[test]
    fn bottom_up_readback_of_flipped_texture() {
        // Top row red, bottom row blue.
        let img = SourceImage::from_fn(1, 2, |_, y| if y == 0 { [255, 0, 0, 255] } else { [0, 0, 255, 255] }).unwrap();
        let mut b = CpuBackend::new();
        b.upload_texture(&img, true).unwrap();
        let id = b.create_target(Size::new(1, 2)).unwrap();
        b.draw(Target::Offscreen(id), &uniforms(img.size(), Size::new(1, 2))).unwrap();
        let raw = b.read_pixels(Target::Offscreen(id)).unwrap();
        // Row 0 of the framebuffer is the bottom of the picture.
        assert_eq!(&raw[..4], &[0, 0, 255, 255]);
        assert_eq!(&raw[4..], &[255, 0, 0, 255]);
    }

    #[test]
    fn letterbox_bars_are_black() {
        // 2x1 white image into a 2x3 target: the middle row is the image.
        let img = SourceImage::from_rgba8(2, 1, vec![255; 8]).unwrap();
        let mut b = CpuBackend::new();
        b.upload_texture(&img, true).unwrap();
        let id = b.create_target(Size::new(2, 3)).unwrap();
        b.draw(Target::Offscreen(id), &uniforms(img.size(), Size::new(2, 3))).unwrap();
        let raw = b.read_pixels(Target::Offscreen(id)).unwrap();
        let rows: Vec<&[u8]> = raw.chunks(8).collect();
        assert_eq!(rows[0], &[0, 0, 0, 255, 0, 0, 0, 255]);
        assert_eq!(rows[1], &[255; 8]);
        assert_eq!(rows[2], &[0, 0, 0, 255, 0, 0, 0, 255]);
    }

    #[test]
    fn targets_are_tracked() {
        let mut b = CpuBackend::new();
        let a = b.create_target(Size::new(4, 4)).unwrap();
        let c = b.create_target(Size::new(4, 4)).unwrap();
        assert_ne!(a, c);
        assert_eq!(b.target_count(), 2);
        b.destroy_target(a);
        b.destroy_target(a);
        assert_eq!(b.target_count(), 1);
    }

    #[test]
    fn oversize_texture_rejected() {
        let mut b = CpuBackend::with_limits(RenderLimits { max_texture_dim: 4, available_memory: 1 << 20 });
        let img = SourceImage::from_rgba8(5, 1, vec![0; 20]).unwrap();
        assert!(matches!(b.upload_texture(&img, true), Err(RenderError::TextureTooLarge { .. })));
        assert!(!b.has_texture());
    }
}
