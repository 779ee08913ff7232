//! Rendering backends with automatic selection.
//!
//! Provides a CPU (rayon) rasterizer and a wgpu backend behind one trait.
//!
//! # Environment Variables
//!
//! - `TONE_BACKEND` - `cpu`, `wgpu` or `auto` (default), read by
//!   [`Backend::from_env`]

mod cpu_backend;
mod detect;

#[cfg(feature = "wgpu")]
mod wgpu_backend;

pub use cpu_backend::CpuBackend;
pub use detect::{describe_backends, detect_backends, select_best_backend, BackendInfo};

#[cfg(feature = "wgpu")]
pub use wgpu_backend::WgpuBackend;

use tone_core::{RowOrder, Size, SourceImage};
use tracing::warn;

use crate::uniforms::DrawUniforms;
use crate::{RenderError, RenderResult};

/// Environment variable consulted by [`Backend::from_env`].
pub const BACKEND_ENV: &str = "TONE_BACKEND";

/// Available rendering backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Auto-select best available (wgpu > CPU).
    #[default]
    Auto,
    /// Software rasterizer using rayon.
    Cpu,
    /// wgpu backend (Vulkan/Metal/DX12/GL).
    Wgpu,
}

impl Backend {
    /// Check if this backend is available on current system.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Auto => true,
            Self::Cpu => true,
            #[cfg(feature = "wgpu")]
            Self::Wgpu => WgpuBackend::is_available(),
            #[cfg(not(feature = "wgpu"))]
            Self::Wgpu => false,
        }
    }

    /// Parses a backend name, case-insensitive.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Some(Self::Auto),
            "cpu" | "software" => Some(Self::Cpu),
            "wgpu" | "gpu" => Some(Self::Wgpu),
            _ => None,
        }
    }

    /// Backend requested by `TONE_BACKEND`, or `Auto`.
    pub fn from_env() -> Self {
        match std::env::var(BACKEND_ENV) {
            Ok(v) => Self::parse(&v).unwrap_or_else(|| {
                warn!(value = %v, "unrecognized {BACKEND_ENV}, using auto");
                Self::Auto
            }),
            Err(_) => Self::Auto,
        }
    }
}

/// Resource limits of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderLimits {
    /// Largest texture or target side in pixels.
    pub max_texture_dim: u32,
    /// Memory available for textures and targets, in bytes.
    pub available_memory: u64,
}

impl RenderLimits {
    /// Checks that a `size` texture fits these limits.
    pub fn check(&self, size: Size) -> RenderResult<()> {
        if size.is_empty() {
            return Err(RenderError::InvalidDimensions(size.width, size.height));
        }
        if size.width > self.max_texture_dim
            || size.height > self.max_texture_dim
            || size.area() * 4 > self.available_memory
        {
            return Err(RenderError::TextureTooLarge {
                width: size.width,
                height: size.height,
                limit: self.max_texture_dim,
            });
        }
        Ok(())
    }
}

/// Handle of an offscreen render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub(crate) u64);

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Destination of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The visible surface.
    Surface,
    /// An offscreen target from [`RenderBackend::create_target`].
    Offscreen(TargetId),
}

/// A device able to run the tone-mapping programs.
///
/// All calls happen on one thread, in order; implementations never need
/// internal locking.
pub trait RenderBackend: Send {
    /// Backend name.
    fn name(&self) -> &'static str;

    /// Texture and memory limits.
    fn limits(&self) -> &RenderLimits;

    /// Row order of [`read_pixels`](Self::read_pixels) output.
    fn readback_order(&self) -> RowOrder;

    /// Replaces the source texture with `image`, optionally flipped vertically.
    fn upload_texture(&mut self, image: &SourceImage, flip_y: bool) -> RenderResult<()>;

    /// Releases the source texture, if any.
    fn release_texture(&mut self);

    /// Whether a source texture is bound.
    fn has_texture(&self) -> bool;

    /// (Re)allocates the visible surface at `size` physical pixels.
    fn configure_surface(&mut self, size: Size) -> RenderResult<()>;

    /// Current visible surface size.
    fn surface_size(&self) -> Option<Size>;

    /// Allocates an offscreen RGBA8 target.
    fn create_target(&mut self, size: Size) -> RenderResult<TargetId>;

    /// Frees an offscreen target. Unknown ids are ignored.
    fn destroy_target(&mut self, id: TargetId);

    /// Number of live offscreen targets.
    fn target_count(&self) -> usize;

    /// Clears `target` to opaque black and draws the letterboxed quad.
    fn draw(&mut self, target: Target, uniforms: &DrawUniforms) -> RenderResult<()>;

    /// Reads back `target` as tightly packed RGBA8 in [`readback_order`](Self::readback_order).
    fn read_pixels(&mut self, target: Target) -> RenderResult<Vec<u8>>;
}

/// Create a backend instance.
pub fn create_backend(backend: Backend) -> RenderResult<Box<dyn RenderBackend>> {
    match backend {
        Backend::Auto => match select_best_backend() {
            Backend::Cpu | Backend::Auto => create_backend(Backend::Cpu),
            best => create_backend(best).or_else(|e| {
                warn!(backend = ?best, error = %e, "backend init failed, falling back to CPU");
                create_backend(Backend::Cpu)
            }),
        },
        Backend::Cpu => Ok(Box::new(CpuBackend::new())),
        Backend::Wgpu => {
            #[cfg(feature = "wgpu")]
            {
                Ok(Box::new(WgpuBackend::new()?))
            }
            #[cfg(not(feature = "wgpu"))]
            {
                Err(RenderError::BackendNotAvailable(
                    "wgpu feature not enabled".to_string()
                ))
            }
        }
    }
}
