//! Render pipeline and offscreen export for duotone/tritone tone mapping.
//!
//! Draws a [`SourceImage`](tone_core::SourceImage) through one of two
//! fragment programs onto a visible surface, and re-renders the same
//! effect into a temporary target for export.
//!
//! # Architecture
//!
//! ```text
//! RenderPipeline (Idle | Ready)
//!     ├── ImageLoader      (newest decode wins)
//!     ├── RedrawScheduler  (one draw per frame)
//!     ├── OffscreenExporter
//!     └── Box<dyn RenderBackend>
//!             ├── CpuBackend  (rayon rasterizer)
//!             └── WgpuBackend (WGSL render pipelines)
//! ```
//!
//! # Example
//!
//! ```rust
//! use tone_core::{ExportRequest, SourceImage, ToneMode};
//! use tone_gpu::{Backend, RenderPipeline};
//!
//! let mut pipeline = RenderPipeline::with_backend(Backend::Cpu)?;
//! pipeline.resize(800.0)?;
//!
//! let image = SourceImage::from_fn(64, 32, |x, _| [x as u8 * 4, 0, 0, 255])?;
//! pipeline.load_image(image)?;
//! pipeline.set_mode(ToneMode::Tritone);
//! pipeline.on_frame()?;
//!
//! let pixels = pipeline.export_pixels(&ExportRequest::max_side(16))?.unwrap();
//! assert_eq!((pixels.width, pixels.height), (16, 8));
//! # Ok::<(), tone_gpu::RenderError>(())
//! ```

pub mod backend;
pub mod export;
pub mod loader;
pub mod pipeline;
pub mod schedule;
pub mod uniforms;
mod shaders;

pub use backend::{
    create_backend, describe_backends, detect_backends, select_best_backend, Backend, BackendInfo,
    CpuBackend, RenderBackend, RenderLimits, Target, TargetId,
};
#[cfg(feature = "wgpu")]
pub use backend::WgpuBackend;
pub use export::OffscreenExporter;
pub use loader::{ImageLoader, LoadTicket};
pub use pipeline::{PipelineState, RenderPipeline, ToneSettings};
pub use schedule::RedrawScheduler;
pub use uniforms::DrawUniforms;

use thiserror::Error;
use tone_core::ToneError;

/// Rendering errors.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("Failed to create device: {0}")]
    DeviceCreation(String),

    #[error("Texture too large: {width}x{height} exceeds limit {limit}")]
    TextureTooLarge { width: u32, height: u32, limit: u32 },

    #[error("Invalid dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),

    #[error("Unknown render target: {0}")]
    UnknownTarget(TargetId),

    #[error("No source texture bound")]
    NoTexture,

    #[error("Render operation failed: {0}")]
    OperationFailed(String),

    #[error(transparent)]
    Core(#[from] ToneError),
}

pub type RenderResult<T> = Result<T, RenderError>;
