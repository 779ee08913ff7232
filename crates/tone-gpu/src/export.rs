//! Offscreen re-render for export.
//!
//! The export draw is the live draw pointed at a temporary target sized by
//! [`export_size`]: same programs, same letterbox, same uniforms apart from
//! the sizes. The target lives only for the duration of one call and is
//! released on every path, including errors.

use tone_core::viewport::ViewportGeometry;
use tone_core::{export_size, ExportRequest, ExportedPixels, Size, ToneConfig};
use tracing::debug;

use crate::backend::{RenderBackend, Target, TargetId};
use crate::uniforms::DrawUniforms;
use crate::RenderResult;

/// Offscreen target that is destroyed when dropped.
struct ScopedTarget<'a> {
    backend: &'a mut dyn RenderBackend,
    id: TargetId,
}

impl<'a> ScopedTarget<'a> {
    fn acquire(backend: &'a mut dyn RenderBackend, size: Size) -> RenderResult<Self> {
        let id = backend.create_target(size)?;
        Ok(Self { backend, id })
    }

    fn draw(&mut self, uniforms: &DrawUniforms) -> RenderResult<()> {
        self.backend.draw(Target::Offscreen(self.id), uniforms)
    }

    fn read(&mut self, size: Size) -> RenderResult<ExportedPixels> {
        let order = self.backend.readback_order();
        let raw = self.backend.read_pixels(Target::Offscreen(self.id))?;
        Ok(ExportedPixels::from_readback(size.width, size.height, raw, order)?)
    }
}

impl Drop for ScopedTarget<'_> {
    fn drop(&mut self) {
        self.backend.destroy_target(self.id);
    }
}

/// Renders the bound texture at export resolution and reads it back.
#[derive(Debug, Clone, Copy, Default)]
pub struct OffscreenExporter;

impl OffscreenExporter {
    pub fn new() -> Self {
        Self
    }

    /// Exports the texture currently bound on `backend`.
    ///
    /// `source` is the size of the bound image. Returns `Ok(None)` when no
    /// texture is bound. Pixels come back top row first whatever the
    /// backend's native row order.
    pub fn export_pixels(
        &self,
        backend: &mut dyn RenderBackend,
        source: Size,
        config: &ToneConfig,
        request: &ExportRequest,
    ) -> RenderResult<Option<ExportedPixels>> {
        if !backend.has_texture() {
            debug!("export skipped: no texture bound");
            return Ok(None);
        }

        let size = export_size(source, request);
        debug!(%source, %size, mode = %config.mode(), "exporting");

        let geometry = ViewportGeometry::for_target(source, size);
        let uniforms = DrawUniforms::new(config, &geometry);

        let mut target = ScopedTarget::acquire(backend, size)?;
        target.draw(&uniforms)?;
        target.read(size).map(Some)
    }
}
