//! Render pipeline for one studio session.
//!
//! Owns the backend, the source texture and the current parameters, and
//! moves between two states:
//!
//! ```text
//!            load_image / finish_load
//!   ┌──────┐ ───────────────────────> ┌───────┐
//!   │ Idle │                          │ Ready │ ── resize / set_* ──> draw
//!   └──────┘ <─────────────────────── └───────┘
//!                  unload_image
//! ```
//!
//! In `Idle` every draw and export is a silent no-op. Loading and resizing
//! draw immediately; parameter and mode changes only schedule a redraw,
//! which the host flushes once per display refresh with [`RenderPipeline::on_frame`].

use tone_core::viewport::ViewportGeometry;
use tone_core::{
    export_file_name, DuotoneParams, ExportRequest, ExportedFile, ExportedPixels, ImageEncoder, Size, SourceImage,
    ToneConfig, ToneMode, ToneState, TritoneParams, ViewportConfig,
};
use tracing::{debug, trace};

use crate::backend::{create_backend, Backend, RenderBackend, Target};
use crate::export::OffscreenExporter;
use crate::loader::{ImageLoader, LoadTicket};
use crate::schedule::RedrawScheduler;
use crate::uniforms::DrawUniforms;
use crate::RenderResult;

/// Device pixel ratio assumed until the host reports one.
const DEFAULT_DEVICE_SCALE: f32 = 1.0;

/// Pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No texture bound.
    Idle,
    /// Texture bound, geometry computed.
    Ready,
}

/// Parameters for both programs plus the active mode.
///
/// Switching modes keeps the other program's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ToneSettings {
    /// Active program.
    pub mode: ToneMode,
    /// Duotone parameters.
    pub duotone: DuotoneParams,
    /// Tritone parameters.
    pub tritone: TritoneParams,
}

impl ToneSettings {
    /// Configuration of the active program.
    pub fn active(&self) -> ToneConfig {
        match self.mode {
            ToneMode::Duotone => ToneConfig::Duotone(self.duotone),
            ToneMode::Tritone => ToneConfig::Tritone(self.tritone),
        }
    }

    /// Stores `config` in its program's slot without changing the mode.
    pub fn store(&mut self, config: ToneConfig) {
        match config {
            ToneConfig::Duotone(p) => self.duotone = p,
            ToneConfig::Tritone(p) => self.tritone = p,
        }
    }
}

impl From<&ToneState> for ToneSettings {
    fn from(state: &ToneState) -> Self {
        Self {
            mode: state.mode,
            duotone: state.duotone.to_params(),
            tritone: state.tritone.to_params(),
        }
    }
}

/// Bound image and its display geometry.
struct Session {
    image: SourceImage,
    geometry: ViewportGeometry,
}

/// Drives the tone-mapping programs against a source texture and a surface.
pub struct RenderPipeline {
    backend: Box<dyn RenderBackend>,
    viewport: ViewportConfig,
    settings: ToneSettings,
    session: Option<Session>,
    host_width: f32,
    device_scale: f32,
    loader: ImageLoader,
    redraw: RedrawScheduler,
    exporter: OffscreenExporter,
    draws: u64,
}

impl RenderPipeline {
    /// Pipeline on an existing backend.
    pub fn new(backend: Box<dyn RenderBackend>, viewport: ViewportConfig) -> Self {
        debug!(backend = backend.name(), "render pipeline created");
        Self {
            backend,
            host_width: viewport.max_width_desktop,
            viewport,
            settings: ToneSettings::default(),
            session: None,
            device_scale: DEFAULT_DEVICE_SCALE,
            loader: ImageLoader::new(),
            redraw: RedrawScheduler::new(),
            exporter: OffscreenExporter::new(),
            draws: 0,
        }
    }

    /// Pipeline on a freshly created backend with default viewport limits.
    pub fn with_backend(backend: Backend) -> RenderResult<Self> {
        Ok(Self::new(create_backend(backend)?, ViewportConfig::default()))
    }

    /// Pipeline on the backend named by `TONE_BACKEND`.
    pub fn from_env() -> RenderResult<Self> {
        Self::with_backend(Backend::from_env())
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn state(&self) -> PipelineState {
        if self.session.is_some() {
            PipelineState::Ready
        } else {
            PipelineState::Idle
        }
    }

    pub fn settings(&self) -> &ToneSettings {
        &self.settings
    }

    pub fn mode(&self) -> ToneMode {
        self.settings.mode
    }

    /// Configuration the next draw will use.
    pub fn config(&self) -> ToneConfig {
        self.settings.active()
    }

    /// Bound image, if any.
    pub fn image(&self) -> Option<&SourceImage> {
        self.session.as_ref().map(|s| &s.image)
    }

    /// Current display geometry, if an image is bound.
    pub fn geometry(&self) -> Option<&ViewportGeometry> {
        self.session.as_ref().map(|s| &s.geometry)
    }

    /// Number of surface draws performed.
    pub fn draw_count(&self) -> u64 {
        self.draws
    }

    pub fn is_redraw_pending(&self) -> bool {
        self.redraw.is_pending()
    }

    /// Backend the pipeline draws with.
    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    pub fn scheduler(&self) -> &RedrawScheduler {
        &self.redraw
    }

    // -------------------------------------------------------------------------
    // Image lifecycle
    // -------------------------------------------------------------------------

    /// Starts an asynchronous load; any load still in flight is superseded.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.loader.begin()
    }

    /// Delivers the decode result for `ticket`.
    ///
    /// Returns `Ok(false)` without touching any state if a newer load has
    /// started since. Otherwise binds `image` and draws.
    pub fn finish_load(&mut self, ticket: LoadTicket, image: SourceImage) -> RenderResult<bool> {
        if !self.loader.complete(ticket) {
            return Ok(false);
        }
        self.bind(image)?;
        Ok(true)
    }

    /// Binds an already decoded image and draws.
    pub fn load_image(&mut self, image: SourceImage) -> RenderResult<()> {
        let ticket = self.begin_load();
        self.finish_load(ticket, image).map(|_| ())
    }

    /// Releases the texture and returns to `Idle`. Pending loads are abandoned.
    pub fn unload_image(&mut self) {
        self.loader.cancel();
        self.redraw.cancel();
        if self.session.take().is_some() {
            debug!("image unbound");
        }
        self.backend.release_texture();
    }

    fn bind(&mut self, image: SourceImage) -> RenderResult<()> {
        // Replaced wholesale: drop the old texture before uploading.
        self.session = None;
        self.backend.release_texture();
        self.backend.upload_texture(&image, true)?;

        let geometry = self.display_geometry(image.size());
        if let Err(e) = self.backend.configure_surface(geometry.target) {
            self.backend.release_texture();
            return Err(e);
        }
        debug!(source = %image.size(), surface = %geometry.target, "image bound");

        self.session = Some(Session { image, geometry });
        self.draw()
    }

    // -------------------------------------------------------------------------
    // Geometry
    // -------------------------------------------------------------------------

    /// Host width changed (CSS px). Recomputes geometry and redraws if an
    /// image is bound.
    pub fn resize(&mut self, host_width: f32) -> RenderResult<()> {
        self.host_width = host_width;
        self.refit()
    }

    /// Device pixel ratio changed. Same effect as [`resize`](Self::resize).
    pub fn set_device_scale(&mut self, device_scale: f32) -> RenderResult<()> {
        self.device_scale = device_scale;
        self.refit()
    }

    fn display_geometry(&self, source: Size) -> ViewportGeometry {
        ViewportGeometry::for_display(source, self.host_width, self.device_scale, &self.viewport)
    }

    fn refit(&mut self) -> RenderResult<()> {
        let Some(source) = self.session.as_ref().map(|s| s.image.size()) else {
            return Ok(());
        };
        let geometry = self.display_geometry(source);
        self.backend.configure_surface(geometry.target)?;
        if let Some(session) = self.session.as_mut() {
            session.geometry = geometry;
        }
        debug!(host_width = self.host_width, surface = %geometry.target, css = %geometry.css, "geometry recomputed");
        self.draw()
    }

    // -------------------------------------------------------------------------
    // Parameters
    // -------------------------------------------------------------------------

    /// Stores `config` in its program's slot and schedules a redraw.
    /// The active mode is not changed.
    pub fn set_config(&mut self, config: ToneConfig) {
        self.settings.store(config);
        self.redraw.request();
    }

    /// Switches the active program and schedules a redraw.
    pub fn set_mode(&mut self, mode: ToneMode) {
        self.settings.mode = mode;
        self.redraw.request();
    }

    /// Takes mode and both parameter sets from studio state and schedules a redraw.
    pub fn apply_state(&mut self, state: &ToneState) {
        self.settings = ToneSettings::from(state);
        self.redraw.request();
    }

    // -------------------------------------------------------------------------
    // Drawing
    // -------------------------------------------------------------------------

    /// Frame callback: performs the pending redraw, if any.
    ///
    /// Returns true if a draw reached the surface.
    pub fn on_frame(&mut self) -> RenderResult<bool> {
        if !self.redraw.take() {
            return Ok(false);
        }
        let before = self.draws;
        self.draw()?;
        Ok(self.draws > before)
    }

    /// Draws the current parameters to the surface now. No-op when `Idle`.
    pub fn draw(&mut self) -> RenderResult<()> {
        let Some(session) = &self.session else {
            return Ok(());
        };
        let uniforms = DrawUniforms::new(&self.settings.active(), &session.geometry);
        self.backend.draw(Target::Surface, &uniforms)?;
        self.draws += 1;
        self.redraw.cancel();
        trace!(draws = self.draws, "surface drawn");
        Ok(())
    }

    /// Reads the visible surface back, top row first.
    pub fn read_surface(&mut self) -> RenderResult<Option<ExportedPixels>> {
        let Some(session) = &self.session else {
            return Ok(None);
        };
        let Size { width, height } = session.geometry.target;
        let order = self.backend.readback_order();
        let raw = self.backend.read_pixels(Target::Surface)?;
        Ok(Some(ExportedPixels::from_readback(width, height, raw, order)?))
    }

    // -------------------------------------------------------------------------
    // Export
    // -------------------------------------------------------------------------

    /// Re-renders the bound image at export resolution.
    ///
    /// Returns `Ok(None)` when no image is bound.
    pub fn export_pixels(&mut self, request: &ExportRequest) -> RenderResult<Option<ExportedPixels>> {
        let Some(session) = &self.session else {
            debug!("export skipped: no image bound");
            return Ok(None);
        };
        self.exporter
            .export_pixels(self.backend.as_mut(), session.image.size(), &self.settings.active(), request)
    }

    /// Exports and encodes the bound image as a downloadable file named
    /// `{basename}_{mode}.{ext}`.
    pub fn export_file(
        &mut self,
        request: &ExportRequest,
        basename: Option<&str>,
        encoder: &dyn ImageEncoder,
    ) -> RenderResult<Option<ExportedFile>> {
        let Some(pixels) = self.export_pixels(request)? else {
            return Ok(None);
        };
        let bytes = encoder.encode(&pixels, request.format, request.quality)?;
        let file_name = export_file_name(basename, self.settings.mode, request.format);
        debug!(%file_name, bytes = bytes.len(), "export encoded");
        Ok(Some(ExportedFile { file_name, mime: request.format.mime(), bytes }))
    }

    // -------------------------------------------------------------------------
    // Teardown
    // -------------------------------------------------------------------------

    /// Ends the session, releasing every backend resource.
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.unload_image();
    }
}

impl Drop for RenderPipeline {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("backend", &self.backend.name())
            .field("state", &self.state())
            .field("mode", &self.settings.mode)
            .field("draws", &self.draws)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn pipeline() -> RenderPipeline {
        RenderPipeline::with_backend(Backend::Cpu).unwrap()
    }

    fn gray(w: u32, h: u32) -> SourceImage {
        SourceImage::from_rgba8(w, h, vec![128; (w * h * 4) as usize]).unwrap()
    }

    #[test]
    fn idle_is_noop() {
        let mut p = pipeline();
        assert_eq!(p.state(), PipelineState::Idle);
        p.draw().unwrap();
        p.set_mode(ToneMode::Tritone);
        assert!(!p.on_frame().unwrap());
        assert_eq!(p.draw_count(), 0);
        assert!(p.export_pixels(&ExportRequest::default()).unwrap().is_none());
        assert!(p.read_surface().unwrap().is_none());
    }

    #[test]
    fn load_draws_once_and_unload_returns_idle() {
        let mut p = pipeline();
        p.load_image(gray(40, 20)).unwrap();
        assert_eq!(p.state(), PipelineState::Ready);
        assert_eq!(p.draw_count(), 1);
        assert_eq!(p.geometry().unwrap().target, Size::new(40, 20));
        p.unload_image();
        assert_eq!(p.state(), PipelineState::Idle);
        assert!(p.image().is_none());
    }

    #[test]
    fn resize_recomputes_geometry() {
        let mut p = pipeline();
        p.load_image(gray(2000, 1000)).unwrap();
        assert_eq!(p.geometry().unwrap().css, Size::new(1000, 500));
        p.resize(400.0).unwrap();
        assert_eq!(p.geometry().unwrap().css, Size::new(400, 200));
        p.set_device_scale(2.0).unwrap();
        assert_eq!(p.geometry().unwrap().target, Size::new(800, 400));
        assert_eq!(p.draw_count(), 3);
    }

    #[test]
    fn setters_coalesce_until_frame() {
        let mut p = pipeline();
        p.load_image(gray(8, 8)).unwrap();
        for i in 0..10 {
            p.set_config(ToneConfig::Duotone(DuotoneParams { strength: i as f32 / 10.0, ..Default::default() }));
        }
        p.set_mode(ToneMode::Duotone);
        assert_eq!(p.draw_count(), 1);
        assert!(p.on_frame().unwrap());
        assert!(!p.on_frame().unwrap());
        assert_eq!(p.draw_count(), 2);
        assert_eq!(p.scheduler().coalesced(), 10);
        assert_eq!(p.settings().duotone.strength, 0.9);
    }

    #[test]
    fn set_config_keeps_mode() {
        let mut p = pipeline();
        p.set_config(ToneConfig::Tritone(TritoneParams { softness: 0.3, ..Default::default() }));
        assert_eq!(p.mode(), ToneMode::Duotone);
        p.set_mode(ToneMode::Tritone);
        match p.config() {
            ToneConfig::Tritone(t) => assert_eq!(t.softness, 0.3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn stale_decode_ignored() {
        let mut p = pipeline();
        let first = p.begin_load();
        let second = p.begin_load();
        assert!(p.finish_load(second, gray(4, 2)).unwrap());
        assert!(!p.finish_load(first, gray(9, 9)).unwrap());
        assert_eq!(p.image().unwrap().size(), Size::new(4, 2));
    }

    #[test]
    fn failed_surface_releases_texture() {
        use crate::backend::{CpuBackend, RenderLimits};

        let limits = RenderLimits { max_texture_dim: 16, available_memory: 1 << 20 };
        let mut p = RenderPipeline::new(Box::new(CpuBackend::with_limits(limits)), ViewportConfig::default());
        p.set_device_scale(4.0).unwrap();

        // 10x10 uploads, but the 40x40 surface exceeds the limit.
        let res = p.load_image(gray(10, 10));
        assert!(matches!(res, Err(crate::RenderError::TextureTooLarge { .. })));
        assert_eq!(p.state(), PipelineState::Idle);
        assert!(!p.backend().has_texture());
    }

    #[test]
    fn unload_abandons_pending_load() {
        let mut p = pipeline();
        let t = p.begin_load();
        p.unload_image();
        assert!(!p.finish_load(t, gray(4, 4)).unwrap());
        assert_eq!(p.state(), PipelineState::Idle);
    }

    #[test]
    fn apply_state_converts_ui_units() {
        let mut p = pipeline();
        let mut state = ToneState { mode: ToneMode::Tritone, ..Default::default() };
        state.tritone.brightness = 40.0;
        p.apply_state(&state);
        assert_eq!(p.mode(), ToneMode::Tritone);
        assert_abs_diff_eq!(p.settings().tritone.brightness, 0.4);
        assert_eq!(p.settings().duotone.shadow, tone_core::parse_hex_color("#1b602f"));
    }
}
