//! Export geometry, readback row order and file naming.
//!
//! The render backends produce raw RGBA8 readbacks; this module holds the
//! backend-independent parts of turning them into a file:
//!
//! - [`export_size`] - output dimensions for an [`ExportRequest`]
//! - [`flip_rows`] - row reversal for bottom-up framebuffers
//! - [`ImageEncoder`] - pluggable container encoder
//! - [`export_file_name`] - `{basename}_{mode}.{ext}`

use serde::{Deserialize, Serialize};

use crate::error::{ToneError, ToneResult};
use crate::tone::ToneMode;
use crate::viewport::Size;

/// Base name used when the host supplies none.
pub const DEFAULT_BASENAME: &str = "tone";

/// Absorbs float error so that an exact bound is not floored one short.
const FLOOR_EPSILON: f64 = 1e-9;

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// `image/png`
    Png,
    /// `image/jpeg`
    Jpeg,
    /// `image/webp`
    #[default]
    Webp,
    /// `image/avif`
    Avif,
}

impl ExportFormat {
    /// MIME type.
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Avif => "image/avif",
        }
    }

    /// File extension without the dot.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Avif => "avif",
        }
    }

    /// Parses a MIME type. Anything unrecognized is WebP.
    pub fn from_mime(mime: &str) -> Self {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Self::Png,
            "image/jpeg" | "image/jpg" => Self::Jpeg,
            "image/avif" => Self::Avif,
            _ => Self::Webp,
        }
    }

    /// Whether `quality` affects the output.
    pub const fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg | Self::Avif)
    }
}

/// Parameters of one export action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportRequest {
    /// Maximum output width.
    pub max_width: u32,
    /// Maximum output height.
    pub max_height: u32,
    /// Output container, passed through to the encoder.
    pub format: ExportFormat,
    /// Encoder quality in [0, 1], passed through to the encoder.
    pub quality: f32,
}

impl ExportRequest {
    /// Request bounded by `max_width` x `max_height`, WebP at 0.9.
    pub const fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
            format: ExportFormat::Webp,
            quality: 0.9,
        }
    }

    /// Request bounded by a maximum long side.
    pub const fn max_side(side: u32) -> Self {
        Self::new(side, side)
    }

    /// Sets the output format.
    pub const fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the encoder quality.
    pub const fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }
}

impl Default for ExportRequest {
    fn default() -> Self {
        Self::max_side(2000)
    }
}

/// Output size for exporting `source` under `request`.
///
/// Scales down uniformly to fit both bounds, never up; each side is floored
/// and kept at least 1.
///
/// # Example
///
/// ```rust
/// use tone_core::export::{export_size, ExportRequest};
/// use tone_core::viewport::Size;
///
/// let out = export_size(Size::new(6000, 4000), &ExportRequest::max_side(2000));
/// assert_eq!(out, Size::new(2000, 1333));
/// ```
pub fn export_size(source: Size, request: &ExportRequest) -> Size {
    let src_w = source.width.max(1) as f64;
    let src_h = source.height.max(1) as f64;
    let scale = (request.max_width as f64 / src_w)
        .min(request.max_height as f64 / src_h)
        .min(1.0);
    let w = ((src_w * scale + FLOOR_EPSILON).floor() as u32).max(1);
    let h = ((src_h * scale + FLOOR_EPSILON).floor() as u32).max(1);
    Size::new(w, h)
}

/// Row order of a raw framebuffer readback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    /// Row 0 is the top of the image.
    TopDown,
    /// Row 0 is the bottom of the image.
    BottomUp,
}

/// Reverses row order of a tightly packed buffer of `height` rows.
///
/// Row `y` of the output is row `height - 1 - y` of the input. Applying it
/// twice restores the original.
pub fn flip_rows(pixels: &[u8], width: u32, height: u32, bytes_per_pixel: usize) -> ToneResult<Vec<u8>> {
    let row = width as usize * bytes_per_pixel;
    let expected = row * height as usize;
    if pixels.len() != expected {
        return Err(ToneError::BufferSizeMismatch { expected, actual: pixels.len() });
    }
    let mut out = Vec::with_capacity(expected);
    for src in pixels.chunks_exact(row.max(1)).rev() {
        out.extend_from_slice(src);
    }
    Ok(out)
}

/// RGBA8 pixels read back from a render target, top row first.
#[derive(Clone, PartialEq, Eq)]
pub struct ExportedPixels {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA8, top to bottom.
    pub pixels: Vec<u8>,
}

impl ExportedPixels {
    /// Wraps a top-down RGBA8 buffer, validating its length.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> ToneResult<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(ToneError::BufferSizeMismatch { expected, actual: pixels.len() });
        }
        Ok(Self { width, height, pixels })
    }

    /// Builds from a raw readback in the given row order.
    pub fn from_readback(width: u32, height: u32, raw: Vec<u8>, order: RowOrder) -> ToneResult<Self> {
        match order {
            RowOrder::TopDown => Self::new(width, height, raw),
            RowOrder::BottomUp => Self::new(width, height, flip_rows(&raw, width, height, 4)?),
        }
    }

    /// Dimensions.
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// RGBA of pixel (x, y), top-left origin.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels.get(i..i + 4).and_then(|p| p.try_into().ok())
    }
}

impl std::fmt::Debug for ExportedPixels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportedPixels")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Encodes exported pixels into a container format.
///
/// Format and quality are opaque to the render core and forwarded as-is.
pub trait ImageEncoder {
    /// Encodes `pixels` as `format`.
    fn encode(&self, pixels: &ExportedPixels, format: ExportFormat, quality: f32) -> ToneResult<Vec<u8>>;
}

/// An encoded export, ready to be offered as a download.
#[derive(Clone, PartialEq, Eq)]
pub struct ExportedFile {
    /// Suggested file name.
    pub file_name: String,
    /// MIME type of `bytes`.
    pub mime: &'static str,
    /// Encoded file contents.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ExportedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportedFile")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Normalizes a user-supplied base name.
///
/// Trims, collapses whitespace runs to `_`, and falls back to
/// [`DEFAULT_BASENAME`] when nothing is left.
pub fn sanitize_basename(basename: Option<&str>) -> String {
    let joined = basename
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    if joined.is_empty() {
        DEFAULT_BASENAME.to_string()
    } else {
        joined
    }
}

/// `{basename}_{mode}.{ext}`
///
/// ```rust
/// use tone_core::export::{export_file_name, ExportFormat};
/// use tone_core::tone::ToneMode;
///
/// let name = export_file_name(Some(" summer trip "), ToneMode::Tritone, ExportFormat::Jpeg);
/// assert_eq!(name, "summer_trip_tritone.jpg");
/// ```
pub fn export_file_name(basename: Option<&str>, mode: ToneMode, format: ExportFormat) -> String {
    format!("{}_{}.{}", sanitize_basename(basename), mode.label(), format.extension())
}
