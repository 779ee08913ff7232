//! Container encode/decode via the `image` crate.
//!
//! Requires the `codec` feature. Encoding supports every [`ExportFormat`];
//! decoding covers PNG, JPEG and WebP (AVIF decode needs the system `dav1d`
//! library, which is not bundled).

use ::image::{DynamicImage, RgbaImage};
use tracing::debug;

use crate::error::{ToneError, ToneResult};
use crate::export::{ExportFormat, ExportedPixels, ImageEncoder};
use crate::image::SourceImage;

/// AVIF encoder speed (1-10, higher = faster).
const AVIF_SPEED: u8 = 6;

/// [`ImageEncoder`] backed by the `image` crate.
///
/// Quality in [0, 1] maps to the encoder's 1-100 scale for JPEG and AVIF.
/// PNG and WebP are lossless and ignore it. JPEG drops the alpha channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateEncoder;

impl ImageEncoder for ImageCrateEncoder {
    fn encode(&self, pixels: &ExportedPixels, format: ExportFormat, quality: f32) -> ToneResult<Vec<u8>> {
        let rgba = RgbaImage::from_raw(pixels.width, pixels.height, pixels.pixels.clone())
            .ok_or_else(|| ToneError::Encode("pixel buffer does not match dimensions".into()))?;
        let img = DynamicImage::ImageRgba8(rgba);
        let q = quality_percent(quality);

        let mut out = Vec::new();
        let res = match format {
            ExportFormat::Png => img.write_with_encoder(::image::codecs::png::PngEncoder::new(&mut out)),
            ExportFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
                .write_with_encoder(::image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, q)),
            ExportFormat::Webp => {
                img.write_with_encoder(::image::codecs::webp::WebPEncoder::new_lossless(&mut out))
            }
            ExportFormat::Avif => img.write_with_encoder(
                ::image::codecs::avif::AvifEncoder::new_with_speed_quality(&mut out, AVIF_SPEED, q),
            ),
        };
        res.map_err(|e| ToneError::Encode(e.to_string()))?;

        debug!(format = format.extension(), width = pixels.width, height = pixels.height, bytes = out.len(), "encoded export");
        Ok(out)
    }
}

fn quality_percent(quality: f32) -> u8 {
    let q = if quality.is_finite() { quality.clamp(0.0, 1.0) } else { 0.9 };
    ((q * 100.0).round() as u8).max(1)
}

/// Decodes an encoded image into an RGBA8 [`SourceImage`].
pub fn decode_image(bytes: &[u8]) -> ToneResult<SourceImage> {
    let img = ::image::load_from_memory(bytes).map_err(|e| ToneError::Decode(e.to_string()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    debug!(width, height, "decoded source image");
    SourceImage::from_rgba8(width, height, rgba.into_raw())
}
