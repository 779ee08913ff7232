//! Decoded source image.

use std::sync::Arc;

use crate::error::{ToneError, ToneResult};
use crate::viewport::Size;

/// Immutable decoded RGBA8 raster, top row first.
///
/// Pixels are shared behind an [`Arc`]: cloning is cheap and the render
/// pipeline only ever holds a reference to the host's decode result.
#[derive(Clone)]
pub struct SourceImage {
    pixels: Arc<Vec<u8>>,
    width: u32,
    height: u32,
}

impl SourceImage {
    /// Wraps tightly packed RGBA8 pixels.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> ToneResult<Self> {
        if width == 0 || height == 0 {
            return Err(ToneError::InvalidDimensions(width, height));
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(ToneError::BufferSizeMismatch { expected, actual: pixels.len() });
        }
        Ok(Self { pixels: Arc::new(pixels), width, height })
    }

    /// Expands tightly packed RGB8 pixels to opaque RGBA8.
    pub fn from_rgb8(width: u32, height: u32, pixels: &[u8]) -> ToneResult<Self> {
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(ToneError::BufferSizeMismatch { expected, actual: pixels.len() });
        }
        let rgba = pixels
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect();
        Self::from_rgba8(width, height, rgba)
    }

    /// Builds an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> ToneResult<Self> {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&f(x, y));
            }
        }
        Self::from_rgba8(width, height, pixels)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions.
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Raw RGBA8 pixels, top row first.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA of pixel (x, y), top-left origin.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels.get(i..i + 4).and_then(|p| p.try_into().ok())
    }

    /// True if both handles share the same pixel allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}
