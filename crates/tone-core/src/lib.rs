//! Core types for duotone and tritone tone mapping.
//!
//! Everything here is GPU-free and deterministic:
//!
//! ```text
//! ToneState (UI units)
//!     └── to_config() ──> ToneConfig ──> apply(rgb) per pixel
//! SourceImage ──> viewport::fit / quad_scale ──> ViewportGeometry
//! ExportRequest ──> export_size ──> ExportedPixels ──> ImageEncoder
//! ```
//!
//! Rendering lives in `tone-gpu`; this crate supplies the math that both
//! its software and GPU backends execute.
//!
//! # Features
//!
//! - `codec` - encode/decode containers via the `image` crate.
//!
//! # Example
//!
//! ```rust
//! use tone_core::{parse_hex_color, ToneState};
//!
//! let state = ToneState::default();
//! let config = state.to_config();
//! let out = config.apply(parse_hex_color("#808080"));
//! assert!(out.max_element() <= 1.0);
//! ```

pub mod color;
pub mod config;
pub mod error;
pub mod export;
pub mod image;
pub mod studio;
pub mod tone;
pub mod viewport;

#[cfg(feature = "codec")]
pub mod codec;

pub use color::{parse_hex_color, parse_hex_color_opt, to_hex, Rgb};
pub use config::{ExportPreset, ViewportConfig};
pub use error::{ToneError, ToneResult};
pub use export::{
    export_file_name, export_size, flip_rows, ExportFormat, ExportRequest, ExportedFile, ExportedPixels,
    ImageEncoder, RowOrder,
};
pub use self::image::SourceImage;
pub use studio::{DuotoneState, ToneState, TritoneState};
pub use tone::{DuotoneParams, ToneConfig, ToneMode, TritoneParams, TritoneWeights};
pub use viewport::{fit, quad_scale, DisplayFit, Size, ViewportGeometry};

#[cfg(feature = "codec")]
pub use codec::{decode_image, ImageCrateEncoder};
