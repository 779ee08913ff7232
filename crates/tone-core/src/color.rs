//! Hex color parsing.
//!
//! Tone colors arrive from the host as `#rrggbb` strings (color pickers,
//! saved state). They are converted once to normalized [`Rgb`] triples before
//! reaching the tone mapper.
//!
//! # Example
//!
//! ```rust
//! use tone_core::color::{parse_hex_color, to_hex, BLACK};
//!
//! let pink = parse_hex_color("#F784C5");
//! assert!((pink.x - 247.0 / 255.0).abs() < 1e-6);
//! assert_eq!(to_hex(pink), "#f784c5");
//!
//! // Malformed input never fails, it is black.
//! assert_eq!(parse_hex_color("nope"), BLACK);
//! ```

/// Normalized RGB triple, each channel in [0, 1].
pub type Rgb = glam::Vec3;

/// Opaque black, returned for anything that is not a valid hex color.
pub const BLACK: Rgb = Rgb::ZERO;

/// Parses a 6-digit hex color with optional leading `#`, case-insensitive.
///
/// Returns [`BLACK`] on malformed input: empty, short, long, or containing
/// anything but hex digits.
pub fn parse_hex_color(text: &str) -> Rgb {
    parse_bytes(text)
        .map(|[r, g, b]| Rgb::new(r as f32, g as f32, b as f32) / 255.0)
        .unwrap_or(BLACK)
}

/// Same as [`parse_hex_color`] for an optional string; `None` is black.
pub fn parse_hex_color_opt(text: Option<&str>) -> Rgb {
    text.map(parse_hex_color).unwrap_or(BLACK)
}

/// Formats a normalized color as lowercase `#rrggbb`.
///
/// Channels are clamped to [0, 1] and rounded to the nearest byte.
pub fn to_hex(rgb: Rgb) -> String {
    let [r, g, b] = rgb.clamp(Rgb::ZERO, Rgb::ONE).to_array().map(|c| (c * 255.0).round() as u8);
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn parse_bytes(text: &str) -> Option<[u8; 3]> {
    let digits = text.strip_prefix('#').unwrap_or(text);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some([byte(0)?, byte(2)?, byte(4)?])
}
