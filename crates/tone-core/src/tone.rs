//! Luminance-driven duotone and tritone tone mapping.
//!
//! These are the per-pixel programs executed by every render backend. The
//! GPU backends run WGSL translations of the same steps; the CPU backend
//! calls [`ToneConfig::apply`] directly.
//!
//! # Duotone
//!
//! ```text
//! lum     = dot(src, REC709_LUMA)
//! duo     = mix(shadow, highlight, lum)
//! blended = mix(src, duo, strength)
//! out     = brightness_contrast(blended)
//! ```
//!
//! # Tritone
//!
//! Three color bands split at two luminance thresholds, each edge softened
//! by a cubic Hermite ease of half-width `softness`:
//!
//! ```text
//!   wA = 1 - smooth_edge(t1 - s, t1 + s, lum)
//!   wC =     smooth_edge(t2 - s, t2 + s, lum)
//!   wB = clamp(1 - wA - wC, 0, 1)
//! ```
//!
//! An optional "edge purity" remix (`orig_mix`) pulls the deepest shadows
//! toward black and the brightest highlights toward white.
//!
//! # Example
//!
//! ```rust
//! use tone_core::color::Rgb;
//! use tone_core::tone::{DuotoneParams, ToneConfig};
//!
//! let config = ToneConfig::Duotone(DuotoneParams {
//!     shadow: Rgb::new(1.0, 0.0, 0.0),
//!     highlight: Rgb::new(0.0, 0.0, 1.0),
//!     ..DuotoneParams::identity()
//! });
//! let out = config.apply(Rgb::ZERO);
//! assert_eq!(out, Rgb::new(1.0, 0.0, 0.0));
//! ```

use serde::{Deserialize, Serialize};

use crate::color::Rgb;

/// Rec.709 luminance coefficients.
pub const REC709_LUMA: Rgb = Rgb::new(0.2126, 0.7152, 0.0722);

/// Minimum distance enforced between the two tritone thresholds.
pub const THRESHOLD_GAP: f32 = 0.001;

/// Upper bound for tritone edge softness.
pub const MAX_SOFTNESS: f32 = 0.5;

/// Which tone-mapping program is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToneMode {
    /// Two-color gradient.
    #[default]
    Duotone,
    /// Three-color banded blend.
    Tritone,
}

impl ToneMode {
    /// Lowercase name, used in exported file names.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Duotone => "duotone",
            Self::Tritone => "tritone",
        }
    }

    /// All modes.
    pub const fn all() -> &'static [Self] {
        &[Self::Duotone, Self::Tritone]
    }
}

impl std::fmt::Display for ToneMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Duotone parameters in mapper units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuotoneParams {
    /// Color at luminance 0.
    pub shadow: Rgb,
    /// Color at luminance 1.
    pub highlight: Rgb,
    /// Blend between source and toned color, [0, 1].
    pub strength: f32,
    /// Brightness offset, [-1, 1].
    pub brightness: f32,
    /// Contrast around mid-gray, [-1, 1].
    pub contrast: f32,
}

impl DuotoneParams {
    /// Black-to-white gradient at full strength (an identity on grays).
    pub const fn identity() -> Self {
        Self {
            shadow: Rgb::ZERO,
            highlight: Rgb::ONE,
            strength: 1.0,
            brightness: 0.0,
            contrast: 0.0,
        }
    }

    /// Copy with every field clamped to its legal range.
    pub fn sanitized(&self) -> Self {
        Self {
            shadow: clamp_rgb(self.shadow),
            highlight: clamp_rgb(self.highlight),
            strength: saturate(self.strength),
            brightness: clamp_signed(self.brightness),
            contrast: clamp_signed(self.contrast),
        }
    }

    /// Maps one source color.
    pub fn apply(&self, src: Rgb) -> Rgb {
        let lum = luminance(src);
        let duo = self.shadow.lerp(self.highlight, lum);
        let blended = src.lerp(duo, saturate(self.strength));
        brightness_contrast(blended, self.brightness, self.contrast)
    }
}

impl Default for DuotoneParams {
    fn default() -> Self {
        Self::identity()
    }
}

/// Tritone parameters in mapper units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TritoneParams {
    /// Shadow band color.
    pub color_a: Rgb,
    /// Midtone band color.
    pub color_b: Rgb,
    /// Highlight band color.
    pub color_c: Rgb,
    /// Shadow/midtone split, [0, 1].
    pub threshold1: f32,
    /// Midtone/highlight split, [0, 1].
    pub threshold2: f32,
    /// Half-width of each band edge, [0, 0.5].
    pub softness: f32,
    /// Blend between source and toned color, [0, 1].
    pub strength: f32,
    /// Brightness offset, [-1, 1].
    pub brightness: f32,
    /// Contrast around mid-gray, [-1, 1].
    pub contrast: f32,
    /// How far extremes revert to black/white, [0, 1].
    pub orig_mix: f32,
}

impl TritoneParams {
    /// Copy with every field clamped and the thresholds separated.
    pub fn sanitized(&self) -> Self {
        let (t1, t2) = effective_thresholds(saturate(self.threshold1), saturate(self.threshold2));
        Self {
            color_a: clamp_rgb(self.color_a),
            color_b: clamp_rgb(self.color_b),
            color_c: clamp_rgb(self.color_c),
            threshold1: t1,
            threshold2: t2,
            softness: self.softness.clamp(0.0, MAX_SOFTNESS),
            strength: saturate(self.strength),
            brightness: clamp_signed(self.brightness),
            contrast: clamp_signed(self.contrast),
            orig_mix: saturate(self.orig_mix),
        }
    }

    /// Band weights for a luminance value.
    pub fn weights(&self, lum: f32) -> TritoneWeights {
        let (t1, t2) = effective_thresholds(self.threshold1, self.threshold2);
        TritoneWeights::at(lum, t1, t2, self.softness.clamp(0.0, MAX_SOFTNESS))
    }

    /// Maps one source color.
    pub fn apply(&self, src: Rgb) -> Rgb {
        let lum = luminance(src);
        let s = self.softness.clamp(0.0, MAX_SOFTNESS);
        let w = self.weights(lum);
        let mut mapped = self.color_a * w.a + self.color_b * w.b + self.color_c * w.c;

        let near_black = 1.0 - smooth_edge(0.0, s * 2.0, lum);
        let near_white = smooth_edge(1.0 - s * 2.0, 1.0, lum);
        let bw = Rgb::splat(near_white) * near_black.max(near_white);
        mapped = mapped.lerp(bw, saturate(self.orig_mix));

        let blended = src.lerp(mapped, saturate(self.strength));
        brightness_contrast(blended, self.brightness, self.contrast)
    }
}

impl Default for TritoneParams {
    fn default() -> Self {
        Self {
            color_a: Rgb::ZERO,
            color_b: Rgb::splat(0.5),
            color_c: Rgb::ONE,
            threshold1: 0.40,
            threshold2: 0.75,
            softness: 0.12,
            strength: 1.0,
            brightness: 0.0,
            contrast: 0.0,
            orig_mix: 0.0,
        }
    }
}

/// Shadow / midtone / highlight weights of a tritone blend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TritoneWeights {
    /// Shadow weight.
    pub a: f32,
    /// Midtone weight.
    pub b: f32,
    /// Highlight weight.
    pub c: f32,
}

impl TritoneWeights {
    /// Weights for `lum` with separated thresholds `t1 < t2` and softness `s`.
    pub fn at(lum: f32, t1: f32, t2: f32, s: f32) -> Self {
        let a = 1.0 - smooth_edge(t1 - s, t1 + s, lum);
        let c = smooth_edge(t2 - s, t2 + s, lum);
        let b = (1.0 - a - c).clamp(0.0, 1.0);
        Self { a, b, c }
    }

    /// Sum of all three weights.
    pub fn sum(&self) -> f32 {
        self.a + self.b + self.c
    }
}

/// Active tone mapping with its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToneConfig {
    /// Two-color gradient.
    Duotone(DuotoneParams),
    /// Three-color bands.
    Tritone(TritoneParams),
}

impl ToneConfig {
    /// Mode tag of this configuration.
    pub const fn mode(&self) -> ToneMode {
        match self {
            Self::Duotone(_) => ToneMode::Duotone,
            Self::Tritone(_) => ToneMode::Tritone,
        }
    }

    /// Copy with all parameters clamped to their legal ranges.
    pub fn sanitized(&self) -> Self {
        match self {
            Self::Duotone(p) => Self::Duotone(p.sanitized()),
            Self::Tritone(p) => Self::Tritone(p.sanitized()),
        }
    }

    /// Maps one source color. Output channels are in [0, 1].
    #[inline]
    pub fn apply(&self, src: Rgb) -> Rgb {
        match self {
            Self::Duotone(p) => p.apply(src),
            Self::Tritone(p) => p.apply(src),
        }
    }
}

impl From<DuotoneParams> for ToneConfig {
    fn from(p: DuotoneParams) -> Self {
        Self::Duotone(p)
    }
}

impl From<TritoneParams> for ToneConfig {
    fn from(p: TritoneParams) -> Self {
        Self::Tritone(p)
    }
}

/// Rec.709 luminance of a normalized color.
#[inline]
pub fn luminance(rgb: Rgb) -> f32 {
    rgb.dot(REC709_LUMA)
}

/// Cubic Hermite ease: 0 below `lo`, 1 at or above `hi`.
///
/// A zero-width edge (`hi <= lo`) is a hard step at `lo`.
#[inline]
pub fn smooth_edge(lo: f32, hi: f32, x: f32) -> f32 {
    if hi <= lo {
        return if x < lo { 0.0 } else { 1.0 };
    }
    let k = ((x - lo) / (hi - lo)).clamp(0.0, 1.0);
    k * k * (3.0 - 2.0 * k)
}

/// Separates raw thresholds so that `t1 + THRESHOLD_GAP <= t2`.
#[inline]
pub fn effective_thresholds(t1: f32, t2: f32) -> (f32, f32) {
    (t1.min(t2 - THRESHOLD_GAP), t2.max(t1 + THRESHOLD_GAP))
}

/// Contrast around 0.5, then brightness offset, clamped to [0, 1].
#[inline]
pub fn brightness_contrast(c: Rgb, brightness: f32, contrast: f32) -> Rgb {
    let half = Rgb::splat(0.5);
    let out = (c - half) * (1.0 + contrast) + half + Rgb::splat(brightness * 0.5);
    out.clamp(Rgb::ZERO, Rgb::ONE)
}

/// Converts a slider value in [-100, 100] to mapper units in [-1, 1].
#[inline]
pub fn ui_to_unit(value: f32) -> f32 {
    clamp_signed(value / 100.0)
}

#[inline]
fn saturate(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

#[inline]
fn clamp_signed(v: f32) -> f32 {
    v.clamp(-1.0, 1.0)
}

#[inline]
fn clamp_rgb(c: Rgb) -> Rgb {
    c.clamp(Rgb::ZERO, Rgb::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const EPSILON: f32 = 1e-5;

    fn gray(v: f32) -> Rgb {
        Rgb::splat(v)
    }

    fn rgb_eq(a: Rgb, b: Rgb) -> bool {
        (a - b).abs().max_element() < EPSILON
    }

    #[test]
    fn luminance_weights() {
        assert_abs_diff_eq!(luminance(Rgb::ONE), 1.0, epsilon = EPSILON);
        assert_abs_diff_eq!(luminance(Rgb::new(1.0, 0.0, 0.0)), 0.2126);
        assert_abs_diff_eq!(luminance(Rgb::new(0.0, 1.0, 0.0)), 0.7152);
        assert_abs_diff_eq!(luminance(Rgb::new(0.0, 0.0, 1.0)), 0.0722);
    }

    #[test]
    fn duotone_endpoints() {
        let shadow = Rgb::new(0.1, 0.4, 0.2);
        let highlight = Rgb::new(0.9, 0.5, 0.8);
        let p = DuotoneParams { shadow, highlight, ..DuotoneParams::identity() };
        assert!(rgb_eq(p.apply(Rgb::ZERO), shadow));
        assert!(rgb_eq(p.apply(Rgb::ONE), highlight));
    }

    #[test]
    fn duotone_zero_strength_is_source() {
        let p = DuotoneParams {
            shadow: Rgb::new(1.0, 0.0, 0.0),
            highlight: Rgb::new(0.0, 1.0, 0.0),
            strength: 0.0,
            ..DuotoneParams::identity()
        };
        for src in [Rgb::new(0.2, 0.3, 0.4), gray(0.0), gray(1.0), Rgb::new(0.9, 0.1, 0.5)] {
            assert!(rgb_eq(p.apply(src), src));
        }
    }

    #[test]
    fn duotone_strength_is_clamped() {
        let base = DuotoneParams { shadow: Rgb::new(1.0, 0.0, 0.0), ..DuotoneParams::identity() };
        let over = DuotoneParams { strength: 3.0, ..base };
        let src = gray(0.3);
        assert!(rgb_eq(over.apply(src), base.apply(src)));
    }

    #[test]
    fn duotone_output_in_range() {
        let p = DuotoneParams { brightness: 1.0, contrast: 1.0, ..DuotoneParams::identity() };
        for i in 0..=10 {
            let out = p.apply(gray(i as f32 / 10.0));
            assert!(out.min_element() >= 0.0 && out.max_element() <= 1.0);
        }
    }

    #[test]
    fn smooth_edge_shape() {
        assert_eq!(smooth_edge(0.2, 0.4, 0.1), 0.0);
        assert_eq!(smooth_edge(0.2, 0.4, 0.5), 1.0);
        assert_abs_diff_eq!(smooth_edge(0.2, 0.4, 0.3), 0.5, epsilon = EPSILON);
        // Degenerate edge: hard step.
        assert_eq!(smooth_edge(0.3, 0.3, 0.29), 0.0);
        assert_eq!(smooth_edge(0.3, 0.3, 0.3), 1.0);
        assert_eq!(smooth_edge(0.3, 0.3, 0.31), 1.0);
    }

    #[test]
    fn thresholds_always_separated() {
        let raw = [0.0, 0.001, 0.3, 0.5, 0.5005, 0.7, 0.999, 1.0];
        for &a in &raw {
            for &b in &raw {
                let (t1, t2) = effective_thresholds(a, b);
                assert!(t2 - t1 >= THRESHOLD_GAP - 1e-7, "raw ({a}, {b}) -> ({t1}, {t2})");
            }
        }
    }

    #[test]
    fn sanitized_tritone_keeps_gap() {
        let p = TritoneParams { threshold1: 0.8, threshold2: 0.2, ..Default::default() }.sanitized();
        assert!(p.threshold1 < p.threshold2);
        let q = TritoneParams { threshold1: 0.5, threshold2: 0.5, softness: 4.0, orig_mix: -1.0, ..Default::default() }
            .sanitized();
        assert!(q.threshold2 - q.threshold1 >= THRESHOLD_GAP - 1e-7);
        assert_eq!(q.softness, MAX_SOFTNESS);
        assert_eq!(q.orig_mix, 0.0);
    }

    #[test]
    fn tritone_weights_far_from_edges() {
        let p = TritoneParams { threshold1: 0.3, threshold2: 0.7, softness: 0.1, ..Default::default() };
        let low = p.weights(0.05);
        assert_abs_diff_eq!(low.a, 1.0);
        assert_abs_diff_eq!(low.b, 0.0);
        assert_abs_diff_eq!(low.c, 0.0);

        let high = p.weights(0.95);
        assert_abs_diff_eq!(high.c, 1.0);
        assert_abs_diff_eq!(high.a, 0.0);
        assert_abs_diff_eq!(high.b, 0.0);
    }

    #[test]
    fn tritone_weights_sum_to_one() {
        for (t1, t2, s) in [(0.3, 0.7, 0.0), (0.3, 0.7, 0.12), (0.4, 0.45, 0.5), (0.6, 0.2, 0.25)] {
            let p = TritoneParams { threshold1: t1, threshold2: t2, softness: s, ..Default::default() };
            for i in 0..=200 {
                let w = p.weights(i as f32 / 200.0);
                assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn tritone_hard_band_midpoint() {
        let p = TritoneParams {
            color_a: Rgb::new(1.0, 0.0, 0.0),
            color_b: Rgb::new(0.0, 1.0, 0.0),
            color_c: Rgb::new(0.0, 0.0, 1.0),
            threshold1: 0.3,
            threshold2: 0.7,
            softness: 0.0,
            ..Default::default()
        };
        let w = p.weights(0.5);
        assert_eq!((w.a, w.b, w.c), (0.0, 1.0, 0.0));
        assert!(rgb_eq(p.apply(gray(0.5)), Rgb::new(0.0, 1.0, 0.0)));
        // Hard steps on either side.
        assert!(rgb_eq(p.apply(gray(0.29)), Rgb::new(1.0, 0.0, 0.0)));
        assert!(rgb_eq(p.apply(gray(0.71)), Rgb::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn tritone_orig_mix_pulls_extremes_to_black_and_white() {
        let p = TritoneParams {
            color_a: Rgb::new(0.0, 0.0, 1.0),
            color_b: Rgb::new(0.0, 1.0, 0.0),
            color_c: Rgb::new(1.0, 0.0, 0.0),
            softness: 0.1,
            orig_mix: 1.0,
            ..Default::default()
        };
        assert!(rgb_eq(p.apply(gray(0.0)), Rgb::ZERO));
        assert!(rgb_eq(p.apply(gray(1.0)), Rgb::ONE));
        // Midtones are neither near black nor near white: bw collapses to 0.
        assert!(rgb_eq(p.apply(gray(0.5)), Rgb::ZERO));
    }

    #[test]
    fn tritone_orig_mix_saturates() {
        let full = TritoneParams { softness: 0.2, orig_mix: 1.0, ..Default::default() };
        let over = TritoneParams { orig_mix: 2.0, ..full };
        for &v in &[0.05f32, 0.3, 0.5, 0.8, 0.95] {
            assert!(rgb_eq(over.apply(gray(v)), full.apply(gray(v))));
        }
    }

    #[test]
    fn contrast_pushes_away_from_mid_gray() {
        for &v in &[0.1f32, 0.3, 0.45, 0.55, 0.7, 0.9] {
            let mut prev_dist = (v - 0.5).abs();
            for step in 1..=10 {
                let ct = step as f32 / 10.0;
                let out = brightness_contrast(gray(v), 0.0, ct).x;
                let dist = (out - 0.5).abs();
                assert!(dist >= prev_dist - 1e-6, "v={v} ct={ct}");
                prev_dist = dist;
            }
        }
    }

    #[test]
    fn brightness_is_additive_before_clamp() {
        for &b in &[-0.4f32, -0.1, 0.0, 0.2, 0.4] {
            let base = brightness_contrast(gray(0.5), 0.0, 0.0).x;
            let out = brightness_contrast(gray(0.5), b, 0.0).x;
            assert_abs_diff_eq!(out - base, b * 0.5, epsilon = EPSILON);
        }
    }

    #[test]
    fn ui_units() {
        assert_eq!(ui_to_unit(100.0), 1.0);
        assert_eq!(ui_to_unit(-50.0), -0.5);
        assert_eq!(ui_to_unit(250.0), 1.0);
    }

    #[test]
    fn config_dispatch() {
        let duo: ToneConfig = DuotoneParams::identity().into();
        assert_eq!(duo.mode(), ToneMode::Duotone);
        let tri: ToneConfig = TritoneParams::default().into();
        assert_eq!(tri.mode(), ToneMode::Tritone);
        assert_eq!(ToneMode::Tritone.to_string(), "tritone");
    }
}
