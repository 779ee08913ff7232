//! Host-facing studio parameters in UI units.
//!
//! Colors are kept as hex strings and brightness/contrast as slider values
//! in [-100, 100], exactly as the controls produce them. [`ToneState::to_config`]
//! converts everything to mapper units at draw time.

use serde::{Deserialize, Serialize};

use crate::color::parse_hex_color;
use crate::tone::{ui_to_unit, DuotoneParams, ToneConfig, ToneMode, TritoneParams};

/// Default duotone shadow.
pub const DEFAULT_DUO_SHADOW: &str = "#1b602f";
/// Default duotone highlight.
pub const DEFAULT_DUO_HIGHLIGHT: &str = "#f784c5";
/// Default tritone shadow band.
pub const DEFAULT_TRI_A: &str = "#0c1e6b";
/// Default tritone midtone band.
pub const DEFAULT_TRI_B: &str = "#f15a94";
/// Default tritone highlight band.
pub const DEFAULT_TRI_C: &str = "#00a63f";

/// Duotone controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuotoneState {
    /// Shadow color, `#rrggbb`.
    pub shadow: String,
    /// Highlight color, `#rrggbb`.
    pub highlight: String,
    /// [0, 1]
    pub strength: f32,
    /// [-100, 100]
    pub brightness: f32,
    /// [-100, 100]
    pub contrast: f32,
}

impl Default for DuotoneState {
    fn default() -> Self {
        Self {
            shadow: DEFAULT_DUO_SHADOW.into(),
            highlight: DEFAULT_DUO_HIGHLIGHT.into(),
            strength: 1.0,
            brightness: 0.0,
            contrast: 0.0,
        }
    }
}

impl DuotoneState {
    /// Mapper parameters, clamped.
    pub fn to_params(&self) -> DuotoneParams {
        DuotoneParams {
            shadow: parse_hex_color(&self.shadow),
            highlight: parse_hex_color(&self.highlight),
            strength: self.strength,
            brightness: ui_to_unit(self.brightness),
            contrast: ui_to_unit(self.contrast),
        }
        .sanitized()
    }

    /// Exchanges shadow and highlight colors.
    pub fn swap_colors(&mut self) {
        std::mem::swap(&mut self.shadow, &mut self.highlight);
    }
}

/// Tritone controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TritoneState {
    /// Shadow band color.
    pub color_a: String,
    /// Midtone band color.
    pub color_b: String,
    /// Highlight band color.
    pub color_c: String,
    /// [0, 1]
    pub threshold1: f32,
    /// [0, 1]
    pub threshold2: f32,
    /// [0, 0.5]
    pub softness: f32,
    /// [0, 1]
    pub strength: f32,
    /// [-100, 100]
    pub brightness: f32,
    /// [-100, 100]
    pub contrast: f32,
    /// [0, 1]
    pub orig_mix: f32,
}

impl Default for TritoneState {
    fn default() -> Self {
        Self {
            color_a: DEFAULT_TRI_A.into(),
            color_b: DEFAULT_TRI_B.into(),
            color_c: DEFAULT_TRI_C.into(),
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

impl TritoneState {
    /// Mapper parameters, clamped with separated thresholds.
    pub fn to_params(&self) -> TritoneParams {
        TritoneParams {
            color_a: parse_hex_color(&self.color_a),
            color_b: parse_hex_color(&self.color_b),
            color_c: parse_hex_color(&self.color_c),
            threshold1: self.threshold1,
            threshold2: self.threshold2,
            softness: self.softness,
            strength: self.strength,
            brightness: ui_to_unit(self.brightness),
            contrast: ui_to_unit(self.contrast),
            orig_mix: self.orig_mix,
        }
        .sanitized()
    }

    /// Rotates colors: A takes C, B takes A, C takes B.
    pub fn cycle_colors(&mut self) {
        let Self { color_a, color_b, color_c, .. } = self;
        std::mem::swap(color_a, color_c); // a=C, c=A
        std::mem::swap(color_b, color_c); // b=A, c=B
    }
}

/// Complete studio state: active mode plus both parameter sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneState {
    /// Active program.
    pub mode: ToneMode,
    /// Duotone controls.
    pub duotone: DuotoneState,
    /// Tritone controls.
    pub tritone: TritoneState,
}

impl ToneState {
    /// Active configuration in mapper units.
    pub fn to_config(&self) -> ToneConfig {
        match self.mode {
            ToneMode::Duotone => ToneConfig::Duotone(self.duotone.to_params()),
            ToneMode::Tritone => ToneConfig::Tritone(self.tritone.to_params()),
        }
    }

    /// Swaps the duotone shadow and highlight.
    pub fn swap_duotone_colors(&mut self) {
        self.duotone.swap_colors();
    }

    /// Rotates the tritone band colors.
    pub fn cycle_tritone_colors(&mut self) {
        self.tritone.cycle_colors();
    }

    /// Restores duotone defaults.
    pub fn reset_duotone(&mut self) {
        self.duotone = DuotoneState::default();
    }

    /// Restores tritone defaults.
    pub fn reset_tritone(&mut self) {
        self.tritone = TritoneState::default();
    }
}
