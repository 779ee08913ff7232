//! Tunable defaults for display sizing and export.
//!
//! All structs are serde-friendly so a host can load them from its own
//! settings file; every field has a default taken from the studio's
//! stock behavior.

use serde::{Deserialize, Serialize};

use crate::export::{ExportFormat, ExportRequest};

/// Hosts narrower than this (CSS px) use the mobile width cap.
pub const DEFAULT_MOBILE_BREAKPOINT: f32 = 576.0;

/// Maximum display width on desktop hosts (CSS px).
pub const DEFAULT_MAX_WIDTH_DESKTOP: f32 = 1000.0;

/// Maximum display width on mobile hosts (CSS px).
pub const DEFAULT_MAX_WIDTH_MOBILE: f32 = 600.0;

/// Display sizing limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Breakpoint between mobile and desktop caps.
    pub mobile_breakpoint: f32,
    /// Desktop width cap.
    pub max_width_desktop: f32,
    /// Mobile width cap.
    pub max_width_mobile: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            mobile_breakpoint: DEFAULT_MOBILE_BREAKPOINT,
            max_width_desktop: DEFAULT_MAX_WIDTH_DESKTOP,
            max_width_mobile: DEFAULT_MAX_WIDTH_MOBILE,
        }
    }
}

/// Named export settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportPreset {
    /// Output container.
    pub format: ExportFormat,
    /// Encoder quality in [0, 1] (ignored by lossless formats).
    pub quality: f32,
    /// Maximum output width.
    pub max_width: u32,
    /// Maximum output height.
    pub max_height: u32,
}

impl ExportPreset {
    /// Web-sized WebP, long side capped at 2000 px.
    pub const fn web() -> Self {
        Self {
            format: ExportFormat::Webp,
            quality: 0.9,
            max_width: 2000,
            max_height: 2000,
        }
    }

    /// Full-quality PNG up to 4096x4096.
    pub const fn hi_res_png() -> Self {
        Self {
            format: ExportFormat::Png,
            quality: 1.0,
            max_width: 4096,
            max_height: 4096,
        }
    }

    /// Request built from this preset.
    pub fn request(&self) -> ExportRequest {
        ExportRequest::new(self.max_width, self.max_height)
            .with_format(self.format)
            .with_quality(self.quality)
    }
}

impl Default for ExportPreset {
    fn default() -> Self {
        Self::web()
    }
}
