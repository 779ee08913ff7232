//! Which backends this build and machine can run.

use std::cmp::Reverse;
use std::fmt;

use super::cpu_backend::MAX_TEXTURE_DIM;
use super::Backend;

/// Availability report for one backend.
#[derive(Debug, Clone)]
pub struct BackendInfo {
    pub backend: Backend,
    pub name: &'static str,
    pub available: bool,
    /// Auto-selection rank, higher wins.
    pub priority: u32,
    /// Largest texture side, when known without creating a device.
    pub max_texture_dim: Option<u32>,
}

impl BackendInfo {
    fn cpu() -> Self {
        Self {
            backend: Backend::Cpu,
            name: "CPU",
            available: true,
            priority: 10,
            max_texture_dim: Some(MAX_TEXTURE_DIM),
        }
    }

    #[cfg(feature = "wgpu")]
    fn wgpu() -> Self {
        let available = super::WgpuBackend::is_available();
        Self {
            backend: Backend::Wgpu,
            name: "wgpu",
            available,
            priority: if available { 100 } else { 0 },
            max_texture_dim: None,
        }
    }
}

impl fmt::Display for BackendInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.available { '+' } else { '-' };
        write!(f, "[{mark}] {}", self.name)?;
        if let Some(dim) = self.max_texture_dim {
            write!(f, " (textures up to {dim}px)")?;
        }
        Ok(())
    }
}

/// Backends compiled into this build, best first.
pub fn detect_backends() -> Vec<BackendInfo> {
    #[allow(unused_mut)]
    let mut found = vec![BackendInfo::cpu()];
    #[cfg(feature = "wgpu")]
    found.push(BackendInfo::wgpu());
    found.sort_by_key(|b| Reverse(b.priority));
    found
}

/// Highest-ranked available backend; CPU when nothing else is usable.
pub fn select_best_backend() -> Backend {
    detect_backends()
        .into_iter()
        .find(|b| b.available)
        .map_or(Backend::Cpu, |b| b.backend)
}

/// One line per backend, e.g. `[+] CPU (textures up to 16384px)`.
pub fn describe_backends() -> String {
    detect_backends()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
