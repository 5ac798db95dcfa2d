// src/cpu.rs
//
// CPU capability levels shared by the alpha codec and the resize backend.
//
// Policy: a level the running CPU cannot execute is clamped, never rejected.
// The level is lowered along its own family ladder until a supported one is
// found, and the effective level is what every getter reports afterwards.

use crate::error::{ResizerError, Result};
use fast_image_resize as fir;
use once_cell::sync::Lazy;
use std::fmt;
use std::str::FromStr;

static BEST_SUPPORTED: Lazy<CpuCapability> =
    Lazy::new(|| CpuCapability::from_fir(fir::CpuExtensions::default()));

/// Instruction-set tier used to pick a kernel variant.
///
/// Ordered by strength within a family: `None < Sse4_1 < Avx2` on x86_64,
/// `None < Neon` on aarch64.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CpuCapability {
    #[default]
    None,
    Sse4_1,
    Avx2,
    Neon,
}

impl CpuCapability {
    pub const ALL: [CpuCapability; 4] = [
        CpuCapability::None,
        CpuCapability::Sse4_1,
        CpuCapability::Avx2,
        CpuCapability::Neon,
    ];

    /// Strongest level the running processor supports. Detected once.
    pub fn detect_best_supported() -> Self {
        *BEST_SUPPORTED
    }

    pub fn is_supported(self) -> bool {
        match self {
            Self::None => true,
            _ => self.to_fir().is_some_and(|ext| ext.is_supported()),
        }
    }

    /// Next weaker level in the same family.
    pub fn weaker(self) -> Option<Self> {
        match self {
            Self::None => None,
            Self::Sse4_1 | Self::Neon => Some(Self::None),
            Self::Avx2 => Some(Self::Sse4_1),
        }
    }

    /// Effective level for a request: the request itself when supported,
    /// otherwise the first supported level below it.
    pub fn clamp_to_supported(self) -> Self {
        let mut level = self;
        while !level.is_supported() {
            match level.weaker() {
                Some(weaker) => level = weaker,
                None => return Self::None,
            }
        }
        if level != self {
            tracing::warn!(
                requested = %self,
                effective = %level,
                "cpu capability not supported, clamped"
            );
        }
        level
    }

    /// Whether vectorization-friendly kernels should be used.
    pub fn is_simd(self) -> bool {
        self != Self::None
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Sse4_1 => "sse4.1",
            Self::Avx2 => "avx2",
            Self::Neon => "neon",
        }
    }

    pub(crate) fn to_fir(self) -> Option<fir::CpuExtensions> {
        match self {
            Self::None => Some(fir::CpuExtensions::None),
            #[cfg(target_arch = "x86_64")]
            Self::Sse4_1 => Some(fir::CpuExtensions::Sse4_1),
            #[cfg(target_arch = "x86_64")]
            Self::Avx2 => Some(fir::CpuExtensions::Avx2),
            #[cfg(target_arch = "aarch64")]
            Self::Neon => Some(fir::CpuExtensions::Neon),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    fn from_fir(extensions: fir::CpuExtensions) -> Self {
        match extensions {
            #[cfg(target_arch = "x86_64")]
            fir::CpuExtensions::Sse4_1 => Self::Sse4_1,
            #[cfg(target_arch = "x86_64")]
            fir::CpuExtensions::Avx2 => Self::Avx2,
            #[cfg(target_arch = "aarch64")]
            fir::CpuExtensions::Neon => Self::Neon,
            #[allow(unreachable_patterns)]
            _ => Self::None,
        }
    }
}

impl fmt::Display for CpuCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CpuCapability {
    type Err = ResizerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "sse4.1" | "sse4_1" => Ok(Self::Sse4_1),
            "avx2" => Ok(Self::Avx2),
            "neon" => Ok(Self::Neon),
            other => Err(ResizerError::invalid_argument(
                "cpu_capability",
                other.to_string(),
                "Expected none, sse4.1, avx2 or neon",
            )),
        }
    }
}
