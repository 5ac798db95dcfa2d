// src/error.rs
//
// Unified error handling for mode-resizer
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy:
// - Shape: bad dimensions, buffers, crop boxes or modes handed in by the caller
// - ModePair: a conversion path the normalizer does not know
// - InvalidArgument: out-of-range option values
// - Backend: the resampling backend or its thread pool failed

use crate::mode::ColorMode;
use std::borrow::Cow;
use thiserror::Error;

/// Error taxonomy, one category per failure class a caller handles differently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCategory {
    /// Invalid image shape, buffer or mode for the requested operation
    Shape,
    /// Mode conversion path not covered by the normalizer
    ModePair,
    /// Option value outside its accepted range
    InvalidArgument,
    /// Failure inside the resampling backend or the worker pool
    Backend,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Shape => "Shape",
            ErrorCategory::ModePair => "ModePair",
            ErrorCategory::InvalidArgument => "InvalidArgument",
            ErrorCategory::Backend => "Backend",
        }
    }
}

/// mode-resizer error types
///
/// Every error is local to one call; nothing is retried.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResizerError {
    // Shape Errors
    #[error("Invalid image dimensions: width={width}, height={height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Size of buffer must be greater or equal to {expected} bytes, got {actual} bytes")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("Unsupported mode of {role} image: {mode}")]
    UnsupportedMode {
        role: Cow<'static, str>,
        mode: ColorMode,
    },

    #[error(
        "Crop box ({left}, {top}, {width}x{height}) is outside of image dimensions ({img_width}x{img_height})"
    )]
    InvalidCropBox {
        left: f64,
        top: f64,
        width: f64,
        height: f64,
        img_width: u32,
        img_height: u32,
    },

    #[error("Invalid mode of image: expected {expected}, got {actual}")]
    ModeMismatch {
        expected: Cow<'static, str>,
        actual: ColorMode,
    },

    // Conversion Errors
    #[error("No conversion path from {from} to {to}")]
    UnsupportedModePair { from: ColorMode, to: ColorMode },

    // Configuration Errors
    #[error("Invalid value for {name}: {value}. {reason}")]
    InvalidArgument {
        name: Cow<'static, str>,
        value: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    // Backend Errors
    #[error("Resize failed ({source_width}x{source_height} -> {target_width}x{target_height}): {message}")]
    BackendFailed {
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
        message: Cow<'static, str>,
    },

    #[error("Failed to build worker pool: {message}")]
    ThreadPoolBuildFailed { message: Cow<'static, str> },
}

// Constructor Helpers
impl ResizerError {
    pub fn invalid_dimensions(width: u32, height: u32) -> Self {
        Self::InvalidDimensions { width, height }
    }

    pub fn buffer_too_small(expected: usize, actual: usize) -> Self {
        Self::BufferTooSmall { expected, actual }
    }

    pub fn unsupported_mode(role: impl Into<Cow<'static, str>>, mode: ColorMode) -> Self {
        Self::UnsupportedMode {
            role: role.into(),
            mode,
        }
    }

    pub fn invalid_crop_box(
        left: f64,
        top: f64,
        width: f64,
        height: f64,
        img_width: u32,
        img_height: u32,
    ) -> Self {
        Self::InvalidCropBox {
            left,
            top,
            width,
            height,
            img_width,
            img_height,
        }
    }

    pub fn mode_mismatch(expected: impl Into<Cow<'static, str>>, actual: ColorMode) -> Self {
        Self::ModeMismatch {
            expected: expected.into(),
            actual,
        }
    }

    pub fn unsupported_mode_pair(from: ColorMode, to: ColorMode) -> Self {
        Self::UnsupportedModePair { from, to }
    }

    pub fn invalid_argument(
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn backend_failed(
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::BackendFailed {
            source_width: source_dims.0,
            source_height: source_dims.1,
            target_width: target_dims.0,
            target_height: target_dims.1,
            message: message.into(),
        }
    }

    pub fn thread_pool_build_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::ThreadPoolBuildFailed {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (caller can fix its input)
    pub fn is_recoverable(&self) -> bool {
        match self.category() {
            ErrorCategory::Shape | ErrorCategory::InvalidArgument => true,
            ErrorCategory::ModePair | ErrorCategory::Backend => false,
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidDimensions { .. }
            | Self::BufferTooSmall { .. }
            | Self::UnsupportedMode { .. }
            | Self::InvalidCropBox { .. }
            | Self::ModeMismatch { .. } => ErrorCategory::Shape,

            Self::UnsupportedModePair { .. } => ErrorCategory::ModePair,

            Self::InvalidArgument { .. } => ErrorCategory::InvalidArgument,

            Self::BackendFailed { .. } | Self::ThreadPoolBuildFailed { .. } => {
                ErrorCategory::Backend
            }
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for ResizerError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::thread_pool_build_failed(err.to_string())
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, ResizerError>;
