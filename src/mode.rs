// src/mode.rs
//
// Pixel layouts and color modes.
// A ColorMode is a semantic tag; a PixelFormat is the physical layout behind it.

use crate::error::{ResizerError, Result};
use fast_image_resize::PixelType;
use std::fmt;
use std::str::FromStr;

/// Physical layout of one pixel: channel type and channel count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    U8,
    U8x2,
    U8x3,
    U8x4,
    U16,
    U16x2,
    U16x3,
    U16x4,
    I32,
    F32,
    F32x2,
    F32x3,
    F32x4,
}

impl PixelFormat {
    /// Size of one pixel in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U8x2 | Self::U16 => 2,
            Self::U8x3 => 3,
            Self::U8x4 | Self::U16x2 | Self::I32 | Self::F32 => 4,
            Self::U16x3 => 6,
            Self::U16x4 | Self::F32x2 => 8,
            Self::F32x3 => 12,
            Self::F32x4 => 16,
        }
    }

    pub const fn channels(self) -> usize {
        match self {
            Self::U8 | Self::U16 | Self::I32 | Self::F32 => 1,
            Self::U8x2 | Self::U16x2 | Self::F32x2 => 2,
            Self::U8x3 | Self::U16x3 | Self::F32x3 => 3,
            Self::U8x4 | Self::U16x4 | Self::F32x4 => 4,
        }
    }

    /// Whether the last channel of this layout can carry alpha.
    pub const fn has_alpha_slot(self) -> bool {
        matches!(
            self,
            Self::U8x2 | Self::U8x4 | Self::U16x2 | Self::U16x4 | Self::F32x2 | Self::F32x4
        )
    }

    /// Minimal buffer length for an image of this layout.
    ///
    /// Rejects zero dimensions; overflow is reported as an undersized buffer.
    pub fn buffer_len(self, width: u32, height: u32) -> Result<usize> {
        if width == 0 || height == 0 {
            return Err(ResizerError::invalid_dimensions(width, height));
        }
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(self.size()))
            .ok_or_else(|| ResizerError::buffer_too_small(usize::MAX, 0))
    }

    pub(crate) fn to_fir(self) -> PixelType {
        match self {
            Self::U8 => PixelType::U8,
            Self::U8x2 => PixelType::U8x2,
            Self::U8x3 => PixelType::U8x3,
            Self::U8x4 => PixelType::U8x4,
            Self::U16 => PixelType::U16,
            Self::U16x2 => PixelType::U16x2,
            Self::U16x3 => PixelType::U16x3,
            Self::U16x4 => PixelType::U16x4,
            Self::I32 => PixelType::I32,
            Self::F32 => PixelType::F32,
            Self::F32x2 => PixelType::F32x2,
            Self::F32x3 => PixelType::F32x3,
            Self::F32x4 => PixelType::F32x4,
        }
    }
}

/// Semantic color mode of an image.
///
/// `Rgb`, `Rgba`, `RgbaPremultiplied` and `Cmyk` share one 4-byte layout;
/// RGB keeps an opaque padding byte in the alpha slot. `Rgba` and
/// `RgbaPremultiplied` differ only in how the color channels are read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorMode {
    /// `RGB`
    Rgb,
    /// `RGBA`, straight alpha
    Rgba,
    /// `RGBa`, color channels premultiplied by alpha
    RgbaPremultiplied,
    /// `L`, 8-bit luma
    Grayscale,
    /// `CMYK`
    Cmyk,
    /// `I`, 32-bit signed luma
    Int32Gray,
    /// `F`, 32-bit float luma
    Float32Gray,
}

impl ColorMode {
    pub const ALL: [ColorMode; 7] = [
        ColorMode::Rgb,
        ColorMode::Rgba,
        ColorMode::RgbaPremultiplied,
        ColorMode::Grayscale,
        ColorMode::Cmyk,
        ColorMode::Int32Gray,
        ColorMode::Float32Gray,
    ];

    pub const fn pixel_format(self) -> PixelFormat {
        match self {
            Self::Rgb | Self::Rgba | Self::RgbaPremultiplied | Self::Cmyk => PixelFormat::U8x4,
            Self::Grayscale => PixelFormat::U8,
            Self::Int32Gray => PixelFormat::I32,
            Self::Float32Gray => PixelFormat::F32,
        }
    }

    /// RGB, RGBA or RGBa.
    pub const fn is_rgb_family(self) -> bool {
        matches!(self, Self::Rgb | Self::Rgba | Self::RgbaPremultiplied)
    }

    /// Modes that always go through a generic conversion before resizing
    /// into a different mode.
    pub const fn requires_generic_source_conversion(self) -> bool {
        matches!(
            self,
            Self::Cmyk | Self::Int32Gray | Self::Float32Gray | Self::Grayscale
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rgb => "RGB",
            Self::Rgba => "RGBA",
            Self::RgbaPremultiplied => "RGBa",
            Self::Grayscale => "L",
            Self::Cmyk => "CMYK",
            Self::Int32Gray => "I",
            Self::Float32Gray => "F",
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorMode {
    type Err = ResizerError;

    /// Mode names are case-sensitive: `RGBA` and `RGBa` are different modes.
    fn from_str(s: &str) -> Result<Self> {
        ColorMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                ResizerError::invalid_argument(
                    "mode",
                    s.to_string(),
                    "Expected one of RGB, RGBA, RGBa, L, CMYK, I, F",
                )
            })
    }
}
