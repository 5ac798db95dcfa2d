// src/crop.rs
//
// Source crop boxes and the aspect-fit calculator.

use crate::error::{ResizerError, Result};

/// Rectangle in source-image pixel coordinates. Fractional values are allowed;
/// the resize backend samples sub-pixel windows directly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CropBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Result<Self> {
        let values = [("left", left), ("top", top), ("width", width), ("height", height)];
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(ResizerError::invalid_argument(
                    name,
                    value.to_string(),
                    "Crop box values must be finite and greater or equal to zero",
                ));
            }
        }
        Ok(Self {
            left,
            top,
            width,
            height,
        })
    }

    /// Box covering the whole image.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: width as f64,
            height: height as f64,
        }
    }

    /// Crop box that gives the source the aspect ratio of `dst_size` without
    /// distortion. See [`fit_crop_box`].
    pub fn fit_src_into_dst_size(
        src_size: (u32, u32),
        dst_size: (u32, u32),
        centering: Option<(f64, f64)>,
    ) -> Result<Self> {
        fit_crop_box(src_size, dst_size, centering)
    }

    /// Integer rectangle `(left, top, width, height)`, each edge rounded to
    /// the nearest pixel.
    pub fn to_pixel_rect(&self) -> (u32, u32, u32, u32) {
        let left = self.left.round();
        let top = self.top.round();
        let right = (self.left + self.width).round();
        let bottom = (self.top + self.height).round();
        (
            left as u32,
            top as u32,
            (right - left).max(0.0) as u32,
            (bottom - top).max(0.0) as u32,
        )
    }

    /// Fails unless the box is non-empty and lies inside a `width` x `height` image.
    pub(crate) fn check_within(&self, width: u32, height: u32) -> Result<()> {
        let malformed = !(self.left >= 0.0 && self.top >= 0.0)
            || !(self.width > 0.0 && self.height > 0.0)
            || self.left + self.width > width as f64
            || self.top + self.height > height as f64;
        if malformed {
            return Err(ResizerError::invalid_crop_box(
                self.left,
                self.top,
                self.width,
                self.height,
                width,
                height,
            ));
        }
        Ok(())
    }
}

/// Clamp a centering component into `[0, 1]`; anything outside falls back to 0.5.
fn centering_component(value: f64) -> f64 {
    if (0.0..=1.0).contains(&value) {
        value
    } else {
        0.5
    }
}

/// Compute the crop box that resizes `src_size` into the aspect ratio of
/// `dst_size` without distortions.
///
/// `centering` controls the crop position: `(0.5, 0.5)` crops evenly from both
/// sides, `(0.0, 0.0)` keeps the top-left corner, `(1.0, 0.0)` keeps the
/// top-right corner. Components outside `[0, 1]` are replaced with 0.5.
pub fn fit_crop_box(
    src_size: (u32, u32),
    dst_size: (u32, u32),
    centering: Option<(f64, f64)>,
) -> Result<CropBox> {
    let (src_width, src_height) = src_size;
    let (dst_width, dst_height) = dst_size;
    if src_width == 0 || src_height == 0 {
        return Err(ResizerError::invalid_dimensions(src_width, src_height));
    }
    if dst_width == 0 || dst_height == 0 {
        return Err(ResizerError::invalid_dimensions(dst_width, dst_height));
    }

    let (center_x, center_y) = centering.unwrap_or((0.5, 0.5));
    let center_x = centering_component(center_x);
    let center_y = centering_component(center_y);

    let src_width = src_width as f64;
    let src_height = src_height as f64;
    let src_ratio = src_width / src_height;
    let dst_ratio = dst_width as f64 / dst_height as f64;

    let (crop_width, crop_height) = if src_ratio == dst_ratio {
        (src_width, src_height)
    } else if src_ratio > dst_ratio {
        // wider than needed, crop the sides
        (dst_ratio * src_height, src_height)
    } else {
        // taller than needed, crop top and bottom
        (src_width, src_width / dst_ratio)
    };

    Ok(CropBox {
        left: (src_width - crop_width) * center_x,
        top: (src_height - crop_height) * center_y,
        width: crop_width,
        height: crop_height,
    })
}
