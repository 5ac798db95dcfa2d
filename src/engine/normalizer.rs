// src/engine/normalizer.rs
//
// Mode normalization around a resize.
//
// prepare() brings the source into a mode the backend can resample straight
// into the destination layout and decides the backend's use_alpha flag.
// restore() turns the backend output into the destination mode.
//
// Copy-on-write: the caller's source is only copied when a step actually
// changes pixels or tags. Relabels never move data.

use crate::alpha::AlphaMulDiv;
use crate::convert::ColorConverter;
use crate::error::{ResizerError, Result};
use crate::image::Image;
use crate::mode::ColorMode;
use crate::options::ResizeAlg;
use crate::pool::WorkerPool;
use bitflags::bitflags;
use std::borrow::Cow;
use tracing::debug;

bitflags! {
    /// Steps performed while normalizing a source and restoring the output.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct NormalizeSteps: u32 {
        /// Source went through a generic conversion.
        const GENERIC_CONVERSION = 1 << 0;
        /// Source tag was changed without touching pixels.
        const RELABEL_SOURCE     = 1 << 1;
        /// Premultiplied source was un-premultiplied during conversion.
        const DIVIDE_SOURCE      = 1 << 2;
        /// Straight-alpha source was premultiplied before resampling.
        const PREMULTIPLY_SOURCE = 1 << 3;
        /// Output was un-premultiplied.
        const DIVIDE_OUTPUT      = 1 << 4;
        /// Output was premultiplied.
        const PREMULTIPLY_OUTPUT = 1 << 5;
        /// Output tag was changed without touching pixels.
        const RELABEL_OUTPUT     = 1 << 6;
    }
}

impl NormalizeSteps {
    /// Steps that ran the alpha codec.
    pub const ALPHA_PASSES: Self = Self::DIVIDE_SOURCE
        .union(Self::PREMULTIPLY_SOURCE)
        .union(Self::DIVIDE_OUTPUT)
        .union(Self::PREMULTIPLY_OUTPUT);
}

/// What to do with the backend output so that it carries the destination mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Restoration {
    /// Output already has the destination mode.
    Keep,
    /// Un-premultiply in place, ending as `RGBA`.
    DivideAlpha,
    /// Premultiply in place, ending as `RGBa`.
    MultiplyAlpha,
    /// Change the tag only.
    Relabel(ColorMode),
}

/// Whether `src` must be converted into `dst` before resampling.
pub fn needs_generic_conversion(src: ColorMode, dst: ColorMode) -> bool {
    src != dst && (src.requires_generic_source_conversion() || !dst.is_rgb_family())
}

/// Whether a straight-alpha source is premultiplied before resampling.
/// Nearest never blends pixels, so it never needs it.
pub fn needs_premultiply(src: ColorMode, dst: ColorMode, algorithm: ResizeAlg) -> bool {
    src == ColorMode::Rgba && dst == ColorMode::RgbaPremultiplied && !algorithm.is_nearest()
}

/// Restoration that maps output in `normalized` mode onto `dst`.
pub fn plan_restoration(normalized: ColorMode, dst: ColorMode) -> Result<Restoration> {
    use ColorMode::{Rgb, Rgba, RgbaPremultiplied};

    let restoration = match (normalized, dst) {
        (n, d) if n == d => Restoration::Keep,
        (RgbaPremultiplied, Rgba) => Restoration::DivideAlpha,
        (Rgba, RgbaPremultiplied) => Restoration::MultiplyAlpha,
        (RgbaPremultiplied | Rgba, Rgb) => Restoration::Relabel(Rgb),
        (Rgb, Rgba | RgbaPremultiplied) => Restoration::Relabel(dst),
        (n, d) => return Err(ResizerError::unsupported_mode_pair(n, d)),
    };
    Ok(restoration)
}

/// Source prepared for the backend.
#[derive(Debug)]
pub struct NormalizedSource<'a> {
    /// Borrowed when no step touched the source.
    pub image: Cow<'a, Image>,
    /// Whether the backend resamples alpha as weights.
    pub use_alpha: bool,
    pub restoration: Restoration,
    pub steps: NormalizeSteps,
}

impl NormalizedSource<'_> {
    pub fn mode(&self) -> ColorMode {
        self.image.mode()
    }
}

/// Decides and runs conversions and alpha passes around a resize.
pub struct ModeNormalizer<'r, C> {
    alpha_mul_div: &'r AlphaMulDiv,
    converter: &'r C,
    pool: Option<&'r WorkerPool>,
}

impl<'r, C: ColorConverter> ModeNormalizer<'r, C> {
    pub fn new(alpha_mul_div: &'r AlphaMulDiv, converter: &'r C, pool: Option<&'r WorkerPool>) -> Self {
        Self {
            alpha_mul_div,
            converter,
            pool,
        }
    }

    /// Bring `src` into a representation the backend can resample into `dst_mode`.
    pub fn prepare<'a>(
        &self,
        src: &'a Image,
        dst_mode: ColorMode,
        algorithm: ResizeAlg,
    ) -> Result<NormalizedSource<'a>> {
        let mut steps = NormalizeSteps::empty();
        let mut image = Cow::Borrowed(src);

        if needs_generic_conversion(src.mode(), dst_mode) {
            image = self.convert_into(image, dst_mode, &mut steps)?;
            debug!(from = %src.mode(), to = %dst_mode, result = %image.mode(), "generic conversion");
        }

        if needs_premultiply(image.mode(), dst_mode, algorithm) {
            image = Cow::Owned(self.alpha_mul_div.multiply_alpha(&image, self.pool)?);
            steps |= NormalizeSteps::PREMULTIPLY_SOURCE;
            debug!(algorithm = ?algorithm, "premultiplied source alpha");
        }

        let use_alpha = image.mode() == ColorMode::Rgba;
        let restoration = plan_restoration(image.mode(), dst_mode)?;
        debug!(
            src = %src.mode(),
            dst = %dst_mode,
            normalized = %image.mode(),
            use_alpha,
            restoration = ?restoration,
            "normalized source"
        );

        Ok(NormalizedSource {
            image,
            use_alpha,
            restoration,
            steps,
        })
    }

    /// Apply `restoration` to backend output. Returns the steps performed.
    pub fn restore(&self, output: &mut Image, restoration: Restoration) -> Result<NormalizeSteps> {
        let steps = match restoration {
            Restoration::Keep => NormalizeSteps::empty(),
            Restoration::DivideAlpha => {
                self.alpha_mul_div.divide_alpha_inplace(output, self.pool)?;
                NormalizeSteps::DIVIDE_OUTPUT
            }
            Restoration::MultiplyAlpha => {
                self.alpha_mul_div.multiply_alpha_inplace(output, self.pool)?;
                NormalizeSteps::PREMULTIPLY_OUTPUT
            }
            Restoration::Relabel(mode) => {
                output.set_mode_tag(mode)?;
                NormalizeSteps::RELABEL_OUTPUT
            }
        };
        if !steps.is_empty() {
            debug!(restoration = ?restoration, mode = %output.mode(), "restored output");
        }
        Ok(steps)
    }

    /// Generic conversion of `image` into `target`.
    ///
    /// The result normally carries `target`; an `RGBa` image asked for `RGBA`
    /// is returned as is and left for the restoration step to un-premultiply.
    pub fn convert<'a>(&self, image: Cow<'a, Image>, target: ColorMode) -> Result<Cow<'a, Image>> {
        let mut steps = NormalizeSteps::empty();
        self.convert_into(image, target, &mut steps)
    }

    fn convert_into<'a>(
        &self,
        image: Cow<'a, Image>,
        target: ColorMode,
        steps: &mut NormalizeSteps,
    ) -> Result<Cow<'a, Image>> {
        use ColorMode::{Cmyk, Float32Gray, Int32Gray, Rgb, Rgba, RgbaPremultiplied};

        let source = image.mode();
        if source == target {
            return Ok(image);
        }

        match (source, target) {
            (Rgb, Rgba | RgbaPremultiplied) => {
                let mut image = image;
                image.to_mut().set_mode_tag(target)?;
                *steps |= NormalizeSteps::RELABEL_SOURCE;
                Ok(image)
            }
            (RgbaPremultiplied, Rgba) => Ok(image),
            (RgbaPremultiplied, _) => {
                let straight = self.alpha_mul_div.divide_alpha(&image, self.pool)?;
                *steps |= NormalizeSteps::DIVIDE_SOURCE;
                self.convert_into(Cow::Owned(straight), target, steps)
            }
            (_, RgbaPremultiplied) => {
                // alpha is implicitly opaque after dropping to RGB
                let rgb = self.convert_into(image, Rgb, steps)?;
                let mut image: Cow<'_, Image> = Cow::Owned(rgb.into_owned());
                image.to_mut().set_mode_tag(RgbaPremultiplied)?;
                *steps |= NormalizeSteps::RELABEL_SOURCE;
                Ok(image)
            }
            (Cmyk, Int32Gray | Float32Gray) | (Int32Gray | Float32Gray, Cmyk) => {
                let rgb = self.convert_into(image, Rgb, steps)?;
                self.convert_into(rgb, target, steps)
            }
            _ => {
                *steps |= NormalizeSteps::GENERIC_CONVERSION;
                Ok(Cow::Owned(self.converter.convert(&image, target)?))
            }
        }
    }
}
