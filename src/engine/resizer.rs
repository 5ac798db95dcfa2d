// src/engine/resizer.rs
//
// Resize orchestrator: validate -> normalize -> crop -> backend -> restore.
//
// Nothing caller-owned is mutated before the backend call; the destination
// buffer is the only thing written, and its mode tag is set last.

use crate::alpha::AlphaMulDiv;
use crate::convert::{ColorConverter, StandardConverter};
use crate::cpu::CpuCapability;
use crate::crop::{fit_crop_box, CropBox};
use crate::engine::backend::{BackendRequest, DestinationBuffer, FirBackend, ResizeBackend, SourceView};
use crate::engine::normalizer::{ModeNormalizer, NormalizeSteps};
use crate::error::{ResizerError, Result};
use crate::image::Image;
use crate::mode::{ColorMode, PixelFormat};
use crate::options::{Cropping, ResizeOptions};
use tracing::debug;

/// What a mode-aware resize did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResizeReport {
    pub src_mode: ColorMode,
    pub dst_mode: ColorMode,
    /// Mode the backend resampled in.
    pub normalized_mode: ColorMode,
    pub use_alpha: bool,
    pub steps: NormalizeSteps,
    /// Source window actually resampled, `None` for the whole image.
    pub crop_box: Option<CropBox>,
    pub capability: CpuCapability,
}

/// Mode-aware resizer.
///
/// Holds one capability level, shared by its alpha codec and its backend.
#[derive(Debug)]
pub struct Resizer<B = FirBackend, C = StandardConverter> {
    backend: B,
    converter: C,
    alpha_mul_div: AlphaMulDiv,
    cpu_capability: CpuCapability,
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Resizer {
    /// Resizer over `fast_image_resize` at the best supported capability level.
    pub fn new() -> Self {
        Self::with_parts(FirBackend::new(), StandardConverter)
    }
}

impl<B: ResizeBackend, C: ColorConverter> Resizer<B, C> {
    pub fn with_parts(backend: B, converter: C) -> Self {
        let mut resizer = Self {
            backend,
            converter,
            alpha_mul_div: AlphaMulDiv::new(),
            cpu_capability: CpuCapability::None,
        };
        resizer.set_cpu_capability(CpuCapability::detect_best_supported());
        resizer
    }

    pub fn cpu_capability(&self) -> CpuCapability {
        self.cpu_capability
    }

    /// Select a capability level for the codec and the backend. Unsupported
    /// levels are clamped; returns the effective level.
    pub fn set_cpu_capability(&mut self, capability: CpuCapability) -> CpuCapability {
        let effective = capability.clamp_to_supported();
        self.alpha_mul_div.set_cpu_capability(effective);
        self.backend.set_cpu_capability(effective);
        self.cpu_capability = effective;
        effective
    }

    pub fn alpha_mul_div(&self) -> &AlphaMulDiv {
        &self.alpha_mul_div
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Resize `src` into the size and mode of `dst`.
    ///
    /// On success `dst` holds the resampled pixels tagged with its original mode.
    pub fn resize(
        &self,
        src: &Image,
        dst: &mut Image,
        options: Option<&ResizeOptions>,
    ) -> Result<ResizeReport> {
        let default_options = ResizeOptions::default();
        let options = options.unwrap_or(&default_options);
        let algorithm = options.algorithm();
        let src_mode = src.mode();
        let dst_mode = dst.mode();

        algorithm.validate()?;
        if !self.backend.supports(dst.pixel_format()) {
            return Err(ResizerError::unsupported_mode("destination", dst_mode));
        }

        // Nearest gains nothing from the pool.
        let pool = if algorithm.is_nearest() {
            None
        } else {
            options.get_thread_pool()
        };

        let normalizer = ModeNormalizer::new(&self.alpha_mul_div, &self.converter, pool);
        let normalized = normalizer.prepare(src, dst_mode, algorithm)?;
        let normalized_mode = normalized.mode();
        // the backend only ever sees the normalized source
        if !self.backend.supports(normalized.image.pixel_format()) {
            return Err(ResizerError::unsupported_mode("source", normalized_mode));
        }
        if normalized.image.pixel_format() != dst.pixel_format() {
            return Err(ResizerError::unsupported_mode_pair(normalized_mode, dst_mode));
        }

        let crop_box = match options.cropping() {
            Cropping::None => None,
            Cropping::Crop(crop_box) => Some(crop_box),
            Cropping::FitIntoDestination(centering) => {
                Some(fit_crop_box(src.size(), dst.size(), Some(centering))?)
            }
        };
        let view = match crop_box {
            Some(crop_box) => normalized.image.cropped_view(crop_box)?,
            None => normalized.image.view(),
        };

        let request = BackendRequest {
            algorithm,
            use_alpha: normalized.use_alpha,
            capability: self.cpu_capability,
            pool,
        };
        let (width, height) = dst.size();
        let mut dst_buffer =
            DestinationBuffer::new(width, height, dst.pixel_format(), dst.buffer_mut())?;
        self.backend
            .resize(&SourceView::from(view), &mut dst_buffer, &request)?;

        dst.retag(normalized_mode)?;
        let restored = normalizer.restore(dst, normalized.restoration)?;
        debug_assert_eq!(dst.mode(), dst_mode);

        let report = ResizeReport {
            src_mode,
            dst_mode,
            normalized_mode,
            use_alpha: normalized.use_alpha,
            steps: normalized.steps | restored,
            crop_box,
            capability: self.cpu_capability,
        };
        debug!(report = ?report, "resize finished");
        Ok(report)
    }

    /// Resize raw pixels without any mode logic.
    ///
    /// Source and destination share `format`; `use_alpha` comes from the
    /// options. The buffers must hold at least `width * height` pixels.
    pub fn resize_raw(
        &self,
        format: PixelFormat,
        src: (u32, u32, &[u8]),
        dst: (u32, u32, &mut [u8]),
        options: Option<&ResizeOptions>,
    ) -> Result<()> {
        let default_options = ResizeOptions::default();
        let options = options.unwrap_or(&default_options);
        options.algorithm().validate()?;
        if !self.backend.supports(format) {
            return Err(ResizerError::invalid_argument(
                "pixel_format",
                format!("{format:?}"),
                "Not supported by the resize backend",
            ));
        }

        let (src_width, src_height, src_buffer) = src;
        let (dst_width, dst_height, dst_buffer) = dst;
        let mut view = SourceView::new(src_width, src_height, format, src_buffer)?;
        match options.cropping() {
            Cropping::None => {}
            Cropping::Crop(crop_box) => view = view.with_crop(crop_box)?,
            Cropping::FitIntoDestination(centering) => {
                let crop_box =
                    fit_crop_box((src_width, src_height), (dst_width, dst_height), Some(centering))?;
                view = view.with_crop(crop_box)?;
            }
        }
        let mut dst_buffer = DestinationBuffer::new(dst_width, dst_height, format, dst_buffer)?;

        let algorithm = options.algorithm();
        let request = BackendRequest {
            algorithm,
            use_alpha: options.get_use_alpha(),
            capability: self.cpu_capability,
            pool: if algorithm.is_nearest() {
                None
            } else {
                options.get_thread_pool()
            },
        };
        self.backend.resize(&view, &mut dst_buffer, &request)
    }
}
