// src/engine/backend.rs
//
// Resampling backend boundary.
//
// The backend sees byte layout, shape and the use_alpha hint. It never sees
// color mode semantics; those are settled by the normalizer before dispatch.

use crate::cpu::CpuCapability;
use crate::crop::CropBox;
use crate::error::{ResizerError, Result};
use crate::image::ImageView;
use crate::mode::PixelFormat;
use crate::options::ResizeAlg;
use crate::pool::WorkerPool;
use fast_image_resize::images::{Image as FirImage, ImageRef};
use fast_image_resize::{self as fir, ImageBufferError, IntoImageView, IntoImageViewMut};
use parking_lot::Mutex;
use tracing::trace;

/// Borrowed source pixels, optionally narrowed to a crop box.
#[derive(Clone, Copy, Debug)]
pub struct SourceView<'a> {
    width: u32,
    height: u32,
    format: PixelFormat,
    buffer: &'a [u8],
    crop: Option<CropBox>,
}

impl<'a> SourceView<'a> {
    /// Validates the buffer length against the shape.
    pub fn new(width: u32, height: u32, format: PixelFormat, buffer: &'a [u8]) -> Result<Self> {
        let len = format.buffer_len(width, height)?;
        if buffer.len() < len {
            return Err(ResizerError::buffer_too_small(len, buffer.len()));
        }
        Ok(Self {
            width,
            height,
            format,
            buffer: &buffer[..len],
            crop: None,
        })
    }

    /// Restrict sampling to `crop`. Fails when the box leaves the source.
    pub fn with_crop(mut self, crop: CropBox) -> Result<Self> {
        crop.check_within(self.width, self.height)?;
        self.crop = Some(crop);
        Ok(self)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    pub fn crop(&self) -> Option<CropBox> {
        self.crop
    }
}

impl<'a> From<ImageView<'a>> for SourceView<'a> {
    fn from(view: ImageView<'a>) -> Self {
        let image = view.image();
        Self {
            width: image.width(),
            height: image.height(),
            format: image.pixel_format(),
            buffer: image.buffer(),
            crop: view.crop_box(),
        }
    }
}

/// Mutable destination pixels.
#[derive(Debug)]
pub struct DestinationBuffer<'a> {
    width: u32,
    height: u32,
    format: PixelFormat,
    buffer: &'a mut [u8],
}

impl<'a> DestinationBuffer<'a> {
    pub fn new(width: u32, height: u32, format: PixelFormat, buffer: &'a mut [u8]) -> Result<Self> {
        let len = format.buffer_len(width, height)?;
        if buffer.len() < len {
            return Err(ResizerError::buffer_too_small(len, buffer.len()));
        }
        Ok(Self {
            width,
            height,
            format,
            buffer: &mut buffer[..len],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn buffer(&self) -> &[u8] {
        self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut [u8] {
        self.buffer
    }
}

/// Per-call parameters handed to the backend.
#[derive(Clone, Copy, Debug)]
pub struct BackendRequest<'a> {
    pub algorithm: ResizeAlg,
    pub use_alpha: bool,
    pub capability: CpuCapability,
    pub pool: Option<&'a WorkerPool>,
}

/// Resampling engine consumed by the orchestrator.
pub trait ResizeBackend {
    /// Whether pixels of `format` can be resampled.
    fn supports(&self, format: PixelFormat) -> bool;

    fn cpu_capability(&self) -> CpuCapability;

    /// Select a capability level; unsupported levels are clamped.
    /// Returns the effective level.
    fn set_cpu_capability(&mut self, capability: CpuCapability) -> CpuCapability;

    /// Resample `src` (or its crop box) into the whole of `dst`.
    /// Both sides must share one pixel format.
    fn resize(
        &self,
        src: &SourceView<'_>,
        dst: &mut DestinationBuffer<'_>,
        request: &BackendRequest<'_>,
    ) -> Result<()>;
}

/// Backend built on `fast_image_resize`.
pub struct FirBackend {
    resizer: Mutex<fir::Resizer>,
    cpu_capability: CpuCapability,
}

impl Default for FirBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FirBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirBackend")
            .field("cpu_capability", &self.cpu_capability)
            .finish()
    }
}

impl FirBackend {
    pub fn new() -> Self {
        Self {
            resizer: Mutex::new(fir::Resizer::new()),
            cpu_capability: CpuCapability::detect_best_supported(),
        }
    }

    fn fail(src: &SourceView<'_>, dst_size: (u32, u32), message: String) -> ResizerError {
        ResizerError::backend_failed((src.width, src.height), dst_size, message)
    }

    /// Run the resize against a destination that already satisfies fir's
    /// alignment rules.
    fn resize_into(
        &self,
        src: &SourceView<'_>,
        dst_image: &mut (impl IntoImageViewMut + Send),
        dst_size: (u32, u32),
        request: &BackendRequest<'_>,
    ) -> Result<()> {
        let pixel_type = src.format.to_fir();
        match ImageRef::new(src.width, src.height, src.buffer, pixel_type) {
            Ok(src_image) => self.dispatch(&src_image, dst_image, src, dst_size, request),
            Err(ImageBufferError::InvalidBufferAlignment) => {
                let mut aligned = FirImage::new(src.width, src.height, pixel_type);
                aligned.buffer_mut().copy_from_slice(src.buffer);
                self.dispatch(&aligned, dst_image, src, dst_size, request)
            }
            Err(other) => Err(Self::fail(
                src,
                dst_size,
                format!("fir source image error: {other:?}"),
            )),
        }
    }

    fn dispatch(
        &self,
        src_image: &(impl IntoImageView + Sync),
        dst_image: &mut (impl IntoImageViewMut + Send),
        src: &SourceView<'_>,
        dst_size: (u32, u32),
        request: &BackendRequest<'_>,
    ) -> Result<()> {
        let mut options = fir::ResizeOptions::new()
            .resize_alg(request.algorithm.to_fir())
            .use_alpha(request.use_alpha);
        if let Some(crop) = src.crop {
            options = options.crop(crop.left, crop.top, crop.width, crop.height);
        }

        let capability = request.capability.clamp_to_supported();
        let extensions = capability.to_fir().unwrap_or(fir::CpuExtensions::None);

        let mut guard = self.resizer.lock();
        let resizer: &mut fir::Resizer = &mut guard;
        // SAFETY: the level was clamped to one the running CPU supports.
        unsafe {
            resizer.set_cpu_extensions(extensions);
        }

        trace!(
            src_width = src.width,
            src_height = src.height,
            dst_width = dst_size.0,
            dst_height = dst_size.1,
            format = ?src.format,
            algorithm = ?request.algorithm,
            use_alpha = request.use_alpha,
            capability = %capability,
            pooled = request.pool.is_some(),
            "dispatching resize"
        );

        let options = &options;
        let result = match request.pool {
            Some(pool) => pool.install(|| resizer.resize(src_image, dst_image, options)),
            None => resizer.resize(src_image, dst_image, options),
        };
        result.map_err(|e| Self::fail(src, dst_size, format!("fir resize error: {e:?}")))
    }
}

impl ResizeBackend for FirBackend {
    fn supports(&self, _format: PixelFormat) -> bool {
        true
    }

    fn cpu_capability(&self) -> CpuCapability {
        self.cpu_capability
    }

    fn set_cpu_capability(&mut self, capability: CpuCapability) -> CpuCapability {
        self.cpu_capability = capability.clamp_to_supported();
        self.cpu_capability
    }

    fn resize(
        &self,
        src: &SourceView<'_>,
        dst: &mut DestinationBuffer<'_>,
        request: &BackendRequest<'_>,
    ) -> Result<()> {
        let dst_size = (dst.width, dst.height);
        if src.format != dst.format {
            return Err(Self::fail(
                src,
                dst_size,
                format!("pixel formats differ: {:?} -> {:?}", src.format, dst.format),
            ));
        }
        let pixel_type = dst.format.to_fir();

        match FirImage::from_slice_u8(dst.width, dst.height, &mut *dst.buffer, pixel_type) {
            Ok(mut dst_image) => return self.resize_into(src, &mut dst_image, dst_size, request),
            Err(ImageBufferError::InvalidBufferAlignment) => {}
            Err(other) => {
                return Err(Self::fail(
                    src,
                    dst_size,
                    format!("fir destination image error: {other:?}"),
                ))
            }
        }

        let mut aligned = FirImage::new(dst.width, dst.height, pixel_type);
        self.resize_into(src, &mut aligned, dst_size, request)?;
        dst.buffer.copy_from_slice(aligned.buffer());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FilterType;

    fn request(algorithm: ResizeAlg) -> BackendRequest<'static> {
        BackendRequest {
            algorithm,
            use_alpha: false,
            capability: CpuCapability::None,
            pool: None,
        }
    }

    #[test]
    fn test_constant_image_stays_constant() {
        let backend = FirBackend::new();
        let src_pixels = vec![200u8; 16 * 16 * 4];
        let src = SourceView::new(16, 16, PixelFormat::U8x4, &src_pixels).unwrap();
        let mut dst_pixels = vec![0u8; 5 * 7 * 4];
        let mut dst = DestinationBuffer::new(5, 7, PixelFormat::U8x4, &mut dst_pixels).unwrap();
        backend
            .resize(&src, &mut dst, &request(ResizeAlg::Convolution(FilterType::Lanczos3)))
            .unwrap();
        assert!(dst_pixels.iter().all(|&v| v == 200));
    }

    #[test]
    fn test_nearest_crop_picks_window() {
        let backend = FirBackend::new();
        // 4x1 gray ramp, crop the right half
        let src_pixels = vec![10u8, 20, 30, 40];
        let src = SourceView::new(4, 1, PixelFormat::U8, &src_pixels)
            .unwrap()
            .with_crop(CropBox::new(2.0, 0.0, 2.0, 1.0).unwrap())
            .unwrap();
        let mut dst_pixels = vec![0u8; 2];
        let mut dst = DestinationBuffer::new(2, 1, PixelFormat::U8, &mut dst_pixels).unwrap();
        backend.resize(&src, &mut dst, &request(ResizeAlg::Nearest)).unwrap();
        assert_eq!(dst_pixels, vec![30, 40]);
    }

    #[test]
    fn test_format_mismatch_is_backend_error() {
        let backend = FirBackend::new();
        let src_pixels = vec![0u8; 4];
        let src = SourceView::new(1, 1, PixelFormat::U8x4, &src_pixels).unwrap();
        let mut dst_pixels = vec![0u8; 1];
        let mut dst = DestinationBuffer::new(1, 1, PixelFormat::U8, &mut dst_pixels).unwrap();
        let err = backend.resize(&src, &mut dst, &request(ResizeAlg::Nearest)).unwrap_err();
        assert!(matches!(err, ResizerError::BackendFailed { .. }));
    }

    #[test]
    fn test_source_view_validates_length() {
        assert!(matches!(
            SourceView::new(2, 2, PixelFormat::U8x4, &[0u8; 15]),
            Err(ResizerError::BufferTooSmall { .. })
        ));
        let pixels = [0u8; 16];
        let view = SourceView::new(2, 2, PixelFormat::U8x4, &pixels).unwrap();
        assert!(view.with_crop(CropBox::new(1.0, 1.0, 2.0, 1.0).unwrap()).is_err());
    }

    #[test]
    fn test_pool_gives_same_output() {
        let backend = FirBackend::new();
        let pool = WorkerPool::new(Some(2)).unwrap();
        let src_pixels: Vec<u8> = (0..64 * 64 * 4).map(|i| (i % 251) as u8).collect();
        let src = SourceView::new(64, 64, PixelFormat::U8x4, &src_pixels).unwrap();

        let algorithm = ResizeAlg::Convolution(FilterType::Bilinear);
        let mut single = vec![0u8; 20 * 20 * 4];
        let mut dst = DestinationBuffer::new(20, 20, PixelFormat::U8x4, &mut single).unwrap();
        backend.resize(&src, &mut dst, &request(algorithm)).unwrap();

        let mut pooled = vec![0u8; 20 * 20 * 4];
        let mut dst = DestinationBuffer::new(20, 20, PixelFormat::U8x4, &mut pooled).unwrap();
        let pooled_request = BackendRequest {
            pool: Some(&pool),
            ..request(algorithm)
        };
        backend.resize(&src, &mut dst, &pooled_request).unwrap();
        assert_eq!(single, pooled);
    }
}
