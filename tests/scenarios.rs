// tests/scenarios.rs
//
// Orchestration scenarios against a recording backend.
// The backend copies pixels nearest-neighbor style and records every request,
// so the tests can see exactly what the resizer handed over.

use mode_resizer::engine::{
    BackendRequest, DestinationBuffer, NormalizeSteps, ResizeBackend, Resizer, SourceView,
};
use mode_resizer::{
    fit_crop_box, ColorMode, CpuCapability, CropBox, FilterType, Image, PixelFormat, ResizeAlg,
    ResizeOptions, ResizerError, StandardConverter, WorkerPool,
};
use parking_lot::Mutex;

#[derive(Clone, Debug, PartialEq)]
struct RecordedCall {
    algorithm: ResizeAlg,
    use_alpha: bool,
    capability: CpuCapability,
    pooled: bool,
    format: PixelFormat,
    crop: Option<CropBox>,
    src_first_pixel: Vec<u8>,
}

#[derive(Default)]
struct RecordingBackend {
    calls: Mutex<Vec<RecordedCall>>,
    rejected: Vec<PixelFormat>,
    cpu_capability: CpuCapability,
}

impl RecordingBackend {
    fn rejecting(format: PixelFormat) -> Self {
        Self {
            rejected: vec![format],
            ..Self::default()
        }
    }
}

impl ResizeBackend for RecordingBackend {
    fn supports(&self, format: PixelFormat) -> bool {
        !self.rejected.contains(&format)
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
    ) -> mode_resizer::Result<()> {
        let pixel_size = src.format().size();
        let (left, top, width, height) = src
            .crop()
            .map(|c| c.to_pixel_rect())
            .unwrap_or((0, 0, src.width(), src.height()));
        let first = ((top * src.width() + left) as usize) * pixel_size;

        self.calls.lock().push(RecordedCall {
            algorithm: request.algorithm,
            use_alpha: request.use_alpha,
            capability: request.capability,
            pooled: request.pool.is_some(),
            format: src.format(),
            crop: src.crop(),
            src_first_pixel: src.buffer()[first..first + pixel_size].to_vec(),
        });

        let (dst_width, dst_height) = (dst.width(), dst.height());
        let src_buffer = src.buffer();
        let src_width = src.width();
        let out = dst.buffer_mut();
        for y in 0..dst_height {
            for x in 0..dst_width {
                let sx = left + x * width / dst_width;
                let sy = top + y * height / dst_height;
                let s = ((sy * src_width + sx) as usize) * pixel_size;
                let d = ((y * dst_width + x) as usize) * pixel_size;
                out[d..d + pixel_size].copy_from_slice(&src_buffer[s..s + pixel_size]);
            }
        }
        Ok(())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn recording_resizer() -> Resizer<RecordingBackend, StandardConverter> {
    init_tracing();
    Resizer::with_parts(RecordingBackend::default(), StandardConverter)
}

fn single_call(resizer: &Resizer<RecordingBackend, StandardConverter>) -> RecordedCall {
    let calls = resizer.backend().calls.lock();
    assert_eq!(calls.len(), 1, "expected exactly one backend call");
    calls[0].clone()
}

fn rgba_image(width: u32, height: u32, pixel: [u8; 4]) -> Image {
    let buffer = pixel.repeat((width * height) as usize);
    Image::from_vec(width, height, ColorMode::Rgba, buffer).unwrap()
}

fn lanczos() -> ResizeOptions {
    ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3))
}

#[test]
fn rgba_into_premultiplied_premultiplies_once() {
    let resizer = recording_resizer();
    let src = rgba_image(4, 4, [200, 100, 50, 128]);
    let mut dst = Image::new(2, 2, ColorMode::RgbaPremultiplied).unwrap();

    let report = resizer.resize(&src, &mut dst, Some(&lanczos())).unwrap();

    assert_eq!(
        report.steps & NormalizeSteps::ALPHA_PASSES,
        NormalizeSteps::PREMULTIPLY_SOURCE
    );
    assert!(!report.use_alpha);
    assert_eq!(report.normalized_mode, ColorMode::RgbaPremultiplied);
    let call = single_call(&resizer);
    assert!(!call.use_alpha);
    assert_eq!(call.src_first_pixel, vec![100, 50, 25, 128]);
    assert_eq!(dst.mode(), ColorMode::RgbaPremultiplied);
    assert_eq!(&dst.buffer()[..4], &[100, 50, 25, 128]);
    // the caller's source is untouched
    assert_eq!(&src.buffer()[..4], &[200, 100, 50, 128]);
}

#[test]
fn rgba_into_rgba_passes_straight_through() {
    let resizer = recording_resizer();
    let src = rgba_image(4, 4, [200, 100, 50, 128]);
    let mut dst = Image::new(2, 2, ColorMode::Rgba).unwrap();

    let report = resizer.resize(&src, &mut dst, Some(&lanczos())).unwrap();

    assert!(report.steps.is_empty());
    assert!(report.use_alpha);
    let call = single_call(&resizer);
    assert!(call.use_alpha);
    assert_eq!(call.src_first_pixel, vec![200, 100, 50, 128]);
    assert_eq!(dst.mode(), ColorMode::Rgba);
}

#[test]
fn rgb_into_premultiplied_only_relabels() {
    for algorithm in [
        ResizeAlg::Nearest,
        ResizeAlg::Convolution(FilterType::Bilinear),
        ResizeAlg::Interpolation(FilterType::CatmullRom),
        ResizeAlg::SuperSampling(FilterType::Box, 2),
    ] {
        let resizer = recording_resizer();
        let mut src = Image::new(4, 4, ColorMode::Rgb).unwrap();
        src.buffer_mut()[..3].copy_from_slice(&[9, 8, 7]);
        let mut dst = Image::new(4, 4, ColorMode::RgbaPremultiplied).unwrap();

        let options = ResizeOptions::new().resize_alg(algorithm);
        let report = resizer.resize(&src, &mut dst, Some(&options)).unwrap();

        assert!(!report.steps.intersects(NormalizeSteps::ALPHA_PASSES), "{algorithm:?}");
        assert!(report.steps.contains(NormalizeSteps::RELABEL_OUTPUT));
        assert!(!single_call(&resizer).use_alpha);
        assert_eq!(dst.mode(), ColorMode::RgbaPremultiplied);
        assert_eq!(&dst.buffer()[..4], &[9, 8, 7, 255]);
    }
}

#[test]
fn nearest_never_premultiplies_source() {
    let resizer = recording_resizer();
    let src = rgba_image(4, 4, [200, 100, 50, 128]);
    let mut dst = Image::new(2, 2, ColorMode::RgbaPremultiplied).unwrap();
    let pool = WorkerPool::new(Some(2)).unwrap();
    let options = ResizeOptions::new()
        .resize_alg(ResizeAlg::Nearest)
        .thread_pool(Some(pool));

    let report = resizer.resize(&src, &mut dst, Some(&options)).unwrap();

    assert!(!report.steps.contains(NormalizeSteps::PREMULTIPLY_SOURCE));
    let call = single_call(&resizer);
    assert_eq!(call.src_first_pixel, vec![200, 100, 50, 128]);
    assert!(call.use_alpha);
    assert!(!call.pooled);
    // output still ends up premultiplied
    assert!(report.steps.contains(NormalizeSteps::PREMULTIPLY_OUTPUT));
    assert_eq!(dst.mode(), ColorMode::RgbaPremultiplied);
    assert_eq!(&dst.buffer()[..4], &[100, 50, 25, 128]);
}

#[test]
fn premultiplied_into_rgba_divides_output() {
    let resizer = recording_resizer();
    let src = Image::from_vec(
        2,
        1,
        ColorMode::RgbaPremultiplied,
        vec![100, 50, 25, 128, 7, 7, 7, 0],
    )
    .unwrap();
    let mut dst = Image::new(2, 1, ColorMode::Rgba).unwrap();

    let report = resizer.resize(&src, &mut dst, Some(&lanczos())).unwrap();

    assert_eq!(
        report.steps & NormalizeSteps::ALPHA_PASSES,
        NormalizeSteps::DIVIDE_OUTPUT
    );
    assert!(!single_call(&resizer).use_alpha);
    assert_eq!(dst.mode(), ColorMode::Rgba);
    // zero alpha divides to black
    assert_eq!(dst.buffer(), &[199, 100, 50, 128, 0, 0, 0, 0]);
}

#[test]
fn alpha_modes_into_rgb_relabel() {
    for src_mode in [ColorMode::Rgba, ColorMode::RgbaPremultiplied] {
        let resizer = recording_resizer();
        let src = Image::from_vec(1, 1, src_mode, vec![1, 2, 3, 4]).unwrap();
        let mut dst = Image::new(1, 1, ColorMode::Rgb).unwrap();
        let report = resizer.resize(&src, &mut dst, Some(&lanczos())).unwrap();
        assert_eq!(report.steps, NormalizeSteps::RELABEL_OUTPUT);
        assert_eq!(dst.mode(), ColorMode::Rgb);
    }
}

#[test]
fn generic_modes_convert_into_destination() {
    let resizer = recording_resizer();
    let src = Image::from_vec(1, 1, ColorMode::Grayscale, vec![42]).unwrap();
    let mut dst = Image::new(1, 1, ColorMode::Rgba).unwrap();

    let report = resizer.resize(&src, &mut dst, Some(&lanczos())).unwrap();

    assert!(report.steps.contains(NormalizeSteps::GENERIC_CONVERSION));
    assert_eq!(report.normalized_mode, ColorMode::Rgba);
    assert!(single_call(&resizer).use_alpha);
    assert_eq!(dst.buffer(), &[42, 42, 42, 255]);
}

#[test]
fn pool_forwarded_for_blending_algorithms() {
    let resizer = recording_resizer();
    let pool = WorkerPool::new(Some(2)).unwrap();
    let src = rgba_image(4, 4, [1, 2, 3, 255]);
    let mut dst = Image::new(2, 2, ColorMode::Rgba).unwrap();
    let options = lanczos().thread_pool(Some(pool));
    resizer.resize(&src, &mut dst, Some(&options)).unwrap();
    assert!(single_call(&resizer).pooled);
}

#[test]
fn capability_reaches_backend() {
    let mut resizer = recording_resizer();
    let effective = resizer.set_cpu_capability(CpuCapability::None);
    assert_eq!(effective, CpuCapability::None);
    let src = rgba_image(2, 2, [0, 0, 0, 255]);
    let mut dst = Image::new(1, 1, ColorMode::Rgba).unwrap();
    let report = resizer.resize(&src, &mut dst, None).unwrap();
    assert_eq!(report.capability, CpuCapability::None);
    assert_eq!(single_call(&resizer).capability, CpuCapability::None);
}

#[test]
fn fit_into_destination_crops_source_view() {
    let resizer = recording_resizer();
    let mut src = Image::new(8, 2, ColorMode::Grayscale).unwrap();
    src.buffer_mut().copy_from_slice(&[0, 1, 2, 3, 4, 5, 6, 7, 10, 11, 12, 13, 14, 15, 16, 17]);
    let mut dst = Image::new(2, 2, ColorMode::Grayscale).unwrap();
    let options = ResizeOptions::new()
        .resize_alg(ResizeAlg::Nearest)
        .fit_into_destination(Some((1.0, 0.0)));

    let report = resizer.resize(&src, &mut dst, Some(&options)).unwrap();

    let expected = fit_crop_box((8, 2), (2, 2), Some((1.0, 0.0))).unwrap();
    assert_eq!(report.crop_box, Some(expected));
    assert_eq!(single_call(&resizer).crop, Some(expected));
    assert_eq!(dst.buffer(), &[6, 7, 16, 17]);
}

#[test]
fn unsupported_destination_is_shape_error() {
    let resizer = Resizer::with_parts(
        RecordingBackend::rejecting(PixelFormat::F32),
        StandardConverter,
    );
    let src = rgba_image(2, 2, [0, 0, 0, 255]);
    let mut dst = Image::new(1, 1, ColorMode::Float32Gray).unwrap();
    let err = resizer.resize(&src, &mut dst, None).unwrap_err();
    assert!(matches!(err, ResizerError::UnsupportedMode { .. }));
    assert!(err.is_recoverable());
    assert!(resizer.backend().calls.lock().is_empty());
}

#[test]
fn source_support_is_checked_after_normalization() {
    let resizer = Resizer::with_parts(
        RecordingBackend::rejecting(PixelFormat::F32),
        StandardConverter,
    );
    let src = Image::from_vec(1, 1, ColorMode::Float32Gray, 64.0f32.to_ne_bytes().to_vec()).unwrap();
    let mut dst = Image::new(1, 1, ColorMode::Rgba).unwrap();

    let report = resizer.resize(&src, &mut dst, Some(&lanczos())).unwrap();

    assert_eq!(report.normalized_mode, ColorMode::Rgba);
    assert_eq!(single_call(&resizer).format, PixelFormat::U8x4);
    assert_eq!(dst.buffer(), &[64, 64, 64, 255]);
}

#[test]
fn direct_super_sampling_variant_is_validated() {
    let resizer = recording_resizer();
    let src = rgba_image(4, 4, [1, 2, 3, 255]);
    let mut dst = Image::new(2, 2, ColorMode::Rgba).unwrap();
    let options = ResizeOptions::new().resize_alg(ResizeAlg::SuperSampling(FilterType::Box, 0));

    let err = resizer.resize(&src, &mut dst, Some(&options)).unwrap_err();
    assert!(matches!(err, ResizerError::InvalidArgument { .. }));
    assert!(resizer.backend().calls.lock().is_empty());

    let raw_src = [0u8; 16];
    let mut raw_dst = [0u8; 4];
    let err = resizer
        .resize_raw(PixelFormat::U8x4, (2, 2, &raw_src), (1, 1, &mut raw_dst), Some(&options))
        .unwrap_err();
    assert!(matches!(err, ResizerError::InvalidArgument { .. }));
}

#[test]
fn crop_box_scenario_values() {
    let crop = fit_crop_box((4928, 3279), (1024, 256), Some((0.5, 0.5))).unwrap();
    assert_eq!(crop.left, 0.0);
    assert_eq!(crop.width, 4928.0);
    assert_eq!(crop.height, 1232.0);
    assert_eq!(crop.top, 1023.5);
}
