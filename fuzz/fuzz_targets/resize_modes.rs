#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mode_resizer::{
    ColorMode, FilterType, Image, ResizeAlg, ResizeOptions, Resizer, ResizerError,
};

#[derive(Arbitrary, Debug)]
struct Input {
    src_mode: u8,
    dst_mode: u8,
    src_width: u8,
    src_height: u8,
    dst_width: u8,
    dst_height: u8,
    algorithm: u8,
    crop: Option<(f32, f32, f32, f32)>,
    fit: Option<(f32, f32)>,
    pixels: Vec<u8>,
}

fn mode(b: u8) -> ColorMode {
    ColorMode::ALL[b as usize % ColorMode::ALL.len()]
}

fn algorithm(b: u8) -> ResizeAlg {
    match b % 5 {
        0 => ResizeAlg::Nearest,
        1 => ResizeAlg::Convolution(FilterType::Lanczos3),
        2 => ResizeAlg::Convolution(FilterType::Box),
        3 => ResizeAlg::Interpolation(FilterType::Bilinear),
        _ => ResizeAlg::SuperSampling(FilterType::Mitchell, b.max(2)),
    }
}

fuzz_target!(|input: Input| {
    let src_mode = mode(input.src_mode);
    let dst_mode = mode(input.dst_mode);
    let (w, h) = (u32::from(input.src_width % 48) + 1, u32::from(input.src_height % 48) + 1);
    let Ok(len) = src_mode.pixel_format().buffer_len(w, h) else {
        return;
    };
    let mut buffer = input.pixels;
    buffer.resize(len, 0x5a);
    // float sources must stay finite for the converter
    if src_mode == ColorMode::Float32Gray {
        for px in buffer.chunks_exact_mut(4) {
            if !f32::from_ne_bytes([px[0], px[1], px[2], px[3]]).is_finite() {
                px.copy_from_slice(&0f32.to_ne_bytes());
            }
        }
    }
    let Ok(src) = Image::from_vec(w, h, src_mode, buffer) else {
        return;
    };
    let (dw, dh) = (u32::from(input.dst_width % 48) + 1, u32::from(input.dst_height % 48) + 1);
    let Ok(mut dst) = Image::new(dw, dh, dst_mode) else {
        return;
    };

    let mut options = ResizeOptions::new().resize_alg(algorithm(input.algorithm));
    let explicit_crop = input.fit.is_none() && input.crop.is_some();
    if let Some((cx, cy)) = input.fit {
        options = options.fit_into_destination(Some((f64::from(cx), f64::from(cy))));
    } else if let Some((l, t, cw, ch)) = input.crop {
        match options
            .clone()
            .crop(f64::from(l), f64::from(t), f64::from(cw), f64::from(ch))
        {
            Ok(cropped) => options = cropped,
            Err(_) => return,
        }
    }

    match Resizer::new().resize(&src, &mut dst, Some(&options)) {
        Ok(report) => {
            assert_eq!(dst.mode(), dst_mode);
            assert_eq!(report.dst_mode, dst_mode);
        }
        Err(ResizerError::InvalidCropBox { .. }) => {}
        // degenerate sub-pixel crops may be refused by the backend
        Err(ResizerError::BackendFailed { .. }) if explicit_crop => {}
        Err(e) => panic!("{src_mode} -> {dst_mode}: {e}"),
    }
    assert_eq!(src.mode(), src_mode);
});
