// src/convert.rs
//
// Generic colorspace conversion between unrelated modes.
//
// Alpha-aware transitions (anything touching RGBa) are owned by the mode
// normalizer; converters only see straight-alpha and opaque modes.

use crate::error::{ResizerError, Result};
use crate::image::Image;
use crate::mode::ColorMode;

/// Conversion collaborator used by the normalizer for mode pairs that need real
/// colorspace math.
pub trait ColorConverter {
    fn convert(&self, image: &Image, target: ColorMode) -> Result<Image>;
}

/// Pillow-compatible conversions between RGB, RGBA, L, CMYK, I and F.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardConverter;

impl ColorConverter for StandardConverter {
    fn convert(&self, image: &Image, target: ColorMode) -> Result<Image> {
        let source = image.mode();
        if source == ColorMode::RgbaPremultiplied || target == ColorMode::RgbaPremultiplied {
            return Err(ResizerError::unsupported_mode_pair(source, target));
        }
        if source == target {
            return Ok(image.clone());
        }

        let src_size = source.pixel_format().size();
        let dst_size = target.pixel_format().size();
        let pixels = image.buffer().len() / src_size;
        let mut buffer = Vec::with_capacity(pixels * dst_size);

        if is_gray(source) && is_gray(target) {
            for px in image.buffer().chunks_exact(src_size) {
                encode_gray(target, decode_gray(source, px), &mut buffer);
            }
        } else {
            for px in image.buffer().chunks_exact(src_size) {
                encode_rgba(target, decode_rgba(source, px), &mut buffer);
            }
        }

        Image::from_vec(image.width(), image.height(), target, buffer)
    }
}

fn is_gray(mode: ColorMode) -> bool {
    matches!(
        mode,
        ColorMode::Grayscale | ColorMode::Int32Gray | ColorMode::Float32Gray
    )
}

#[inline]
fn mul_div255(a: u8, b: u8) -> u8 {
    ((u32::from(a) * u32::from(b) + 127) / 255) as u8
}

/// ITU-R 601-2 luma, integer form.
#[inline]
fn luma8(rgb: [u8; 4]) -> u8 {
    ((u32::from(rgb[0]) * 19595 + u32::from(rgb[1]) * 38470 + u32::from(rgb[2]) * 7471 + 0x8000)
        >> 16) as u8
}

#[inline]
fn luma_f32(rgb: [u8; 4]) -> f32 {
    f32::from(rgb[0]) * 0.299 + f32::from(rgb[1]) * 0.587 + f32::from(rgb[2]) * 0.114
}

#[inline]
fn read_i32(px: &[u8]) -> i32 {
    i32::from_ne_bytes([px[0], px[1], px[2], px[3]])
}

#[inline]
fn read_f32(px: &[u8]) -> f32 {
    f32::from_ne_bytes([px[0], px[1], px[2], px[3]])
}

fn decode_gray(mode: ColorMode, px: &[u8]) -> f64 {
    match mode {
        ColorMode::Int32Gray => f64::from(read_i32(px)),
        ColorMode::Float32Gray => f64::from(read_f32(px)),
        _ => f64::from(px[0]),
    }
}

fn encode_gray(mode: ColorMode, value: f64, out: &mut Vec<u8>) {
    match mode {
        ColorMode::Int32Gray => out.extend_from_slice(&(value.round() as i32).to_ne_bytes()),
        ColorMode::Float32Gray => out.extend_from_slice(&(value as f32).to_ne_bytes()),
        _ => out.push(value.clamp(0.0, 255.0).round() as u8),
    }
}

fn decode_rgba(mode: ColorMode, px: &[u8]) -> [u8; 4] {
    match mode {
        ColorMode::Rgb => [px[0], px[1], px[2], u8::MAX],
        ColorMode::Grayscale => [px[0], px[0], px[0], u8::MAX],
        ColorMode::Cmyk => {
            let nk = u8::MAX - px[3];
            [
                nk - mul_div255(px[0], nk),
                nk - mul_div255(px[1], nk),
                nk - mul_div255(px[2], nk),
                u8::MAX,
            ]
        }
        ColorMode::Int32Gray => {
            let v = read_i32(px).clamp(0, 255) as u8;
            [v, v, v, u8::MAX]
        }
        ColorMode::Float32Gray => {
            let v = read_f32(px).clamp(0.0, 255.0).round() as u8;
            [v, v, v, u8::MAX]
        }
        ColorMode::Rgba | ColorMode::RgbaPremultiplied => [px[0], px[1], px[2], px[3]],
    }
}

fn encode_rgba(mode: ColorMode, rgba: [u8; 4], out: &mut Vec<u8>) {
    match mode {
        ColorMode::Rgb => out.extend_from_slice(&[rgba[0], rgba[1], rgba[2], u8::MAX]),
        ColorMode::Rgba | ColorMode::RgbaPremultiplied => out.extend_from_slice(&rgba),
        ColorMode::Grayscale => out.push(luma8(rgba)),
        ColorMode::Cmyk => out.extend_from_slice(&[
            u8::MAX - rgba[0],
            u8::MAX - rgba[1],
            u8::MAX - rgba[2],
            0,
        ]),
        ColorMode::Int32Gray => out.extend_from_slice(&i32::from(luma8(rgba)).to_ne_bytes()),
        ColorMode::Float32Gray => out.extend_from_slice(&luma_f32(rgba).to_ne_bytes()),
    }
}
