// src/alpha.rs
//
// Alpha premultiplication and its inverse.
//
// Rounding is round-half-up in exact integer arithmetic:
//   multiply: (v * a + max / 2) / max         (max is odd, so there are no ties)
//   divide:   min(max, (2 * v * max + a) / (2 * a)),  a == 0 -> 0
//
// Every kernel variant must match the scalar reference bit for bit. The table
// kernel is derived from the scalar functions, so it cannot drift.

use crate::cpu::CpuCapability;
use crate::error::{ResizerError, Result};
use crate::image::Image;
use crate::mode::{ColorMode, PixelFormat};
use crate::pool::WorkerPool;
use once_cell::sync::Lazy;
use rayon::prelude::*;

/// Pixels handed to one rayon task.
const CHUNK_PIXELS: usize = 4096;

/// `MUL_TABLE[alpha][value]`
static MUL_TABLE: Lazy<Vec<[u8; 256]>> = Lazy::new(|| build_table(mul_u8));
/// `DIV_TABLE[alpha][value]`
static DIV_TABLE: Lazy<Vec<[u8; 256]>> = Lazy::new(|| build_table(div_u8));

fn build_table(op: fn(u8, u8) -> u8) -> Vec<[u8; 256]> {
    (0..=u8::MAX)
        .map(|alpha| {
            let mut row = [0u8; 256];
            for (value, slot) in (0..=u8::MAX).zip(row.iter_mut()) {
                *slot = op(value, alpha);
            }
            row
        })
        .collect()
}

#[inline]
fn mul_u8(value: u8, alpha: u8) -> u8 {
    ((u32::from(value) * u32::from(alpha) + 127) / 255) as u8
}

#[inline]
fn div_u8(value: u8, alpha: u8) -> u8 {
    if alpha == 0 {
        return 0;
    }
    let alpha = u32::from(alpha);
    ((u32::from(value) * 255 * 2 + alpha) / (alpha * 2)).min(255) as u8
}

#[inline]
fn mul_u16(value: u16, alpha: u16) -> u16 {
    ((u64::from(value) * u64::from(alpha) + 32767) / 65535) as u16
}

#[inline]
fn div_u16(value: u16, alpha: u16) -> u16 {
    if alpha == 0 {
        return 0;
    }
    let alpha = u64::from(alpha);
    ((u64::from(value) * 65535 * 2 + alpha) / (alpha * 2)).min(65535) as u16
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AlphaOp {
    Multiply,
    Divide,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kernel {
    Scalar,
    Table,
}

impl Kernel {
    /// 16-bit data has no table variant and runs the scalar kernel at every level.
    fn select(capability: CpuCapability, format: PixelFormat) -> Self {
        match format {
            PixelFormat::U8x2 | PixelFormat::U8x4 if capability.is_simd() => Kernel::Table,
            _ => Kernel::Scalar,
        }
    }
}

/// Channel layout of a format the codec accepts.
#[derive(Clone, Copy, Debug)]
struct AlphaLayout {
    wide: bool,
    channels: usize,
    pixel_size: usize,
}

impl AlphaLayout {
    fn of(format: PixelFormat) -> Result<Self> {
        let wide = match format {
            PixelFormat::U8x2 | PixelFormat::U8x4 => false,
            PixelFormat::U16x2 | PixelFormat::U16x4 => true,
            other => {
                return Err(ResizerError::invalid_argument(
                    "pixel_format",
                    format!("{other:?}"),
                    "Alpha multiplication supports U8x2, U8x4, U16x2 and U16x4",
                ))
            }
        };
        Ok(Self {
            wide,
            channels: format.channels(),
            pixel_size: format.size(),
        })
    }
}

/// Destination of a codec pass: a separate buffer, or the source itself.
enum Target<'a> {
    Fresh { src: &'a [u8], dst: &'a mut [u8] },
    Aliased(&'a mut [u8]),
}

#[inline]
fn map_pixel(kernel: Kernel, op: AlphaOp, layout: AlphaLayout, src: &[u8], dst: &mut [u8]) {
    let color_channels = layout.channels - 1;
    if layout.wide {
        let alpha_at = color_channels * 2;
        let alpha = u16::from_ne_bytes([src[alpha_at], src[alpha_at + 1]]);
        for c in 0..color_channels {
            let value = u16::from_ne_bytes([src[c * 2], src[c * 2 + 1]]);
            let out = match op {
                AlphaOp::Multiply => mul_u16(value, alpha),
                AlphaOp::Divide => div_u16(value, alpha),
            };
            dst[c * 2..c * 2 + 2].copy_from_slice(&out.to_ne_bytes());
        }
        dst[alpha_at..alpha_at + 2].copy_from_slice(&alpha.to_ne_bytes());
        return;
    }

    let alpha = src[color_channels];
    match (kernel, op) {
        (Kernel::Scalar, AlphaOp::Multiply) => {
            for c in 0..color_channels {
                dst[c] = mul_u8(src[c], alpha);
            }
        }
        (Kernel::Scalar, AlphaOp::Divide) => {
            for c in 0..color_channels {
                dst[c] = div_u8(src[c], alpha);
            }
        }
        (Kernel::Table, AlphaOp::Multiply) => {
            let row = &MUL_TABLE[alpha as usize];
            for c in 0..color_channels {
                dst[c] = row[src[c] as usize];
            }
        }
        (Kernel::Table, AlphaOp::Divide) => {
            let row = &DIV_TABLE[alpha as usize];
            for c in 0..color_channels {
                dst[c] = row[src[c] as usize];
            }
        }
    }
    dst[color_channels] = alpha;
}

fn map_chunk_fresh(kernel: Kernel, op: AlphaOp, layout: AlphaLayout, src: &[u8], dst: &mut [u8]) {
    for (s, d) in src
        .chunks_exact(layout.pixel_size)
        .zip(dst.chunks_exact_mut(layout.pixel_size))
    {
        map_pixel(kernel, op, layout, s, d);
    }
}

fn map_chunk_aliased(kernel: Kernel, op: AlphaOp, layout: AlphaLayout, buffer: &mut [u8]) {
    let mut pixel = [0u8; 8];
    for d in buffer.chunks_exact_mut(layout.pixel_size) {
        let pixel = &mut pixel[..layout.pixel_size];
        pixel.copy_from_slice(d);
        map_pixel(kernel, op, layout, pixel, d);
    }
}

/// Multiplies and divides color channels by alpha.
///
/// Output is identical for every capability level and with or without a
/// worker pool.
#[derive(Clone, Debug)]
pub struct AlphaMulDiv {
    cpu_capability: CpuCapability,
}

impl Default for AlphaMulDiv {
    fn default() -> Self {
        Self::new()
    }
}

impl AlphaMulDiv {
    /// Codec running at the strongest level the CPU supports.
    pub fn new() -> Self {
        Self {
            cpu_capability: CpuCapability::detect_best_supported(),
        }
    }

    pub fn cpu_capability(&self) -> CpuCapability {
        self.cpu_capability
    }

    /// Select a capability level; unsupported levels are clamped.
    /// Returns the effective level.
    pub fn set_cpu_capability(&mut self, capability: CpuCapability) -> CpuCapability {
        self.cpu_capability = capability.clamp_to_supported();
        self.cpu_capability
    }

    /// Premultiply an `RGBA` image into a new `RGBa` image.
    ///
    /// An `RGBa` source is returned as an untouched copy.
    pub fn multiply_alpha(&self, src: &Image, pool: Option<&WorkerPool>) -> Result<Image> {
        self.image_copy(AlphaOp::Multiply, src, pool)
    }

    /// Premultiply an `RGBA` image in place and tag it `RGBa`.
    ///
    /// An `RGBa` image is left as is.
    pub fn multiply_alpha_inplace(&self, image: &mut Image, pool: Option<&WorkerPool>) -> Result<()> {
        self.image_inplace(AlphaOp::Multiply, image, pool)
    }

    /// Un-premultiply an `RGBa` image into a new `RGBA` image.
    ///
    /// An `RGBA` source is returned as an untouched copy.
    pub fn divide_alpha(&self, src: &Image, pool: Option<&WorkerPool>) -> Result<Image> {
        self.image_copy(AlphaOp::Divide, src, pool)
    }

    /// Un-premultiply an `RGBa` image in place and tag it `RGBA`.
    ///
    /// An `RGBA` image is left as is.
    pub fn divide_alpha_inplace(&self, image: &mut Image, pool: Option<&WorkerPool>) -> Result<()> {
        self.image_inplace(AlphaOp::Divide, image, pool)
    }

    /// Premultiply raw pixels of `format` from `src` into `dst`.
    pub fn multiply_alpha_pixels(
        &self,
        format: PixelFormat,
        src: &[u8],
        dst: &mut [u8],
        pool: Option<&WorkerPool>,
    ) -> Result<()> {
        self.process(AlphaOp::Multiply, format, Target::Fresh { src, dst }, pool)
    }

    pub fn multiply_alpha_pixels_inplace(
        &self,
        format: PixelFormat,
        buffer: &mut [u8],
        pool: Option<&WorkerPool>,
    ) -> Result<()> {
        self.process(AlphaOp::Multiply, format, Target::Aliased(buffer), pool)
    }

    /// Un-premultiply raw pixels of `format` from `src` into `dst`.
    pub fn divide_alpha_pixels(
        &self,
        format: PixelFormat,
        src: &[u8],
        dst: &mut [u8],
        pool: Option<&WorkerPool>,
    ) -> Result<()> {
        self.process(AlphaOp::Divide, format, Target::Fresh { src, dst }, pool)
    }

    pub fn divide_alpha_pixels_inplace(
        &self,
        format: PixelFormat,
        buffer: &mut [u8],
        pool: Option<&WorkerPool>,
    ) -> Result<()> {
        self.process(AlphaOp::Divide, format, Target::Aliased(buffer), pool)
    }

    /// (accepted source mode, result mode)
    fn modes(op: AlphaOp) -> (ColorMode, ColorMode) {
        match op {
            AlphaOp::Multiply => (ColorMode::Rgba, ColorMode::RgbaPremultiplied),
            AlphaOp::Divide => (ColorMode::RgbaPremultiplied, ColorMode::Rgba),
        }
    }

    fn image_copy(&self, op: AlphaOp, src: &Image, pool: Option<&WorkerPool>) -> Result<Image> {
        let (from, to) = Self::modes(op);
        if src.mode() == to {
            return Ok(src.clone());
        }
        if src.mode() != from {
            return Err(ResizerError::mode_mismatch(from.as_str(), src.mode()));
        }
        let mut dst = Image::new(src.width(), src.height(), to)?;
        self.process(
            op,
            PixelFormat::U8x4,
            Target::Fresh {
                src: src.buffer(),
                dst: dst.buffer_mut(),
            },
            pool,
        )?;
        Ok(dst)
    }

    fn image_inplace(&self, op: AlphaOp, image: &mut Image, pool: Option<&WorkerPool>) -> Result<()> {
        let (from, to) = Self::modes(op);
        if image.mode() == to {
            return Ok(());
        }
        if image.mode() != from {
            return Err(ResizerError::mode_mismatch(from.as_str(), image.mode()));
        }
        self.process(op, PixelFormat::U8x4, Target::Aliased(image.buffer_mut()), pool)?;
        image.set_mode_tag(to)
    }

    /// Shared core of all entry points.
    fn process(
        &self,
        op: AlphaOp,
        format: PixelFormat,
        target: Target<'_>,
        pool: Option<&WorkerPool>,
    ) -> Result<()> {
        let layout = AlphaLayout::of(format)?;
        let kernel = Kernel::select(self.cpu_capability, format);
        let chunk_len = CHUNK_PIXELS * layout.pixel_size;

        match target {
            Target::Fresh { src, dst } => {
                if src.len() % layout.pixel_size != 0 {
                    return Err(ResizerError::buffer_too_small(
                        src.len().next_multiple_of(layout.pixel_size),
                        src.len(),
                    ));
                }
                if dst.len() < src.len() {
                    return Err(ResizerError::buffer_too_small(src.len(), dst.len()));
                }
                let dst = &mut dst[..src.len()];
                match pool {
                    Some(pool) => pool.install(|| {
                        src.par_chunks(chunk_len)
                            .zip(dst.par_chunks_mut(chunk_len))
                            .for_each(|(s, d)| map_chunk_fresh(kernel, op, layout, s, d))
                    }),
                    None => map_chunk_fresh(kernel, op, layout, src, dst),
                }
            }
            Target::Aliased(buffer) => {
                if buffer.len() % layout.pixel_size != 0 {
                    return Err(ResizerError::buffer_too_small(
                        buffer.len().next_multiple_of(layout.pixel_size),
                        buffer.len(),
                    ));
                }
                match pool {
                    Some(pool) => pool.install(|| {
                        buffer
                            .par_chunks_mut(chunk_len)
                            .for_each(|d| map_chunk_aliased(kernel, op, layout, d))
                    }),
                    None => map_chunk_aliased(kernel, op, layout, buffer),
                }
            }
        }
        Ok(())
    }
}
