// lib.rs
//
// mode-resizer: color-mode aware image resizing on top of fast_image_resize
//
// Design goals:
// - Correct color math: premultiply before blending, restore afterwards
// - Relabel instead of copying wherever the bytes already mean the right thing
// - Bit-identical alpha math at every CPU capability level
// - Caller-owned worker pools, shared and never torn down here

pub mod alpha;
pub mod convert;
pub mod cpu;
pub mod crop;
pub mod engine;
pub mod error;
pub mod image;
pub mod mode;
pub mod options;
pub mod pool;

pub use alpha::AlphaMulDiv;
pub use convert::{ColorConverter, StandardConverter};
pub use cpu::CpuCapability;
pub use crop::{fit_crop_box, CropBox};
pub use engine::{NormalizeSteps, ResizeBackend, ResizeReport, Resizer};
pub use error::{ErrorCategory, ResizerError, Result};
pub use crate::image::{Image, ImageView};
pub use mode::{ColorMode, PixelFormat};
pub use options::{Cropping, FilterType, ResizeAlg, ResizeOptions};
pub use pool::WorkerPool;
