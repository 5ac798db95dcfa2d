// src/options.rs
//
// Resize options.
// Plain values: every builder method returns an updated copy, and snapshot()
// hands out an independent copy that still shares the caller's worker pool.

use crate::crop::CropBox;
use crate::error::{ResizerError, Result};
use crate::pool::WorkerPool;
use fast_image_resize as fir;
use std::str::FromStr;

/// Filter kernel for convolution, interpolation and super-sampling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterType {
    /// Each pixel contributes equally to the destination.
    Box,
    /// Triangle filter, linear interpolation.
    Bilinear,
    /// Cubic, `a = -0.5`.
    CatmullRom,
    /// Cubic, `B = 1/3`, `C = 1/3`.
    Mitchell,
    Gaussian,
    /// Windowed sinc, three lobes. Best quality, slowest.
    #[default]
    Lanczos3,
}

impl FilterType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Box => "box",
            Self::Bilinear => "bilinear",
            Self::CatmullRom => "catmull_rom",
            Self::Mitchell => "mitchell",
            Self::Gaussian => "gaussian",
            Self::Lanczos3 => "lanczos3",
        }
    }

    fn to_fir(self) -> fir::FilterType {
        match self {
            Self::Box => fir::FilterType::Box,
            Self::Bilinear => fir::FilterType::Bilinear,
            Self::CatmullRom => fir::FilterType::CatmullRom,
            Self::Mitchell => fir::FilterType::Mitchell,
            Self::Gaussian => fir::FilterType::Gaussian,
            Self::Lanczos3 => fir::FilterType::Lanczos3,
        }
    }
}

impl FromStr for FilterType {
    type Err = ResizerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "box" => Ok(Self::Box),
            "bilinear" => Ok(Self::Bilinear),
            "catmull_rom" | "catmullrom" => Ok(Self::CatmullRom),
            "mitchell" => Ok(Self::Mitchell),
            "gaussian" => Ok(Self::Gaussian),
            "lanczos3" => Ok(Self::Lanczos3),
            other => Err(ResizerError::invalid_argument(
                "filter_type",
                other.to_string(),
                "Expected box, bilinear, catmull_rom, mitchell, gaussian or lanczos3",
            )),
        }
    }
}

/// Resampling algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResizeAlg {
    Nearest,
    Convolution(FilterType),
    Interpolation(FilterType),
    /// Filter plus multiplicity in `[2, 255]`. Build it with [`ResizeAlg::super_sampling`].
    SuperSampling(FilterType, u8),
}

impl Default for ResizeAlg {
    fn default() -> Self {
        Self::Convolution(FilterType::Lanczos3)
    }
}

impl ResizeAlg {
    pub const MIN_MULTIPLICITY: u8 = 2;

    /// Super-sampling with a validated multiplicity.
    pub fn super_sampling(filter_type: FilterType, multiplicity: u8) -> Result<Self> {
        let algorithm = Self::SuperSampling(filter_type, multiplicity);
        algorithm.validate()?;
        Ok(algorithm)
    }

    /// Rejects a super-sampling multiplicity below 2. Checked again before
    /// every resize since the variant can be built directly.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::SuperSampling(_, multiplicity) if multiplicity < Self::MIN_MULTIPLICITY => {
                Err(ResizerError::invalid_argument(
                    "multiplicity",
                    multiplicity.to_string(),
                    "Multiplicity must be in range [2, 255]",
                ))
            }
            _ => Ok(()),
        }
    }

    pub fn is_nearest(&self) -> bool {
        matches!(self, Self::Nearest)
    }

    pub(crate) fn to_fir(self) -> fir::ResizeAlg {
        match self {
            Self::Nearest => fir::ResizeAlg::Nearest,
            Self::Convolution(filter) => fir::ResizeAlg::Convolution(filter.to_fir()),
            Self::Interpolation(filter) => fir::ResizeAlg::Interpolation(filter.to_fir()),
            Self::SuperSampling(filter, multiplicity) => {
                fir::ResizeAlg::SuperSampling(filter.to_fir(), multiplicity)
            }
        }
    }
}

/// Which part of the source image is resized.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Cropping {
    /// The whole source image.
    #[default]
    None,
    /// An explicit box in source pixel coordinates.
    Crop(CropBox),
    /// A box matching the destination aspect ratio, positioned by
    /// `(center_x, center_y)` in `[0, 1]`.
    FitIntoDestination((f64, f64)),
}

#[derive(Clone, Debug)]
pub struct ResizeOptions {
    algorithm: ResizeAlg,
    use_alpha: bool,
    cropping: Cropping,
    thread_pool: Option<WorkerPool>,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            algorithm: ResizeAlg::default(),
            use_alpha: true,
            cropping: Cropping::None,
            thread_pool: None,
        }
    }
}

impl ResizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resize_alg(mut self, algorithm: ResizeAlg) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Resize only the given part of the source image.
    pub fn crop(mut self, left: f64, top: f64, width: f64, height: f64) -> Result<Self> {
        self.cropping = Cropping::Crop(CropBox::new(left, top, width, height)?);
        Ok(self)
    }

    /// Crop the source to the destination aspect ratio. `None` centers the box.
    pub fn fit_into_destination(mut self, centering: Option<(f64, f64)>) -> Self {
        self.cropping = Cropping::FitIntoDestination(centering.unwrap_or((0.5, 0.5)));
        self
    }

    /// Only consulted by raw-buffer resizes; mode-aware resizes decide it
    /// from the color modes.
    pub fn use_alpha(mut self, use_alpha: bool) -> Self {
        self.use_alpha = use_alpha;
        self
    }

    pub fn thread_pool(mut self, pool: Option<WorkerPool>) -> Self {
        self.thread_pool = pool;
        self
    }

    pub fn algorithm(&self) -> ResizeAlg {
        self.algorithm
    }

    pub fn get_use_alpha(&self) -> bool {
        self.use_alpha
    }

    pub fn cropping(&self) -> Cropping {
        self.cropping
    }

    pub fn get_thread_pool(&self) -> Option<&WorkerPool> {
        self.thread_pool.as_ref()
    }

    /// Independent copy for handing to another resize call. Scalar fields are
    /// duplicated; the worker pool is shared.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }
}
