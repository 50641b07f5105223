// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Validated imaging parameters.
//!
//! The code here "mirrors" the code within the `args` module; `args` is
//! unparsed, user-facing code, whereas parameters have been parsed and are
//! ready to be used directly. Parameters can also be constructed directly;
//! every struct has a `validate` method that the pipeline calls before doing
//! any work.

mod error;

pub use error::ConfigError;

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    constants::*,
    gridding::{Kernel, UvTaper, Weighting},
    image::ImagingGeometry,
};

/// Everything needed to go from a visibility table to a deconvolved image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagingParams {
    pub grid: GridParams,

    /// The units of the dirty image and everything derived from it.
    pub normalisation: ImageNormalisation,

    /// Append the Hermitian partner of every visibility before gridding, so
    /// that images are real.
    pub add_conjugates: bool,

    pub deconvolver: DeconvolverParams,

    /// Show progress bars while deconvolving.
    pub progress_bars: bool,
}

impl ImagingParams {
    /// Parameters with default settings for the given geometry.
    pub fn new(geometry: ImagingGeometry) -> ImagingParams {
        ImagingParams {
            grid: GridParams::new(geometry),
            normalisation: ImageNormalisation::default(),
            add_conjugates: true,
            deconvolver: DeconvolverParams::default(),
            progress_bars: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.deconvolver.validate()
    }
}

/// How visibilities are put onto a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridParams {
    pub geometry: ImagingGeometry,
    pub kernel: Kernel,

    /// The number of kernel table entries per grid cell.
    pub oversample: NonZeroUsize,

    pub weighting: Weighting,
    pub taper: UvTaper,
}

impl GridParams {
    /// Grid parameters with the default kernel, oversampling, weighting and
    /// taper.
    pub fn new(geometry: ImagingGeometry) -> GridParams {
        GridParams {
            geometry,
            kernel: Kernel::default(),
            oversample: NonZeroUsize::new(DEFAULT_KERNEL_OVERSAMPLE)
                .unwrap_or(NonZeroUsize::MIN),
            weighting: Weighting::default(),
            taper: UvTaper::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.geometry.validate()?;
        self.kernel
            .validate(self.geometry.rows, self.geometry.cols)?;
        self.taper.validate()
    }
}

/// The units of dirty and deconvolved images.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ImageNormalisation {
    /// Flux per beam: a point source of flux S at the phase centre has a
    /// dirty-image peak of S.
    #[default]
    #[strum(serialize = "beam")]
    Beam,

    /// The plain inverse transform of the weight-normalised grid, i.e. flux
    /// per beam divided by the number of pixels.
    #[strum(serialize = "transform")]
    Transform,
}

impl ImageNormalisation {
    /// The factor applied to the inverse transform of a weight-normalised
    /// grid with `num_pixels` pixels.
    pub fn scale(&self, num_pixels: usize) -> f64 {
        match self {
            ImageNormalisation::Beam => num_pixels as f64,
            ImageNormalisation::Transform => 1.0,
        }
    }
}

/// The names of the deconvolution algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeconvolverType {
    #[strum(serialize = "clean")]
    Clean,

    #[strum(serialize = "mem")]
    Mem,
}

/// The deconvolution algorithm and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "lowercase")]
pub enum DeconvolverParams {
    Clean(CleanParams),
    Mem(MemParams),
}

impl Default for DeconvolverParams {
    fn default() -> Self {
        DeconvolverParams::Clean(CleanParams::default())
    }
}

impl DeconvolverParams {
    pub fn deconvolver_type(&self) -> DeconvolverType {
        match self {
            DeconvolverParams::Clean(_) => DeconvolverType::Clean,
            DeconvolverParams::Mem(_) => DeconvolverType::Mem,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            DeconvolverParams::Clean(p) => p.validate(),
            DeconvolverParams::Mem(p) => p.validate(),
        }
    }
}

/// The names of the CLEAN threshold kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum ThresholdType {
    #[strum(serialize = "absolute")]
    Absolute,

    #[strum(serialize = "fraction")]
    FractionOfPeak,

    #[strum(serialize = "sigma")]
    NoiseSigma,
}

/// When CLEAN stops subtracting components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum CleanThreshold {
    /// Stop when the largest absolute residual is at or below this value
    /// (image units).
    Absolute(f64),

    /// Stop when the largest absolute residual is at or below this fraction of
    /// the initial dirty-image peak.
    FractionOfPeak(f64),

    /// Stop when the largest absolute residual is at or below this many times
    /// the noise of the dirty image, estimated with a resistant mean.
    NoiseSigma(f64),
}

impl Default for CleanThreshold {
    fn default() -> Self {
        CleanThreshold::FractionOfPeak(DEFAULT_CLEAN_THRESHOLD_FRACTION)
    }
}

impl CleanThreshold {
    pub fn from_type(threshold_type: ThresholdType, value: f64) -> CleanThreshold {
        match threshold_type {
            ThresholdType::Absolute => CleanThreshold::Absolute(value),
            ThresholdType::FractionOfPeak => CleanThreshold::FractionOfPeak(value),
            ThresholdType::NoiseSigma => CleanThreshold::NoiseSigma(value),
        }
    }

    pub fn value(&self) -> f64 {
        match *self {
            CleanThreshold::Absolute(v)
            | CleanThreshold::FractionOfPeak(v)
            | CleanThreshold::NoiseSigma(v) => v,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let v = self.value();
        if !(v.is_finite() && v > 0.0) {
            return Err(ConfigError::Threshold(v));
        }
        Ok(())
    }
}

/// The beam that CLEAN components are convolved with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RestoringBeamSpec {
    /// Fit an elliptical Gaussian to the main lobe of the dirty beam.
    #[default]
    Fit,

    /// Use this beam. FWHMs are in the units of the pixel scale; the position
    /// angle is in radians, anticlockwise from the x axis.
    Fixed { major: f64, minor: f64, pa: f64 },
}

impl RestoringBeamSpec {
    fn validate(&self) -> Result<(), ConfigError> {
        if let RestoringBeamSpec::Fixed { major, minor, pa } = *self {
            if !(major.is_finite() && minor.is_finite() && pa.is_finite())
                || minor <= 0.0
                || major < minor
            {
                return Err(ConfigError::RestoringBeam { major, minor });
            }
        }
        Ok(())
    }
}

/// Parameters for Högbom CLEAN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanParams {
    /// The fraction of the peak residual subtracted each iteration.
    pub gain: f64,
    pub threshold: CleanThreshold,
    pub max_iterations: usize,

    /// Stop if the largest absolute residual doesn't decrease for this many
    /// consecutive iterations.
    pub stall_window: usize,

    pub restoring_beam: RestoringBeamSpec,
}

impl Default for CleanParams {
    fn default() -> Self {
        CleanParams {
            gain: DEFAULT_LOOP_GAIN,
            threshold: CleanThreshold::default(),
            max_iterations: DEFAULT_CLEAN_MAX_ITERATIONS,
            stall_window: DEFAULT_STALL_WINDOW,
            restoring_beam: RestoringBeamSpec::default(),
        }
    }
}

impl CleanParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.gain > 0.0 && self.gain <= 1.0) {
            return Err(ConfigError::LoopGain(self.gain));
        }
        self.threshold.validate()?;
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if self.stall_window == 0 {
            return Err(ConfigError::ZeroStallWindow);
        }
        self.restoring_beam.validate()
    }
}

/// Parameters for the maximum-entropy method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemParams {
    /// The reduced chi-squared to aim for.
    pub target_chi2: f64,

    /// Converged when |chi2 - target| <= tolerance * target.
    pub tolerance: f64,

    /// The weight of the entropy term in the objective.
    pub entropy_weight: f64,

    /// The largest change of log-brightness allowed in the first step.
    pub step_size: f64,

    pub max_iterations: usize,

    /// Stop if the best chi-squared hasn't improved for this many iterations.
    pub stall_window: usize,

    /// A stall with chi-squared above this many times the target means the
    /// target is unreachable.
    pub unreachable_factor: f64,
}

impl Default for MemParams {
    fn default() -> Self {
        MemParams {
            target_chi2: DEFAULT_MEM_TARGET_CHI2,
            tolerance: DEFAULT_MEM_TOLERANCE,
            entropy_weight: DEFAULT_MEM_ENTROPY_WEIGHT,
            step_size: DEFAULT_MEM_STEP_SIZE,
            max_iterations: DEFAULT_MEM_MAX_ITERATIONS,
            stall_window: DEFAULT_STALL_WINDOW,
            unreachable_factor: DEFAULT_MEM_UNREACHABLE_FACTOR,
        }
    }
}

impl MemParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.target_chi2.is_finite() && self.target_chi2 > 0.0) {
            return Err(ConfigError::TargetChi2(self.target_chi2));
        }
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(ConfigError::Tolerance(self.tolerance));
        }
        if !(self.entropy_weight.is_finite() && self.entropy_weight > 0.0) {
            return Err(ConfigError::EntropyWeight(self.entropy_weight));
        }
        if !(self.step_size > 0.0 && self.step_size <= MEM_MAX_STEP_SIZE) {
            return Err(ConfigError::StepSize(self.step_size));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if self.stall_window == 0 {
            return Err(ConfigError::ZeroStallWindow);
        }
        if !(self.unreachable_factor.is_finite() && self.unreachable_factor >= 1.0) {
            return Err(ConfigError::UnreachableFactor(self.unreachable_factor));
        }
        Ok(())
    }
}
