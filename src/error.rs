// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all imaging-related errors, and the non-fatal warnings that
//! are collected in diagnostics.

use serde::Serialize;
use thiserror::Error;

use crate::{args::ArgsError, params::ConfigError, vis::DataError};

/// The error returned by the top-level imaging functions.
#[derive(Error, Debug)]
pub enum ImagingError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Args(#[from] ArgsError),
}

/// Something numerically suspicious that didn't stop a run. These are logged
/// with `warn!` when they happen and kept in the run's diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NumericalWarning {
    #[error("{num} visibilities fall outside the grid and were dropped")]
    OutOfGridSamples { num: usize },

    #[error("The inverse transform has an imaginary residual of {fraction:e} relative to the real peak")]
    ImaginaryResidual { fraction: f64 },

    #[error("The target reduced chi-squared ({target}) could not be reached; the final value is {chi2}")]
    Chi2TargetUnreachable { target: f64, chi2: f64 },

    #[error("Couldn't fit a restoring beam to the dirty beam; using a circular beam with a FWHM of {fwhm_px} pixels")]
    RestoringBeamFitFailed { fwhm_px: f64 },

    #[error("The total gridded weight is zero; the grids were not normalised")]
    WeightNormalisationSkipped,

    #[error("Couldn't estimate the dirty image noise; CLEANing to {fraction} of the peak instead")]
    NoiseEstimateFailed { fraction: f64 },
}
