// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Problems with imaging parameters. These are raised before any data are
/// touched.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("The grid shape ({rows}, {cols}) is invalid; each dimension must be at least 2 and a product of only 2s, 3s and 5s")]
    GridShape { rows: usize, cols: usize },

    #[error("The pixel scale ({0}) must be a positive, finite number")]
    PixelScale(f64),

    #[error("The kernel support radius ({support}) must be positive and no more than half the smallest grid dimension ({max})")]
    KernelSupport { support: f64, max: f64 },

    #[error("The kernel width ({0}) must be a positive, finite number")]
    KernelWidth(f64),

    #[error("The kernel oversampling factor must be at least 1")]
    Oversample,

    #[error("The uv taper FWHM ({0}) must be a positive, finite number")]
    TaperFwhm(f64),

    #[error("The loop gain ({0}) must be greater than 0 and no more than 1")]
    LoopGain(f64),

    #[error("The threshold ({0}) must be a positive, finite number")]
    Threshold(f64),

    #[error("The maximum number of iterations must be at least 1")]
    ZeroIterations,

    #[error("The stall window must be at least 1 iteration")]
    ZeroStallWindow,

    #[error("The target reduced chi-squared ({0}) must be a positive, finite number")]
    TargetChi2(f64),

    #[error("The chi-squared tolerance ({0}) must be greater than 0 and less than 1")]
    Tolerance(f64),

    #[error("The entropy weight ({0}) must be a positive, finite number")]
    EntropyWeight(f64),

    #[error("The step size ({0}) must be greater than 0 and no more than 1")]
    StepSize(f64),

    #[error("The unreachable factor ({0}) must be at least 1")]
    UnreachableFactor(f64),

    #[error("The restoring beam FWHMs (major {major}, minor {minor}) must be positive, with the major axis at least as large as the minor axis")]
    RestoringBeam { major: f64, minor: f64 },

    #[error("Array shape {got:?} doesn't match the expected shape {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
}
