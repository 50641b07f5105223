// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants and defaults.

All constants *must* be double precision. The defaults follow the usual
conventions of aperture-synthesis imaging (Högbom CLEAN, AIPS-style gridding
kernels) unless stated otherwise.
 */

pub use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// The default support radius of the Gaussian-tapered sinc and
/// prolate-spheroidal kernels \[grid cells\]. This makes a 6-cell-wide kernel.
pub const DEFAULT_KERNEL_SUPPORT: f64 = 3.0;

/// The default support radius of the pillbox kernel \[grid cells\].
pub const DEFAULT_PILLBOX_SUPPORT: f64 = 0.5;

/// The number of kernel table entries per grid cell.
pub const DEFAULT_KERNEL_OVERSAMPLE: usize = 128;

/// The width of the sinc in the Gaussian-tapered sinc kernel \[grid cells\].
/// Value from AIPS (Schwab 1984).
pub const DEFAULT_SINC_WIDTH: f64 = 1.55;

/// The width of the Gaussian in the Gaussian-tapered sinc kernel \[grid
/// cells\]. Value from AIPS (Schwab 1984).
pub const DEFAULT_GAUSS_WIDTH: f64 = 2.52;

/// Grid-correction values smaller than this (relative to the value at the
/// phase centre) are clamped, so that image edges aren't amplified without
/// bound.
pub const GRID_CORRECTION_FLOOR: f64 = 1e-3;

/// Imaginary residuals (relative to the real peak) larger than this are
/// reported as a warning after an inverse transform.
pub const IMAG_RESIDUAL_WARN_FRACTION: f64 = 1e-6;

/// The CLEAN loop gain.
pub const DEFAULT_LOOP_GAIN: f64 = 0.1;

/// The CLEAN threshold as a fraction of the initial dirty-image peak.
pub const DEFAULT_CLEAN_THRESHOLD_FRACTION: f64 = 0.01;

/// The CLEAN threshold in units of the dirty-image noise, when a noise-based
/// threshold is asked for without a value.
pub const DEFAULT_CLEAN_THRESHOLD_SIGMA: f64 = 5.0;

/// The maximum number of CLEAN iterations.
pub const DEFAULT_CLEAN_MAX_ITERATIONS: usize = 1000;

/// The maximum number of MEM iterations.
pub const DEFAULT_MEM_MAX_ITERATIONS: usize = 500;

/// The number of consecutive non-improving iterations before an iterative
/// algorithm is considered stalled.
pub const DEFAULT_STALL_WINDOW: usize = 20;

/// Dirty-beam pixels above this value (relative to the peak) are used when
/// fitting the restoring beam to the main lobe. Same as CASA.
pub const BEAM_FIT_THRESHOLD: f64 = 0.35;

/// Restoring-beam FWHM used when a fit to the dirty beam isn't possible
/// \[pixels\].
pub const FALLBACK_BEAM_FWHM_PX: f64 = 2.0;

/// Restoring-beam values are computed out to this many standard deviations.
pub const RESTORING_BEAM_CUTOFF_SIGMA: f64 = 5.0;

/// The sigma cut used by the resistant mean when estimating image noise.
pub const RESISTANT_MEAN_SIGMA_CUT: f64 = 3.0;

/// The target reduced chi-squared for MEM.
pub const DEFAULT_MEM_TARGET_CHI2: f64 = 1.0;

/// MEM is converged when the reduced chi-squared is within this fraction of
/// the target.
pub const DEFAULT_MEM_TOLERANCE: f64 = 0.05;

/// The weight of the entropy term in the MEM objective.
pub const DEFAULT_MEM_ENTROPY_WEIGHT: f64 = 1.0;

/// The largest change of log-brightness allowed in the first MEM step.
pub const DEFAULT_MEM_STEP_SIZE: f64 = 0.2;

/// The largest change of log-brightness allowed in any MEM step.
pub const MEM_MAX_STEP_SIZE: f64 = 1.0;

/// If MEM stalls with a reduced chi-squared larger than this factor times the
/// target, the target is considered unreachable.
pub const DEFAULT_MEM_UNREACHABLE_FACTOR: f64 = 10.0;

/// The factor by which the MEM Lagrange multiplier changes each iteration.
pub const MEM_LAMBDA_FACTOR: f64 = 1.5;

/// The relative chi-squared improvement below which a MEM iteration counts as
/// non-improving.
pub const MEM_MIN_RELATIVE_IMPROVEMENT: f64 = 1e-4;

/// FWHM to standard deviation: 2 sqrt(2 ln 2).
pub const FWHM_FACTOR: f64 = 2.354_820_045_030_949_3;
