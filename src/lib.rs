// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Image reconstruction from X-ray visibilities.

Visibilities (samples of the Fourier transform of the sky) are gridded with a
convolution kernel, transformed into a dirty image and dirty beam, and
deconvolved with Högbom CLEAN or the maximum-entropy method.
 */

pub mod args;
pub mod constants;
pub mod context;
pub mod deconvolve;
pub mod dirty;
mod error;
pub mod gridding;
pub mod image;
pub(crate) mod math;
pub mod params;
pub mod reconstruct;
pub mod transform;
pub mod vis;

// Re-exports.
pub use args::{ArgsError, ImagingArgs};
pub use context::{CancelToken, ImagingContext};
pub use deconvolve::{
    Deconvolution, DeconvolutionDiagnostics, Deconvolver, GaussianBeam, TerminationReason,
};
pub use dirty::{make_dirty, DirtyProducts};
pub use error::{ImagingError, NumericalWarning};
pub use image::{Image, ImagingGeometry};
pub use math::{resistant_mean, ResistantMean};
pub use params::{ConfigError, ImagingParams};
pub use reconstruct::{reconstruct, Diagnostics, Reconstruction};
pub use transform::TransformEngine;
pub use vis::{DataError, Visibility, VisibilityTable};

#[allow(non_camel_case_types)]
pub type c64 = num_complex::Complex64;
