// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turn a dirty image into a model of the sky.
//!
//! Every algorithm implements [`Deconvolver`]; which one is used is decided
//! by [`DeconvolverParams`] when parameters are parsed.

mod clean;
mod mem;
mod restore;
#[cfg(test)]
mod tests;

pub use clean::Clean;
pub use mem::Mem;
pub use restore::{fit_restoring_beam, restore, GaussianBeam};

use serde::Serialize;
use strum_macros::Display;
use vec1::Vec1;

use crate::{
    context::{CancelToken, ImagingContext},
    dirty::DirtyProducts,
    error::{ImagingError, NumericalWarning},
    image::Image,
    params::{ConfigError, DeconvolverParams, DeconvolverType},
};

/// A deconvolution algorithm.
pub trait Deconvolver: Send + Sync {
    fn algorithm(&self) -> DeconvolverType;

    /// Deconvolve `dirty`. Iterations are sequential; `cancel` is checked
    /// between them, and if it's set, the state after the last complete
    /// iteration is returned.
    fn deconvolve(
        &self,
        dirty: &DirtyProducts,
        ctx: &ImagingContext,
        cancel: &CancelToken,
    ) -> Result<Deconvolution, ImagingError>;
}

impl DeconvolverParams {
    /// Make the deconvolver these parameters describe.
    pub fn build(&self) -> Box<dyn Deconvolver> {
        match self {
            DeconvolverParams::Clean(p) => Box::new(Clean::new(p.clone())),
            DeconvolverParams::Mem(p) => Box::new(Mem::new(p.clone())),
        }
    }
}

/// Why an iterative algorithm stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminationReason {
    /// The stopping criterion was met.
    Converged,

    /// The iteration limit was reached.
    MaxIterations,

    /// The metric got worse for too many consecutive iterations.
    Diverged,

    /// The metric stopped improving.
    Stalled,

    /// The metric stopped improving well away from its target.
    TargetUnreachable,

    /// The run was cancelled.
    Cancelled,
}

/// The state of a run after an iteration (iteration 0 is the initial state).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TraceEntry {
    pub iteration: usize,

    /// The largest absolute residual for CLEAN; the reduced chi-squared for
    /// MEM.
    pub metric: f64,

    /// The smallest model pixel.
    pub min_model: f64,
}

/// A delta function subtracted by CLEAN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CleanComponent {
    /// The iteration that found this component (starting at 1).
    pub iteration: usize,

    /// The (row, column) pixel.
    pub position: (usize, usize),

    pub amplitude: f64,
}

/// The final state of a MEM run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MemSummary {
    pub chi2: f64,
    pub entropy: f64,
    pub lambda: f64,

    /// The flat prior brightness per pixel.
    pub prior: f64,
}

/// Book-keeping from a deconvolution run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeconvolutionDiagnostics {
    pub algorithm: DeconvolverType,

    /// The number of completed iterations.
    pub iterations: usize,

    pub termination: TerminationReason,

    /// One entry for the initial state and one per completed iteration.
    pub trace: Vec1<TraceEntry>,

    /// The sum of the model image.
    pub model_flux: f64,

    /// The beam used to make the restored image, if one was made.
    pub restoring_beam: Option<GaussianBeam>,

    pub mem: Option<MemSummary>,

    pub warnings: Vec<NumericalWarning>,
}

/// The products of a deconvolution run.
#[derive(Debug, Clone)]
pub struct Deconvolution {
    pub model: Image,
    pub residual: Image,

    /// The model convolved with the restoring beam, plus the residual.
    pub restored: Option<Image>,

    /// Components in the order they were found. Empty for algorithms that
    /// don't work with components.
    pub components: Vec<CleanComponent>,

    pub diagnostics: DeconvolutionDiagnostics,
}

/// Check that the dirty image, dirty beam and context all agree on a shape.
fn check_shapes(dirty: &DirtyProducts, ctx: &ImagingContext) -> Result<(), ConfigError> {
    let expected = ctx.geometry().shape();
    for got in [dirty.dirty.shape(), dirty.beam.shape(), dirty.vis_grid.dim()] {
        if got != expected {
            return Err(ConfigError::ShapeMismatch { expected, got });
        }
    }
    Ok(())
}

/// The smallest value of an image, or 0 for an empty one.
fn min_value(data: &ndarray::Array2<f64>) -> f64 {
    data.iter().copied().reduce(f64::min).unwrap_or(0.0)
}
