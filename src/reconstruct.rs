// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Visibilities in, deconvolved images out.

use log::info;
use serde::Serialize;

use crate::{
    args::display_warnings,
    context::{CancelToken, ImagingContext},
    deconvolve::{Deconvolution, DeconvolutionDiagnostics},
    dirty::{make_dirty, DirtyProducts},
    error::{ImagingError, NumericalWarning},
    gridding::GriddingDiagnostics,
    params::ImagingParams,
    vis::VisibilityTable,
};

/// Everything that was recorded about a run. This can be serialised, e.g. to
/// JSON, to be kept alongside the images.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub gridding: GriddingDiagnostics,

    /// The imaginary residual of the dirty image's inverse transform,
    /// relative to its real peak.
    pub imag_residual: f64,

    pub deconvolution: DeconvolutionDiagnostics,

    /// All warnings from the run, in the order they happened.
    pub warnings: Vec<NumericalWarning>,
}

impl Diagnostics {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// The products of a run.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    /// The dirty image and beam, along with the grids they came from.
    pub dirty: DirtyProducts,

    /// The model, residual and (for CLEAN) restored images.
    pub deconvolution: Deconvolution,

    pub diagnostics: Diagnostics,
}

/// Grid `table`, make a dirty image and beam, then deconvolve them with the
/// algorithm in `params`.
///
/// All parameters are checked before any data are looked at, and the data are
/// checked before anything is gridded. Cancelling `cancel` stops the
/// deconvolution after its current iteration; what was done so far is
/// returned.
pub fn reconstruct(
    table: &VisibilityTable,
    params: &ImagingParams,
    ctx: &ImagingContext,
    cancel: &CancelToken,
) -> Result<Reconstruction, ImagingError> {
    params.validate()?;

    let dirty = make_dirty(table, params, ctx)?;
    info!(
        "Gridded {} visibilities ({} flagged, {} outside the grid)",
        dirty.gridding.num_gridded, dirty.gridding.num_flagged, dirty.gridding.num_out_of_grid
    );

    let deconvolver = params.deconvolver.build();
    info!("Deconvolving with {}", deconvolver.algorithm());
    let deconvolution = deconvolver.deconvolve(&dirty, ctx, cancel)?;

    let mut warnings = dirty.warnings.clone();
    warnings.extend(deconvolution.diagnostics.warnings.iter().cloned());
    display_warnings(&warnings);

    let diagnostics = Diagnostics {
        gridding: dirty.gridding.clone(),
        imag_residual: dirty.imag_residual,
        deconvolution: deconvolution.diagnostics.clone(),
        warnings,
    };
    Ok(Reconstruction {
        dirty,
        deconvolution,
        diagnostics,
    })
}
