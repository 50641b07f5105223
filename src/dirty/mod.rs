// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Make a dirty image and dirty beam from visibilities.


use log::{debug, warn};
use ndarray::prelude::*;

use crate::{
    c64,
    constants::IMAG_RESIDUAL_WARN_FRACTION,
    context::ImagingContext,
    error::{ImagingError, NumericalWarning},
    gridding::{grid, grid_correction, grid_with_conjugates, GriddingDiagnostics},
    image::Image,
    params::{ConfigError, GridParams, ImageNormalisation, ImagingParams},
    vis::{DataError, VisibilityTable},
};

/// A dirty image, its beam, and everything needed to turn other grids into
/// images with the same units.
#[derive(Debug, Clone)]
pub struct DirtyProducts {
    pub dirty: Image,

    /// The dirty beam (point-spread function), with a peak of 1.
    pub beam: Image,

    /// The weight-normalised visibility grid.
    pub vis_grid: Array2<c64>,

    /// The weight-normalised sampling function.
    pub sampling_grid: Array2<c64>,

    /// The visibilities put into their nearest cells, unnormalised. Unlike
    /// `vis_grid`, each cell only holds data from visibilities nearest to it,
    /// so a model's transform can be compared with it cell by cell.
    pub cell_vis_grid: Array2<c64>,

    /// The total weight in each cell of `cell_vis_grid`.
    pub cell_weights: Array2<f64>,

    pub grid_params: GridParams,
    pub normalisation: ImageNormalisation,

    /// The image-plane correction for the gridding kernel. Images are divided
    /// by this.
    pub correction: Array2<f64>,

    pub gridding: GriddingDiagnostics,

    /// The imaginary residual of the dirty image's inverse transform.
    pub imag_residual: f64,

    pub warnings: Vec<NumericalWarning>,
}

impl DirtyProducts {
    /// Turn a grid (on the same cells as `vis_grid`) into an image with the
    /// same normalisation and kernel correction as the dirty image. The
    /// imaginary residual of the transform is also returned.
    pub fn image_from_grid(
        &self,
        grid: ArrayView2<c64>,
        ctx: &ImagingContext,
    ) -> Result<(Array2<f64>, f64), ConfigError> {
        let (mut image, imag_residual) = ctx.engine().to_image(grid)?;
        let scale = self
            .normalisation
            .scale(self.grid_params.geometry.num_pixels());
        image.zip_mut_with(&self.correction, |i, &c| *i *= scale / c);
        Ok((image, imag_residual))
    }

    /// Turn an unnormalised grid on the cells of `cell_vis_grid` into an
    /// image in the dirty image's units. No kernel correction is needed; for
    /// visibilities at cell centres, the image of `cell_vis_grid` is the
    /// dirty image.
    pub fn image_from_cells(
        &self,
        grid: ArrayView2<c64>,
        ctx: &ImagingContext,
    ) -> Result<Array2<f64>, ConfigError> {
        let (mut image, _) = ctx.engine().to_image(grid)?;
        let mut scale = self
            .normalisation
            .scale(self.grid_params.geometry.num_pixels());
        let total: f64 = self.cell_weights.sum();
        if total > 0.0 {
            scale /= total;
        }
        image *= scale;
        Ok(image)
    }
}

/// Grid `table`, and transform the grids into a dirty image and dirty beam.
///
/// The parameters and data are checked before anything is allocated.
pub fn make_dirty(
    table: &VisibilityTable,
    params: &ImagingParams,
    ctx: &ImagingContext,
) -> Result<DirtyProducts, ImagingError> {
    let grid_params = &params.grid;
    grid_params.validate()?;
    if ctx.geometry().shape() != grid_params.geometry.shape() {
        return Err(ConfigError::ShapeMismatch {
            expected: grid_params.geometry.shape(),
            got: ctx.geometry().shape(),
        }
        .into());
    }
    table.check_imageable()?;

    let mut gridded = if params.add_conjugates {
        grid_with_conjugates(table, grid_params)?
    } else {
        grid(table, grid_params)?
    };
    if gridded.diagnostics.empty {
        return Err(DataError::NoSamplesInGrid {
            num_out_of_grid: gridded.diagnostics.num_out_of_grid,
        }
        .into());
    }

    let mut warnings = vec![];
    if gridded.diagnostics.num_out_of_grid > 0 {
        let w = NumericalWarning::OutOfGridSamples {
            num: gridded.diagnostics.num_out_of_grid,
        };
        warn!("{w}");
        warnings.push(w);
    }
    gridded.normalise();
    if gridded.diagnostics.normalisation_skipped {
        let w = NumericalWarning::WeightNormalisationSkipped;
        warn!("{w}");
        warnings.push(w);
    }

    let mut products = DirtyProducts {
        dirty: Image::zeros(&grid_params.geometry),
        beam: Image::zeros(&grid_params.geometry),
        vis_grid: gridded.vis_grid,
        sampling_grid: gridded.sampling_grid,
        cell_vis_grid: gridded.cell_vis_grid,
        cell_weights: gridded.cell_weights,
        grid_params: *grid_params,
        normalisation: params.normalisation,
        correction: grid_correction(grid_params),
        gridding: gridded.diagnostics,
        imag_residual: 0.0,
        warnings,
    };

    let (dirty, imag_residual) = products.image_from_grid(products.vis_grid.view(), ctx)?;
    if imag_residual > IMAG_RESIDUAL_WARN_FRACTION {
        let w = NumericalWarning::ImaginaryResidual {
            fraction: imag_residual,
        };
        warn!("{w}");
        products.warnings.push(w);
    }

    let (mut beam, _) = ctx.engine().to_image(products.sampling_grid.view())?;
    beam /= &products.correction;
    let beam_max = beam.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if beam_max > 0.0 {
        beam /= beam_max;
    }

    products.dirty = Image::new(dirty, &grid_params.geometry);
    products.beam = Image::new(beam, &grid_params.geometry);
    products.imag_residual = imag_residual;
    debug!(
        "Made a {:?} dirty image; peak {:.6e}, imaginary residual {:.3e}",
        grid_params.geometry.shape(),
        products.dirty.peak().1,
        imag_residual
    );

    Ok(products)
}
