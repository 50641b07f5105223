// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fourier transforms between the (centred) grid and image planes.
//!
//! The zero-spacing cell of a grid and the phase centre of an image are both
//! at `(rows / 2, cols / 2)`. `to_grid` is not normalised, so the zero-spacing
//! cell of a transformed image is the image's total flux; `to_image` divides
//! by the number of pixels, so that the two are inverses.

mod dft;
#[cfg(test)]
mod tests;

pub use dft::{
    back_project, back_project_with_centre, predict_visibilities, predict_visibilities_with_centre,
};

use std::sync::Arc;

use ndarray::{prelude::*, Zip};
use rustfft::{Fft, FftPlanner};

use crate::{c64, image::ImagingGeometry, params::ConfigError};

/// FFT plans for one imaging geometry. Plans are made once and then shared
/// by every transform of a run.
pub struct TransformEngine {
    geometry: ImagingGeometry,

    /// Transforms along each row, i.e. of length `cols`.
    row_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,

    /// Transforms along each column, i.e. of length `rows`.
    col_forward: Arc<dyn Fft<f64>>,
    col_inverse: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for TransformEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformEngine")
            .field("geometry", &self.geometry)
            .finish()
    }
}

impl TransformEngine {
    pub fn new(geometry: ImagingGeometry) -> Result<TransformEngine, ConfigError> {
        geometry.validate()?;
        let mut planner = FftPlanner::new();
        Ok(TransformEngine {
            geometry,
            row_forward: planner.plan_fft_forward(geometry.cols),
            row_inverse: planner.plan_fft_inverse(geometry.cols),
            col_forward: planner.plan_fft_forward(geometry.rows),
            col_inverse: planner.plan_fft_inverse(geometry.rows),
        })
    }

    pub fn geometry(&self) -> &ImagingGeometry {
        &self.geometry
    }

    fn check_shape(&self, shape: (usize, usize)) -> Result<(), ConfigError> {
        if shape != self.geometry.shape() {
            return Err(ConfigError::ShapeMismatch {
                expected: self.geometry.shape(),
                got: shape,
            });
        }
        Ok(())
    }

    /// Transform an image to the Fourier plane.
    pub fn to_grid(&self, image: ArrayView2<f64>) -> Result<Array2<c64>, ConfigError> {
        self.check_shape(image.dim())?;
        let mut data = ifftshift(image.mapv(|v| c64::new(v, 0.0)).view());
        fft_lanes(&mut data, Axis(1), &self.row_forward);
        fft_lanes(&mut data, Axis(0), &self.col_forward);
        Ok(fftshift(data.view()))
    }

    /// Transform a grid to the image plane. The real part is returned, along
    /// with the largest absolute imaginary value relative to the largest
    /// absolute real value. A grid without Hermitian symmetry will have a
    /// non-negligible imaginary residual; this is not an error.
    pub fn to_image(&self, grid: ArrayView2<c64>) -> Result<(Array2<f64>, f64), ConfigError> {
        self.check_shape(grid.dim())?;
        let mut data = ifftshift(grid);
        fft_lanes(&mut data, Axis(1), &self.row_inverse);
        fft_lanes(&mut data, Axis(0), &self.col_inverse);
        let norm = self.geometry.num_pixels() as f64;
        let data = fftshift(data.view());

        let (max_re, max_im) = data.iter().fold((0.0_f64, 0.0_f64), |(re, im), v| {
            (re.max(v.re.abs()), im.max(v.im.abs()))
        });
        let imag_residual = if max_re > 0.0 {
            max_im / max_re
        } else if max_im > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
        Ok((data.mapv(|v| v.re / norm), imag_residual))
    }
}

/// Run a 1D FFT over every lane of `data` along `axis`, in parallel.
fn fft_lanes(data: &mut Array2<c64>, axis: Axis, fft: &Arc<dyn Fft<f64>>) {
    Zip::from(data.lanes_mut(axis)).par_for_each(|mut lane| match lane.as_slice_mut() {
        Some(slice) => fft.process(slice),
        None => {
            let mut buffer = lane.to_vec();
            fft.process(&mut buffer);
            lane.iter_mut()
                .zip(buffer)
                .for_each(|(out, v)| *out = v);
        }
    });
}

/// Circularly shift both axes of `data` forward by `shift`.
fn roll(data: ArrayView2<c64>, shift: (usize, usize)) -> Array2<c64> {
    let (rows, cols) = data.dim();
    let mut out = Array2::zeros((rows, cols));
    for ((r, c), &v) in data.indexed_iter() {
        out[((r + shift.0) % rows, (c + shift.1) % cols)] = v;
    }
    out
}

/// Move the zero-frequency cell from index 0 to `n / 2`.
pub(crate) fn fftshift(data: ArrayView2<c64>) -> Array2<c64> {
    let (rows, cols) = data.dim();
    roll(data, (rows / 2, cols / 2))
}

/// Move index `n / 2` to 0; the inverse of [`fftshift`].
pub(crate) fn ifftshift(data: ArrayView2<c64>) -> Array2<c64> {
    let (rows, cols) = data.dim();
    roll(data, (rows - rows / 2, cols - cols / 2))
}
