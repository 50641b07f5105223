// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Image-plane arrays and the geometry shared between images and grids.
//!
//! Rows of an image run along y and columns along x; rows of a grid run along
//! v and columns along u. The phase centre of an image (and the zero-spacing
//! cell of a grid) is at `(rows / 2, cols / 2)`.

use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{math::is_fft_friendly, params::ConfigError};

/// The pixel count and pixel scale of an image, which also fix the Fourier
/// cell size of the corresponding grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImagingGeometry {
    pub rows: usize,
    pub cols: usize,

    /// The angular size of a pixel \[angle / pixel\]. Visibility coordinates
    /// must be in the inverse of this angle unit.
    pub pixel_scale: f64,
}

impl ImagingGeometry {
    pub fn new(
        rows: usize,
        cols: usize,
        pixel_scale: f64,
    ) -> Result<ImagingGeometry, ConfigError> {
        let g = ImagingGeometry {
            rows,
            cols,
            pixel_scale,
        };
        g.validate()?;
        Ok(g)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ImagingGeometry {
            rows,
            cols,
            pixel_scale,
        } = *self;
        if rows < 2 || cols < 2 || !is_fft_friendly(rows) || !is_fft_friendly(cols) {
            return Err(ConfigError::GridShape { rows, cols });
        }
        if !(pixel_scale.is_finite() && pixel_scale > 0.0) {
            return Err(ConfigError::PixelScale(pixel_scale));
        }
        Ok(())
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn num_pixels(&self) -> usize {
        self.rows * self.cols
    }

    /// The pixel of the phase centre; also the zero-spacing cell of a grid.
    pub fn reference_pixel(&self) -> (usize, usize) {
        (self.rows / 2, self.cols / 2)
    }

    /// The width of a grid cell along u \[inverse angle\].
    pub fn cell_size_u(&self) -> f64 {
        1.0 / (self.cols as f64 * self.pixel_scale)
    }

    /// The width of a grid cell along v \[inverse angle\].
    pub fn cell_size_v(&self) -> f64 {
        1.0 / (self.rows as f64 * self.pixel_scale)
    }

    /// The largest spatial frequency the pixel scale can represent.
    pub fn nyquist_uv(&self) -> f64 {
        0.5 / self.pixel_scale
    }

    /// The x coordinate of each image column \[angle\].
    pub fn x_coords(&self) -> Array1<f64> {
        let c0 = (self.cols / 2) as f64;
        Array1::from_shape_fn(self.cols, |c| (c as f64 - c0) * self.pixel_scale)
    }

    /// The y coordinate of each image row \[angle\].
    pub fn y_coords(&self) -> Array1<f64> {
        let r0 = (self.rows / 2) as f64;
        Array1::from_shape_fn(self.rows, |r| (r as f64 - r0) * self.pixel_scale)
    }

    /// The u coordinate of each grid column \[inverse angle\].
    pub fn u_coords(&self) -> Array1<f64> {
        let c0 = (self.cols / 2) as f64;
        let du = self.cell_size_u();
        Array1::from_shape_fn(self.cols, |c| (c as f64 - c0) * du)
    }

    /// The v coordinate of each grid row \[inverse angle\].
    pub fn v_coords(&self) -> Array1<f64> {
        let r0 = (self.rows / 2) as f64;
        let dv = self.cell_size_v();
        Array1::from_shape_fn(self.rows, |r| (r as f64 - r0) * dv)
    }
}

/// A real-valued image with its pixel scale and phase-centre pixel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    pub data: Array2<f64>,
    pub pixel_scale: f64,
    pub reference_pixel: (usize, usize),
}

impl Image {
    /// Wrap an array with the metadata of `geometry`. The array's shape must
    /// match the geometry.
    pub fn new(data: Array2<f64>, geometry: &ImagingGeometry) -> Image {
        debug_assert_eq!(data.dim(), geometry.shape());
        Image {
            data,
            pixel_scale: geometry.pixel_scale,
            reference_pixel: geometry.reference_pixel(),
        }
    }

    pub fn zeros(geometry: &ImagingGeometry) -> Image {
        Image::new(Array2::zeros(geometry.shape()), geometry)
    }

    pub fn geometry(&self) -> ImagingGeometry {
        let (rows, cols) = self.data.dim();
        ImagingGeometry {
            rows,
            cols,
            pixel_scale: self.pixel_scale,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// The sum of all pixel values.
    pub fn total_flux(&self) -> f64 {
        self.data.sum()
    }

    /// The pixel with the largest absolute value and that value (with its
    /// sign). Ties go to the lowest row-major index.
    pub fn peak(&self) -> ((usize, usize), f64) {
        peak_abs(self.data.view())
    }

    /// The largest absolute pixel value.
    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0, |acc, v| acc.max(v.abs()))
    }
}

/// The position of the largest absolute value in `data`, and that value.
/// Ties go to the lowest row-major index.
pub(crate) fn peak_abs(data: ArrayView2<f64>) -> ((usize, usize), f64) {
    let mut best = ((0, 0), 0.0);
    let mut best_abs = f64::NEG_INFINITY;
    for (pos, &v) in data.indexed_iter() {
        if v.abs() > best_abs {
            best_abs = v.abs();
            best = (pos, v);
        }
    }
    best
}
