// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Direct (i.e. un-gridded) Fourier transforms. These are slow, but exact;
//! they're used to simulate visibilities and as a reference for the gridded
//! pipeline.
//!
//! Pixel (r, c) is at x = (c - cols / 2) * pixel_scale + centre_x and
//! y = (r - rows / 2) * pixel_scale + centre_y. With a centre of (0, 0), the
//! reference pixel sits on the phase centre, as it does for the FFTs, so the
//! two agree exactly. Maps whose pixel centres are offset by half a pixel
//! can be described by moving the centre by half a pixel.

use ndarray::{Array1, Zip};
use rayon::prelude::*;

use crate::{
    c64,
    constants::TAU,
    image::{Image, ImagingGeometry},
    math::cexp,
    vis::VisibilityTable,
};

/// Evaluate V(u, v) = sum_{x,y} I(x, y) exp(-2 pi i (u x + v y)) at each
/// (u, v), with the image's reference pixel at the phase centre.
pub fn predict_visibilities(image: &Image, uvs: &[(f64, f64)]) -> Vec<c64> {
    predict_visibilities_with_centre(image, uvs, (0.0, 0.0))
}

/// [`predict_visibilities`] for an image whose reference pixel is at
/// `centre` (x, y) \[angle\] rather than the phase centre.
pub fn predict_visibilities_with_centre(
    image: &Image,
    uvs: &[(f64, f64)],
    centre: (f64, f64),
) -> Vec<c64> {
    let (xs, ys) = pixel_coords(&image.geometry(), centre);

    // Only non-zero pixels contribute; models are usually sparse.
    let pixels: Vec<(f64, f64, f64)> = image
        .data
        .indexed_iter()
        .filter(|(_, &flux)| flux != 0.0)
        .map(|((r, c), &flux)| (xs[c], ys[r], flux))
        .collect();

    uvs.par_iter()
        .map(|&(u, v)| {
            pixels
                .iter()
                .map(|&(x, y, flux)| cexp(-TAU * (u * x + v * y)) * flux)
                .sum()
        })
        .collect()
}

/// Evaluate I(x, y) = (1 / N) Re sum_k V_k exp(2 pi i (u_k x + v_k y)) on the
/// pixels of `geometry`, where the sum is over the N unflagged visibilities
/// of `table`.
pub fn back_project(table: &VisibilityTable, geometry: &ImagingGeometry) -> Image {
    back_project_with_centre(table, geometry, (0.0, 0.0))
}

/// [`back_project`] onto a map whose reference pixel is at `centre` (x, y)
/// \[angle\].
pub fn back_project_with_centre(
    table: &VisibilityTable,
    geometry: &ImagingGeometry,
    centre: (f64, f64),
) -> Image {
    let (xs, ys) = pixel_coords(geometry, centre);
    let vis: Vec<_> = table.unflagged().collect();
    let mut image = Image::zeros(geometry);
    if vis.is_empty() {
        return image;
    }
    let norm = vis.len() as f64;

    Zip::from(image.data.rows_mut())
        .and(&ys)
        .par_for_each(|mut row, &y| {
            for (pixel, &x) in row.iter_mut().zip(xs.iter()) {
                let sum: f64 = vis
                    .iter()
                    .map(|v| (v.vis * cexp(TAU * (v.u * x + v.v * y))).re)
                    .sum();
                *pixel = sum / norm;
            }
        });
    image
}

fn pixel_coords(geometry: &ImagingGeometry, centre: (f64, f64)) -> (Array1<f64>, Array1<f64>) {
    (geometry.x_coords() + centre.0, geometry.y_coords() + centre.1)
}
