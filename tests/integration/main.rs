// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod arg_files;
mod point_sources;

use ndarray::prelude::*;

use xray_imager::{
    transform::predict_visibilities, Image, ImagingGeometry, VisibilityTable,
};

/// Sources as ((row, col), flux).
type Sky = [((usize, usize), f64)];

/// Visibilities of `sky` on every grid cell within `radius` cells of the
/// origin (both signs), each with weight `weight`.
fn observe(geometry: &ImagingGeometry, sky: &Sky, radius: i32, weight: f64) -> VisibilityTable {
    let mut data = Array2::zeros(geometry.shape());
    for &(pos, flux) in sky {
        data[pos] += flux;
    }
    let image = Image::new(data, geometry);

    let du = geometry.cell_size_u();
    let dv = geometry.cell_size_v();
    let uvs: Vec<(f64, f64)> = (-radius..=radius)
        .flat_map(|i| (-radius..=radius).map(move |j| (i as f64 * du, j as f64 * dv)))
        .collect();
    let vis = predict_visibilities(&image, &uvs);
    VisibilityTable::from_tuples(
        uvs.iter()
            .zip(vis)
            .map(|(&(u, v), vis)| (u, v, vis.re, vis.im, weight)),
    )
    .unwrap()
}
