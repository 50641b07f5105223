// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;
use crate::{constants::TAU, image::Image, vis::VisibilityTable};

fn engine(rows: usize, cols: usize) -> TransformEngine {
    TransformEngine::new(ImagingGeometry::new(rows, cols, 0.5).unwrap()).unwrap()
}

#[test]
fn test_shifts_are_inverses() {
    for (rows, cols) in [(4, 4), (5, 6), (9, 10)] {
        let data = Array2::from_shape_fn((rows, cols), |(r, c)| c64::new(r as f64, c as f64));
        let shifted = fftshift(data.view());
        assert_eq!(shifted[(rows / 2, cols / 2)], data[(0, 0)]);
        assert_eq!(ifftshift(shifted.view()), data);
    }
}

#[test]
fn test_round_trip() {
    for (rows, cols) in [(8, 8), (6, 10), (15, 16)] {
        let engine = engine(rows, cols);
        let image = Array2::from_shape_fn((rows, cols), |(r, c)| {
            ((r * 7 + c * 3) % 11) as f64 - 4.0 + 0.25 * (r as f64)
        });
        let grid = engine.to_grid(image.view()).unwrap();
        let (back, imag_residual) = engine.to_image(grid.view()).unwrap();
        assert_abs_diff_eq!(back, image, epsilon = 1e-12);
        assert!(imag_residual < 1e-12);
    }
}

#[test]
fn test_zero_spacing_is_total_flux() {
    let engine = engine(16, 16);
    let mut image = Array2::zeros((16, 16));
    image[(3, 4)] = 2.0;
    image[(10, 12)] = -0.5;
    image[(8, 8)] = 1.25;
    let grid = engine.to_grid(image.view()).unwrap();
    assert_abs_diff_eq!(grid[(8, 8)], c64::new(2.75, 0.0), epsilon = 1e-12);
}

#[test]
fn test_fft_matches_direct_dft() {
    let engine = engine(8, 10);
    let geometry = *engine.geometry();
    let mut data = Array2::zeros(geometry.shape());
    data[(5, 2)] = 2.0;
    data[(1, 7)] = 0.5;
    let image = Image::new(data, &geometry);
    let grid = engine.to_grid(image.data.view()).unwrap();

    let us = geometry.u_coords();
    let vs = geometry.v_coords();
    let mut uvs = vec![];
    for &v in vs.iter() {
        for &u in us.iter() {
            uvs.push((u, v));
        }
    }
    let predicted = predict_visibilities(&image, &uvs);
    for (fft, dft) in grid.iter().zip(predicted) {
        assert_abs_diff_eq!(*fft, dft, epsilon = 1e-12);
    }
}

#[test]
fn test_point_source_at_phase_centre_is_flat() {
    let geometry = ImagingGeometry::new(8, 8, 1.0).unwrap();
    let mut data = Array2::zeros(geometry.shape());
    data[geometry.reference_pixel()] = 3.0;
    let image = Image::new(data, &geometry);
    let predicted = predict_visibilities(&image, &[(0.1, 0.2), (-0.3, 0.05), (0.0, 0.0)]);
    for v in predicted {
        assert_abs_diff_eq!(v, c64::new(3.0, 0.0), epsilon = 1e-15);
    }
}

#[test]
fn test_hermitian_grid_gives_real_image() {
    let engine = engine(8, 8);
    let mut grid = Array2::zeros((8, 8));
    grid[(4, 5)] = c64::new(1.0, 2.0);
    grid[(4, 3)] = c64::new(1.0, -2.0);
    let (image, imag_residual) = engine.to_image(grid.view()).unwrap();
    assert!(imag_residual < 1e-12);
    assert!(image.iter().any(|v| v.abs() > 1e-3));

    // Only one half of the pair isn't Hermitian.
    grid[(4, 3)] = c64::new(0.0, 0.0);
    let (_, imag_residual) = engine.to_image(grid.view()).unwrap();
    assert!(imag_residual > 0.1);
}

#[test]
fn test_shape_mismatch() {
    let engine = engine(8, 8);
    let image = Array2::zeros((8, 6));
    assert!(matches!(
        engine.to_grid(image.view()),
        Err(ConfigError::ShapeMismatch {
            expected: (8, 8),
            got: (8, 6)
        })
    ));
}

#[test]
fn test_back_project_single_vis_is_flat() {
    let geometry = ImagingGeometry::new(8, 8, 1.0).unwrap();
    let table = VisibilityTable::from_tuples([(0.0, 0.0, 1.0, 0.0, 1.0)]).unwrap();
    let image = back_project(&table, &geometry);
    assert!(image.data.iter().all(|&v| (v - 1.0).abs() < 1e-15));

    let table =
        VisibilityTable::from_tuples([(0.1, 0.0, 1.0, 0.0, 1.0), (-0.2, 0.3, 1.0, 0.0, 1.0)])
            .unwrap();
    let image = back_project(&table, &geometry);
    assert_abs_diff_eq!(image.data[(4, 4)], 1.0, epsilon = 1e-15);
    assert_eq!(image.peak().0, (4, 4));
}

#[test]
fn test_map_centre_is_a_phase_shift() {
    let geometry = ImagingGeometry::new(8, 8, 0.5).unwrap();
    let mut data = Array2::zeros(geometry.shape());
    data[(2, 6)] = 1.5;
    data[(5, 3)] = -0.25;
    let image = Image::new(data, &geometry);

    let uvs = [(0.1, 0.2), (-0.7, 0.05), (0.33, -0.4)];
    let centre = (0.25, -0.75);
    let centred = predict_visibilities(&image, &uvs);
    let moved = predict_visibilities_with_centre(&image, &uvs, centre);
    for ((&(u, v), c), m) in uvs.iter().zip(centred).zip(moved) {
        let shift = c64::from_polar(1.0, -TAU * (u * centre.0 + v * centre.1));
        assert_abs_diff_eq!(m, c * shift, epsilon = 1e-12);
    }

    // Pixel centres half a pixel off the grid still round trip when both
    // directions use the same centre.
    let half = (0.25, 0.25);
    let mut uvs = vec![];
    for &v in geometry.v_coords().iter() {
        for &u in geometry.u_coords().iter() {
            uvs.push((u, v));
        }
    }
    let vis = predict_visibilities_with_centre(&image, &uvs, half);
    let table = VisibilityTable::from_tuples(
        uvs.iter()
            .zip(vis)
            .map(|(&(u, v), vis)| (u, v, vis.re, vis.im, 1.0)),
    )
    .unwrap();
    let back = back_project_with_centre(&table, &geometry, half);
    assert_abs_diff_eq!(back.data, image.data, epsilon = 1e-12);
}
