// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.


use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::prelude::*;

use super::*;
use crate::{
    c64,
    gridding::GriddingDiagnostics,
    image::ImagingGeometry,
    params::{GridParams, ImageNormalisation},
};

/// Dirty products for a dirty image and beam that didn't come from any
/// visibilities. Only CLEAN can use these.
fn products_from_images(dirty: Array2<f64>, beam: Array2<f64>) -> (DirtyProducts, ImagingContext) {
    let (rows, cols) = dirty.dim();
    let geometry = ImagingGeometry::new(rows, cols, 1.0).unwrap();
    let products = DirtyProducts {
        dirty: Image::new(dirty, &geometry),
        beam: Image::new(beam, &geometry),
        vis_grid: Array2::<c64>::zeros((rows, cols)),
        sampling_grid: Array2::<c64>::zeros((rows, cols)),
        cell_vis_grid: Array2::<c64>::zeros((rows, cols)),
        cell_weights: Array2::zeros((rows, cols)),
        grid_params: GridParams::new(geometry),
        normalisation: ImageNormalisation::Beam,
        correction: Array2::ones((rows, cols)),
        gridding: GriddingDiagnostics::default(),
        imag_residual: 0.0,
        warnings: vec![],
    };
    (products, ImagingContext::new(geometry).unwrap())
}

#[test]
fn test_beam_coefficients_round_trip() {
    let beam = GaussianBeam {
        major_fwhm: 5.0,
        minor_fwhm: 2.0,
        pa: 0.3,
    };
    let (a, b, c) = beam.coefficients();
    let back = GaussianBeam::from_coefficients(a, b, c).unwrap();
    assert_relative_eq!(back.major_fwhm, 5.0, max_relative = 1e-12);
    assert_relative_eq!(back.minor_fwhm, 2.0, max_relative = 1e-12);
    assert_abs_diff_eq!(back.pa, 0.3, epsilon = 1e-12);

    assert!(GaussianBeam::from_coefficients(1.0, 2.0, 1.0).is_none());
    assert!(GaussianBeam::from_coefficients(-1.0, 0.0, 1.0).is_none());
}

#[test]
fn test_beam_is_half_power_at_half_fwhm() {
    let beam = GaussianBeam {
        major_fwhm: 6.0,
        minor_fwhm: 3.0,
        pa: 0.5,
    };
    let (s, c) = beam.pa.sin_cos();
    assert_abs_diff_eq!(beam.evaluate(0.0, 0.0), 1.0);
    assert_abs_diff_eq!(beam.evaluate(3.0 * c, 3.0 * s), 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(beam.evaluate(-1.5 * s, 1.5 * c), 0.5, epsilon = 1e-12);
}

#[test]
fn test_fit_recovers_an_elliptical_beam() {
    let truth = GaussianBeam {
        major_fwhm: 6.0,
        minor_fwhm: 3.5,
        pa: -0.4,
    };
    let image = truth.to_array((32, 32), (16, 16));
    let fitted = fit_restoring_beam(image.view()).unwrap();
    assert_relative_eq!(fitted.major_fwhm, truth.major_fwhm, max_relative = 1e-8);
    assert_relative_eq!(fitted.minor_fwhm, truth.minor_fwhm, max_relative = 1e-8);
    assert_abs_diff_eq!(fitted.pa, truth.pa, epsilon = 1e-8);
}

#[test]
fn test_fit_fails_on_a_delta_function() {
    let mut image = Array2::zeros((8, 8));
    image[(4, 4)] = 1.0;
    assert!(fit_restoring_beam(image.view()).is_none());
    assert!(fit_restoring_beam(Array2::zeros((8, 8)).view()).is_none());
}

#[test]
fn test_restore_conserves_flux() {
    let beam = GaussianBeam::circular(3.0);
    let mut model = Array2::zeros((64, 64));
    model[(32, 30)] = 2.0;
    model[(20, 40)] = -0.5;
    let restored = restore(model.view(), &beam);

    assert_abs_diff_eq!(restored[(32, 30)], 2.0, epsilon = 1e-6);
    let sigma = 3.0 / crate::constants::FWHM_FACTOR;
    let area = crate::constants::TAU * sigma * sigma;
    assert_relative_eq!(restored.sum(), 1.5 * area, max_relative = 1e-4);
}

#[test]
fn test_restore_with_a_beam_wider_than_the_image() {
    let beam = GaussianBeam::circular(1e300);
    let mut model = Array2::zeros((16, 16));
    model[(3, 12)] = 0.75;
    let restored = restore(model.view(), &beam);
    for &v in restored.iter() {
        assert_abs_diff_eq!(v, 0.75, epsilon = 1e-12);
    }
}

#[test]
fn test_build_from_params() {
    let clean = DeconvolverParams::default().build();
    assert_eq!(clean.algorithm(), DeconvolverType::Clean);
    let mem = DeconvolverParams::Mem(crate::params::MemParams::default()).build();
    assert_eq!(mem.algorithm(), DeconvolverType::Mem);
}

#[test]
fn test_shape_mismatch() {
    let (products, _) = products_from_images(Array2::zeros((8, 8)), Array2::zeros((8, 8)));
    let ctx = ImagingContext::new(ImagingGeometry::new(16, 16, 1.0).unwrap()).unwrap();
    let result = DeconvolverParams::default()
        .build()
        .deconvolve(&products, &ctx, &CancelToken::new());
    assert!(matches!(
        result,
        Err(ImagingError::Config(ConfigError::ShapeMismatch { .. }))
    ));
}
