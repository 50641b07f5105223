// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Elliptical Gaussian restoring beams.

use std::collections::VecDeque;

use log::debug;
use ndarray::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    constants::{BEAM_FIT_THRESHOLD, FRAC_PI_2, FWHM_FACTOR, PI, RESTORING_BEAM_CUTOFF_SIGMA},
    math::solve_3x3,
};

/// An elliptical Gaussian with a peak of 1. Sizes are in pixels, and the
/// position angle is in radians, anticlockwise from the x (column) axis
/// towards the y (row) axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GaussianBeam {
    pub major_fwhm: f64,
    pub minor_fwhm: f64,
    pub pa: f64,
}

impl GaussianBeam {
    pub fn circular(fwhm: f64) -> GaussianBeam {
        GaussianBeam {
            major_fwhm: fwhm,
            minor_fwhm: fwhm,
            pa: 0.0,
        }
    }

    /// The coefficients (a, b, c) of the quadratic form
    /// `a dx^2 + 2 b dx dy + c dy^2`, the negative log of the beam.
    pub fn coefficients(&self) -> (f64, f64, f64) {
        let s_maj = self.major_fwhm / FWHM_FACTOR;
        let s_min = self.minor_fwhm / FWHM_FACTOR;
        let p = 1.0 / (2.0 * s_maj * s_maj);
        let q = 1.0 / (2.0 * s_min * s_min);
        let (s, c) = self.pa.sin_cos();
        (p * c * c + q * s * s, s * c * (p - q), p * s * s + q * c * c)
    }

    /// The beam described by a quadratic form; see
    /// [`GaussianBeam::coefficients`]. `None` unless the form is positive
    /// definite.
    pub fn from_coefficients(a: f64, b: f64, c: f64) -> Option<GaussianBeam> {
        if !(a > 0.0 && c > 0.0 && a * c - b * b > 0.0) {
            return None;
        }
        let mean = 0.5 * (a + c);
        let half_diff = (0.25 * (a - c).powi(2) + b * b).sqrt();
        let (lambda_small, lambda_big) = (mean - half_diff, mean + half_diff);
        if lambda_small <= 0.0 {
            return None;
        }

        let mut pa = 0.5 * (-2.0 * b).atan2(c - a);
        if pa <= -FRAC_PI_2 {
            pa += PI;
        } else if pa > FRAC_PI_2 {
            pa -= PI;
        }
        Some(GaussianBeam {
            major_fwhm: FWHM_FACTOR / (2.0 * lambda_small).sqrt(),
            minor_fwhm: FWHM_FACTOR / (2.0 * lambda_big).sqrt(),
            pa,
        })
    }

    /// The beam value at an offset of (dx, dy) pixels from its centre.
    pub fn evaluate(&self, dx: f64, dy: f64) -> f64 {
        let (a, b, c) = self.coefficients();
        (-(a * dx * dx + 2.0 * b * dx * dy + c * dy * dy)).exp()
    }

    /// The beam as an image of the given shape, centred on `centre`.
    pub fn to_array(&self, shape: (usize, usize), centre: (usize, usize)) -> Array2<f64> {
        Array2::from_shape_fn(shape, |(r, c)| {
            self.evaluate(
                c as f64 - centre.1 as f64,
                r as f64 - centre.0 as f64,
            )
        })
    }
}

/// Fit an elliptical Gaussian to the main lobe of a dirty beam.
///
/// The main lobe is the connected region around the beam's peak with values
/// above [`BEAM_FIT_THRESHOLD`] of the peak. A least-squares fit of the
/// negative log of those values to a quadratic form gives the Gaussian.
/// `None` is returned if the lobe is too small or the fit isn't an ellipse.
pub fn fit_restoring_beam(beam: ArrayView2<f64>) -> Option<GaussianBeam> {
    let (rows, cols) = beam.dim();
    let mut peak = ((0, 0), f64::NEG_INFINITY);
    for (pos, &v) in beam.indexed_iter() {
        if v > peak.1 {
            peak = (pos, v);
        }
    }
    let ((pr, pc), peak_value) = peak;
    if !(peak_value > 0.0) {
        return None;
    }

    // Flood fill the main lobe.
    let mut in_lobe = Array2::from_elem((rows, cols), false);
    let mut queue = VecDeque::from([(pr, pc)]);
    in_lobe[(pr, pc)] = true;
    let mut lobe = vec![];
    while let Some((r, c)) = queue.pop_front() {
        lobe.push((r, c));
        let neighbours = [
            (r.wrapping_sub(1), c),
            (r + 1, c),
            (r, c.wrapping_sub(1)),
            (r, c + 1),
        ];
        for (nr, nc) in neighbours {
            if nr < rows
                && nc < cols
                && !in_lobe[(nr, nc)]
                && beam[(nr, nc)] / peak_value > BEAM_FIT_THRESHOLD
            {
                in_lobe[(nr, nc)] = true;
                queue.push_back((nr, nc));
            }
        }
    }
    if lobe.len() < 3 {
        debug!("The dirty beam's main lobe has only {} pixels", lobe.len());
        return None;
    }

    // Normal equations for -ln(B) = a dx^2 + 2b dx dy + c dy^2.
    let mut ata = [[0.0; 3]; 3];
    let mut atb = [0.0; 3];
    for &(r, c) in &lobe {
        let dx = c as f64 - pc as f64;
        let dy = r as f64 - pr as f64;
        let features = [dx * dx, 2.0 * dx * dy, dy * dy];
        let target = -(beam[(r, c)] / peak_value).ln();
        for i in 0..3 {
            for j in 0..3 {
                ata[i][j] += features[i] * features[j];
            }
            atb[i] += features[i] * target;
        }
    }
    let [a, b, c] = solve_3x3(ata, atb)?;
    let fitted = GaussianBeam::from_coefficients(a, b, c);
    debug!("Fitted restoring beam: {fitted:?}");
    fitted
}

/// Convolve `model` with `beam`. Each model pixel contributes out to
/// [`RESTORING_BEAM_CUTOFF_SIGMA`] standard deviations of the beam's major
/// axis.
pub fn restore(model: ArrayView2<f64>, beam: &GaussianBeam) -> Array2<f64> {
    let (rows, cols) = model.dim();
    // Past the image size, a wider beam reaches no more pixels.
    let reach = (RESTORING_BEAM_CUTOFF_SIGMA * beam.major_fwhm / FWHM_FACTOR)
        .ceil()
        .min(rows.max(cols) as f64) as isize;
    let (a, b, c) = beam.coefficients();
    let components: Vec<(isize, isize, f64)> = model
        .indexed_iter()
        .filter(|(_, &v)| v != 0.0)
        .map(|((r, c), &v)| (r as isize, c as isize, v))
        .collect();

    let mut restored = Array2::zeros((rows, cols));
    restored
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(r, mut row)| {
            let r = r as isize;
            for &(cr, cc, flux) in components.iter().filter(|(cr, _, _)| (cr - r).abs() <= reach) {
                let dy = (r - cr) as f64;
                let c_lo = (cc - reach).max(0) as usize;
                let c_hi = (cc + reach).min(cols as isize - 1) as usize;
                for col in c_lo..=c_hi {
                    let dx = (col as isize - cc) as f64;
                    row[col] += flux * (-(a * dx * dx + 2.0 * b * dx * dy + c * dy * dy)).exp();
                }
            }
        });
    restored
}
