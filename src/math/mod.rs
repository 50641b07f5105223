// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.


use crate::{c64, constants::PI};

/// Complex exponential. The argument is assumed to be purely imaginary.
///
/// This function doesn't actually use complex numbers; it just returns the real
/// and imag components from Euler's formula (i.e. e^{ix} = cos{x} + i sin{x}).
#[inline]
pub(crate) fn cexp(x: f64) -> c64 {
    let (im, re) = x.sin_cos();
    c64::new(re, im)
}

/// The normalised sinc function, sin(πx) / (πx).
#[inline]
pub(crate) fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

/// Is `n` a product of only 2s, 3s and 5s? FFTs of these lengths are fast.
pub(crate) fn is_fft_friendly(mut n: usize) -> bool {
    if n == 0 {
        return false;
    }
    for p in [2, 3, 5] {
        while n % p == 0 {
            n /= p;
        }
    }
    n == 1
}

/// The median of some values. For an even number of values, the mean of the
/// two middle values is used. `None` if there are no values.
pub(crate) fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some(0.5 * (sorted[n / 2 - 1] + sorted[n / 2]))
    }
}

/// The result of [`resistant_mean`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResistantMean {
    /// The mean of the values that survived clipping.
    pub mean: f64,

    /// The standard deviation of the mean.
    pub sigma: f64,

    /// The number of values that survived clipping.
    pub num_good: usize,
}

impl ResistantMean {
    /// The standard deviation of the surviving values themselves (i.e. not of
    /// their mean).
    pub fn std_dev(&self) -> f64 {
        self.sigma * ((self.num_good as f64) - 1.0).max(0.0).sqrt()
    }
}

/// Compensate a standard deviation for being computed from values truncated at
/// `sigma_cut` standard deviations.
fn compensate_truncation(sigma: f64, sigma_cut: f64) -> f64 {
    let sc = sigma_cut.max(1.0);
    if sc <= 4.5 {
        sigma / (-0.15405 + 0.90723 * sc - 0.23584 * sc.powi(2) + 0.020142 * sc.powi(3))
    } else {
        sigma
    }
}

/// An outlier-resistant mean, following the IDL astrolib routine
/// `RESISTANT_Mean`. Values further than `sigma_cut` robust standard
/// deviations from the median are discarded (twice; the second time using the
/// standard deviation of the first survivors).
///
/// `None` is returned if there are fewer than two values.
pub fn resistant_mean(data: &[f64], sigma_cut: f64) -> Option<ResistantMean> {
    if data.len() < 2 {
        return None;
    }

    let data_median = median(data)?;
    let abs_dev: Vec<f64> = data.iter().map(|d| (d - data_median).abs()).collect();
    let mut median_abs_dev = median(&abs_dev)? / 0.6745;
    if median_abs_dev < 1.0e-24 {
        median_abs_dev = abs_dev.iter().sum::<f64>() / abs_dev.len() as f64 / 0.8;
    }

    let clipped_stats = |cutoff: f64| -> (f64, f64, usize) {
        let good: Vec<f64> = data
            .iter()
            .zip(abs_dev.iter())
            .filter(|(_, &ad)| ad <= cutoff)
            .map(|(&d, _)| d)
            .collect();
        let n = good.len().max(1) as f64;
        let mean = good.iter().sum::<f64>() / n;
        let sigma = (good.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / n).sqrt();
        (mean, compensate_truncation(sigma, sigma_cut), good.len())
    };

    let (_, sigma, _) = clipped_stats(sigma_cut * median_abs_dev);
    let (mean, sigma, num_good) = clipped_stats(sigma_cut * sigma);
    if num_good < 2 {
        return None;
    }

    Some(ResistantMean {
        mean,
        sigma: sigma / ((num_good - 1) as f64).sqrt(),
        num_good,
    })
}

/// A Hann window evaluated at a normalised radius `rho` (0 at the centre, 1
/// at the edge). Zero outside.
pub(crate) fn hann(rho: f64) -> f64 {
    let rho = rho.abs();
    if rho > 1.0 {
        0.0
    } else {
        0.5 * (1.0 + (PI * rho).cos())
    }
}

/// A Blackman window evaluated at a normalised radius `rho` (0 at the centre,
/// 1 at the edge). Zero outside.
pub(crate) fn blackman(rho: f64) -> f64 {
    let rho = rho.abs();
    if rho > 1.0 {
        0.0
    } else {
        0.42 + 0.5 * (PI * rho).cos() + 0.08 * (2.0 * PI * rho).cos()
    }
}

/// Solve the 3x3 linear system `a x = b` by Gaussian elimination with partial
/// pivoting. `None` if the system is singular.
pub(crate) fn solve_3x3(mut a: [[f64; 3]; 3], mut b: [f64; 3]) -> Option<[f64; 3]> {
    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |acc, x| acc.max(x.abs()));
    if scale == 0.0 {
        return None;
    }

    for col in 0..3 {
        let pivot = (col..3)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() <= 1e-12 * scale {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..3 {
            let factor = a[row][col] / a[col][col];
            for k in col..3 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; 3];
    for row in (0..3).rev() {
        let sum: f64 = (row + 1..3).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - sum) / a[row][row];
    }
    Some(x)
}
