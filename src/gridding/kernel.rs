// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Convolution kernels used to put visibilities onto a grid.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{constants::*, math::sinc, params::ConfigError};

/// The names of the kernel families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum KernelType {
    #[strum(serialize = "nearest")]
    Nearest,

    #[strum(serialize = "pillbox")]
    Pillbox,

    #[strum(serialize = "gaussian-sinc")]
    GaussianSinc,

    #[strum(serialize = "prolate-spheroidal")]
    ProlateSpheroidal,
}

/// A gridding convolution kernel. All distances are in grid cells, and the
/// kernel is applied separably along u and v.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "kebab-case")]
pub enum Kernel {
    /// Put each visibility into its nearest cell only.
    Nearest,

    /// Equal weight for every cell within `support`.
    Pillbox { support: f64 },

    /// sinc(d / sinc_width) * exp(-(d / gauss_width)^2).
    GaussianSinc {
        support: f64,
        sinc_width: f64,
        gauss_width: f64,
    },

    /// Schwab's rational approximation to the zero-order prolate spheroidal
    /// wave function (alpha = 1, full width = 2 * support).
    ProlateSpheroidal { support: f64 },
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::from_type(KernelType::ProlateSpheroidal, None)
    }
}

impl Kernel {
    /// Make a kernel of the given family. If `support` isn't given, the
    /// family's default is used.
    pub fn from_type(kernel_type: KernelType, support: Option<f64>) -> Kernel {
        match kernel_type {
            KernelType::Nearest => Kernel::Nearest,
            KernelType::Pillbox => Kernel::Pillbox {
                support: support.unwrap_or(DEFAULT_PILLBOX_SUPPORT),
            },
            KernelType::GaussianSinc => Kernel::GaussianSinc {
                support: support.unwrap_or(DEFAULT_KERNEL_SUPPORT),
                sinc_width: DEFAULT_SINC_WIDTH,
                gauss_width: DEFAULT_GAUSS_WIDTH,
            },
            KernelType::ProlateSpheroidal => Kernel::ProlateSpheroidal {
                support: support.unwrap_or(DEFAULT_KERNEL_SUPPORT),
            },
        }
    }

    pub fn kernel_type(&self) -> KernelType {
        match self {
            Kernel::Nearest => KernelType::Nearest,
            Kernel::Pillbox { .. } => KernelType::Pillbox,
            Kernel::GaussianSinc { .. } => KernelType::GaussianSinc,
            Kernel::ProlateSpheroidal { .. } => KernelType::ProlateSpheroidal,
        }
    }

    /// The support radius \[grid cells\].
    pub fn support(&self) -> f64 {
        match *self {
            Kernel::Nearest => 0.5,
            Kernel::Pillbox { support }
            | Kernel::GaussianSinc { support, .. }
            | Kernel::ProlateSpheroidal { support } => support,
        }
    }

    /// The value of the kernel `distance` cells from its centre.
    pub fn evaluate(&self, distance: f64) -> f64 {
        let d = distance.abs();
        if d > self.support() {
            return 0.0;
        }

        match *self {
            Kernel::Nearest | Kernel::Pillbox { .. } => 1.0,

            Kernel::GaussianSinc {
                sinc_width,
                gauss_width,
                ..
            } => sinc(d / sinc_width) * (-(d / gauss_width).powi(2)).exp(),

            Kernel::ProlateSpheroidal { support } => {
                let nu = d / support;
                (1.0 - nu * nu) * spheroidal(nu)
            }
        }
    }

    pub(crate) fn validate(&self, rows: usize, cols: usize) -> Result<(), ConfigError> {
        let support = self.support();
        let max = (rows.min(cols) / 2) as f64;
        if !(support.is_finite() && support > 0.0 && support <= max) {
            return Err(ConfigError::KernelSupport { support, max });
        }
        if let Kernel::GaussianSinc {
            sinc_width,
            gauss_width,
            ..
        } = *self
        {
            if !(sinc_width.is_finite() && sinc_width > 0.0) {
                return Err(ConfigError::KernelWidth(sinc_width));
            }
            if !(gauss_width.is_finite() && gauss_width > 0.0) {
                return Err(ConfigError::KernelWidth(gauss_width));
            }
        }
        Ok(())
    }
}

/// The zero-order prolate spheroidal function with alpha = 1 and m = 6,
/// evaluated with Schwab's rational approximation. `nu` is in [0, 1].
pub(crate) fn spheroidal(nu: f64) -> f64 {
    const P: [[f64; 5]; 2] = [
        [8.203343e-2, -3.644705e-1, 6.278660e-1, -5.335581e-1, 2.312756e-1],
        [4.028559e-3, -3.697768e-2, 1.021332e-1, -1.201436e-1, 6.412774e-2],
    ];
    const Q: [[f64; 3]; 2] = [
        [1.0, 8.212018e-1, 2.078043e-1],
        [1.0, 9.599102e-1, 2.918724e-1],
    ];

    let nu = nu.abs();
    if nu > 1.0 {
        return 0.0;
    }
    let (part, nu_end) = if nu < 0.75 { (0, 0.75) } else { (1, 1.0) };
    let del_nu_sq = nu * nu - nu_end * nu_end;
    let top = P[part].iter().rev().fold(0.0, |acc, p| acc * del_nu_sq + p);
    let bot = Q[part].iter().rev().fold(0.0, |acc, q| acc * del_nu_sq + q);
    if bot > 0.0 {
        top / bot
    } else {
        0.0
    }
}

/// A kernel tabulated at `oversample` points per grid cell, from the centre
/// out to the support radius.
#[derive(Debug, Clone)]
pub struct KernelTable {
    kernel: Kernel,
    values: Vec<f64>,
    oversample: usize,
}

impl KernelTable {
    pub fn new(kernel: Kernel, oversample: NonZeroUsize) -> KernelTable {
        let oversample = oversample.get();
        let len = (kernel.support() * oversample as f64).floor() as usize + 1;
        let values = (0..len)
            .map(|i| kernel.evaluate(i as f64 / oversample as f64))
            .collect();
        KernelTable {
            kernel,
            values,
            oversample,
        }
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// The tabulated kernel value nearest to `distance` cells from the centre.
    pub fn lookup(&self, distance: f64) -> f64 {
        let index = (distance.abs() * self.oversample as f64).round() as usize;
        self.values.get(index).copied().unwrap_or(0.0)
    }

    /// The image-plane correction for this kernel along an axis of `n`
    /// pixels: the discrete Fourier transform of the kernel sampled at whole
    /// cell offsets, normalised to 1 at the phase centre. This is the taper
    /// gridding applies to a visibility at a cell centre, so dividing by it
    /// makes the dirty image of such data exactly the image of the sampled
    /// cells. Negative values (a pillbox's sidelobes) are clamped to 0; the
    /// 2D correction is floored instead, see
    /// [`super::grid_correction`].
    ///
    /// Nearest-cell gridding doesn't convolve, so its correction is 1.
    pub fn grid_correction(&self, n: usize) -> Vec<f64> {
        if let Kernel::Nearest = self.kernel {
            return vec![1.0; n];
        }

        let reach = self.kernel.support().floor() as usize;
        let taps: Vec<f64> = (0..=reach).map(|d| self.lookup(d as f64)).collect();
        let centre = n / 2;
        let transform = |x: f64| -> f64 {
            taps.iter()
                .enumerate()
                .map(|(d, &k)| {
                    let w = if d == 0 { 1.0 } else { 2.0 };
                    w * k * (TAU * d as f64 * x).cos()
                })
                .sum::<f64>()
        };
        let norm = transform(0.0);
        (0..n)
            .map(|p| {
                let x = (p as f64 - centre as f64) / n as f64;
                (transform(x) / norm).max(0.0)
            })
            .collect()
    }
}
