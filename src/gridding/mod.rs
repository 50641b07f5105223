// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Put irregularly-sampled visibilities onto a regular Fourier grid.
//!
//! Two grids are made at the same time: the visibility grid (weight * kernel
//! * visibility) and the sampling grid (weight * kernel alone). The inverse
//! transform of the latter is the point-spread function.

mod kernel;

pub use kernel::{Kernel, KernelTable, KernelType};

use std::f64::consts::LN_2;

use log::{debug, trace};
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    c64,
    constants::GRID_CORRECTION_FLOOR,
    math::{blackman, hann},
    params::{ConfigError, GridParams},
    vis::VisibilityTable,
};

/// How visibility weights are modified before gridding.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// Use the weights as they are.
    #[default]
    #[strum(serialize = "natural")]
    Natural,

    /// Divide each weight by the total weight falling into its nearest cell.
    /// This flattens the sampling function at the cost of sensitivity.
    #[strum(serialize = "uniform")]
    Uniform,
}

/// The names of the uv tapers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum UvTaperType {
    #[strum(serialize = "none")]
    None,

    #[strum(serialize = "gaussian")]
    Gaussian,

    #[strum(serialize = "hann")]
    Hann,

    #[strum(serialize = "blackman")]
    Blackman,
}

/// A radial taper applied to visibility weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UvTaper {
    #[default]
    None,

    /// A Gaussian with this FWHM \[inverse angle\].
    Gaussian { fwhm: f64 },

    /// A Hann window reaching zero at the Nyquist limit.
    Hann,

    /// A Blackman window reaching zero at the Nyquist limit.
    Blackman,
}

impl UvTaper {
    /// The multiplicative weight factor at (u, v). `uv_max` is the radius at
    /// which windows reach zero.
    pub fn factor(&self, u: f64, v: f64, uv_max: f64) -> f64 {
        let r = u.hypot(v);
        match *self {
            UvTaper::None => 1.0,
            UvTaper::Gaussian { fwhm } => (-4.0 * LN_2 * (r / fwhm).powi(2)).exp(),
            UvTaper::Hann => hann(r / uv_max),
            UvTaper::Blackman => blackman(r / uv_max),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if let UvTaper::Gaussian { fwhm } = *self {
            if !(fwhm.is_finite() && fwhm > 0.0) {
                return Err(ConfigError::TaperFwhm(fwhm));
            }
        }
        Ok(())
    }
}

/// Book-keeping from a gridding run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GriddingDiagnostics {
    /// The number of visibilities put on the grid.
    pub num_gridded: usize,

    /// The number of flagged visibilities (ignored).
    pub num_flagged: usize,

    /// The number of visibilities beyond the grid's Nyquist limit in u or v
    /// (dropped).
    pub num_out_of_grid: usize,

    /// The sum of the sampling grid, i.e. the total of weight * kernel over
    /// all gridded visibilities.
    pub total_weight: f64,

    /// True if nothing was gridded; the grids are all zero.
    pub empty: bool,

    /// True once the grids have been divided by `total_weight`.
    pub normalised: bool,

    /// True if normalisation was requested but the total weight was zero.
    pub normalisation_skipped: bool,
}

/// Gridded visibilities and the sampling function.
#[derive(Debug, Clone)]
pub struct Gridded {
    pub vis_grid: Array2<c64>,
    pub sampling_grid: Array2<c64>,

    /// The same visibilities put into their nearest cells only, with the
    /// same weights. These are never normalised. With
    /// [`Kernel::Nearest`] they equal the other grids before normalisation.
    pub cell_vis_grid: Array2<c64>,

    /// The total weight in each cell of `cell_vis_grid`.
    pub cell_weights: Array2<f64>,

    pub diagnostics: GriddingDiagnostics,
}

impl Gridded {
    /// Divide both grids by the total gridded weight. If that weight is zero,
    /// nothing is done and this is recorded in the diagnostics.
    pub fn normalise(&mut self) {
        if self.diagnostics.normalised {
            return;
        }
        let total = self.diagnostics.total_weight;
        if total > 0.0 {
            self.vis_grid.mapv_inplace(|v| v / total);
            self.sampling_grid.mapv_inplace(|v| v / total);
            self.diagnostics.normalised = true;
        } else {
            debug!("Not normalising grids; the total weight is zero");
            self.diagnostics.normalisation_skipped = true;
        }
    }
}

/// The fractional grid position of a (u, v) and its nearest cell.
struct GridPosition {
    row_f: f64,
    col_f: f64,
    row: usize,
    col: usize,
}

/// Where (u, v) lands on the grid, or `None` if either coordinate is beyond
/// the Nyquist limit. The grid is periodic: the cell nearest +Nyquist is the
/// one at -Nyquist.
fn grid_position(u: f64, v: f64, params: &GridParams) -> Option<GridPosition> {
    let g = &params.geometry;
    // Allow for rounding in coordinates that are whole numbers of cells.
    let limit = g.nyquist_uv() * (1.0 + 1e-9);
    if !(u.abs() <= limit && v.abs() <= limit) {
        return None;
    }
    let (ref_r, ref_c) = g.reference_pixel();
    let row_f = v / g.cell_size_v() + ref_r as f64;
    let col_f = u / g.cell_size_u() + ref_c as f64;
    Some(GridPosition {
        row_f,
        col_f,
        row: wrap(row_f.round() as isize, g.rows),
        col: wrap(col_f.round() as isize, g.cols),
    })
}

fn wrap(i: isize, n: usize) -> usize {
    i.rem_euclid(n as isize) as usize
}

/// The (unwrapped) cells within `support` of the fractional position `x`.
fn tap_range(x: f64, support: f64) -> std::ops::RangeInclusive<isize> {
    (x - support).ceil() as isize..=(x + support).floor() as isize
}

/// Grid the unflagged visibilities of `table`.
///
/// Visibilities beyond the Nyquist limit are dropped and counted. If no
/// visibility ends up on the grid, all-zero grids are returned and the
/// diagnostics say so. Kernel taps that fall off one edge of the grid wrap
/// onto the other. The grids are not normalised; see [`Gridded::normalise`].
pub fn grid(table: &VisibilityTable, params: &GridParams) -> Result<Gridded, ConfigError> {
    grid_samples(table, params, false)
}

/// Like [`grid`], but each visibility is also gridded at (-u, -v) with its
/// complex conjugate, making the dirty image real. The diagnostics only count
/// the visibilities of `table`; a visibility and its partner are either both
/// on the grid or both off it.
pub fn grid_with_conjugates(
    table: &VisibilityTable,
    params: &GridParams,
) -> Result<Gridded, ConfigError> {
    grid_samples(table, params, true)
}

fn grid_samples(
    table: &VisibilityTable,
    params: &GridParams,
    conjugates: bool,
) -> Result<Gridded, ConfigError> {
    params.validate()?;
    let g = &params.geometry;
    let uv_max = g.nyquist_uv();

    // Uniform weighting needs the weight density on the grid first.
    let density = match params.weighting {
        Weighting::Natural => None,
        Weighting::Uniform => {
            let mut density = Array2::<f64>::zeros(g.shape());
            for vis in table.unflagged() {
                if let Some(pos) = grid_position(vis.u, vis.v, params) {
                    density[(pos.row, pos.col)] += vis.weight;
                    if conjugates {
                        if let Some(pos) = grid_position(-vis.u, -vis.v, params) {
                            density[(pos.row, pos.col)] += vis.weight;
                        }
                    }
                }
            }
            Some(density)
        }
    };

    let mut grids = Grids {
        table_k: KernelTable::new(params.kernel, params.oversample),
        vis_grid: Array2::zeros(g.shape()),
        sampling_grid: Array2::zeros(g.shape()),
        cell_vis_grid: Array2::zeros(g.shape()),
        cell_weights: Array2::zeros(g.shape()),
    };
    let mut diagnostics = GriddingDiagnostics::default();

    for vis in table.iter() {
        if vis.flagged {
            diagnostics.num_flagged += 1;
            continue;
        }
        let pos = match grid_position(vis.u, vis.v, params) {
            Some(pos) => pos,
            None => {
                trace!("Visibility at ({}, {}) is off the grid", vis.u, vis.v);
                diagnostics.num_out_of_grid += 1;
                continue;
            }
        };
        diagnostics.num_gridded += 1;

        let weight = vis.weight * params.taper.factor(vis.u, vis.v, uv_max);
        grids.deposit(&pos, vis.vis, weight, density.as_ref());
        if conjugates {
            if let Some(pos) = grid_position(-vis.u, -vis.v, params) {
                grids.deposit(&pos, vis.vis.conj(), weight, density.as_ref());
            }
        }
    }

    diagnostics.total_weight = grids.sampling_grid.iter().map(|s| s.re).sum();
    diagnostics.empty = diagnostics.num_gridded == 0;
    debug!(
        "Gridded {} visibilities ({} flagged, {} off the grid); total weight {:.6e}",
        diagnostics.num_gridded,
        diagnostics.num_flagged,
        diagnostics.num_out_of_grid,
        diagnostics.total_weight
    );

    Ok(Gridded {
        vis_grid: grids.vis_grid,
        sampling_grid: grids.sampling_grid,
        cell_vis_grid: grids.cell_vis_grid,
        cell_weights: grids.cell_weights,
        diagnostics,
    })
}

/// The grids being filled by [`grid_samples`].
struct Grids {
    table_k: KernelTable,
    vis_grid: Array2<c64>,
    sampling_grid: Array2<c64>,
    cell_vis_grid: Array2<c64>,
    cell_weights: Array2<f64>,
}

impl Grids {
    fn deposit(
        &mut self,
        pos: &GridPosition,
        vis: c64,
        mut weight: f64,
        density: Option<&Array2<f64>>,
    ) {
        let cell = (pos.row, pos.col);
        if let Some(density) = density {
            let d = density[cell];
            if d > 0.0 {
                weight /= d;
            }
        }
        self.cell_vis_grid[cell] += vis * weight;
        self.cell_weights[cell] += weight;

        let kernel = self.table_k.kernel();
        if let Kernel::Nearest = kernel {
            self.vis_grid[cell] += vis * weight;
            self.sampling_grid[cell] += weight;
            return;
        }

        let (rows, cols) = self.vis_grid.dim();
        let support = kernel.support();
        for r in tap_range(pos.row_f, support) {
            let kv = self.table_k.lookup(r as f64 - pos.row_f);
            if kv == 0.0 {
                continue;
            }
            let r = wrap(r, rows);
            for c in tap_range(pos.col_f, support) {
                let k = kv * self.table_k.lookup(c as f64 - pos.col_f);
                if k == 0.0 {
                    continue;
                }
                let w = weight * k;
                let c = wrap(c, cols);
                self.vis_grid[(r, c)] += vis * w;
                self.sampling_grid[(r, c)] += w;
            }
        }
    }
}

/// The separable image-plane correction for gridding with `params`' kernel,
/// as a (rows, cols) array. Dirty images should be divided by this. Values
/// are floored at [`GRID_CORRECTION_FLOOR`] so the division can't blow up.
pub fn grid_correction(params: &GridParams) -> Array2<f64> {
    let table_k = KernelTable::new(params.kernel, params.oversample);
    let g = &params.geometry;
    let corr_r = table_k.grid_correction(g.rows);
    let corr_c = table_k.grid_correction(g.cols);
    Array2::from_shape_fn(g.shape(), |(r, c)| {
        (corr_r[r] * corr_c[c]).max(GRID_CORRECTION_FLOOR)
    })
}

/// Look up the model visibility at each visibility's position on `grid`
/// (nearest cell). Off-grid visibilities give `None`. This is the inverse of
/// nearest-cell gridding; it's handy for comparing a model with data.
pub fn degrid_nearest(
    grid: ArrayView2<c64>,
    table: &VisibilityTable,
    params: &GridParams,
) -> Vec<Option<c64>> {
    table
        .iter()
        .map(|vis| grid_position(vis.u, vis.v, params).map(|pos| grid[(pos.row, pos.col)]))
        .collect()
}
