// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Measured Fourier-plane samples ("visibilities").
//!
//! A [`VisibilityTable`] is handed to the imaging code by whatever calibrated
//! the instrument's counts. It is never modified; operations that would
//! change it (e.g. adding Hermitian conjugates) return a new table.

mod error;
#[cfg(test)]
mod tests;

pub use error::DataError;

use serde::{Deserialize, Serialize};

use crate::c64;

/// A single visibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Visibility {
    /// Spatial frequency along the image x axis \[inverse angle\].
    pub u: f64,

    /// Spatial frequency along the image y axis \[inverse angle\].
    pub v: f64,

    /// The complex value of the visibility.
    pub vis: c64,

    /// The inverse-variance weight. Must not be negative.
    pub weight: f64,

    /// Flagged visibilities are never gridded.
    #[serde(default)]
    pub flagged: bool,
}

impl Visibility {
    pub fn new(u: f64, v: f64, vis: c64, weight: f64) -> Visibility {
        Visibility {
            u,
            v,
            vis,
            weight,
            flagged: false,
        }
    }

    /// The Hermitian partner of this visibility, i.e. V(-u,-v) = V*(u,v).
    pub fn conjugate(&self) -> Visibility {
        Visibility {
            u: -self.u,
            v: -self.v,
            vis: self.vis.conj(),
            ..*self
        }
    }

    fn is_finite(&self) -> bool {
        self.u.is_finite()
            && self.v.is_finite()
            && self.vis.re.is_finite()
            && self.vis.im.is_finite()
            && self.weight.is_finite()
    }
}

/// An ordered collection of [`Visibility`]s. Once constructed, it cannot be
/// changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisibilityTable {
    vis: Vec<Visibility>,
}

impl VisibilityTable {
    /// Create a new table. Every visibility must be finite and have a
    /// non-negative weight. An empty table is allowed here, but it can't be
    /// imaged.
    pub fn new(vis: Vec<Visibility>) -> Result<VisibilityTable, DataError> {
        for (index, v) in vis.iter().enumerate() {
            if !v.is_finite() {
                return Err(DataError::NonFinite { index });
            }
            if v.weight < 0.0 {
                return Err(DataError::NegativeWeight {
                    index,
                    weight: v.weight,
                });
            }
        }

        Ok(VisibilityTable { vis })
    }

    /// Create a new table from (u, v, real, imag, weight) tuples; this is the
    /// layout usually supplied by calibration software.
    pub fn from_tuples<I>(tuples: I) -> Result<VisibilityTable, DataError>
    where
        I: IntoIterator<Item = (f64, f64, f64, f64, f64)>,
    {
        let vis = tuples
            .into_iter()
            .map(|(u, v, re, im, weight)| Visibility::new(u, v, c64::new(re, im), weight))
            .collect();
        VisibilityTable::new(vis)
    }

    pub fn len(&self) -> usize {
        self.vis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vis.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<Visibility> {
        self.vis.iter()
    }

    pub fn as_slice(&self) -> &[Visibility] {
        &self.vis
    }

    /// Iterate over the visibilities that aren't flagged.
    pub fn unflagged(&self) -> impl Iterator<Item = &Visibility> {
        self.vis.iter().filter(|v| !v.flagged)
    }

    pub fn num_unflagged(&self) -> usize {
        self.unflagged().count()
    }

    /// The sum of the weights of all unflagged visibilities.
    pub fn total_weight(&self) -> f64 {
        self.unflagged().map(|v| v.weight).sum()
    }

    /// The largest |u| or |v| of any unflagged visibility.
    pub fn max_uv(&self) -> f64 {
        self.unflagged()
            .map(|v| v.u.abs().max(v.v.abs()))
            .fold(0.0, f64::max)
    }

    /// Check that there is something to image. This doesn't allocate
    /// anything, so it should be called before gridding.
    pub fn check_imageable(&self) -> Result<(), DataError> {
        if self.vis.is_empty() {
            return Err(DataError::EmptyTable);
        }
        if self.vis.iter().all(|v| v.flagged) {
            return Err(DataError::AllFlagged {
                num: self.vis.len(),
            });
        }
        if self.total_weight() <= 0.0 {
            return Err(DataError::ZeroWeights);
        }
        Ok(())
    }

    /// Return a new table with the Hermitian partner of every unflagged
    /// visibility appended. Gridding such a table yields a Hermitian grid,
    /// and hence a real image.
    pub fn with_conjugates(&self) -> VisibilityTable {
        let mut vis = Vec::with_capacity(self.vis.len() * 2);
        vis.extend_from_slice(&self.vis);
        vis.extend(self.unflagged().map(Visibility::conjugate));
        VisibilityTable { vis }
    }

    /// The (u, v) coordinates of all visibilities.
    pub fn uvs(&self) -> Vec<(f64, f64)> {
        self.vis.iter().map(|v| (v.u, v.v)).collect()
    }
}

impl<'a> IntoIterator for &'a VisibilityTable {
    type Item = &'a Visibility;
    type IntoIter = std::slice::Iter<'a, Visibility>;

    fn into_iter(self) -> Self::IntoIter {
        self.vis.iter()
    }
}
