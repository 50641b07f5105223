// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Problems with input visibilities. These are always raised before any
/// gridding is attempted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("The visibility table is empty; there is nothing to image")]
    EmptyTable,

    #[error("All {num} visibilities are flagged; there is nothing to image")]
    AllFlagged { num: usize },

    #[error("The weights of all unflagged visibilities are zero")]
    ZeroWeights,

    #[error("Visibility {index} has a negative weight ({weight})")]
    NegativeWeight { index: usize, weight: f64 },

    #[error("Visibility {index} has a non-finite coordinate, value or weight")]
    NonFinite { index: usize },

    #[error("None of the {num_out_of_grid} unflagged visibilities fall inside the grid; is the pixel scale too large?")]
    NoSamplesInGrid { num_out_of_grid: usize },
}
