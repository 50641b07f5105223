// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::params::ConfigError;

/// Problems turning user-supplied arguments into parameters.
#[derive(Error, Debug)]
pub enum ArgsError {
    #[error("No grid shape was specified")]
    MissingGridShape,

    #[error("No pixel scale was specified")]
    MissingPixelScale,

    #[error("The grid shape must have one (square) or two (rows, cols) elements, but got {0:?}")]
    BadGridShape(Vec<usize>),

    #[error("'{got}' is not a valid {what}; valid names are: {valid}")]
    UnknownName {
        what: &'static str,
        got: String,
        valid: String,
    },

    #[error("A Gaussian uv taper needs a FWHM")]
    MissingTaperFwhm,

    #[error("An absolute CLEAN threshold needs a value")]
    MissingThreshold,

    #[error("A restoring beam minor axis or position angle was given without a major axis")]
    IncompleteRestoringBeam,

    #[error("{0}")]
    ArgFile(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
