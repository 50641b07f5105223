// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-run state shared by the imaging pipeline.


use std::{borrow::Cow, sync::Arc};

use crossbeam_utils::atomic::AtomicCell;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::{
    image::ImagingGeometry,
    params::{ConfigError, ImagingParams},
    transform::TransformEngine,
};

/// Everything a run needs besides its data and parameters: FFT plans for the
/// run's geometry, and whether to draw progress bars.
///
/// A context belongs to one run; nothing in it is process-wide.
#[derive(Debug)]
pub struct ImagingContext {
    engine: TransformEngine,
    progress_bars: bool,
}

impl ImagingContext {
    pub fn new(geometry: ImagingGeometry) -> Result<ImagingContext, ConfigError> {
        Ok(ImagingContext {
            engine: TransformEngine::new(geometry)?,
            progress_bars: false,
        })
    }

    /// A context for the geometry and progress-bar setting of `params`.
    pub fn from_params(params: &ImagingParams) -> Result<ImagingContext, ConfigError> {
        Ok(ImagingContext::new(params.grid.geometry)?.with_progress_bars(params.progress_bars))
    }

    pub fn with_progress_bars(mut self, progress_bars: bool) -> ImagingContext {
        self.progress_bars = progress_bars;
        self
    }

    pub fn engine(&self) -> &TransformEngine {
        &self.engine
    }

    pub fn geometry(&self) -> &ImagingGeometry {
        self.engine.geometry()
    }

    /// Make a progress bar for an iterative algorithm. It's hidden unless
    /// progress bars are enabled.
    pub(crate) fn iteration_progress(&self, len: usize, message: Cow<'static, str>) -> ProgressBar {
        ProgressBar::with_draw_target(
            Some(len as _),
            if self.progress_bars {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:17}: [{wide_bar:.blue}] {pos:4}/{len:4} iterations ({elapsed_precise}<{eta_precise})").unwrap()
                .progress_chars("=> "),
        )
        .with_position(0)
        .with_message(message)
    }
}

/// A flag that asks a running deconvolution to stop. It's checked between
/// iterations; the state after the last complete iteration is returned.
/// Clones share the same flag, so one can be handed to another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicCell<bool>>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load()
    }
}
