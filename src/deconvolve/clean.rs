// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Högbom CLEAN.

use log::{debug, info, warn};
use ndarray::{prelude::*, Zip};
use vec1::vec1;

use super::{
    check_shapes, fit_restoring_beam, min_value, restore, CleanComponent, Deconvolution,
    DeconvolutionDiagnostics, Deconvolver, GaussianBeam, TerminationReason, TraceEntry,
};
use crate::{
    constants::{
        DEFAULT_CLEAN_THRESHOLD_FRACTION, FALLBACK_BEAM_FWHM_PX, RESISTANT_MEAN_SIGMA_CUT,
    },
    context::{CancelToken, ImagingContext},
    dirty::DirtyProducts,
    error::{ImagingError, NumericalWarning},
    image::{peak_abs, Image},
    math::resistant_mean,
    params::{CleanParams, CleanThreshold, DeconvolverType, RestoringBeamSpec},
};

/// Repeatedly subtract a scaled dirty beam at the peak of the residual.
#[derive(Debug, Clone)]
pub struct Clean {
    params: CleanParams,
}

impl Clean {
    pub fn new(params: CleanParams) -> Clean {
        Clean { params }
    }

    /// The absolute residual at which cleaning stops. If the noise can't be
    /// estimated, a fraction of the initial peak is used instead and a
    /// warning is added.
    fn threshold(
        &self,
        dirty: ArrayView2<f64>,
        initial_peak: f64,
        warnings: &mut Vec<NumericalWarning>,
    ) -> f64 {
        match self.params.threshold {
            CleanThreshold::Absolute(t) => t,
            CleanThreshold::FractionOfPeak(f) => f * initial_peak,
            CleanThreshold::NoiseSigma(n) => {
                let values: Vec<f64> = dirty.iter().copied().collect();
                match resistant_mean(&values, RESISTANT_MEAN_SIGMA_CUT) {
                    Some(rm) if rm.std_dev() > 0.0 => {
                        debug!(
                            "Dirty image noise: {:.6e} (mean {:.6e}, {} pixels kept)",
                            rm.std_dev(),
                            rm.mean,
                            rm.num_good
                        );
                        n * rm.std_dev()
                    }
                    _ => {
                        let w = NumericalWarning::NoiseEstimateFailed {
                            fraction: DEFAULT_CLEAN_THRESHOLD_FRACTION,
                        };
                        warn!("{w}");
                        warnings.push(w);
                        DEFAULT_CLEAN_THRESHOLD_FRACTION * initial_peak
                    }
                }
            }
        }
    }

    fn restoring_beam(
        &self,
        dirty: &DirtyProducts,
        warnings: &mut Vec<NumericalWarning>,
    ) -> GaussianBeam {
        match self.params.restoring_beam {
            RestoringBeamSpec::Fixed { major, minor, pa } => {
                let scale = dirty.beam.pixel_scale;
                GaussianBeam {
                    major_fwhm: major / scale,
                    minor_fwhm: minor / scale,
                    pa,
                }
            }
            RestoringBeamSpec::Fit => match fit_restoring_beam(dirty.beam.data.view()) {
                Some(beam) => beam,
                None => {
                    let w = NumericalWarning::RestoringBeamFitFailed {
                        fwhm_px: FALLBACK_BEAM_FWHM_PX,
                    };
                    warn!("{w}");
                    warnings.push(w);
                    GaussianBeam::circular(FALLBACK_BEAM_FWHM_PX)
                }
            },
        }
    }
}

/// Subtract `amplitude` times `beam` from `residual`, with the beam's
/// `beam_ref` pixel placed at `position`. The beam wraps around the image
/// edges like the transforms that made it; it must have the residual's shape.
pub(super) fn subtract_beam(
    mut residual: ArrayViewMut2<f64>,
    beam: ArrayView2<f64>,
    beam_ref: (usize, usize),
    position: (usize, usize),
    amplitude: f64,
) {
    let (rows, cols) = residual.dim();
    debug_assert_eq!(beam.dim(), (rows, cols));
    let shift_r = (rows + beam_ref.0 - position.0) % rows;
    let shift_c = (cols + beam_ref.1 - position.1) % cols;
    Zip::indexed(&mut residual).for_each(|(r, c), v| {
        *v -= amplitude * beam[((r + shift_r) % rows, (c + shift_c) % cols)];
    });
}

impl Deconvolver for Clean {
    fn algorithm(&self) -> DeconvolverType {
        DeconvolverType::Clean
    }

    fn deconvolve(
        &self,
        dirty: &DirtyProducts,
        ctx: &ImagingContext,
        cancel: &CancelToken,
    ) -> Result<Deconvolution, ImagingError> {
        self.params.validate()?;
        check_shapes(dirty, ctx)?;
        let geometry = *ctx.geometry();
        let params = &self.params;

        let mut residual = dirty.dirty.data.clone();
        let mut model = Array2::<f64>::zeros(geometry.shape());
        let beam = dirty.beam.data.view();
        let beam_ref = dirty.beam.reference_pixel;

        let mut warnings = vec![];
        let (mut peak_pos, mut peak_value) = peak_abs(residual.view());
        let threshold = self.threshold(residual.view(), peak_value.abs(), &mut warnings);
        debug!(
            "CLEAN: initial peak {peak_value:.6e} at {peak_pos:?}; threshold {threshold:.6e}"
        );

        let mut trace = vec1![TraceEntry {
            iteration: 0,
            metric: peak_value.abs(),
            min_model: 0.0,
        }];
        let mut components = vec![];
        let mut iterations = 0;
        let mut num_not_decreasing = 0;
        let mut termination = TerminationReason::MaxIterations;

        let pb = ctx.iteration_progress(params.max_iterations, "CLEANing".into());
        if peak_value.abs() <= threshold {
            termination = TerminationReason::Converged;
        } else {
            for iteration in 1..=params.max_iterations {
                if cancel.is_cancelled() {
                    termination = TerminationReason::Cancelled;
                    break;
                }

                let amplitude = params.gain * peak_value;
                subtract_beam(residual.view_mut(), beam, beam_ref, peak_pos, amplitude);
                model[peak_pos] += amplitude;
                components.push(CleanComponent {
                    iteration,
                    position: peak_pos,
                    amplitude,
                });
                iterations = iteration;
                pb.inc(1);

                let previous = peak_value.abs();
                (peak_pos, peak_value) = peak_abs(residual.view());
                trace.push(TraceEntry {
                    iteration,
                    metric: peak_value.abs(),
                    min_model: min_value(&model),
                });

                if peak_value.abs() <= threshold {
                    termination = TerminationReason::Converged;
                    break;
                }
                if peak_value.abs() >= previous {
                    num_not_decreasing += 1;
                    if num_not_decreasing >= params.stall_window {
                        termination = TerminationReason::Diverged;
                        break;
                    }
                } else {
                    num_not_decreasing = 0;
                }
            }
        }
        pb.abandon_with_message(format!("CLEAN: {termination} after {iterations} iterations"));
        info!(
            "CLEAN finished after {iterations} iterations ({termination}); peak residual {:.6e}",
            peak_value.abs()
        );

        let restoring_beam = self.restoring_beam(dirty, &mut warnings);
        let mut restored = restore(model.view(), &restoring_beam);
        restored += &residual;

        let model_flux = model.sum();
        Ok(Deconvolution {
            model: Image::new(model, &geometry),
            residual: Image::new(residual, &geometry),
            restored: Some(Image::new(restored, &geometry)),
            components,
            diagnostics: DeconvolutionDiagnostics {
                algorithm: DeconvolverType::Clean,
                iterations,
                termination,
                trace,
                model_flux,
                restoring_beam: Some(restoring_beam),
                mem: None,
                warnings,
            },
        })
    }
}
