// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The maximum-entropy method.
//!
//! The model maximises `entropy_weight * S(m) - lambda * chi2(m)`, where `S`
//! is the Skilling entropy relative to a flat prior and `chi2` is the reduced
//! chi-squared between the model's visibilities and the gridded data. The
//! Lagrange multiplier `lambda` is adjusted every iteration to steer `chi2`
//! towards its target. Updates are multiplicative, so the model can never be
//! negative.
//!
//! The data are the visibilities in their nearest grid cells, whatever kernel
//! made the dirty image, so that the model's transform can be compared with
//! them cell by cell.

use log::{debug, info, warn};
use ndarray::{prelude::*, Zip};
use vec1::vec1;

use super::{
    check_shapes, min_value, Deconvolution, DeconvolutionDiagnostics, Deconvolver, MemSummary,
    TerminationReason, TraceEntry,
};
use crate::{
    c64,
    constants::{MEM_LAMBDA_FACTOR, MEM_MAX_STEP_SIZE, MEM_MIN_RELATIVE_IMPROVEMENT},
    context::{CancelToken, ImagingContext},
    dirty::DirtyProducts,
    error::{ImagingError, NumericalWarning},
    image::Image,
    params::{ConfigError, DeconvolverType, MemParams},
};

/// Steps are halved at most this many times when they move chi-squared away
/// from its target.
const MAX_BACKTRACKS: usize = 30;

/// Maximum-entropy deconvolution.
#[derive(Debug, Clone)]
pub struct Mem {
    params: MemParams,
}

impl Mem {
    pub fn new(params: MemParams) -> Mem {
        Mem { params }
    }
}

/// The data a MEM model is compared against.
struct MemProblem<'a> {
    ctx: &'a ImagingContext,

    /// The weighted-mean visibility of each sampled cell; zero elsewhere.
    observed: Array2<c64>,

    /// The total weight of each cell; zero where nothing was sampled.
    weights: Array2<f64>,

    num_cells: usize,

    /// Converts the transform of a model image into visibility units. This
    /// depends on the image normalisation.
    model_to_vis: f64,
}

impl<'a> MemProblem<'a> {
    fn new(dirty: &DirtyProducts, ctx: &'a ImagingContext) -> MemProblem<'a> {
        let mut observed = Array2::zeros(dirty.cell_vis_grid.dim());
        let mut num_cells = 0;
        Zip::from(&mut observed)
            .and(&dirty.cell_vis_grid)
            .and(&dirty.cell_weights)
            .for_each(|o, &v, &w| {
                if w > 0.0 {
                    *o = v / w;
                    num_cells += 1;
                }
            });
        let weights = dirty.cell_weights.mapv(|w| w.max(0.0));

        let num_pixels = dirty.grid_params.geometry.num_pixels();
        MemProblem {
            ctx,
            observed,
            weights,
            num_cells,
            model_to_vis: num_pixels as f64 / dirty.normalisation.scale(num_pixels),
        }
    }

    fn predict(&self, model: ArrayView2<f64>) -> Result<Array2<c64>, ConfigError> {
        let mut predicted = self.ctx.engine().to_grid(model)?;
        let k = self.model_to_vis;
        predicted.mapv_inplace(|v| v * k);
        Ok(predicted)
    }

    fn chi2(&self, predicted: &Array2<c64>) -> f64 {
        let sum = Zip::from(predicted)
            .and(&self.observed)
            .and(&self.weights)
            .fold(0.0, |acc, &p, &v, &w| acc + w * (p - v).norm_sqr());
        sum / self.num_cells.max(1) as f64
    }

    /// The derivative of chi-squared with respect to each model pixel.
    fn chi2_gradient(&self, predicted: &Array2<c64>) -> Result<Array2<f64>, ConfigError> {
        let weighted = Zip::from(predicted)
            .and(&self.observed)
            .and(&self.weights)
            .map_collect(|&p, &v, &w| (p - v) * w);
        let (mut gradient, _) = self.ctx.engine().to_image(weighted.view())?;
        let num_pixels = self.ctx.geometry().num_pixels() as f64;
        let factor = 2.0 * self.model_to_vis * num_pixels / self.num_cells.max(1) as f64;
        gradient *= factor;
        Ok(gradient)
    }

    /// The largest observed visibility amplitude spread evenly over the
    /// image, in model units.
    fn flat_prior(&self) -> f64 {
        let max_vis = self.observed.iter().fold(0.0_f64, |acc, v| acc.max(v.norm()));
        let num_pixels = self.ctx.geometry().num_pixels() as f64;
        let prior = max_vis / (num_pixels * self.model_to_vis);
        if prior > 0.0 {
            prior
        } else {
            f64::MIN_POSITIVE.sqrt()
        }
    }
}

/// The model closest to the chi-squared target so far.
struct BestIterate {
    distance: f64,
    model: Array2<f64>,
    predicted: Array2<c64>,
    chi2: f64,
    lambda: f64,
}

/// The Skilling entropy of `model` relative to the flat prior `prior`.
fn entropy(model: &Array2<f64>, prior: f64) -> f64 {
    model
        .iter()
        .map(|&m| {
            if m > 0.0 {
                m - prior - m * (m / prior).ln()
            } else {
                -prior
            }
        })
        .sum()
}

impl Deconvolver for Mem {
    fn algorithm(&self) -> DeconvolverType {
        DeconvolverType::Mem
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
        let MemParams {
            target_chi2: target,
            tolerance,
            entropy_weight,
            step_size,
            max_iterations,
            stall_window,
            unreachable_factor,
        } = self.params;

        let problem = MemProblem::new(dirty, ctx);
        let prior = problem.flat_prior();
        let tiny = f64::MIN_POSITIVE;
        let mut model = Array2::from_elem(geometry.shape(), prior);
        let mut predicted = problem.predict(model.view())?;
        let mut chi2 = problem.chi2(&predicted);

        let max_gradient = problem
            .chi2_gradient(&predicted)?
            .iter()
            .fold(0.0_f64, |acc, g| acc.max(g.abs()));
        let mut lambda = if max_gradient > 0.0 {
            1.0 / max_gradient
        } else {
            1.0
        };
        let mut step = step_size;
        debug!(
            "MEM: {} sampled cells, prior {prior:.6e}, initial chi2 {chi2:.6e}, lambda {lambda:.6e}",
            problem.num_cells
        );

        let mut trace = vec1![TraceEntry {
            iteration: 0,
            metric: chi2,
            min_model: min_value(&model),
        }];
        let mut iterations = 0;
        let mut best_distance = (chi2 - target).abs();
        let mut best = BestIterate {
            distance: best_distance,
            model: model.clone(),
            predicted: predicted.clone(),
            chi2,
            lambda,
        };
        let mut num_not_improving = 0;
        let mut termination = TerminationReason::MaxIterations;

        let pb = ctx.iteration_progress(max_iterations, "MEM".into());
        if (chi2 - target).abs() <= tolerance * target {
            termination = TerminationReason::Converged;
        } else {
            for iteration in 1..=max_iterations {
                if cancel.is_cancelled() {
                    termination = TerminationReason::Cancelled;
                    break;
                }

                let chi2_gradient = problem.chi2_gradient(&predicted)?;
                let mut gradient = Array2::zeros(geometry.shape());
                Zip::from(&mut gradient)
                    .and(&model)
                    .and(&chi2_gradient)
                    .for_each(|g, &m, &dc| {
                        *g = -entropy_weight * (m.max(tiny) / prior).ln() - lambda * dc;
                    });
                let max_g = gradient.iter().fold(0.0_f64, |acc, g| acc.max(g.abs()));
                if !(max_g > 0.0 && max_g.is_finite()) {
                    termination = TerminationReason::Stalled;
                    break;
                }

                // Take a multiplicative step, shrinking it while it moves
                // chi-squared away from the target.
                let distance = (chi2 - target).abs();
                let mut backtracks = 0;
                let (trial, trial_predicted, trial_chi2) = loop {
                    let eta = step / max_g;
                    let mut trial = model.clone();
                    Zip::from(&mut trial)
                        .and(&gradient)
                        .for_each(|m, &g| *m = (*m * (eta * g).exp()).max(0.0));
                    let trial_predicted = problem.predict(trial.view())?;
                    let trial_chi2 = problem.chi2(&trial_predicted);
                    if (trial_chi2 - target).abs() > distance && backtracks < MAX_BACKTRACKS {
                        step *= 0.5;
                        backtracks += 1;
                        continue;
                    }
                    break (trial, trial_predicted, trial_chi2);
                };
                // Overshooting the target means the step is too big.
                if (trial_chi2 > target) != (chi2 > target) {
                    step *= 0.5;
                } else {
                    step = (step * 1.1).min(MEM_MAX_STEP_SIZE);
                }
                model = trial;
                predicted = trial_predicted;
                chi2 = trial_chi2;
                if chi2 > target {
                    lambda *= MEM_LAMBDA_FACTOR;
                } else {
                    lambda /= MEM_LAMBDA_FACTOR;
                }

                iterations = iteration;
                pb.inc(1);
                trace.push(TraceEntry {
                    iteration,
                    metric: chi2,
                    min_model: min_value(&model),
                });

                let distance = (chi2 - target).abs();
                if distance < best.distance {
                    best = BestIterate {
                        distance,
                        model: model.clone(),
                        predicted: predicted.clone(),
                        chi2,
                        lambda,
                    };
                }
                if distance <= tolerance * target {
                    termination = TerminationReason::Converged;
                    break;
                }
                if distance < best_distance * (1.0 - MEM_MIN_RELATIVE_IMPROVEMENT) {
                    best_distance = distance;
                    num_not_improving = 0;
                } else {
                    num_not_improving += 1;
                    if num_not_improving >= stall_window {
                        termination = if best.chi2 > unreachable_factor * target {
                            TerminationReason::TargetUnreachable
                        } else {
                            TerminationReason::Stalled
                        };
                        break;
                    }
                }
            }
        }
        // Runs that stop early keep the iterate closest to the target.
        if matches!(
            termination,
            TerminationReason::Stalled
                | TerminationReason::TargetUnreachable
                | TerminationReason::MaxIterations
        ) && best.distance < (chi2 - target).abs()
        {
            debug!(
                "MEM: keeping the iterate with chi2 {:.6e} rather than the last ({chi2:.6e})",
                best.chi2
            );
            model = best.model;
            predicted = best.predicted;
            chi2 = best.chi2;
            lambda = best.lambda;
        }
        pb.abandon_with_message(format!("MEM: {termination} after {iterations} iterations"));
        info!("MEM finished after {iterations} iterations ({termination}); chi2 {chi2:.6e}");

        let mut warnings = vec![];
        if chi2 > unreachable_factor * target {
            let w = NumericalWarning::Chi2TargetUnreachable { target, chi2 };
            warn!("{w}");
            warnings.push(w);
        }

        // The residual is whatever the model doesn't explain, imaged in the
        // dirty image's units.
        let residual_grid = Zip::from(&dirty.cell_vis_grid)
            .and(&dirty.cell_weights)
            .and(&predicted)
            .map_collect(|&v, &w, &p| v - p * w);
        let residual = dirty.image_from_cells(residual_grid.view(), ctx)?;

        let summary = MemSummary {
            chi2,
            entropy: entropy(&model, prior),
            lambda,
            prior,
        };
        let model_flux = model.sum();
        Ok(Deconvolution {
            model: Image::new(model, &geometry),
            residual: Image::new(residual, &geometry),
            restored: None,
            components: vec![],
            diagnostics: DeconvolutionDiagnostics {
                algorithm: DeconvolverType::Mem,
                iterations,
                termination,
                trace,
                model_flux,
                restoring_beam: None,
                mem: Some(summary),
                warnings,
            },
        })
    }
}
