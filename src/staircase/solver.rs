//! Robust Levenberg-Marquardt least squares with a forward-difference Jacobian.
//!
//! Each iteration linearises the residuals around the current parameters,
//! weights every residual with the loss derivative `ρ'(z)` (IRLS) and solves
//! the Marquardt-damped normal equations
//!
//! ```text
//! (JᵀWJ + λ·diag(JᵀWJ)) δ = −JᵀW r
//! ```
//!
//! A step is accepted only when it lowers the robust cost
//! `½·f²·Σ ρ((r/f)²)`; otherwise the damping grows tenfold and the step is
//! recomputed. Zero Jacobian columns (a transition with no sample inside its
//! difference step) get a small diagonal floor so the system stays definite
//! and their update is exactly zero.

use super::options::{RobustLoss, SolverOptions};
use crate::error::{ProfileError, Result};
use log::{debug, trace, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

const DAMPING_MIN: f64 = 1e-12;
const DAMPING_MAX: f64 = 1e16;
const DIAG_FLOOR: f64 = 1e-12;

/// Residual function `r(p)` minimised by the solver.
pub trait ResidualModel {
    fn num_residuals(&self) -> usize;
    /// Write `r(params)` into `out` (length [`Self::num_residuals`]).
    fn residuals(&self, params: &[f64], out: &mut [f64]);
}

/// Why the solver stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    /// Gradient max-norm below `gtol`.
    GradientTolerance,
    /// Relative cost decrease below `ftol`.
    CostTolerance,
    /// Step norm below `xtol`.
    StepTolerance,
    /// No step lowers the cost even at maximal damping.
    NoFurtherDecrease,
}

/// Convergence report of a solver run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverSummary {
    pub status: SolverStatus,
    pub iterations: usize,
    pub residual_evaluations: usize,
    pub initial_cost: f64,
    pub final_cost: f64,
}

#[derive(Clone, Debug)]
pub struct SolverOutcome {
    pub params: Vec<f64>,
    pub summary: SolverSummary,
}

/// Levenberg-Marquardt driver parameterised by a robust loss.
pub struct LevenbergMarquardt {
    options: SolverOptions,
    loss: RobustLoss,
    f_scale: f64,
}

impl LevenbergMarquardt {
    pub fn new(options: SolverOptions, loss: RobustLoss, f_scale: f64) -> Self {
        Self {
            options,
            loss,
            f_scale,
        }
    }

    /// Minimise the robust cost of `model` starting from `initial`.
    pub fn minimize<M: ResidualModel>(&self, model: &M, initial: &[f64]) -> Result<SolverOutcome> {
        if !(self.f_scale.is_finite() && self.f_scale > 0.0) {
            return Err(ProfileError::InvalidOptions(format!(
                "f_scale must be positive, got {}",
                self.f_scale
            )));
        }
        let m = initial.len();
        let n = model.num_residuals();
        if m == 0 {
            return Err(ProfileError::InvalidOptions(
                "solver needs at least one parameter".into(),
            ));
        }
        if initial.iter().any(|p| !p.is_finite()) {
            return Err(ProfileError::FitDiverged(
                "initial parameters are not finite".into(),
            ));
        }

        let mut params = initial.to_vec();
        let mut residuals = vec![0.0; n];
        model.residuals(&params, &mut residuals);
        let mut evaluations = 1usize;
        let mut cost = self.cost(&residuals);
        if !cost.is_finite() {
            return Err(ProfileError::FitDiverged(
                "initial cost is not finite".into(),
            ));
        }
        let initial_cost = cost;
        let mut damping = self.options.initial_damping.max(DAMPING_MIN);

        let mut jacobian = DMatrix::<f64>::zeros(n, m);
        let mut shifted_residuals = vec![0.0; n];
        let mut trial_residuals = vec![0.0; n];

        for iteration in 1..=self.options.max_iterations {
            self.jacobian(model, &params, &residuals, &mut jacobian, &mut shifted_residuals);
            evaluations += m;

            let weights = DVector::from_iterator(n, residuals.iter().map(|&r| self.weight(r)));
            let weighted_r = DVector::from_iterator(
                n,
                residuals.iter().zip(weights.iter()).map(|(r, w)| r * w),
            );
            let gradient = jacobian.transpose() * &weighted_r;
            let mut weighted_j = jacobian.clone();
            for (mut row, &w) in weighted_j.row_iter_mut().zip(weights.iter()) {
                row *= w;
            }
            let normal = jacobian.transpose() * &weighted_j;

            if gradient.amax() <= self.options.gtol {
                return Ok(self.finish(
                    params,
                    SolverStatus::GradientTolerance,
                    iteration,
                    evaluations,
                    initial_cost,
                    cost,
                ));
            }

            let diag_max = normal.diagonal().amax().max(1.0);
            let floor = DIAG_FLOOR * diag_max;

            loop {
                let mut system = normal.clone();
                for j in 0..m {
                    system[(j, j)] += damping * normal[(j, j)].max(floor);
                }
                let step = match system.cholesky() {
                    Some(chol) => chol.solve(&(-&gradient)),
                    None => {
                        damping *= 10.0;
                        if damping > DAMPING_MAX {
                            return Ok(self.finish(
                                params,
                                SolverStatus::NoFurtherDecrease,
                                iteration,
                                evaluations,
                                initial_cost,
                                cost,
                            ));
                        }
                        continue;
                    }
                };

                let trial: Vec<f64> = params.iter().zip(step.iter()).map(|(p, d)| p + d).collect();
                model.residuals(&trial, &mut trial_residuals);
                evaluations += 1;
                let trial_cost = self.cost(&trial_residuals);

                if trial_cost.is_finite() && trial_cost < cost {
                    let decrease = cost - trial_cost;
                    let step_norm = step.norm();
                    let param_norm = params.iter().map(|p| p * p).sum::<f64>().sqrt();
                    trace!(
                        "lm iter {iteration}: cost {cost:.6e} -> {trial_cost:.6e}, damping {damping:.1e}"
                    );
                    params = trial;
                    std::mem::swap(&mut residuals, &mut trial_residuals);
                    cost = trial_cost;
                    damping = (damping / 10.0).max(DAMPING_MIN);

                    if params.iter().any(|p| !p.is_finite()) {
                        return Err(ProfileError::FitDiverged(
                            "parameters became non-finite".into(),
                        ));
                    }
                    if decrease <= self.options.ftol * (cost + decrease) {
                        return Ok(self.finish(
                            params,
                            SolverStatus::CostTolerance,
                            iteration,
                            evaluations,
                            initial_cost,
                            cost,
                        ));
                    }
                    if step_norm <= self.options.xtol * (self.options.xtol + param_norm) {
                        return Ok(self.finish(
                            params,
                            SolverStatus::StepTolerance,
                            iteration,
                            evaluations,
                            initial_cost,
                            cost,
                        ));
                    }
                    break;
                }

                damping *= 10.0;
                if damping > DAMPING_MAX {
                    return Ok(self.finish(
                        params,
                        SolverStatus::NoFurtherDecrease,
                        iteration,
                        evaluations,
                        initial_cost,
                        cost,
                    ));
                }
            }
        }

        warn!(
            "least squares did not converge within {} iterations (cost {:.6e})",
            self.options.max_iterations, cost
        );
        Err(ProfileError::FitDiverged(format!(
            "no convergence within {} iterations",
            self.options.max_iterations
        )))
    }

    /// Robust cost `½·f²·Σ ρ((r/f)²)`.
    pub fn cost(&self, residuals: &[f64]) -> f64 {
        let f2 = self.f_scale * self.f_scale;
        0.5 * f2
            * residuals
                .iter()
                .map(|&r| self.loss.rho(r * r / f2))
                .sum::<f64>()
    }

    #[inline]
    fn weight(&self, r: f64) -> f64 {
        let z = (r / self.f_scale).powi(2);
        self.loss.weight(z)
    }

    fn jacobian<M: ResidualModel>(
        &self,
        model: &M,
        params: &[f64],
        residuals: &[f64],
        jacobian: &mut DMatrix<f64>,
        shifted_residuals: &mut [f64],
    ) {
        let mut shifted = params.to_vec();
        for j in 0..params.len() {
            let h = self.options.jacobian_rel_step * params[j].abs().max(1.0);
            shifted[j] = params[j] + h;
            model.residuals(&shifted, shifted_residuals);
            // The realised step can differ from `h` after rounding.
            let dh = shifted[j] - params[j];
            for (i, (&rp, &r0)) in shifted_residuals.iter().zip(residuals).enumerate() {
                jacobian[(i, j)] = (rp - r0) / dh;
            }
            shifted[j] = params[j];
        }
    }

    fn finish(
        &self,
        params: Vec<f64>,
        status: SolverStatus,
        iterations: usize,
        residual_evaluations: usize,
        initial_cost: f64,
        final_cost: f64,
    ) -> SolverOutcome {
        debug!(
            "lm stopped ({status:?}) after {iterations} iterations: cost {initial_cost:.6e} -> {final_cost:.6e}"
        );
        SolverOutcome {
            params,
            summary: SolverSummary {
                status,
                iterations,
                residual_evaluations,
                initial_cost,
                final_cost,
            },
        }
    }
}
