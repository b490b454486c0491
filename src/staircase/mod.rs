//! Multi-step (staircase) fitting.
//!
//! The corrected profile of a patterned wafer is a train of rectangular
//! pulses. The fitter:
//! 1. builds an alternating rise/fall guess from the located first edge
//!    ([`initial_guess`]);
//! 2. minimises `observed − staircase(distance; p)` over all samples with a
//!    robust Levenberg-Marquardt solver ([`solver::LevenbergMarquardt`]) and a
//!    forward-difference Jacobian.
//!
//! Modules
//! - [`model`] – transitions, evaluation, initial guess.
//! - [`options`] – span/height/loss/solver knobs.
//! - [`solver`] – generic robust least squares over a [`ResidualModel`].
//!
//! The staircase is discontinuous in its positions. A forward difference only
//! sees a position move when a sample lies inside the difference step, so in
//! practice positions stay close to their guess and the heights carry the fit.

pub mod model;
pub mod options;
pub mod solver;

pub use model::{initial_guess, StaircaseParameters, Transition};
pub use options::{RobustLoss, SolverOptions, StaircaseOptions};
pub use solver::{LevenbergMarquardt, ResidualModel, SolverStatus, SolverSummary};

use crate::error::{ProfileError, Result};
use crate::types::CorrectedTrace;
use log::debug;
use serde::Serialize;

/// Residuals of a staircase against a corrected trace.
pub struct StaircaseProblem<'a> {
    distance: &'a [f64],
    observed: &'a [f64],
}

impl<'a> StaircaseProblem<'a> {
    pub fn new(distance: &'a [f64], observed: &'a [f64]) -> Self {
        let n = distance.len().min(observed.len());
        Self {
            distance: &distance[..n],
            observed: &observed[..n],
        }
    }
}

impl ResidualModel for StaircaseProblem<'_> {
    fn num_residuals(&self) -> usize {
        self.distance.len()
    }

    fn residuals(&self, params: &[f64], out: &mut [f64]) {
        model::evaluate_flat_into(params, self.distance, out);
        for (r, &y) in out.iter_mut().zip(self.observed) {
            *r = y - *r;
        }
    }
}

/// Fitted staircase together with its starting point and solver report.
#[derive(Clone, Debug, Serialize)]
pub struct StaircaseFit {
    pub initial: StaircaseParameters,
    pub fitted: StaircaseParameters,
    pub summary: SolverSummary,
}

/// Fit an `n_steps + 1` transition staircase starting at `x0` to a corrected trace.
pub fn fit_staircase(
    corrected: &CorrectedTrace,
    x0: f64,
    n_steps: usize,
    options: &StaircaseOptions,
) -> Result<StaircaseFit> {
    let initial = initial_guess(x0, n_steps, options.nominal_height, options.total_span)?;
    fit_from_guess(corrected, initial, options)
}

/// Refine an explicit starting staircase.
pub fn fit_from_guess(
    corrected: &CorrectedTrace,
    initial: StaircaseParameters,
    options: &StaircaseOptions,
) -> Result<StaircaseFit> {
    let start = initial.to_flat();
    if corrected.len() < start.len() {
        return Err(ProfileError::InsufficientData {
            needed: start.len(),
            got: corrected.len(),
        });
    }
    let problem = StaircaseProblem::new(&corrected.distance, &corrected.adjusted_height);
    let solver = LevenbergMarquardt::new(options.solver.clone(), options.loss, options.f_scale);
    let outcome = solver.minimize(&problem, &start)?;

    let fitted = StaircaseParameters::from_flat(&outcome.params)?;
    if !fitted.is_finite() {
        return Err(ProfileError::FitDiverged(
            "fitted staircase has non-finite parameters".into(),
        ));
    }
    debug!(
        "staircase fit: {} transitions, {:?} after {} iterations",
        fitted.len(),
        outcome.summary.status,
        outcome.summary.iterations
    );
    Ok(StaircaseFit {
        initial,
        fitted,
        summary: outcome.summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(truth: &StaircaseParameters, n: usize) -> CorrectedTrace {
        let distance: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let adjusted_height = truth.curve(&distance);
        CorrectedTrace {
            distance,
            adjusted_height,
            smoothed: false,
        }
    }

    #[test]
    fn recovers_levels_of_exact_pulse_train() {
        let mut truth = initial_guess(500.0, 3, 1.0, 3000.0).unwrap();
        for (k, t) in truth.transitions.iter_mut().enumerate() {
            // Base level 0 before the first rise, 80 nm on each pulse.
            t.height = if k % 2 == 0 { 0.0 } else { 80.0 };
        }
        let trace = synthetic(&truth, 4001);
        let options = StaircaseOptions {
            total_span: 3000.0,
            ..Default::default()
        };
        let fit = fit_staircase(&trace, 500.0, 3, &options).unwrap();
        for (got, want) in fit.fitted.transitions.iter().zip(&truth.transitions) {
            assert!((got.height - want.height).abs() < 0.8, "{got:?} vs {want:?}");
            assert!((got.position - want.position).abs() <= 1.0);
        }
        assert!(fit.summary.final_cost < fit.summary.initial_cost);
    }

    #[test]
    fn too_few_samples_for_parameters() {
        let trace = CorrectedTrace {
            distance: vec![0.0, 1.0, 2.0],
            adjusted_height: vec![0.0; 3],
            smoothed: false,
        };
        assert_eq!(
            fit_staircase(&trace, 1.0, 1, &StaircaseOptions::default()).unwrap_err(),
            ProfileError::InsufficientData { needed: 4, got: 3 }
        );
    }
}
