//! Parameters of the staircase fit and its least-squares solver.

use serde::{Deserialize, Serialize};

/// Loss applied to scaled residuals `z = (r / f_scale)²`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobustLoss {
    /// Plain least squares, `ρ(z) = z`.
    Linear,
    /// `ρ(z) = 2(√(1+z) − 1)`: quadratic near zero, linear for large residuals.
    #[default]
    SoftL1,
    /// `ρ(z) = z` for `z ≤ 1`, `2√z − 1` beyond.
    Huber,
}

impl RobustLoss {
    #[inline]
    pub fn rho(&self, z: f64) -> f64 {
        match self {
            Self::Linear => z,
            Self::SoftL1 => 2.0 * ((1.0 + z).sqrt() - 1.0),
            Self::Huber => {
                if z <= 1.0 {
                    z
                } else {
                    2.0 * z.sqrt() - 1.0
                }
            }
        }
    }

    /// First derivative `ρ'(z)`, used as the IRLS weight.
    #[inline]
    pub fn weight(&self, z: f64) -> f64 {
        match self {
            Self::Linear => 1.0,
            Self::SoftL1 => 1.0 / (1.0 + z).sqrt(),
            Self::Huber => {
                if z <= 1.0 {
                    1.0
                } else {
                    1.0 / z.sqrt()
                }
            }
        }
    }
}

/// Levenberg-Marquardt knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Hard iteration cap; reaching it is reported as a diverged fit.
    pub max_iterations: usize,
    /// Stop when the relative cost decrease of an accepted step falls below this.
    pub ftol: f64,
    /// Stop when `‖δ‖ ≤ xtol·(xtol + ‖p‖)`.
    pub xtol: f64,
    /// Stop when the max-norm of the gradient falls below this.
    pub gtol: f64,
    /// Relative forward-difference step, scaled by `max(1, |p|)`.
    pub jacobian_rel_step: f64,
    /// Starting Marquardt damping factor.
    pub initial_damping: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            ftol: 1e-8,
            xtol: 1e-8,
            gtol: 1e-8,
            jacobian_rel_step: f64::EPSILON.sqrt(),
            initial_damping: 1e-3,
        }
    }
}

/// Staircase fit configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaircaseOptions {
    /// Distance (µm) covered by the pulse train of the initial guess.
    pub total_span: f64,
    /// Height (nm) of the raised level in the initial guess.
    pub nominal_height: f64,
    pub loss: RobustLoss,
    /// Residual scale (nm) separating inliers from outliers for robust losses.
    pub f_scale: f64,
    pub solver: SolverOptions,
}

impl Default for StaircaseOptions {
    fn default() -> Self {
        Self {
            total_span: 4000.0,
            nominal_height: 1.0,
            loss: RobustLoss::SoftL1,
            f_scale: 1.0,
            solver: SolverOptions::default(),
        }
    }
}
