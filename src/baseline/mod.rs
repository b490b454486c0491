//! Quadratic background removal.
//!
//! The profilometer stage adds a smooth bow to every scan. It is modelled as
//! `a·x² + b·x + c` and fitted by ordinary least squares over the whole trace,
//! steps included. Distances are normalised to `[-1, 1]` before solving so the
//! Vandermonde columns stay well conditioned over millimetre-long scans.

use crate::error::{ProfileError, Result};
use crate::types::{CorrectedTrace, Trace};
use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

const MIN_SAMPLES: usize = 3;
const SVD_EPS: f64 = 1e-12;

/// Coefficients of the quadratic background `a·x² + b·x + c`.
///
/// Units: `a` in nm/µm², `b` in nm/µm, `c` in nm.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaselineModel {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl BaselineModel {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    #[inline]
    pub fn evaluate(&self, x: f64) -> f64 {
        (self.a * x + self.b) * x + self.c
    }

    /// Baseline sampled on a distance axis, for overlay plots.
    pub fn curve(&self, distance: &[f64]) -> Vec<f64> {
        distance.iter().map(|&x| self.evaluate(x)).collect()
    }

    pub fn coefficients(&self) -> [f64; 3] {
        [self.a, self.b, self.c]
    }

    pub fn is_finite(&self) -> bool {
        self.a.is_finite() && self.b.is_finite() && self.c.is_finite()
    }
}

/// Fit the quadratic background of `trace`.
pub fn fit_baseline(trace: &Trace) -> Result<BaselineModel> {
    let n = trace.len();
    if n < MIN_SAMPLES {
        return Err(ProfileError::InsufficientData {
            needed: MIN_SAMPLES,
            got: n,
        });
    }
    let x = trace.distance();
    let y = trace.raw_height();

    let (lo, hi) = (x[0], x[n - 1]);
    let mid = 0.5 * (lo + hi);
    let half = (0.5 * (hi - lo)).max(f64::MIN_POSITIVE);

    let design = DMatrix::from_fn(n, 3, |row, col| {
        let u = (x[row] - mid) / half;
        u.powi(col as i32)
    });
    let rhs = DVector::from_column_slice(y);
    let coeffs = design
        .svd(true, true)
        .solve(&rhs, SVD_EPS)
        .map_err(|e| ProfileError::FitDiverged(format!("baseline solve failed: {e}")))?;

    // q(u) = α + βu + γu² with u = (x - m)/s, expanded back into powers of x.
    let (alpha, beta, gamma) = (coeffs[0], coeffs[1], coeffs[2]);
    let s2 = half * half;
    let model = BaselineModel {
        a: gamma / s2,
        b: beta / half - 2.0 * gamma * mid / s2,
        c: alpha - beta * mid / half + gamma * mid * mid / s2,
    };
    if !model.is_finite() {
        return Err(ProfileError::FitDiverged(
            "baseline coefficients are not finite".into(),
        ));
    }
    debug!(
        "baseline fit over {} samples: a={:.6e} b={:.6e} c={:.6e}",
        n, model.a, model.b, model.c
    );
    Ok(model)
}

/// Subtract `model` from the raw heights of `trace`.
pub fn apply_baseline(trace: &Trace, model: &BaselineModel) -> CorrectedTrace {
    let adjusted_height = trace
        .distance()
        .iter()
        .zip(trace.raw_height())
        .map(|(&x, &h)| h - model.evaluate(x))
        .collect();
    CorrectedTrace {
        distance: trace.distance().to_vec(),
        adjusted_height,
        smoothed: false,
    }
}
