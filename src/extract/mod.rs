//! Conversion of fitted staircase parameters into step positions and heights.
//!
//! Pairs are taken in emission order and rounded to 0.1 before differencing:
//! - midpoint `k` is `|x[k+1] − (x[k+1] − x[k]) / 2|`;
//! - height `k` is `|h[k] − h[k+1]|`, the level change at transition `k`.
//!
//! Both lists then lose their last element: it belongs to the closing pair of
//! the staircase, whose position never enters the model. The surviving lists
//! have `risers − 1` entries where `risers = transitions − 1`.

use crate::error::{ProfileError, Result};
use crate::staircase::StaircaseParameters;
use serde::{Deserialize, Serialize};

const MIN_RISERS: usize = 2;

/// Step statistics derived from a fitted staircase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSteps {
    /// Step midpoints (µm).
    pub positions: Vec<f64>,
    /// Step heights (nm), parallel to `positions`.
    pub heights: Vec<f64>,
    /// Mean of `heights`, rounded to an integer (nm).
    pub measured_height: f64,
}

impl ExtractedSteps {
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }
}

/// Round to one decimal, ties to even.
#[inline]
pub(crate) fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// Derive step midpoints, heights and their mean from `params`.
pub fn extract_steps(params: &StaircaseParameters) -> Result<ExtractedSteps> {
    let risers = params.risers();
    if risers < MIN_RISERS {
        return Err(ProfileError::InsufficientSteps { risers });
    }

    let positions: Vec<f64> = params.positions().into_iter().map(round_tenth).collect();
    let heights: Vec<f64> = params.heights().into_iter().map(round_tenth).collect();

    let mut midpoints: Vec<f64> = positions
        .windows(2)
        .map(|w| round_tenth((w[1] - (w[1] - w[0]) / 2.0).abs()))
        .collect();
    let mut steps: Vec<f64> = heights
        .windows(2)
        .map(|w| round_tenth((w[0] - w[1]).abs()))
        .collect();
    // TODO: re-derive from the staircase geometry whether the last level
    // change (steps[risers - 1]) is ever a genuine step worth keeping.
    midpoints.pop();
    steps.pop();

    let mean = steps.iter().sum::<f64>() / steps.len() as f64;
    let measured_height = mean.round_ties_even();
    Ok(ExtractedSteps {
        positions: midpoints,
        heights: steps,
        measured_height,
    })
}
