//! Step-edge localisation on a corrected profile.
//!
//! - Discrete derivative of height with respect to distance (central
//!   differences inside, one-sided at the ends).
//! - Search for the strongest slope inside a window around the caller's
//!   expected first-step position. The result seeds the staircase fit.

pub mod derivative;

pub use derivative::derivative;

use crate::error::{ProfileError, Result};
use crate::types::CorrectedTrace;
use log::debug;
use serde::{Deserialize, Serialize};

/// Search window expressed as multiples of the expected step position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeOptions {
    pub window_low: f64,
    pub window_high: f64,
}

impl Default for EdgeOptions {
    fn default() -> Self {
        Self {
            window_low: 0.7,
            window_high: 1.3,
        }
    }
}

impl EdgeOptions {
    /// Inclusive `[low, high]` distance bounds for `x0_guess`.
    pub fn bounds(&self, x0_guess: f64) -> (f64, f64) {
        let a = self.window_low * x0_guess;
        let b = self.window_high * x0_guess;
        (a.min(b), a.max(b))
    }
}

/// Estimated location of the first step edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepGuess {
    /// Distance (µm) of the steepest sample.
    pub position: f64,
    /// Sample index in the corrected trace.
    pub index: usize,
    /// Signed derivative (nm/µm) at that sample.
    pub slope: f64,
}

/// Locate the steepest sample of `corrected` within the window around `x0_guess`.
///
/// Ties keep the first sample. An empty window, or one with no finite
/// derivative, is reported as [`ProfileError::NoStepFound`].
pub fn locate_first_step(
    corrected: &CorrectedTrace,
    x0_guess: f64,
    options: &EdgeOptions,
) -> Result<StepGuess> {
    let (low, high) = options.bounds(x0_guess);
    if !low.is_finite() || !high.is_finite() {
        return Err(ProfileError::NoStepFound { low, high });
    }
    let slopes = derivative(&corrected.distance, &corrected.adjusted_height);

    let mut best: Option<StepGuess> = None;
    for (index, (&x, &slope)) in corrected.distance.iter().zip(&slopes).enumerate() {
        if x < low || x > high || !slope.is_finite() {
            continue;
        }
        let better = match best {
            Some(b) => slope.abs() > b.slope.abs(),
            None => true,
        };
        if better {
            best = Some(StepGuess {
                position: x,
                index,
                slope,
            });
        }
    }

    let guess = best.ok_or(ProfileError::NoStepFound { low, high })?;
    debug!(
        "first step at x={:.3} (index {}, slope {:.4}) within [{:.3}, {:.3}]",
        guess.position, guess.index, guess.slope, low, high
    );
    Ok(guess)
}
