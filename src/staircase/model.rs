//! Staircase model and its initial guess.

use crate::error::{ProfileError, Result};
use serde::{Deserialize, Serialize};

/// One `(position, height)` pair of the staircase parameter vector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Distance (µm) at which the level changes.
    pub position: f64,
    /// Height (nm) carried by this pair.
    pub height: f64,
}

/// Piecewise-constant profile described by an ordered list of transitions.
///
/// Evaluation at `x`:
/// - before the first transition the level is the first pair's height;
/// - at or after transition `k` the level is the height of pair `k + 1`.
///
/// Later transitions override earlier ones, so the last pair only contributes
/// its height to the segment opened by the second-to-last position. Positions
/// are not required to be sorted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaircaseParameters {
    pub transitions: Vec<Transition>,
}

impl StaircaseParameters {
    pub fn new(transitions: Vec<Transition>) -> Self {
        Self { transitions }
    }

    /// Rebuild from the flat `[x0, h0, x1, h1, ...]` vector.
    pub fn from_flat(flat: &[f64]) -> Result<Self> {
        if flat.is_empty() || flat.len() % 2 != 0 {
            return Err(ProfileError::InvalidOptions(format!(
                "staircase vector needs a positive even length, got {}",
                flat.len()
            )));
        }
        let transitions = flat
            .chunks_exact(2)
            .map(|pair| Transition {
                position: pair[0],
                height: pair[1],
            })
            .collect();
        Ok(Self { transitions })
    }

    pub fn to_flat(&self) -> Vec<f64> {
        self.transitions
            .iter()
            .flat_map(|t| [t.position, t.height])
            .collect()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Number of effective level changes (`transitions - 1`).
    pub fn risers(&self) -> usize {
        self.transitions.len().saturating_sub(1)
    }

    pub fn positions(&self) -> Vec<f64> {
        self.transitions.iter().map(|t| t.position).collect()
    }

    pub fn heights(&self) -> Vec<f64> {
        self.transitions.iter().map(|t| t.height).collect()
    }

    pub fn is_finite(&self) -> bool {
        self.transitions
            .iter()
            .all(|t| t.position.is_finite() && t.height.is_finite())
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        evaluate_flat(&self.to_flat(), x)
    }

    /// Model sampled on a distance axis, for overlay plots.
    pub fn curve(&self, distance: &[f64]) -> Vec<f64> {
        let flat = self.to_flat();
        let mut out = vec![0.0; distance.len()];
        evaluate_flat_into(&flat, distance, &mut out);
        out
    }
}

/// Evaluate the flat parameter vector at a single distance.
#[inline]
pub(crate) fn evaluate_flat(flat: &[f64], x: f64) -> f64 {
    let mut y = flat.get(1).copied().unwrap_or(0.0);
    let pairs = flat.len() / 2;
    for k in 0..pairs.saturating_sub(1) {
        if x >= flat[2 * k] {
            y = flat[2 * k + 3];
        }
    }
    y
}

pub(crate) fn evaluate_flat_into(flat: &[f64], distance: &[f64], out: &mut [f64]) {
    for (o, &x) in out.iter_mut().zip(distance) {
        *o = evaluate_flat(flat, x);
    }
}

/// Alternating up/down guess with `n_steps + 1` transitions.
///
/// With `L = total_span / (2·n_steps)`, transition `j` sits at `x0 + jL`.
/// Even transitions carry `nominal_height` and odd ones zero, so the list
/// reads rise, fall, rise, ... from the located edge onwards. The flat vector
/// has `2·(n_steps + 1)` entries and extraction reports `n_steps − 1` steps.
pub fn initial_guess(
    x0: f64,
    n_steps: usize,
    nominal_height: f64,
    total_span: f64,
) -> Result<StaircaseParameters> {
    if n_steps == 0 {
        return Err(ProfileError::InvalidOptions(
            "n_steps must be positive".into(),
        ));
    }
    if !(total_span.is_finite() && total_span > 0.0) {
        return Err(ProfileError::InvalidOptions(format!(
            "total_span must be positive and finite, got {total_span}"
        )));
    }
    if !x0.is_finite() || !nominal_height.is_finite() {
        return Err(ProfileError::InvalidOptions(
            "initial guess needs a finite x0 and nominal height".into(),
        ));
    }
    let length = total_span / (2 * n_steps) as f64;
    let transitions = (0..=n_steps)
        .map(|j| Transition {
            position: x0 + length * j as f64,
            height: if j % 2 == 0 { nominal_height } else { 0.0 },
        })
        .collect();
    Ok(StaircaseParameters { transitions })
}
