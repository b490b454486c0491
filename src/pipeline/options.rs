//! Pipeline-wide configuration and per-spot requests.

use crate::baseline::BaselineModel;
use crate::edges::EdgeOptions;
use crate::smoothing::SmoothingOptions;
use crate::staircase::StaircaseOptions;
use serde::{Deserialize, Serialize};

/// Knobs shared by every spot processed with one pipeline instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Savitzky-Golay filter applied after baseline removal; `None` skips it.
    pub smoothing: Option<SmoothingOptions>,
    pub edge: EdgeOptions,
    pub staircase: StaircaseOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            smoothing: Some(SmoothingOptions::default()),
            edge: EdgeOptions::default(),
            staircase: StaircaseOptions::default(),
        }
    }
}

/// Caller parameters for one spot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitRequest {
    /// Steps to fit; the staircase gets `n_steps + 1` transitions and
    /// extraction reports `n_steps − 1` of them.
    pub n_steps: usize,
    /// Expected distance (µm) of the first step edge.
    pub x0_guess: f64,
    /// Overrides [`StaircaseOptions::nominal_height`] for this spot.
    #[serde(default)]
    pub nominal_height: Option<f64>,
    /// Precomputed background; skips the baseline fit when present.
    #[serde(default)]
    pub baseline: Option<BaselineModel>,
}

impl FitRequest {
    pub fn new(n_steps: usize, x0_guess: f64) -> Self {
        Self {
            n_steps,
            x0_guess,
            nominal_height: None,
            baseline: None,
        }
    }

    pub fn with_baseline(mut self, baseline: BaselineModel) -> Self {
        self.baseline = Some(baseline);
        self
    }

    pub fn with_nominal_height(mut self, height: f64) -> Self {
        self.nominal_height = Some(height);
        self
    }
}
