//! Trace containers passed between pipeline stages.
//!
//! Distances are in micrometres, heights in nanometres.

use crate::error::{ProfileError, Result};
use serde::{Deserialize, Serialize};

/// Raw scan of one spot: `distance` (µm) against `raw_height` (nm).
///
/// Distances are finite and strictly increasing; both columns have the same
/// length. The constructor enforces this so downstream stages can rely on it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Trace {
    distance: Vec<f64>,
    raw_height: Vec<f64>,
}

impl Trace {
    /// Build a trace from two columns, validating shape and ordering.
    pub fn new(distance: Vec<f64>, raw_height: Vec<f64>) -> Result<Self> {
        if distance.len() != raw_height.len() {
            return Err(ProfileError::InvalidTrace(format!(
                "column length mismatch: distance={} raw_height={}",
                distance.len(),
                raw_height.len()
            )));
        }
        if let Some(idx) = distance.iter().position(|d| !d.is_finite()) {
            return Err(ProfileError::InvalidTrace(format!(
                "non-finite distance at sample {idx}"
            )));
        }
        if let Some(idx) = raw_height.iter().position(|h| !h.is_finite()) {
            return Err(ProfileError::InvalidTrace(format!(
                "non-finite height at sample {idx}"
            )));
        }
        if let Some(idx) = distance.windows(2).position(|w| w[1] <= w[0]) {
            return Err(ProfileError::InvalidTrace(format!(
                "distance not strictly increasing at sample {}",
                idx + 1
            )));
        }
        Ok(Self {
            distance,
            raw_height,
        })
    }

    pub fn len(&self) -> usize {
        self.distance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distance.is_empty()
    }

    pub fn distance(&self) -> &[f64] {
        &self.distance
    }

    pub fn raw_height(&self) -> &[f64] {
        &self.raw_height
    }

    /// Mean spacing between consecutive samples, `None` below two samples.
    pub fn mean_spacing(&self) -> Option<f64> {
        let n = self.distance.len();
        if n < 2 {
            return None;
        }
        Some((self.distance[n - 1] - self.distance[0]) / (n - 1) as f64)
    }
}

impl<'de> Deserialize<'de> for Trace {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Columns {
            distance: Vec<f64>,
            raw_height: Vec<f64>,
        }
        let cols = Columns::deserialize(deserializer)?;
        Trace::new(cols.distance, cols.raw_height).map_err(serde::de::Error::custom)
    }
}

/// Baseline-corrected (and optionally smoothed) trace.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CorrectedTrace {
    pub distance: Vec<f64>,
    pub adjusted_height: Vec<f64>,
    pub smoothed: bool,
}

impl CorrectedTrace {
    pub fn len(&self) -> usize {
        self.distance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distance.is_empty()
    }
}
