//! Synthetic profilometer traces.
//!
//! A trace is a quadratic background plus a train of rectangular pulses plus
//! seeded Gaussian noise (`rand_distr::Normal`). Used by the tests and by the
//! demo binary when no recorded trace is given.

use crate::baseline::BaselineModel;
use crate::error::{ProfileError, Result};
use crate::types::Trace;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// One raised segment `[start, end)` of the pattern (µm).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pulse {
    pub start: f64,
    pub end: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticProfile {
    pub samples: usize,
    /// Distance between consecutive samples (µm).
    pub spacing: f64,
    /// Background `a·x² + b·x + c` (nm).
    pub background: BaselineModel,
    pub pulses: Vec<Pulse>,
    /// Pulse height above the background (nm).
    pub pulse_height: f64,
    /// Standard deviation of the additive noise (nm); zero disables it.
    pub noise_sigma: f64,
    pub seed: u64,
}

impl Default for SyntheticProfile {
    fn default() -> Self {
        Self {
            samples: 4001,
            spacing: 1.0,
            background: BaselineModel::new(1e-6, 0.0, 0.0),
            pulses: vec![
                Pulse {
                    start: 1000.0,
                    end: 2000.0,
                },
                Pulse {
                    start: 3000.0,
                    end: 4001.0,
                },
            ],
            pulse_height: 50.0,
            noise_sigma: 1.0,
            seed: 7,
        }
    }
}

impl SyntheticProfile {
    /// Noise-free height at `x`.
    pub fn ideal_height(&self, x: f64) -> f64 {
        let raised = self.pulses.iter().any(|p| x >= p.start && x < p.end);
        self.background.evaluate(x) + if raised { self.pulse_height } else { 0.0 }
    }

    pub fn generate(&self) -> Result<Trace> {
        if self.spacing.is_nan() || self.spacing <= 0.0 {
            return Err(ProfileError::InvalidOptions(format!(
                "synthetic profile needs spacing > 0, got {}",
                self.spacing
            )));
        }
        let noise = Normal::new(0.0, self.noise_sigma).map_err(|e| {
            ProfileError::InvalidOptions(format!("noise_sigma {}: {e}", self.noise_sigma))
        })?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let distance: Vec<f64> = (0..self.samples).map(|i| i as f64 * self.spacing).collect();
        let raw_height = distance
            .iter()
            .map(|&x| self.ideal_height(x) + noise.sample(&mut rng))
            .collect();
        Trace::new(distance, raw_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn same_seed_same_trace() {
        let profile = SyntheticProfile::default();
        let a = profile.generate().unwrap();
        let b = profile.generate().unwrap();
        assert_eq!(a.raw_height(), b.raw_height());
        assert_eq!(a.len(), 4001);
        assert_eq!(a.distance()[4000], 4000.0);
    }

    #[test]
    fn noise_free_trace_matches_ideal() {
        let profile = SyntheticProfile {
            noise_sigma: 0.0,
            ..Default::default()
        };
        let trace = profile.generate().unwrap();
        assert_relative_eq!(trace.raw_height()[999], 0.998001, epsilon = 1e-9);
        assert_relative_eq!(trace.raw_height()[1000], 51.0, epsilon = 1e-9);
        assert_relative_eq!(trace.raw_height()[2000], 4.0, epsilon = 1e-9);
        // The second pulse is still raised on the last sample.
        assert_relative_eq!(trace.raw_height()[4000], 66.0, epsilon = 1e-9);
    }

    #[test]
    fn noise_has_requested_spread() {
        let profile = SyntheticProfile {
            background: BaselineModel::new(0.0, 0.0, 0.0),
            pulses: Vec::new(),
            noise_sigma: 2.0,
            ..Default::default()
        };
        let trace = profile.generate().unwrap();
        let n = trace.len() as f64;
        let mean = trace.raw_height().iter().sum::<f64>() / n;
        let var = trace.raw_height().iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 0.15, "mean {mean}");
        assert!((var.sqrt() - 2.0).abs() < 0.15, "std {}", var.sqrt());
    }

    #[test]
    fn rejects_bad_spacing() {
        let profile = SyntheticProfile {
            spacing: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            profile.generate(),
            Err(ProfileError::InvalidOptions(_))
        ));
    }

    #[test]
    fn rejects_negative_or_nan_noise() {
        for noise_sigma in [-1.0, f64::NAN] {
            let profile = SyntheticProfile {
                noise_sigma,
                ..Default::default()
            };
            assert!(matches!(
                profile.generate(),
                Err(ProfileError::InvalidOptions(_))
            ));
        }
    }

    #[test]
    fn different_seeds_differ() {
        let a = SyntheticProfile::default().generate().unwrap();
        let b = SyntheticProfile {
            seed: 8,
            ..Default::default()
        }
        .generate()
        .unwrap();
        assert_ne!(a.raw_height(), b.raw_height());
    }
}
