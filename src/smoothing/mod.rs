//! Savitzky-Golay smoothing of a single height column.
//!
//! Every output sample is the value, at that sample, of the least-squares
//! polynomial of order `polyorder` fitted over a `window`-sample neighbourhood.
//! The neighbourhood of sample `i` starts at `i - window/2`; close to either end
//! it is clamped to the first or last `window` samples and the polynomial is
//! evaluated at the sample's offset inside the clamped window. With
//! `polyorder = 0` the filter is a centered moving average.
//!
//! All evaluation weights are rows of the window's hat matrix `A·A⁺`, computed
//! once per call.

use crate::error::{ProfileError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

const PINV_EPS: f64 = 1e-12;

/// Filter geometry used by the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingOptions {
    /// Number of samples in the local fit.
    pub window: usize,
    /// Order of the local polynomial; must be below `window`.
    pub polyorder: usize,
}

impl Default for SmoothingOptions {
    fn default() -> Self {
        Self {
            window: 100,
            polyorder: 0,
        }
    }
}

impl SmoothingOptions {
    pub fn apply(&self, column: &[f64]) -> Result<Vec<f64>> {
        smooth(column, self.window, self.polyorder)
    }
}

/// Smooth `column` with a Savitzky-Golay filter.
pub fn smooth(column: &[f64], window: usize, polyorder: usize) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(ProfileError::InvalidOptions(
            "smoothing window must be positive".into(),
        ));
    }
    if polyorder >= window {
        return Err(ProfileError::InvalidOptions(format!(
            "polyorder {polyorder} must be less than window {window}"
        )));
    }
    let n = column.len();
    if n < window {
        return Err(ProfileError::InsufficientData {
            needed: window,
            got: n,
        });
    }

    let hat = hat_matrix(window, polyorder)?;
    let half = window / 2;
    let last_start = n - window;

    let smoothed: Vec<f64> = (0..n)
        .map(|i| {
            let start = i.saturating_sub(half).min(last_start);
            let offset = i - start;
            let samples = &column[start..start + window];
            hat.row(offset)
                .iter()
                .zip(samples)
                .map(|(w, y)| w * y)
                .sum::<f64>()
        })
        .collect();
    Ok(smoothed)
}

/// `A·A⁺` for the window's Vandermonde matrix; row `t` maps window samples to
/// the fitted value at offset `t`.
fn hat_matrix(window: usize, polyorder: usize) -> Result<DMatrix<f64>> {
    let center = (window as f64 - 1.0) * 0.5;
    let scale = center.max(1.0);
    let vander = DMatrix::from_fn(window, polyorder + 1, |row, col| {
        ((row as f64 - center) / scale).powi(col as i32)
    });
    let pinv = vander
        .clone()
        .pseudo_inverse(PINV_EPS)
        .map_err(|e| ProfileError::InvalidOptions(format!("degenerate smoothing window: {e}")))?;
    Ok(vander * pinv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn preserves_length() {
        for n in [100usize, 101, 257, 1000] {
            let column: Vec<f64> = (0..n).map(|i| ((i * 7) % 13) as f64).collect();
            assert_eq!(smooth(&column, 100, 0).unwrap().len(), n);
        }
    }

    #[test]
    fn order_zero_is_moving_average() {
        let column: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let out = smooth(&column, 4, 0).unwrap();
        // Interior sample 10 averages samples 8..12.
        assert_relative_eq!(out[10], (8.0 + 9.0 + 10.0 + 11.0) / 4.0, epsilon = 1e-12);
        // Left edge reuses the first window.
        assert_relative_eq!(out[0], 1.5, epsilon = 1e-12);
        assert_relative_eq!(out[19], 17.5, epsilon = 1e-12);
    }

    #[test]
    fn reproduces_polynomials_of_filter_order() {
        let column: Vec<f64> = (0..60)
            .map(|i| {
                let x = i as f64;
                0.02 * x * x - 1.5 * x + 4.0
            })
            .collect();
        let out = smooth(&column, 11, 2).unwrap();
        for (a, b) in out.iter().zip(&column) {
            assert_relative_eq!(*a, *b, epsilon = 1e-8);
        }
    }

    #[test]
    fn short_column_is_rejected() {
        let column = vec![0.0; 99];
        assert_eq!(
            smooth(&column, 100, 0),
            Err(ProfileError::InsufficientData {
                needed: 100,
                got: 99
            })
        );
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        assert!(matches!(
            smooth(&[0.0; 10], 3, 3),
            Err(ProfileError::InvalidOptions(_))
        ));
        assert!(matches!(
            smooth(&[0.0; 10], 0, 0),
            Err(ProfileError::InvalidOptions(_))
        ));
    }
}
