//! Error taxonomy shared by every pipeline stage.
//!
//! Each variant is terminal for the spot being processed: stages never retry
//! and never substitute defaults. Callers decide whether a failed spot should
//! be flagged as ignored by the storage layer.

use thiserror::Error;

/// Errors raised by the step-height extraction pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    /// Not enough samples for the requested fit or filter.
    #[error("insufficient data: need {needed} samples, got {got}")]
    InsufficientData { needed: usize, got: usize },
    /// The edge search window holds no usable sample.
    #[error("no step found in search window [{low:.3}, {high:.3}]")]
    NoStepFound { low: f64, high: f64 },
    /// The optimizer failed or produced non-finite parameters.
    #[error("staircase fit diverged: {0}")]
    FitDiverged(String),
    /// Fewer than two risers, so no interior step can be extracted.
    #[error("insufficient steps: {risers} riser(s), need at least 2")]
    InsufficientSteps { risers: usize },
    /// Trace columns are inconsistent (length mismatch, non-finite, unordered).
    #[error("invalid trace: {0}")]
    InvalidTrace(String),
    /// Option values outside their valid domain.
    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

pub type Result<T> = std::result::Result<T, ProfileError>;
