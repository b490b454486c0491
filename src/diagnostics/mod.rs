//! Diagnostics collected while a spot moves through the pipeline.
//!
//! [`PipelineTrace`] is returned next to the result record by
//! [`StepHeightPipeline::run_detailed`](crate::StepHeightPipeline::run_detailed)
//! and serialised by the demo binary. It describes the input, every stage
//! that ran with its duration, the located edge and the solver report.

pub mod timing;

pub use crate::staircase::{SolverStatus, SolverSummary};
pub use timing::{StageTiming, TimingBreakdown};

use crate::edges::StepGuess;
use crate::types::Trace;
use serde::Serialize;

/// Linear stage sequence of the extraction pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Raw,
    BaselineFit,
    Corrected,
    Smoothed,
    EdgeLocated,
    Fitted,
    Extracted,
    Done,
}

impl PipelineStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::BaselineFit => "baseline_fit",
            Self::Corrected => "corrected",
            Self::Smoothed => "smoothed",
            Self::EdgeLocated => "edge_located",
            Self::Fitted => "fitted",
            Self::Extracted => "extracted",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub samples: usize,
    pub start_um: f64,
    pub end_um: f64,
    pub mean_spacing_um: Option<f64>,
}

impl InputDescriptor {
    pub fn from_trace(trace: &Trace) -> Self {
        let d = trace.distance();
        Self {
            samples: trace.len(),
            start_um: d.first().copied().unwrap_or(0.0),
            end_um: d.last().copied().unwrap_or(0.0),
            mean_spacing_um: trace.mean_spacing(),
        }
    }
}

/// Execution trace of one spot.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTrace {
    pub input: InputDescriptor,
    pub baseline_fitted: bool,
    pub step_guess: StepGuess,
    pub solver: SolverSummary,
    pub timings: TimingBreakdown,
}
