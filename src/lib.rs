#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod batch;
pub mod diagnostics;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod types;

// Stage modules – public so tools can run or inspect single stages.
pub mod baseline;
pub mod edges;
pub mod extract;
pub mod smoothing;
pub mod staircase;

// Tooling support.
pub mod config;
pub mod io;
pub mod synthetic;

// --- High-level re-exports -------------------------------------------------

// Main entry points: pipeline + results.
pub use crate::pipeline::{FitRequest, PipelineOptions, SpotReport, StepHeightPipeline};
pub use crate::record::{FittedRecord, RecordKind, ResultRecord};
pub use crate::types::{CorrectedTrace, Trace};

pub use crate::error::{ProfileError, Result};

// Wafer-level helpers.
pub use crate::batch::{fit_spots, find_spot, results_table, BatchOptions, Spot, SpotOutcome};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use profil_steps::prelude::*;
///
/// # fn main() -> Result<(), ProfileError> {
/// let trace = SyntheticProfile::default().generate()?;
/// let record = StepHeightPipeline::default().run(&trace, &FitRequest::new(2, 1000.0))?;
/// println!("kind={} height={} nm", record.kind().as_str(), record.measured_height());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::synthetic::SyntheticProfile;
    pub use crate::{FitRequest, ProfileError, ResultRecord, StepHeightPipeline, Trace};
}

// --- Stage-level API (for tools & advanced users) --------------------------

pub mod stages {
    // Stage runners.
    pub use crate::baseline::{apply_baseline, fit_baseline, BaselineModel};
    pub use crate::edges::{derivative, locate_first_step, EdgeOptions, StepGuess};
    pub use crate::extract::{extract_steps, ExtractedSteps};
    pub use crate::smoothing::{smooth, SmoothingOptions};
    pub use crate::staircase::{
        fit_from_guess, fit_staircase, initial_guess, StaircaseFit, StaircaseOptions,
        StaircaseParameters, Transition,
    };

    // Structured diagnostics types.
    pub use crate::diagnostics::{
        InputDescriptor, PipelineStage, PipelineTrace, SolverStatus, SolverSummary, StageTiming,
        TimingBreakdown,
    };
}
