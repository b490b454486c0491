//! Single-spot orchestration of the extraction stages.
//!
//! Stages run strictly in order and the first failure aborts the spot:
//!
//! ```text
//! RAW → BASELINE_FIT → CORRECTED → SMOOTHED → EDGE_LOCATED → FITTED → EXTRACTED → DONE
//! ```
//!
//! `BASELINE_FIT` is skipped when the request carries a baseline, and
//! `SMOOTHED` when smoothing is disabled. The pipeline holds no state between
//! spots, so one instance can be shared across threads.
//!
//! ```no_run
//! use profil_steps::{FitRequest, StepHeightPipeline, Trace};
//!
//! # fn example(trace: Trace) -> Result<(), profil_steps::ProfileError> {
//! let pipeline = StepHeightPipeline::default();
//! let record = pipeline.run(&trace, &FitRequest::new(2, 1000.0))?;
//! println!("measured height: {} nm", record.measured_height());
//! # Ok(())
//! # }
//! ```

pub mod options;

pub use options::{FitRequest, PipelineOptions};

use crate::baseline::{apply_baseline, fit_baseline};
use crate::diagnostics::{InputDescriptor, PipelineStage, PipelineTrace, TimingBreakdown};
use crate::edges::locate_first_step;
use crate::error::{ProfileError, Result};
use crate::extract::{extract_steps, ExtractedSteps};
use crate::record::{FittedRecord, ResultRecord};
use crate::staircase::{fit_staircase, StaircaseParameters};
use crate::types::{CorrectedTrace, Trace};
use log::{info, warn};
use std::time::Instant;

/// Everything produced for one spot: the record plus intermediate data for
/// plotting and diagnostics.
#[derive(Clone, Debug)]
pub struct SpotReport {
    pub record: ResultRecord,
    pub corrected: CorrectedTrace,
    pub steps: ExtractedSteps,
    pub initial_guess: StaircaseParameters,
    pub trace: PipelineTrace,
}

impl SpotReport {
    /// Fitted staircase sampled on the corrected trace's distance axis.
    pub fn fitted_curve(&self) -> Vec<f64> {
        match self.record.as_fitted() {
            Some(fit) => fit.staircase.curve(&self.corrected.distance),
            None => Vec::new(),
        }
    }
}

/// Step-height extraction pipeline.
#[derive(Clone, Debug, Default)]
pub struct StepHeightPipeline {
    options: PipelineOptions,
}

impl StepHeightPipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run all stages on `trace` and return the fitted record.
    pub fn run(&self, trace: &Trace, request: &FitRequest) -> Result<ResultRecord> {
        self.run_detailed(trace, request).map(|report| report.record)
    }

    /// Run all stages and keep intermediate results and timings.
    pub fn run_detailed(&self, trace: &Trace, request: &FitRequest) -> Result<SpotReport> {
        let total_start = Instant::now();
        let mut timings = TimingBreakdown::default();

        if request.n_steps == 0 {
            return Err(ProfileError::InvalidOptions(
                "n_steps must be positive".into(),
            ));
        }

        let (baseline, baseline_fitted) = match request.baseline {
            Some(model) => (model, false),
            None => {
                let model = timings
                    .time(PipelineStage::BaselineFit, || fit_baseline(trace))
                    .map_err(stage_failed(PipelineStage::BaselineFit))?;
                (model, true)
            }
        };

        let mut corrected = timings.time(PipelineStage::Corrected, || {
            apply_baseline(trace, &baseline)
        });

        if let Some(smoothing) = &self.options.smoothing {
            corrected.adjusted_height = timings
                .time(PipelineStage::Smoothed, || {
                    smoothing.apply(&corrected.adjusted_height)
                })
                .map_err(stage_failed(PipelineStage::Smoothed))?;
            corrected.smoothed = true;
        }

        let step_guess = timings
            .time(PipelineStage::EdgeLocated, || {
                locate_first_step(&corrected, request.x0_guess, &self.options.edge)
            })
            .map_err(stage_failed(PipelineStage::EdgeLocated))?;

        let mut staircase_options = self.options.staircase.clone();
        if let Some(height) = request.nominal_height {
            staircase_options.nominal_height = height;
        }
        let fit = timings
            .time(PipelineStage::Fitted, || {
                fit_staircase(
                    &corrected,
                    step_guess.position,
                    request.n_steps,
                    &staircase_options,
                )
            })
            .map_err(stage_failed(PipelineStage::Fitted))?;

        let steps = timings
            .time(PipelineStage::Extracted, || extract_steps(&fit.fitted))
            .map_err(stage_failed(PipelineStage::Extracted))?;

        timings.total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
        info!(
            "spot fitted: measured_height={} nm from {} steps ({:.1} ms)",
            steps.measured_height,
            steps.len(),
            timings.total_ms
        );

        let record = ResultRecord::Fitted(FittedRecord {
            baseline,
            baseline_fitted,
            staircase: fit.fitted,
            extracted_positions: steps.positions.clone(),
            extracted_heights: steps.heights.clone(),
            measured_height: steps.measured_height,
        });
        Ok(SpotReport {
            record,
            corrected,
            steps,
            initial_guess: fit.initial,
            trace: PipelineTrace {
                input: InputDescriptor::from_trace(trace),
                baseline_fitted,
                step_guess,
                solver: fit.summary,
                timings,
            },
        })
    }
}

fn stage_failed(stage: PipelineStage) -> impl FnOnce(ProfileError) -> ProfileError {
    move |err| {
        warn!("pipeline aborted at {stage}: {err}");
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::BaselineModel;

    fn pulse_trace(baseline: BaselineModel) -> Trace {
        let distance: Vec<f64> = (0..=4000).map(|i| i as f64).collect();
        let height = distance
            .iter()
            .map(|&x| {
                let pulse = (1000.0..2000.0).contains(&x) || x >= 3000.0;
                baseline.evaluate(x) + if pulse { 50.0 } else { 0.0 }
            })
            .collect();
        Trace::new(distance, height).unwrap()
    }

    #[test]
    fn injected_baseline_skips_fit_stage() {
        let baseline = BaselineModel::new(1e-6, 0.0, 0.0);
        let trace = pulse_trace(baseline);
        let report = StepHeightPipeline::default()
            .run_detailed(&trace, &FitRequest::new(2, 1000.0).with_baseline(baseline))
            .unwrap();
        assert!(!report.trace.baseline_fitted);
        assert!(report.trace.timings.elapsed(PipelineStage::BaselineFit).is_none());
        let fit = report.record.as_fitted().unwrap();
        assert_eq!(fit.baseline, baseline);
        assert!(!fit.baseline_fitted);
        assert_eq!(fit.measured_height, 50.0);
        assert_eq!(report.fitted_curve().len(), trace.len());
    }

    #[test]
    fn smoothing_can_be_disabled() {
        let trace = pulse_trace(BaselineModel::new(0.0, 0.0, 0.0));
        let pipeline = StepHeightPipeline::new(PipelineOptions {
            smoothing: None,
            ..Default::default()
        });
        let report = pipeline
            .run_detailed(
                &trace,
                &FitRequest::new(2, 1000.0).with_baseline(BaselineModel::new(0.0, 0.0, 0.0)),
            )
            .unwrap();
        assert!(!report.corrected.smoothed);
        assert!(report.trace.timings.elapsed(PipelineStage::Smoothed).is_none());
        assert_eq!(report.steps.heights, vec![50.0]);
    }

    #[test]
    fn reports_one_step_fewer_than_requested() {
        let baseline = BaselineModel::new(0.0, 0.0, 0.0);
        let trace = pulse_trace(baseline);
        for n_steps in [2usize, 3] {
            let report = StepHeightPipeline::default()
                .run_detailed(
                    &trace,
                    &FitRequest::new(n_steps, 1000.0).with_baseline(baseline),
                )
                .unwrap();
            let fit = report.record.as_fitted().unwrap();
            assert_eq!(fit.staircase.to_flat().len(), 2 * (n_steps + 1));
            assert_eq!(fit.extracted_heights.len(), n_steps - 1);
            assert_eq!(fit.extracted_positions.len(), n_steps - 1);
            assert_eq!(report.steps.len(), n_steps - 1);
        }
    }

    #[test]
    fn zero_steps_is_rejected() {
        let trace = pulse_trace(BaselineModel::new(0.0, 0.0, 0.0));
        assert!(matches!(
            StepHeightPipeline::default().run(&trace, &FitRequest::new(0, 1000.0)),
            Err(ProfileError::InvalidOptions(_))
        ));
    }

    #[test]
    fn short_trace_fails_in_smoothing() {
        let trace = Trace::new(
            (0..50).map(|i| i as f64).collect(),
            vec![0.0; 50],
        )
        .unwrap();
        assert_eq!(
            StepHeightPipeline::default().run(&trace, &FitRequest::new(1, 10.0)),
            Err(ProfileError::InsufficientData {
                needed: 100,
                got: 50
            })
        );
    }
}
