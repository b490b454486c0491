//! Wafer-level batch processing.
//!
//! Spots are independent: each one runs the full pipeline on its own trace and
//! yields its own outcome. With the `parallel` feature enabled (and the runtime
//! toggle on) spots are distributed over the Rayon pool; results keep the
//! input order either way. Persisting the outcomes is left to the caller.

use crate::error::ProfileError;
use crate::pipeline::{FitRequest, StepHeightPipeline};
use crate::record::{RecordKind, ResultRecord};
use crate::types::Trace;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One measurement location with its scan.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Spot {
    /// Stage x coordinate (mm).
    pub x_pos: f64,
    /// Stage y coordinate (mm).
    pub y_pos: f64,
    /// Spots flagged by the operator are not fitted.
    #[serde(default)]
    pub ignored: bool,
    pub trace: Trace,
}

/// What happened to a spot during a batch run.
#[derive(Clone, Debug, PartialEq)]
pub enum SpotResult {
    Done(ResultRecord),
    Failed(ProfileError),
    Skipped,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpotOutcome {
    pub x_pos: f64,
    pub y_pos: f64,
    pub ignored: bool,
    pub result: SpotResult,
}

impl SpotOutcome {
    pub fn record(&self) -> Option<&ResultRecord> {
        match &self.result {
            SpotResult::Done(record) => Some(record),
            _ => None,
        }
    }
}

/// Batch-level knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Fan spots out over Rayon when the `parallel` feature is compiled in.
    pub parallel: bool,
    /// Below this many spots the batch stays sequential.
    pub min_spots_for_parallel: usize,
    /// Spots with `|x| + |y|` above this (mm) are left out of result tables.
    pub wafer_extent_mm: f64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            parallel: cfg!(feature = "parallel"),
            min_spots_for_parallel: 8,
            wafer_extent_mm: 60.0,
        }
    }
}

impl BatchOptions {
    pub fn should_parallelize(&self, spot_count: usize) -> bool {
        cfg!(feature = "parallel") && self.parallel && spot_count >= self.min_spots_for_parallel
    }
}

/// Run `pipeline` on every non-ignored spot.
pub fn fit_spots(
    pipeline: &StepHeightPipeline,
    spots: &[Spot],
    request: &FitRequest,
    options: &BatchOptions,
) -> Vec<SpotOutcome> {
    if options.should_parallelize(spots.len()) {
        #[cfg(feature = "parallel")]
        {
            debug!("fitting {} spots in parallel", spots.len());
            return spots
                .par_iter()
                .map(|spot| fit_spot(pipeline, spot, request))
                .collect();
        }
    }
    debug!("fitting {} spots sequentially", spots.len());
    spots
        .iter()
        .map(|spot| fit_spot(pipeline, spot, request))
        .collect()
}

fn fit_spot(pipeline: &StepHeightPipeline, spot: &Spot, request: &FitRequest) -> SpotOutcome {
    let result = if spot.ignored {
        SpotResult::Skipped
    } else {
        match pipeline.run(&spot.trace, request) {
            Ok(record) => SpotResult::Done(record),
            Err(err) => {
                warn!("spot ({}, {}) failed: {err}", spot.x_pos, spot.y_pos);
                SpotResult::Failed(err)
            }
        }
    };
    SpotOutcome {
        x_pos: spot.x_pos,
        y_pos: spot.y_pos,
        ignored: spot.ignored,
        result,
    }
}

/// Spot at exactly `(x, y)`.
pub fn find_spot(spots: &[Spot], x: f64, y: f64) -> Option<&Spot> {
    spots.iter().find(|s| s.x_pos == x && s.y_pos == y)
}

/// Flat row of the wafer results table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultRow {
    pub x_pos: f64,
    pub y_pos: f64,
    pub ignored: bool,
    pub kind: Option<RecordKind>,
    pub measured_height: Option<f64>,
    pub n_steps_extracted: Option<usize>,
}

/// Tabulate outcomes of spots lying on the wafer
/// (`|x| + |y| ≤ options.wafer_extent_mm`).
pub fn results_table(outcomes: &[SpotOutcome], options: &BatchOptions) -> Vec<ResultRow> {
    let extent = options.wafer_extent_mm;
    let rows: Vec<ResultRow> = outcomes
        .iter()
        .filter(|o| o.x_pos.abs() + o.y_pos.abs() <= extent)
        .map(|o| {
            let record = o.record();
            ResultRow {
                x_pos: o.x_pos,
                y_pos: o.y_pos,
                ignored: o.ignored,
                kind: record.map(ResultRecord::kind),
                measured_height: record.map(ResultRecord::measured_height),
                n_steps_extracted: record
                    .and_then(ResultRecord::as_fitted)
                    .map(|fit| fit.extracted_heights.len()),
            }
        })
        .collect();
    debug!(
        "results table: {} of {} spots within {extent} mm",
        rows.len(),
        outcomes.len()
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_spot(x: f64, y: f64, ignored: bool) -> Spot {
        let distance: Vec<f64> = (0..10).map(|i| i as f64).collect();
        Spot {
            x_pos: x,
            y_pos: y,
            ignored,
            trace: Trace::new(distance, vec![0.0; 10]).unwrap(),
        }
    }

    #[test]
    fn ignored_spots_are_skipped_and_failures_kept() {
        let spots = vec![flat_spot(0.0, 0.0, true), flat_spot(5.0, 0.0, false)];
        let outcomes = fit_spots(
            &StepHeightPipeline::default(),
            &spots,
            &FitRequest::new(2, 3.0),
            &BatchOptions::default(),
        );
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].result, SpotResult::Skipped);
        // Ten samples cannot feed the 100-sample smoothing window.
        assert!(matches!(
            outcomes[1].result,
            SpotResult::Failed(ProfileError::InsufficientData { .. })
        ));
    }

    #[test]
    fn lookup_by_coordinates() {
        let spots = vec![flat_spot(-5.0, 10.0, false), flat_spot(5.0, 10.0, false)];
        assert_eq!(find_spot(&spots, 5.0, 10.0).map(|s| s.x_pos), Some(5.0));
        assert!(find_spot(&spots, 5.0, 5.0).is_none());
    }

    #[test]
    fn table_drops_off_wafer_spots() {
        let outcomes = vec![
            SpotOutcome {
                x_pos: 10.0,
                y_pos: 20.0,
                ignored: false,
                result: SpotResult::Done(ResultRecord::manual(48.0)),
            },
            SpotOutcome {
                x_pos: 40.0,
                y_pos: 30.0,
                ignored: false,
                result: SpotResult::Done(ResultRecord::manual(12.0)),
            },
            SpotOutcome {
                x_pos: -30.0,
                y_pos: 30.0,
                ignored: true,
                result: SpotResult::Skipped,
            },
        ];
        let rows = results_table(&outcomes, &BatchOptions::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].kind, Some(RecordKind::Manual));
        assert_eq!(rows[0].measured_height, Some(48.0));
        assert_eq!(rows[0].n_steps_extracted, None);
        assert!(rows[1].ignored);
        assert_eq!(rows[1].measured_height, None);
    }

    #[test]
    fn table_follows_configured_wafer_extent() {
        let outcomes: Vec<SpotOutcome> = [(10.0, 5.0), (30.0, 25.0), (70.0, 0.0)]
            .into_iter()
            .map(|(x_pos, y_pos)| SpotOutcome {
                x_pos,
                y_pos,
                ignored: false,
                result: SpotResult::Done(ResultRecord::manual(50.0)),
            })
            .collect();
        let narrow = BatchOptions {
            wafer_extent_mm: 20.0,
            ..Default::default()
        };
        let wide = BatchOptions {
            wafer_extent_mm: 100.0,
            ..Default::default()
        };
        assert_eq!(results_table(&outcomes, &narrow).len(), 1);
        assert_eq!(results_table(&outcomes, &BatchOptions::default()).len(), 2);
        assert_eq!(results_table(&outcomes, &wide).len(), 3);
    }

    #[test]
    fn wafer_extent_reads_from_json() {
        let options: BatchOptions = serde_json::from_str(r#"{"wafer_extent_mm": 45.0}"#).unwrap();
        assert_eq!(options.wafer_extent_mm, 45.0);
        assert_eq!(options.min_spots_for_parallel, 8);
    }
}
