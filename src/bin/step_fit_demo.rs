//! Demonstration binary for the step-height pipeline.
//!
//! The demo runs a single spot end to end:
//! 1. Load a trace from JSON or generate a synthetic one.
//! 2. Run baseline removal, smoothing, edge location and the staircase fit.
//! 3. Extract step positions and heights.
//! 4. Emit the record, units, diagnostics and (optionally) the model curves.

use log::info;
use profil_steps::config::step_fit_demo as demo_cfg;
use profil_steps::diagnostics::PipelineTrace;
use profil_steps::extract::ExtractedSteps;
use profil_steps::io::{load_trace_json, write_json_file};
use profil_steps::record::FieldUnit;
use profil_steps::staircase::StaircaseParameters;
use profil_steps::{ResultRecord, SpotReport, StepHeightPipeline, Trace};
use serde::Serialize;
use std::env;
use std::path::Path;
use std::time::Instant;

/// Time `f` with a wall clock; its value is passed through next to the elapsed milliseconds.
fn run_with_timer<R, F: FnOnce() -> Result<R, String>>(f: F) -> Result<Timed<R>, String> {
    let start = Instant::now();
    let value = f()?;
    Ok(Timed {
        value,
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
    })
}

struct Timed<R> {
    value: R,
    elapsed_ms: f64,
}

fn main() {
    env_logger::init();
    match run_with_timer(run) {
        Ok(timed) => println!("Total execution time: {:.2} ms", timed.elapsed_ms),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StepFitReport<'a> {
    record: &'a ResultRecord,
    units: Vec<FieldUnit>,
    steps: &'a ExtractedSteps,
    initial_guess: &'a StaircaseParameters,
    trace: &'a PipelineTrace,
    load_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    curves: Option<Curves>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Curves {
    distance: Vec<f64>,
    raw_height: Vec<f64>,
    baseline: Vec<f64>,
    adjusted_height: Vec<f64>,
    fitted: Vec<f64>,
}

fn run() -> Result<(), String> {
    let config = load_config_from_args()?;

    let Timed {
        value: trace,
        elapsed_ms: load_ms,
    } = run_with_timer(|| load_trace(&config.trace))?;
    info!("loaded trace with {} samples in {load_ms:.2} ms", trace.len());

    let pipeline = StepHeightPipeline::new(config.pipeline.clone());
    let report = pipeline
        .run_detailed(&trace, &config.request)
        .map_err(|e| format!("Step fit failed: {e}"))?;

    let curves = config
        .output
        .include_curves
        .then(|| build_curves(&trace, &report));
    let out = StepFitReport {
        record: &report.record,
        units: report.record.units(),
        steps: &report.steps,
        initial_guess: &report.initial_guess,
        trace: &report.trace,
        load_ms,
        curves,
    };
    write_json_file(&config.output.report_json, &out)?;

    println!(
        "Measured height {} nm from {} steps {:?}",
        report.record.measured_height(),
        report.steps.len(),
        report.steps.heights
    );
    println!(
        "Step fit report written to {}",
        config.output.report_json.display()
    );

    Ok(())
}

fn usage() -> String {
    "Usage: step_fit_demo <config.json>".to_string()
}

fn load_config_from_args() -> Result<demo_cfg::StepFitDemoConfig, String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    demo_cfg::load_config(Path::new(&config_path))
}

fn load_trace(source: &demo_cfg::TraceSource) -> Result<Trace, String> {
    match source {
        demo_cfg::TraceSource::Synthetic(profile) => profile
            .generate()
            .map_err(|e| format!("Failed to generate synthetic trace: {e}")),
        demo_cfg::TraceSource::File(path) => load_trace_json(path),
    }
}

fn build_curves(trace: &Trace, report: &SpotReport) -> Curves {
    let baseline = report
        .record
        .as_fitted()
        .map(|fit| fit.baseline.curve(trace.distance()))
        .unwrap_or_default();
    Curves {
        distance: trace.distance().to_vec(),
        raw_height: trace.raw_height().to_vec(),
        baseline,
        adjusted_height: report.corrected.adjusted_height.clone(),
        fitted: report.fitted_curve(),
    }
}
