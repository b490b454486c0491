use crate::pipeline::{FitRequest, PipelineOptions};
use crate::synthetic::SyntheticProfile;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct StepFitDemoConfig {
    pub trace: TraceSource,
    pub request: FitRequest,
    #[serde(default)]
    pub pipeline: PipelineOptions,
    pub output: StepFitDemoOutputConfig,
}

/// Where the demo takes its scan from.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceSource {
    /// Generate a trace; missing fields fall back to the default profile.
    Synthetic(SyntheticProfile),
    /// JSON object with `distance` and `raw_height` columns.
    File(PathBuf),
}

#[derive(Debug, Deserialize)]
pub struct StepFitDemoOutputConfig {
    #[serde(rename = "report_json")]
    pub report_json: PathBuf,
    /// Also dump the corrected and fitted curves.
    #[serde(default)]
    pub include_curves: bool,
}

pub fn load_config(path: &Path) -> Result<StepFitDemoConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    parse_config(&data).map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}

pub fn parse_config(data: &str) -> Result<StepFitDemoConfig, serde_json::Error> {
    serde_json::from_str(data)
}
