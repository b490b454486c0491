use super::PipelineStage;
use serde::Serialize;
use std::time::Instant;

/// Wall-clock time spent in one pipeline stage.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub stage: PipelineStage,
    pub elapsed_ms: f64,
}

/// Per-stage timings of a single spot run.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn push(&mut self, stage: PipelineStage, elapsed_ms: f64) {
        self.stages.push(StageTiming { stage, elapsed_ms });
    }

    /// Time recorded for `stage`, if it ran.
    pub fn elapsed(&self, stage: PipelineStage) -> Option<f64> {
        self.stages
            .iter()
            .find(|t| t.stage == stage)
            .map(|t| t.elapsed_ms)
    }

    /// Run `f`, record its duration under `stage` and pass its value through.
    pub fn time<R>(&mut self, stage: PipelineStage, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let out = f();
        self.push(stage, start.elapsed().as_secs_f64() * 1000.0);
        out
    }
}
