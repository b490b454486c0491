use profil_steps::baseline::BaselineModel;
use profil_steps::synthetic::SyntheticProfile;
use profil_steps::Trace;

/// Installs `env_logger` once per test binary; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Two 50 nm pulses on a bowed background, sampled every micrometre over
/// `[0, 4000]` µm. The second pulse runs off the end of the scan.
pub fn two_pulse_profile(seed: u64) -> SyntheticProfile {
    SyntheticProfile {
        seed,
        ..Default::default()
    }
}

pub fn two_pulse_trace(seed: u64) -> Trace {
    two_pulse_profile(seed)
        .generate()
        .expect("synthetic profile is valid")
}

/// Copy of `trace` with `value` added at the given sample indices.
pub fn with_spikes(trace: &Trace, indices: &[usize], value: f64) -> Trace {
    let mut height = trace.raw_height().to_vec();
    for &i in indices {
        height[i] += value;
    }
    Trace::new(trace.distance().to_vec(), height).expect("distance axis unchanged")
}

/// Height of the first step once a fitted baseline has soaked up part of the
/// pulse pattern.
///
/// The corrected trace is `pulses − excess` with `excess = fitted − background`,
/// so the step at `edge` shrinks by the mean excess over `[edge, edge + width)`
/// minus the mean excess before `edge`.
pub fn first_step_after_absorption(
    profile: &SyntheticProfile,
    trace: &Trace,
    fitted: &BaselineModel,
    edge: f64,
    width: f64,
) -> f64 {
    let mean_excess = |lo: f64, hi: f64| {
        let (sum, n) = trace
            .distance()
            .iter()
            .filter(|&&x| x >= lo && x < hi)
            .fold((0.0, 0usize), |(sum, n), &x| {
                (sum + fitted.evaluate(x) - profile.background.evaluate(x), n + 1)
            });
        sum / n as f64
    };
    profile.pulse_height - (mean_excess(edge, edge + width) - mean_excess(f64::NEG_INFINITY, edge))
}
