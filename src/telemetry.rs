// telemetry.rs
// Per-rank wall-clock accounting, split into compute and communication time.
// Workers accumulate a sample over the run and ship it to the coordinator
// during shutdown, which reduces them into a mean report.

use std::time::Duration;

#[derive(Clone, Copy, Debug, Default)]
pub struct TelemetrySample {
    pub compute: Duration,
    pub comm: Duration,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TelemetryReport {
    pub mean_compute: Duration,
    pub mean_comm: Duration,
}

impl TelemetryReport {
    pub fn from_samples(samples: &[TelemetrySample]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let n = samples.len() as u32;
        let compute: Duration = samples.iter().map(|s| s.compute).sum();
        let comm: Duration = samples.iter().map(|s| s.comm).sum();
        Self {
            mean_compute: compute / n,
            mean_comm: comm / n,
        }
    }
}
