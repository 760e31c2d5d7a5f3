use serde::Serialize;

/// Per-object phase timings fed into the run accumulators.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseTimings {
    pub fetch_secs: f64,
    pub transform_secs: f64,
}

/// Counters and timing accumulators for one harvest run. One instance per
/// run, mutated by every object outcome under a lock, read by the reporter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub discovered: usize,
    pub indexed: usize,
    pub errored: usize,
    pub failed_druids: Vec<String>,
    pub validation_messages: Vec<String>,
    fetch_secs: f64,
    transform_secs: f64,
    timed_objects: usize,
    pub commit_secs: f64,
    pub elapsed_secs: f64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, timings: PhaseTimings) {
        self.indexed += 1;
        self.fetch_secs += timings.fetch_secs;
        self.transform_secs += timings.transform_secs;
        self.timed_objects += 1;
    }

    pub fn record_error(&mut self, druid: &str) {
        self.errored += 1;
        self.failed_druids.push(druid.to_string());
    }

    pub fn record_validation_messages(&mut self, messages: Vec<String>) {
        self.validation_messages.extend(messages);
    }

    pub fn total_processed(&self) -> usize {
        self.indexed + self.errored
    }

    /// Average fetch seconds per timed object; zero when nothing was timed.
    pub fn avg_fetch_secs(&self) -> f64 {
        if self.timed_objects == 0 {
            0.0
        } else {
            self.fetch_secs / self.timed_objects as f64
        }
    }

    /// Average transform seconds per timed object; zero when nothing was timed.
    pub fn avg_transform_secs(&self) -> f64 {
        if self.timed_objects == 0 {
            0.0
        } else {
            self.transform_secs / self.timed_objects as f64
        }
    }
}
