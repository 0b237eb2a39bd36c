//! Wall-clock and CPU sampling around a single inference call.
//!
//! A [`MetricsTracker`] is created per request and never shared. Missing
//! samples degrade to `0.0` instead of failing.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use sysinfo::{Pid, System};

/// Source of non-blocking CPU utilisation samples (percent).
pub trait CpuSampler: Send {
    /// Take one sample. `None` when the platform cannot report usage.
    fn sample(&mut self) -> Option<f64>;
}

/// Samples the CPU usage of the current process through `sysinfo`.
///
/// Like any delta-based counter, the first reading after construction is 0.
pub struct ProcessCpuSampler {
    system: System,
    pid: Option<Pid>,
}

impl ProcessCpuSampler {
    /// Create a sampler bound to the current process.
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }
}

impl Default for ProcessCpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuSampler for ProcessCpuSampler {
    fn sample(&mut self) -> Option<f64> {
        let pid = self.pid?;
        if !self.system.refresh_process(pid) {
            return None;
        }
        self.system
            .process(pid)
            .map(|process| f64::from(process.cpu_usage()))
    }
}

/// Telemetry captured for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub processing_time_ms: f64,
    pub cpu_usage_percent: f64,
}

/// Start/stop tracker for inference timing and CPU usage.
pub struct MetricsTracker {
    sampler: Box<dyn CpuSampler>,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
    start_cpu: Option<f64>,
    end_cpu: Option<f64>,
}

impl MetricsTracker {
    /// Create a tracker sampling the current process.
    pub fn new() -> Self {
        Self::with_sampler(Box::new(ProcessCpuSampler::new()))
    }

    /// Create a tracker with a custom CPU sampler.
    pub fn with_sampler(sampler: Box<dyn CpuSampler>) -> Self {
        Self {
            sampler,
            start_time: None,
            end_time: None,
            start_cpu: None,
            end_cpu: None,
        }
    }

    /// Record the start timestamp and CPU sample.
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
        self.start_cpu = self.sampler.sample();
    }

    /// Record the end timestamp and CPU sample.
    pub fn stop(&mut self) {
        self.end_time = Some(Instant::now());
        self.end_cpu = self.sampler.sample();
    }

    /// Elapsed milliseconds between `start` and `stop`, or `0.0` if either is missing.
    pub fn elapsed_ms(&self) -> f64 {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end.saturating_duration_since(start).as_secs_f64() * 1000.0,
            _ => 0.0,
        }
    }

    /// Mean of the two CPU samples, or `0.0` if either is missing.
    pub fn cpu_percent(&self) -> f64 {
        match (self.start_cpu, self.end_cpu) {
            (Some(start), Some(end)) => (start + end) / 2.0,
            _ => 0.0,
        }
    }

    /// Both measurements at once.
    pub fn snapshot(&self) -> PerformanceMetrics {
        PerformanceMetrics {
            processing_time_ms: self.elapsed_ms(),
            cpu_usage_percent: self.cpu_percent(),
        }
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    struct ScriptedSampler(VecDeque<Option<f64>>);

    impl CpuSampler for ScriptedSampler {
        fn sample(&mut self) -> Option<f64> {
            self.0.pop_front().flatten()
        }
    }

    fn tracker(samples: Vec<Option<f64>>) -> MetricsTracker {
        MetricsTracker::with_sampler(Box::new(ScriptedSampler(samples.into())))
    }

    #[test]
    fn test_untracked_is_zero() {
        let tracker = tracker(vec![]);
        assert_eq!(tracker.elapsed_ms(), 0.0);
        assert_eq!(tracker.cpu_percent(), 0.0);
    }

    #[test]
    fn test_start_without_stop_is_zero() {
        let mut tracker = tracker(vec![Some(10.0)]);
        tracker.start();
        assert_eq!(tracker.elapsed_ms(), 0.0);
        assert_eq!(tracker.cpu_percent(), 0.0);
    }

    #[test]
    fn test_elapsed_and_cpu_mean() {
        let mut tracker = tracker(vec![Some(10.0), Some(30.0)]);
        tracker.start();
        std::thread::sleep(Duration::from_millis(5));
        tracker.stop();

        assert!(tracker.elapsed_ms() >= 5.0);
        assert_eq!(tracker.cpu_percent(), 20.0);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.cpu_usage_percent, 20.0);
        assert!(snapshot.processing_time_ms >= 5.0);
    }

    #[test]
    fn test_missing_cpu_sample_degrades() {
        let mut tracker = tracker(vec![Some(10.0), None]);
        tracker.start();
        tracker.stop();
        assert_eq!(tracker.cpu_percent(), 0.0);
    }

    #[test]
    fn test_process_sampler_does_not_panic() {
        let mut tracker = MetricsTracker::new();
        tracker.start();
        tracker.stop();
        assert!(tracker.cpu_percent() >= 0.0);
    }
}
