//! CPU and RAM load sampling.
//!
//! A thin wrapper over `sysinfo`: each sample refreshes global CPU usage and
//! memory counters and reports them as percentages.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::thread;
use std::time::Duration;
use sysinfo::{MINIMUM_CPU_UPDATE_INTERVAL, System};
use tracing::debug;

/// Default delay between samples, in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// One reading of system load.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceSample {
    pub cpu_percent: f32,
    pub ram_percent: f32,
    /// Used memory in bytes.
    pub used_memory: u64,
    /// Total memory in bytes.
    pub total_memory: u64,
    pub taken_at: DateTime<Local>,
}

/// Polls OS counters for CPU and RAM utilisation.
pub struct ResourceSampler {
    system: System,
}

impl ResourceSampler {
    /// Creates a sampler and primes the CPU counters.
    ///
    /// CPU usage is a delta between two refreshes, so construction blocks for
    /// `sysinfo::MINIMUM_CPU_UPDATE_INTERVAL` to make the first sample
    /// meaningful.
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
        Self { system }
    }

    /// Takes one sample.
    pub fn sample(&mut self) -> ResourceSample {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let used_memory = self.system.used_memory();
        let total_memory = self.system.total_memory();
        let sample = ResourceSample {
            cpu_percent: self.system.global_cpu_usage(),
            ram_percent: memory_percent(used_memory, total_memory),
            used_memory,
            total_memory,
            taken_at: Local::now(),
        };
        debug!(
            cpu = sample.cpu_percent,
            ram = sample.ram_percent,
            "resource sample"
        );
        sample
    }

    /// Samples every `interval`, passing each reading to `on_sample`.
    ///
    /// Stops after `count` samples, or runs until `on_sample` returns false
    /// when `count` is `None`.
    pub fn run(
        &mut self,
        interval: Duration,
        count: Option<u64>,
        mut on_sample: impl FnMut(&ResourceSample) -> bool,
    ) {
        let mut taken = 0u64;
        loop {
            let sample = self.sample();
            taken += 1;
            if !on_sample(&sample) || count.is_some_and(|max| taken >= max) {
                break;
            }
            // Never sample faster than sysinfo can measure CPU deltas.
            thread::sleep(interval.max(MINIMUM_CPU_UPDATE_INTERVAL));
        }
    }
}

impl Default for ResourceSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentage of `total` in use; 0 when `total` is 0.
pub fn memory_percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        0.0
    } else {
        (used as f64 / total as f64 * 100.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_percent() {
        assert_eq!(memory_percent(0, 0), 0.0);
        assert_eq!(memory_percent(50, 200), 25.0);
        assert_eq!(memory_percent(200, 200), 100.0);
    }

    #[test]
    fn test_sample_is_within_bounds() {
        let mut sampler = ResourceSampler::new();
        let sample = sampler.sample();

        assert!((0.0..=100.0).contains(&sample.ram_percent));
        assert!(sample.cpu_percent >= 0.0);
        assert!(sample.used_memory <= sample.total_memory);
    }

    #[test]
    fn test_run_stops_after_count() {
        let mut sampler = ResourceSampler::new();
        let mut seen = 0;
        sampler.run(Duration::from_millis(0), Some(2), |_| {
            seen += 1;
            true
        });
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_run_stops_when_callback_declines() {
        let mut sampler = ResourceSampler::new();
        let mut seen = 0;
        sampler.run(Duration::from_millis(0), None, |_| {
            seen += 1;
            false
        });
        assert_eq!(seen, 1);
    }
}
