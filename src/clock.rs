use std::time::Duration;

use crate::loader::Dataset;

/// Position within the looping replay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockReading {
    /// Simulated epoch seconds in `[min_time, max_time]`
    pub sim_time: f64,

    /// Completed passes over the dataset
    pub cycle: u64,

    /// Fraction of the current pass, in `[0, 1)`
    pub progress: f64,
}

/// Maps elapsed wall-clock time onto the dataset's time span, looping forever
#[derive(Debug, Clone)]
pub struct ReplayClock {
    period_ms: u128,
    min_time: i64,
    duration: i64,
}

impl ReplayClock {
    /// `period` must be non-zero (enforced by config validation)
    pub fn new(period: Duration, min_time: i64, duration: i64) -> Self {
        Self {
            period_ms: period.as_millis().max(1),
            min_time,
            duration: duration.max(0),
        }
    }

    pub fn for_dataset(period: Duration, dataset: &Dataset) -> Self {
        Self::new(period, dataset.min_time(), dataset.duration())
    }

    pub fn reading(&self, elapsed: Duration) -> ClockReading {
        let elapsed_ms = elapsed.as_millis();
        let cycle = (elapsed_ms / self.period_ms) as u64;
        let progress = (elapsed_ms % self.period_ms) as f64 / self.period_ms as f64;

        ClockReading {
            sim_time: self.min_time as f64 + progress * self.duration as f64,
            cycle,
            progress,
        }
    }

    /// Wall-clock length of one pass
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms as u64)
    }

    pub fn sim_time(&self, elapsed: Duration) -> f64 {
        self.reading(elapsed).sim_time
    }
}
