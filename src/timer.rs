//! Rolling performance timers.
//!
//! A [`PerformanceTimer`] keeps the last `capacity` measurements and reports their
//! average. The engine wraps its trace and draw recording in one each.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use flowfield::PerformanceTimer;
//!
//! let mut timer = PerformanceTimer::new(4);
//! assert_eq!(timer.summary(), "No data");
//!
//! timer.record(Duration::from_millis(2));
//! timer.record(Duration::from_millis(4));
//! assert_eq!(timer.summary(), "3.00ms = 333 ops/sec");
//! ```

use std::time::{Duration, Instant};

/// Number of samples the engine's timers average over.
pub const DEFAULT_TIMER_SAMPLES: usize = 120;

/// Averages the most recent `capacity` durations.
#[derive(Debug, Clone)]
pub struct PerformanceTimer {
    samples: Vec<Duration>,
    capacity: usize,
    /// Next slot to overwrite once the ring is full.
    cursor: usize,
    started: Option<Instant>,
}

impl Default for PerformanceTimer {
    fn default() -> Self {
        Self::new(DEFAULT_TIMER_SAMPLES)
    }
}

impl PerformanceTimer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
            started: None,
        }
    }

    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Record the time since [`start`](Self::start). Does nothing if not started.
    pub fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.record(started.elapsed());
        }
    }

    pub fn record(&mut self, sample: Duration) {
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            self.samples[self.cursor] = sample;
        }
        self.cursor = (self.cursor + 1) % self.capacity;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.cursor = 0;
        self.started = None;
    }

    /// Mean of the retained samples.
    pub fn average(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total / self.samples.len() as u32)
    }

    /// Average in milliseconds.
    pub fn average_ms(&self) -> Option<f64> {
        self.average().map(|d| d.as_secs_f64() * 1000.0)
    }

    /// How many operations of the average duration fit in one second.
    pub fn ops_per_second(&self) -> Option<f64> {
        self.average_ms()
            .filter(|&ms| ms > 0.0)
            .map(|ms| 1000.0 / ms)
    }

    /// `"2.50ms = 400 ops/sec"`, or `"No data"`.
    pub fn summary(&self) -> String {
        match (self.average_ms(), self.ops_per_second()) {
            (Some(ms), Some(ops)) => format!("{:.2}ms = {:.0} ops/sec", ms, ops),
            (Some(ms), None) => format!("{:.2}ms", ms),
            _ => "No data".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_timer() {
        let timer = PerformanceTimer::new(8);
        assert!(timer.is_empty());
        assert_eq!(timer.average(), None);
        assert_eq!(timer.ops_per_second(), None);
        assert_eq!(timer.summary(), "No data");
    }

    #[test]
    fn test_ring_keeps_latest_samples() {
        let mut timer = PerformanceTimer::new(3);
        for ms in [100, 100, 100, 1, 2, 3] {
            timer.record(Duration::from_millis(ms));
        }
        assert_eq!(timer.len(), 3);
        assert_eq!(timer.average(), Some(Duration::from_millis(2)));
    }

    #[test]
    fn test_ops_per_second() {
        let mut timer = PerformanceTimer::new(10);
        timer.record(Duration::from_micros(2500));
        let ops = timer.ops_per_second().unwrap();
        assert!((ops - 400.0).abs() < 1e-6);
        assert_eq!(timer.summary(), "2.50ms = 400 ops/sec");
    }

    #[test]
    fn test_start_stop() {
        let mut timer = PerformanceTimer::new(4);
        timer.stop();
        assert!(timer.is_empty());

        timer.start();
        timer.stop();
        assert_eq!(timer.len(), 1);

        timer.clear();
        assert!(timer.is_empty());
    }
}
