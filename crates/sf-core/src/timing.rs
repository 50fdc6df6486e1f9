//! Lightweight performance timing utilities.
//!
//! The pipeline reports where wall time went (trace parsing, reference
//! simulation, per-equation sampling). Timers here are always on; they cost
//! one `Instant::now()` per start/stop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A simple timer that measures elapsed time.
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    /// Create and start a new timer with the given label.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Elapsed seconds so far, without stopping.
    pub fn elapsed_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Stop the timer and return elapsed time in seconds.
    pub fn stop(self) -> f64 {
        self.elapsed_s()
    }
}

/// Accumulating timer for tracking total time across multiple calls.
///
/// Safe to share between worker threads.
pub struct AccumulatingTimer {
    total_ns: AtomicU64,
    count: AtomicU64,
}

impl Default for AccumulatingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl AccumulatingTimer {
    /// Create a new accumulating timer.
    pub const fn new() -> Self {
        Self {
            total_ns: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Record a timing measurement.
    pub fn record(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.total_ns.fetch_add(nanos, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total time spent (in seconds).
    pub fn total_seconds(&self) -> f64 {
        self.total_ns.load(Ordering::Relaxed) as f64 / 1e9
    }

    /// Get number of calls.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Get average time per call (in seconds).
    pub fn average_seconds(&self) -> f64 {
        let count = self.count();
        if count > 0 {
            self.total_seconds() / count as f64
        } else {
            0.0
        }
    }

    /// Reset the timer.
    pub fn reset(&self) {
        self.total_ns.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulating_timer_averages() {
        let timer = AccumulatingTimer::new();
        assert_eq!(timer.average_seconds(), 0.0);
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(30));
        assert_eq!(timer.count(), 2);
        assert!((timer.total_seconds() - 0.040).abs() < 1e-9);
        assert!((timer.average_seconds() - 0.020).abs() < 1e-9);
        timer.reset();
        assert_eq!(timer.count(), 0);
    }

    #[test]
    fn timer_is_monotonic() {
        let timer = Timer::start("test");
        assert_eq!(timer.label(), "test");
        let first = timer.elapsed_s();
        assert!(timer.stop() >= first);
    }
}
