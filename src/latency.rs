//! Rolling window of snapshot processing times.

use std::time::Duration;

use serde::Serialize;

use crate::window::RollingWindow;

/// Number of samples retained.
pub const LATENCY_WINDOW: usize = 100;

/// Aggregate of the retained samples, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LatencyStats {
    /// Mean processing time.
    pub avg_ms: f64,
    /// Slowest retained sample.
    pub max_ms: f64,
    /// Fastest retained sample.
    pub min_ms: f64,
    /// Number of retained samples.
    pub samples: usize,
}

/// Tracks how long each book update took. Observational only.
#[derive(Debug, Clone)]
pub struct LatencyTracker {
    samples: RollingWindow<f64>,
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new(LATENCY_WINDOW)
    }
}

impl LatencyTracker {
    /// Create a tracker retaining `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: RollingWindow::new(capacity),
        }
    }

    /// Record one processing duration.
    pub fn record(&mut self, elapsed: Duration) {
        self.record_ms(elapsed.as_secs_f64() * 1000.0);
    }

    /// Record one processing duration given in milliseconds.
    pub fn record_ms(&mut self, ms: f64) {
        self.samples.push(ms);
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples are retained.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mean of the window, 0 when empty.
    pub fn avg_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Maximum of the window, 0 when empty.
    pub fn max_ms(&self) -> f64 {
        self.samples.iter().copied().reduce(f64::max).unwrap_or(0.0)
    }

    /// Minimum of the window, 0 when empty.
    pub fn min_ms(&self) -> f64 {
        self.samples.iter().copied().reduce(f64::min).unwrap_or(0.0)
    }

    /// Snapshot of the current aggregates.
    pub fn stats(&self) -> LatencyStats {
        LatencyStats {
            avg_ms: self.avg_ms(),
            max_ms: self.max_ms(),
            min_ms: self.min_ms(),
            samples: self.len(),
        }
    }
}
