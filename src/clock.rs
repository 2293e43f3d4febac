//! Timing of a single conversion job.
//!
//! Duration is measured with [`Instant`], the monotonic clock, so it cannot
//! go negative or jump when the system clock is adjusted. The UTC timestamps
//! recorded alongside are for display in the processing log only; they are
//! never subtracted from each other.
//!
//! Stopping a clock that was never started cannot be expressed: `stop` is
//! only available on the [`RunningStopwatch`] returned by
//! [`Stopwatch::start`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Entry point for timing a job.
pub struct Stopwatch;

impl Stopwatch {
    pub fn start() -> RunningStopwatch {
        RunningStopwatch {
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

/// A started clock. Consumed by [`RunningStopwatch::stop`].
#[derive(Debug)]
pub struct RunningStopwatch {
    started: Instant,
    started_at: DateTime<Utc>,
}

impl RunningStopwatch {
    /// Stop the clock and return the measured metrics.
    pub fn stop(self) -> ProcessingMetrics {
        let elapsed = self.started.elapsed();
        ProcessingMetrics {
            started_at: self.started_at,
            finished_at: Utc::now(),
            elapsed,
        }
    }

    /// Stop the clock but record `fixed` as the elapsed time.
    ///
    /// Lets tests and benchmarks produce processing logs that differ only in
    /// their timestamps.
    pub fn stop_with(self, fixed: Duration) -> ProcessingMetrics {
        ProcessingMetrics {
            started_at: self.started_at,
            finished_at: Utc::now(),
            elapsed: fixed,
        }
    }

    /// Time since start, without stopping.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Timing of one finished job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProcessingMetrics {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl ProcessingMetrics {
    /// Elapsed time in seconds; never negative.
    pub fn duration_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}
