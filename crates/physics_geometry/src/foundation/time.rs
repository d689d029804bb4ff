//! Time management utilities

use std::time::{Duration, Instant};

/// Simple stopwatch for measuring elapsed time
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    pub fn new() -> Self {
        Self {
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Create a new stopwatch and start it immediately
    pub fn start_new() -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start();
        stopwatch
    }

    /// Start the stopwatch
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Stop the stopwatch and accumulate elapsed time
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time {
            self.elapsed += start.elapsed();
            self.start_time = None;
        }
    }

    /// Get the elapsed time
    pub fn elapsed(&self) -> Duration {
        let current_elapsed = self.start_time.map_or(Duration::ZERO, |start| start.elapsed());
        self.elapsed + current_elapsed
    }

    /// Get the elapsed time in milliseconds
    pub fn elapsed_millis(&self) -> f32 {
        self.elapsed().as_secs_f32() * 1000.0
    }
}

/// Wall-clock allowance for a slice of work inside a single tick
///
/// A budget always admits its first unit of work, so a queue with a tiny
/// budget still makes progress every tick.
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
    started: Instant,
    allowance: Duration,
    spent_units: usize,
}

impl TimeBudget {
    /// Start a budget of `seconds` (negative or non-finite values count as zero)
    pub fn start(seconds: f32) -> Self {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        Self {
            started: Instant::now(),
            allowance: Duration::from_secs_f32(seconds),
            spent_units: 0,
        }
    }

    /// Returns true when another unit of work may run
    pub fn has_remaining(&self) -> bool {
        self.spent_units == 0 || self.started.elapsed() < self.allowance
    }

    /// Record one unit of work
    pub fn consume_unit(&mut self) {
        self.spent_units += 1;
    }

    /// Number of units recorded so far
    pub fn units(&self) -> usize {
        self.spent_units
    }

    /// Time spent since the budget started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_budget_admits_one_unit() {
        let mut budget = TimeBudget::start(0.0);
        assert!(budget.has_remaining());

        budget.consume_unit();
        std::thread::sleep(Duration::from_millis(1));
        assert!(!budget.has_remaining());
        assert_eq!(budget.units(), 1);
    }

    #[test]
    fn test_stopwatch_accumulates() {
        let mut stopwatch = Stopwatch::start_new();
        std::thread::sleep(Duration::from_millis(2));
        stopwatch.stop();

        let first = stopwatch.elapsed();
        assert!(first >= Duration::from_millis(2));
        assert_eq!(stopwatch.elapsed(), first);
    }
}
