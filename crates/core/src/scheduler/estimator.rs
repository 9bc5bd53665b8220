//! Execution-time estimation
//!
//! Each task keeps a smoothed average and a running maximum of how long its
//! body takes. The average is for diagnostics; admission ahead of the
//! realtime task uses the maximum, since underestimating a task costs a
//! control-loop deadline.

/// Smoothing shift: each new sample contributes 1/8 of the average
pub const AVERAGE_SHIFT: u32 = 3;

/// Running execution-time statistics for one measured function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionEstimator {
    /// Scaled moving sum; the average is `moving_sum_us >> AVERAGE_SHIFT`
    moving_sum_us: u32,
    max_us: u32,
    last_us: u32,
    total_us: u64,
    /// Time accumulated since the load window last rolled over
    window_us: u64,
    samples: u32,
}

impl ExecutionEstimator {
    /// Empty estimator
    pub const fn new() -> Self {
        Self {
            moving_sum_us: 0,
            max_us: 0,
            last_us: 0,
            total_us: 0,
            window_us: 0,
            samples: 0,
        }
    }

    /// Record one measured duration
    ///
    /// The first sample seeds the average directly so a fresh estimator does
    /// not start from zero.
    pub fn record(&mut self, duration_us: u32) {
        if self.samples == 0 {
            self.moving_sum_us = duration_us.saturating_mul(1 << AVERAGE_SHIFT);
        } else {
            // sum += d - sum/8, kept non-negative
            self.moving_sum_us = self
                .moving_sum_us
                .saturating_sub(self.moving_sum_us >> AVERAGE_SHIFT)
                .saturating_add(duration_us);
        }

        self.max_us = self.max_us.max(duration_us);
        self.last_us = duration_us;
        self.total_us = self.total_us.saturating_add(duration_us as u64);
        self.window_us = self.window_us.saturating_add(duration_us as u64);
        self.samples = self.samples.saturating_add(1);
    }

    /// Smoothed average duration
    #[inline]
    pub fn average_us(&self) -> u32 {
        self.moving_sum_us >> AVERAGE_SHIFT
    }

    /// Longest duration seen since the last reset
    #[inline]
    pub fn max_us(&self) -> u32 {
        self.max_us
    }

    /// Most recent duration
    #[inline]
    pub fn last_us(&self) -> u32 {
        self.last_us
    }

    /// Sum of all recorded durations
    #[inline]
    pub fn total_us(&self) -> u64 {
        self.total_us
    }

    /// Number of recorded samples
    #[inline]
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Duration the realtime guard should assume for the next run
    ///
    /// The worst case seen so far, falling back to the average when the max
    /// was reset independently.
    #[inline]
    pub fn admission_estimate_us(&self) -> u32 {
        if self.max_us > 0 {
            self.max_us
        } else {
            self.average_us()
        }
    }

    /// Return the time accumulated in the current load window and start a new one
    pub fn take_window(&mut self) -> u64 {
        core::mem::take(&mut self.window_us)
    }

    /// Forget the worst case but keep the average
    pub fn reset_max(&mut self) {
        self.max_us = 0;
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
