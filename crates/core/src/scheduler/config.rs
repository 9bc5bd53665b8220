//! Scheduler tuning constants
//!
//! Defaults are chosen for a 1-8 kHz flight-control loop. Firmware may build
//! its own [`SchedulerConfig`] from persisted settings at startup.

use super::load::MAX_LOAD_WINDOW_US;

/// Default share of the realtime slack a candidate may use, in percent
pub const DEFAULT_GUARD_MARGIN_PERCENT: u8 = 90;

/// Default load accounting window (1 second)
pub const DEFAULT_LOAD_WINDOW_US: u32 = 1_000_000;

/// Shortest period a periodic task can be given
pub const DEFAULT_MIN_PERIOD_US: u32 = 10;

/// Scheduler configuration, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// A candidate is admitted only if its worst-case duration fits within
    /// this percentage of the time left before the realtime task is due.
    pub guard_margin_percent: u8,

    /// Length of the load accounting window in microseconds
    pub load_window_us: u32,

    /// Record execution-time statistics
    ///
    /// Turning this off also blinds the realtime guard, which then admits
    /// every candidate whose estimate is still zero.
    pub calculate_statistics: bool,

    /// When the guard rejects every ready candidate while the realtime task
    /// is not yet overdue, run the least risky one anyway.
    pub admit_least_risky_when_starved: bool,

    /// Nonzero periods below this are raised to it
    pub min_period_us: u32,
}

impl SchedulerConfig {
    /// Configuration with the default constants
    pub const fn new() -> Self {
        Self {
            guard_margin_percent: DEFAULT_GUARD_MARGIN_PERCENT,
            load_window_us: DEFAULT_LOAD_WINDOW_US,
            calculate_statistics: true,
            admit_least_risky_when_starved: true,
            min_period_us: DEFAULT_MIN_PERIOD_US,
        }
    }

    /// Builder method to set `guard_margin_percent`
    pub const fn with_guard_margin(mut self, percent: u8) -> Self {
        self.guard_margin_percent = percent;
        self
    }

    /// Builder method to set `load_window_us`, clamped to [`MAX_LOAD_WINDOW_US`]
    pub const fn with_load_window(mut self, window_us: u32) -> Self {
        self.load_window_us = if window_us > MAX_LOAD_WINDOW_US {
            MAX_LOAD_WINDOW_US
        } else {
            window_us
        };
        self
    }

    /// Builder method to set `admit_least_risky_when_starved`
    pub const fn with_starvation_fallback(mut self, enabled: bool) -> Self {
        self.admit_least_risky_when_starved = enabled;
        self
    }

    /// Clamp a requested period to the configured minimum
    ///
    /// Zero passes through untouched: it is meaningful for event-driven tasks.
    #[inline]
    pub const fn clamp_period(&self, period_us: u32) -> u32 {
        if period_us == 0 || period_us >= self.min_period_us {
            period_us
        } else {
            self.min_period_us
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}
