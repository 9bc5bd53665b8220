//! CPU and task load accounting
//!
//! Execution time is accumulated per task while a window is open. When the
//! window closes, each task's share of the elapsed wall-clock time is stored
//! and the counters restart. Results are only ever read by diagnostics; the
//! scheduling decisions never look at them.

use super::registry::TaskRegistry;
use crate::traits::{cmp_time_us, TimeUs};

/// Longest window the wraparound-safe timestamp comparison can measure
pub const MAX_LOAD_WINDOW_US: u32 = i32::MAX as u32;

/// Share of `elapsed_us` spent in `busy_us`, in tenths of a percent (0-1000)
pub fn load_permille(busy_us: u64, elapsed_us: u32) -> u16 {
    if elapsed_us == 0 {
        return 0;
    }
    let permille = busy_us.saturating_mul(1000) / elapsed_us as u64;
    permille.min(1000) as u16
}

/// Periodically-reset load accounting window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadWindow {
    length_us: u32,
    started_at_us: TimeUs,
    waiting_total: u32,
    waiting_samples: u32,
    cpu_load_permille: u16,
    system_load_percent: u16,
}

impl LoadWindow {
    /// Window of `length_us` opened at `now_us`
    ///
    /// Lengths above [`MAX_LOAD_WINDOW_US`] are clamped to it.
    pub const fn new(length_us: u32, now_us: TimeUs) -> Self {
        Self {
            length_us: if length_us > MAX_LOAD_WINDOW_US {
                MAX_LOAD_WINDOW_US
            } else {
                length_us
            },
            started_at_us: now_us,
            waiting_total: 0,
            waiting_samples: 0,
            cpu_load_permille: 0,
            system_load_percent: 0,
        }
    }

    /// Record how many tasks were waiting to run in one scheduler step
    pub fn record_waiting(&mut self, waiting_tasks: u32) {
        self.waiting_total = self.waiting_total.saturating_add(waiting_tasks);
        self.waiting_samples = self.waiting_samples.saturating_add(1);
    }

    /// Whether the window has run its full length
    #[inline]
    pub fn is_due(&self, now_us: TimeUs) -> bool {
        cmp_time_us(now_us, self.started_at_us) >= self.length_us as i32
    }

    /// Close the window: publish per-task and aggregate load, open the next one
    pub fn roll<S, const N: usize>(&mut self, now_us: TimeUs, registry: &mut TaskRegistry<S, N>) {
        let elapsed = cmp_time_us(now_us, self.started_at_us).max(0) as u32;
        let mut busy_total: u64 = 0;

        for entry in registry.entries_mut() {
            let busy = entry.stats.take_window();
            busy_total = busy_total.saturating_add(busy);
            entry.load_permille = load_permille(busy, elapsed);
        }

        self.cpu_load_permille = load_permille(busy_total, elapsed);
        self.system_load_percent = if self.waiting_samples > 0 {
            (self.waiting_total as u64 * 100 / self.waiting_samples as u64).min(u16::MAX as u64)
                as u16
        } else {
            0
        };

        self.started_at_us = now_us;
        self.waiting_total = 0;
        self.waiting_samples = 0;
    }

    /// Time spent executing tasks during the last complete window, in 0.1 %
    #[inline]
    pub fn cpu_load_permille(&self) -> u16 {
        self.cpu_load_permille
    }

    /// Average number of tasks waiting per step during the last window, in percent
    ///
    /// 100 means one task was waiting on average; above 100 the scheduler
    /// cannot keep up with demand.
    #[inline]
    pub fn system_load_percent(&self) -> u16 {
        self.system_load_percent
    }

    /// Window length in microseconds
    #[inline]
    pub fn length_us(&self) -> u32 {
        self.length_us
    }
}
