//! Realtime guard
//!
//! Decides whether a candidate may start given how much time is left before
//! the realtime task is due again. Tasks cannot be interrupted once started,
//! so the only protection the flight-control loop has is refusing to start
//! anything that might still be running when it needs the CPU.

use crate::traits::{cmp_time_us, TimeUs};

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The candidate fits before the realtime deadline
    Admit,
    /// The candidate could delay the realtime task
    Reject,
}

impl Admission {
    #[inline]
    pub fn is_admitted(self) -> bool {
        self == Admission::Admit
    }
}

/// Admission control protecting the realtime task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealtimeGuard {
    margin_percent: u32,
}

impl RealtimeGuard {
    /// Guard that lets candidates use up to `margin_percent` of the slack
    pub const fn new(margin_percent: u8) -> Self {
        Self {
            margin_percent: margin_percent as u32,
        }
    }

    /// Configured margin in percent
    #[inline]
    pub fn margin_percent(&self) -> u8 {
        self.margin_percent as u8
    }

    /// Microseconds until the realtime task is due
    ///
    /// Zero or negative when it is already due or late.
    pub fn time_left_us(now_us: TimeUs, last_run_us: TimeUs, period_us: u32) -> i32 {
        let left = period_us as i64 - cmp_time_us(now_us, last_run_us) as i64;
        left.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    /// Admission check from raw timestamps
    pub fn admit(
        &self,
        now_us: TimeUs,
        last_run_us: TimeUs,
        period_us: u32,
        estimated_us: u32,
    ) -> Admission {
        self.check(Self::time_left_us(now_us, last_run_us, period_us), estimated_us)
    }

    /// Admission check against a precomputed time left
    ///
    /// A realtime task that is already due rejects everyone until it runs.
    pub fn check(&self, time_left_us: i32, estimated_us: u32) -> Admission {
        if time_left_us <= 0 {
            return Admission::Reject;
        }
        let budget = time_left_us as u64 * self.margin_percent as u64;
        if estimated_us as u64 * 100 > budget {
            Admission::Reject
        } else {
            Admission::Admit
        }
    }
}
