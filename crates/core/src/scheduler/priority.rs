//! Dynamic priority calculation
//!
//! A waiting task gains priority in proportion to how many of its periods
//! have elapsed, weighted by its static class:
//!
//! ```text
//! age_cycles = (now - last_executed) / desired_period
//! dynamic    = (static + 1) * age_cycles
//! ```
//!
//! A dynamic priority of zero means the task is not a candidate. Because the
//! boost keeps growing, an overdue `Low` task eventually outranks a `High`
//! task that only just became ready.
//!
//! Event-driven tasks age from the moment their predicate fired instead, and
//! start at one cycle so they are a candidate immediately.

use super::types::Priority;
use crate::traits::{cmp_time_us, TimeUs};

/// Whole periods elapsed between `since_us` and `now_us`
///
/// Timestamps in the future count as zero elapsed time.
#[inline]
pub fn age_cycles(now_us: TimeUs, since_us: TimeUs, period_us: u32) -> u32 {
    if period_us == 0 {
        return 0;
    }
    let elapsed = cmp_time_us(now_us, since_us).max(0) as u32;
    elapsed / period_us
}

/// Dynamic priority for a given age
#[inline]
pub fn weighted(age_cycles: u32, static_priority: Priority) -> u16 {
    let weighted = age_cycles.saturating_mul(static_priority.age_weight() as u32);
    weighted.min(u16::MAX as u32) as u16
}

/// Dynamic priority of a periodic task
///
/// Nonzero once at least one full period has elapsed since the last run.
pub fn periodic_priority(
    now_us: TimeUs,
    last_executed_us: TimeUs,
    desired_period_us: u32,
    static_priority: Priority,
) -> u16 {
    weighted(
        age_cycles(now_us, last_executed_us, desired_period_us),
        static_priority,
    )
}

/// Dynamic priority of an event-driven task whose predicate fired at `signaled_us`
///
/// Always nonzero. A zero period means the task does not age beyond its
/// first cycle.
pub fn signaled_priority(
    now_us: TimeUs,
    signaled_us: TimeUs,
    desired_period_us: u32,
    static_priority: Priority,
) -> u16 {
    let age = 1u32.saturating_add(age_cycles(now_us, signaled_us, desired_period_us));
    weighted(age, static_priority)
}
