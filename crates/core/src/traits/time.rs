//! Time abstraction for the scheduler.
//!
//! The scheduler measures everything in microseconds. Hardware timers are
//! read through [`TimeSource`]; host tests use [`MockTime`] and move the
//! clock by hand.

use core::cell::Cell;

/// Microsecond timestamp as seen by the scheduler.
///
/// This is the low 32 bits of the platform clock. It wraps roughly every
/// 71.6 minutes, so timestamps must only be compared with [`cmp_time_us`].
pub type TimeUs = u32;

/// Signed difference `a - b` between two wrapping timestamps.
///
/// Valid as long as the two instants are less than ~35 minutes apart.
#[inline]
pub const fn cmp_time_us(a: TimeUs, b: TimeUs) -> i32 {
    a.wrapping_sub(b) as i32
}

/// Monotonic clock used for all scheduler measurements.
///
/// # Example
///
/// ```
/// use flightloop_core::traits::{MockTime, TimeSource};
///
/// let clock = MockTime::new();
/// clock.advance(2_500);
/// assert_eq!(clock.now_time_us(), 2_500);
/// assert_eq!(clock.elapsed_since(1_000), 1_500);
/// ```
pub trait TimeSource: Clone + Send + Sync {
    /// Milliseconds since system start.
    fn now_ms(&self) -> u64;

    /// Microseconds since system start.
    fn now_us(&self) -> u64;

    /// Wrapping 32-bit microsecond counter.
    #[inline]
    fn now_time_us(&self) -> TimeUs {
        self.now_us() as TimeUs
    }

    /// Microseconds elapsed since `reference_us`, saturating at zero.
    fn elapsed_since(&self, reference_us: u64) -> u64 {
        self.now_us().saturating_sub(reference_us)
    }
}

impl<T: TimeSource> TimeSource for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }

    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

/// Hand-driven clock for host tests.
///
/// Share one instance between the scheduler (as `&MockTime`) and the task
/// bodies so a task can "take" time by advancing the clock.
#[derive(Clone, Default)]
pub struct MockTime {
    current_us: Cell<u64>,
}

// MockTime never leaves the single test thread that owns it.
unsafe impl Send for MockTime {}
unsafe impl Sync for MockTime {}

impl MockTime {
    /// Clock starting at zero.
    pub fn new() -> Self {
        Self {
            current_us: Cell::new(0),
        }
    }

    /// Clock starting at `us`.
    pub fn with_initial(us: u64) -> Self {
        Self {
            current_us: Cell::new(us),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, us: u64) {
        self.current_us.set(us);
    }

    /// Move the clock forward by `us`.
    pub fn advance(&self, us: u64) {
        self.current_us.set(self.current_us.get() + us);
    }
}

impl TimeSource for MockTime {
    fn now_ms(&self) -> u64 {
        self.current_us.get() / 1000
    }

    fn now_us(&self) -> u64 {
        self.current_us.get()
    }
}
