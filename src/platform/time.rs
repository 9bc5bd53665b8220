//! Embassy-based time source implementation.

use flightloop_core::traits::TimeSource;

/// Scheduler clock backed by the embassy time driver.
///
/// The driver tick must be at least 1 MHz for microsecond task statistics
/// to be meaningful.
///
/// # Example
///
/// ```ignore
/// use flightloop::platform::EmbassyTime;
/// use flightloop::{Scheduler, SchedulerConfig};
///
/// let mut scheduler: Scheduler<FlightState, EmbassyTime, 32> =
///     Scheduler::new(EmbassyTime, SchedulerConfig::default());
/// ```
#[derive(Clone, Copy, Default)]
pub struct EmbassyTime;

impl TimeSource for EmbassyTime {
    fn now_ms(&self) -> u64 {
        embassy_time::Instant::now().as_millis()
    }

    fn now_us(&self) -> u64 {
        embassy_time::Instant::now().as_micros()
    }
}
