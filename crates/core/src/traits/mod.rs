//! Platform service traits.
//!
//! Firmware provides real implementations; the mocks here are always
//! available so the scheduler can be exercised on the host.

pub mod time;

pub use time::{cmp_time_us, MockTime, TimeSource, TimeUs};
