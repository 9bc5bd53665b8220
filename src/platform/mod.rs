//! Platform services
//!
//! Everything the scheduler needs from the hardware goes through the
//! `TimeSource` trait of `flightloop_core`. Host builds drive it with
//! `MockTime`; targets running the embassy time driver use [`EmbassyTime`].

#[cfg(feature = "embassy")]
pub mod time;

#[cfg(feature = "embassy")]
pub use time::EmbassyTime;

pub use flightloop_core::traits::{MockTime, TimeSource, TimeUs};
