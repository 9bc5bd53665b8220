//! Task scheduler for the flight controller
//!
//! The cooperative scheduling engine is re-exported from `flightloop_core`.
//! This module adds the firmware-side health reporting in [`monitor`].

pub mod monitor;

pub use flightloop_core::scheduler::*;
pub use monitor::*;
