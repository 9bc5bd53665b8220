//! Firmware-side core infrastructure
//!
//! Logging macros and scheduler health reporting. The scheduling engine is
//! re-exported from `flightloop_core`.

pub mod logging;
pub mod scheduler;
