#![cfg_attr(not(test), no_std)]

//! flightloop - flight-controller task set on top of `flightloop_core`
//!
//! The scheduling engine itself lives in `flightloop_core` and is pure. This
//! crate adds what a flight controller needs around it: logging, the task
//! table with its enablement rules, health reporting and the target clock.

// Logging macros and scheduler health reporting
pub mod core;

// Platform time source (embassy feature)
pub mod platform;

// Build capabilities and runtime flight configuration
pub mod config;

// Flight-controller task set and main-loop wrapper
pub mod tasks;

pub use flightloop_core::scheduler::{Priority, Scheduler, SchedulerConfig, SchedulerError, TaskId};

// Note: Logging macros (log_info!, log_warn!, log_error!, log_debug!, log_trace!)
// are exported at crate root via #[macro_export] in core::logging
