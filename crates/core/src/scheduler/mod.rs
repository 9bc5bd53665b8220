//! Cooperative real-time task scheduler
//!
//! This module has no async runtime and no hardware dependencies. Firmware
//! supplies a [`TimeSource`](crate::traits::TimeSource) and a state type,
//! registers its tasks once at startup and calls
//! [`Scheduler::run_step`] from its main loop.
//!
//! # Components
//!
//! - [`types`]: Priorities, task descriptors, invocation context, task info
//! - [`registry`]: Fixed-capacity task table and enable/reschedule hooks
//! - [`estimator`]: Execution-time average and worst case
//! - [`priority`]: Age-based dynamic priority
//! - [`guard`]: Admission control protecting the realtime task
//! - [`load`]: CPU and system load accounting
//! - [`engine`]: The scheduler state machine
//!
//! # Example
//!
//! ```rust
//! use flightloop_core::scheduler::{
//!     period_hz, Priority, Scheduler, SchedulerConfig, TaskContext, TaskDescriptor,
//! };
//! use flightloop_core::traits::MockTime;
//!
//! fn pid_loop(loops: &mut u32, _ctx: &mut TaskContext) {
//!     *loops += 1;
//! }
//!
//! let clock = MockTime::new();
//! let mut scheduler: Scheduler<u32, &MockTime, 8> =
//!     Scheduler::new(&clock, SchedulerConfig::default());
//!
//! let pid = scheduler
//!     .register(TaskDescriptor::new("PID", pid_loop, period_hz(1000), Priority::Realtime))
//!     .unwrap();
//! scheduler.set_task_enabled(pid, true);
//!
//! let mut loops = 0;
//! for _ in 0..10 {
//!     clock.advance(1_000);
//!     scheduler.run_step(&mut loops);
//! }
//! assert_eq!(loops, 10);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod guard;
pub mod load;
pub mod priority;
pub mod registry;
pub mod types;

pub use config::SchedulerConfig;
pub use engine::{Scheduler, StepOutcome};
pub use error::SchedulerError;
pub use estimator::ExecutionEstimator;
pub use guard::{Admission, RealtimeGuard};
pub use load::{load_permille, LoadWindow, MAX_LOAD_WINDOW_US};
pub use registry::{TaskEntry, TaskRegistry, TaskState};
pub use types::*;
