//! Core types for the cooperative scheduler
//!
//! This module defines the vocabulary shared by every scheduler component:
//! - Static priority classes
//! - Task handles and descriptors (build-time configuration)
//! - The per-invocation context handed to task bodies
//! - Diagnostic snapshots of a task

use crate::traits::TimeUs;

/// Convert a rate in Hz to a period in microseconds
///
/// # Example
///
/// ```
/// use flightloop_core::scheduler::period_hz;
///
/// assert_eq!(period_hz(1000), 1_000);
/// assert_eq!(period_hz(33), 30_303);
/// ```
#[inline]
pub const fn period_hz(hz: u32) -> u32 {
    1_000_000 / hz
}

/// Static priority class of a task
///
/// The ordinals also weight how fast a waiting task gains dynamic priority
/// (see [`crate::scheduler::priority`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Priority {
    /// Background housekeeping
    Idle = 0,
    /// Serial, OSD, telemetry and other best-effort I/O
    Low = 1,
    /// Sensor polling
    Medium = 3,
    /// System-level bookkeeping
    MediumHigh = 4,
    /// RC input and dispatch
    High = 5,
    /// Reserved for the flight-control loop. At most one task may hold it.
    Realtime = 6,
}

impl Priority {
    /// Raw ordinal value
    #[inline]
    pub const fn level(self) -> u8 {
        self as u8
    }

    /// Multiplier applied to a task's age when computing dynamic priority
    #[inline]
    pub const fn age_weight(self) -> u16 {
        self as u16 + 1
    }
}

/// Stable handle to a registered task
///
/// Handles are issued by the registry in registration order and never
/// invalidated: descriptors are not removed during the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u16);

impl TaskId {
    /// Highest registry index a handle can address
    pub const MAX_INDEX: usize = u16::MAX as usize;

    /// # Panics
    ///
    /// If `index` does not fit in a handle.
    pub(crate) const fn from_index(index: usize) -> Self {
        assert!(index <= Self::MAX_INDEX, "task index does not fit in a task id");
        Self(index as u16)
    }

    /// Position of the task in the registry
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Task body: receives the user state and the invocation context
pub type TaskFn<S> = fn(&mut S, &mut TaskContext);

/// Readiness predicate: `(state, now_us, last_executed_us) -> ready`
pub type CheckFn<S> = fn(&mut S, TimeUs, TimeUs) -> bool;

/// Build-time description of a task
///
/// Descriptors are plain data: a name, the function pointers and the
/// timing requirements. Runtime bookkeeping lives in the registry.
pub struct TaskDescriptor<S> {
    /// Human-readable task name for logging and diagnostics
    pub name: &'static str,

    /// Optional variant name grouping several jobs under one task name
    pub sub_name: Option<&'static str>,

    /// Optional readiness predicate. Absent means "ready when the period expires".
    pub check_fn: Option<CheckFn<S>>,

    /// The work to perform
    pub task_fn: TaskFn<S>,

    /// Target interval between executions in microseconds
    ///
    /// Zero is only valid together with a `check_fn`.
    pub desired_period_us: u32,

    /// Importance class
    pub static_priority: Priority,

    /// Expected worst-case execution time in microseconds
    ///
    /// A run longer than this is counted as an overrun. Without a budget the
    /// desired period is used instead.
    pub budget_us: Option<u32>,
}

// Manual impls: function pointers are Copy whatever `S` is.
impl<S> Clone for TaskDescriptor<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for TaskDescriptor<S> {}

impl<S> TaskDescriptor<S> {
    /// Periodic task without a readiness predicate
    pub const fn new(
        name: &'static str,
        task_fn: TaskFn<S>,
        desired_period_us: u32,
        static_priority: Priority,
    ) -> Self {
        Self {
            name,
            sub_name: None,
            check_fn: None,
            task_fn,
            desired_period_us,
            static_priority,
            budget_us: None,
        }
    }

    /// Builder method to set the sub-name
    pub fn with_sub_name(mut self, sub_name: &'static str) -> Self {
        self.sub_name = Some(sub_name);
        self
    }

    /// Builder method to make the task event-driven
    pub fn with_check(mut self, check_fn: CheckFn<S>) -> Self {
        self.check_fn = Some(check_fn);
        self
    }

    /// Builder method to declare an execution budget
    pub fn with_budget(mut self, budget_us: u32) -> Self {
        self.budget_us = Some(budget_us);
        self
    }

    /// Whether this task is driven by a readiness predicate
    #[inline]
    pub const fn is_event_driven(&self) -> bool {
        self.check_fn.is_some()
    }
}

impl<S> core::fmt::Debug for TaskDescriptor<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("name", &self.name)
            .field("sub_name", &self.sub_name)
            .field("event_driven", &self.is_event_driven())
            .field("desired_period_us", &self.desired_period_us)
            .field("static_priority", &self.static_priority)
            .field("budget_us", &self.budget_us)
            .finish()
    }
}

/// Per-invocation handle passed to a task body
///
/// Requests made through the context apply to the task currently executing
/// and are applied by the scheduler once the body returns.
#[derive(Debug, Clone, Copy)]
pub struct TaskContext {
    now_us: TimeUs,
    available_us: Option<u32>,
    requested_period_us: Option<u32>,
    ignore_execution_time: bool,
}

impl TaskContext {
    /// Context for an invocation dispatched at `now_us`
    pub const fn new(now_us: TimeUs, available_us: Option<u32>) -> Self {
        Self {
            now_us,
            available_us,
            requested_period_us: None,
            ignore_execution_time: false,
        }
    }

    /// Timestamp at which the scheduler dispatched this invocation
    #[inline]
    pub fn now_us(&self) -> TimeUs {
        self.now_us
    }

    /// Time left before the realtime task is due, if one is being guarded
    #[inline]
    pub fn available_us(&self) -> Option<u32> {
        self.available_us
    }

    /// Set the desired period of this task from now on
    ///
    /// Used by tasks whose next event depends on the hardware, such as a
    /// barometer alternating between pressure and temperature conversions.
    pub fn request_next_period(&mut self, period_us: u32) {
        self.requested_period_us = Some(period_us);
    }

    /// Exclude this invocation from execution-time statistics
    ///
    /// For bodies that knowingly block, e.g. while writing configuration
    /// to flash with the motors stopped.
    pub fn ignore_execution_time(&mut self) {
        self.ignore_execution_time = true;
    }

    pub(crate) fn requested_period_us(&self) -> Option<u32> {
        self.requested_period_us
    }

    pub(crate) fn is_execution_time_ignored(&self) -> bool {
        self.ignore_execution_time
    }
}

/// Read-only diagnostic snapshot of one task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskInfo {
    pub name: &'static str,
    pub sub_name: Option<&'static str>,
    pub enabled: bool,
    pub static_priority: Priority,
    pub dynamic_priority: u16,
    pub desired_period_us: u32,
    /// Interval between the two most recent executions
    pub latest_delta_us: u32,
    pub average_execution_us: u32,
    pub max_execution_us: u32,
    /// Accumulated execution time since the last statistics reset
    pub total_execution_us: u64,
    pub check_average_us: u32,
    pub check_max_us: u32,
    pub check_total_us: u64,
    pub invocation_count: u32,
    /// Runs that exceeded the budget (or the period when no budget is set)
    pub overruns: u32,
    /// Times the realtime guard refused to start this task
    pub guard_rejections: u32,
    /// Times the task ran although the guard had refused it
    pub forced_admissions: u32,
    /// Share of wall-clock time used in the last load window, in 0.1 %
    pub load_permille: u16,
}
