//! Task registry
//!
//! Fixed-capacity table of task descriptors and their runtime bookkeeping.
//! Tasks are registered once at startup and never removed, so a [`TaskId`]
//! stays valid for the life of the scheduler.
//!
//! Referencing an id that was not issued by this registry is a programming
//! error and panics.

use heapless::Vec;

use super::config::SchedulerConfig;
use super::error::SchedulerError;
use super::estimator::ExecutionEstimator;
use super::types::{Priority, TaskDescriptor, TaskId, TaskInfo};
use crate::traits::TimeUs;

/// Mutable scheduling state of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskState {
    pub enabled: bool,
    /// Recomputed each step; zero when the task is not a candidate
    pub dynamic_priority: u16,
    pub last_executed_at_us: TimeUs,
    pub last_signaled_at_us: TimeUs,
    /// Interval between the two most recent executions
    pub latest_delta_us: u32,
}

/// One registry slot: descriptor, state and statistics
#[derive(Debug)]
pub struct TaskEntry<S> {
    pub descriptor: TaskDescriptor<S>,
    pub state: TaskState,
    /// Task body timing
    pub stats: ExecutionEstimator,
    /// Readiness predicate timing
    pub check_stats: ExecutionEstimator,
    pub invocation_count: u32,
    pub overruns: u32,
    pub guard_rejections: u32,
    pub forced_admissions: u32,
    pub load_permille: u16,
}

impl<S> TaskEntry<S> {
    fn new(descriptor: TaskDescriptor<S>) -> Self {
        Self {
            descriptor,
            state: TaskState::default(),
            stats: ExecutionEstimator::new(),
            check_stats: ExecutionEstimator::new(),
            invocation_count: 0,
            overruns: 0,
            guard_rejections: 0,
            forced_admissions: 0,
            load_permille: 0,
        }
    }

    /// Whether a run of `duration_us` exceeds what this task is allowed
    pub fn is_overrun(&self, duration_us: u32) -> bool {
        let limit = self
            .descriptor
            .budget_us
            .unwrap_or(self.descriptor.desired_period_us);
        limit > 0 && duration_us > limit
    }

    /// Clear statistics and diagnostic counters, keeping the schedule
    pub fn reset_statistics(&mut self) {
        self.stats.reset();
        self.check_stats.reset();
        self.invocation_count = 0;
        self.overruns = 0;
        self.guard_rejections = 0;
        self.forced_admissions = 0;
        self.load_permille = 0;
    }

    /// Diagnostic snapshot
    pub fn info(&self) -> TaskInfo {
        TaskInfo {
            name: self.descriptor.name,
            sub_name: self.descriptor.sub_name,
            enabled: self.state.enabled,
            static_priority: self.descriptor.static_priority,
            dynamic_priority: self.state.dynamic_priority,
            desired_period_us: self.descriptor.desired_period_us,
            latest_delta_us: self.state.latest_delta_us,
            average_execution_us: self.stats.average_us(),
            max_execution_us: self.stats.max_us(),
            total_execution_us: self.stats.total_us(),
            check_average_us: self.check_stats.average_us(),
            check_max_us: self.check_stats.max_us(),
            check_total_us: self.check_stats.total_us(),
            invocation_count: self.invocation_count,
            overruns: self.overruns,
            guard_rejections: self.guard_rejections,
            forced_admissions: self.forced_admissions,
            load_permille: self.load_permille,
        }
    }
}

/// Ordered, fixed-capacity collection of tasks
///
/// Registration order is also the tie-break order when two candidates have
/// the same dynamic priority.
pub struct TaskRegistry<S, const N: usize> {
    entries: Vec<TaskEntry<S>, N>,
    realtime: Option<TaskId>,
    config: SchedulerConfig,
}

impl<S, const N: usize> TaskRegistry<S, N> {
    /// Empty registry; periods are clamped with [`SchedulerConfig::clamp_period`]
    pub const fn new(config: &SchedulerConfig) -> Self {
        Self {
            entries: Vec::new(),
            realtime: None,
            config: *config,
        }
    }

    /// Add a task. It starts disabled.
    ///
    /// # Errors
    ///
    /// Rejects a full registry, a zero period without a readiness predicate,
    /// a realtime task without a period, a second realtime task and a
    /// duplicated name/sub-name pair.
    pub fn register(&mut self, mut descriptor: TaskDescriptor<S>) -> Result<TaskId, SchedulerError> {
        if self.entries.len() > TaskId::MAX_INDEX {
            return Err(SchedulerError::RegistryFull);
        }
        if descriptor.desired_period_us == 0 && descriptor.check_fn.is_none() {
            return Err(SchedulerError::ZeroPeriodWithoutCheck {
                name: descriptor.name,
            });
        }
        if descriptor.static_priority == Priority::Realtime && descriptor.desired_period_us == 0 {
            return Err(SchedulerError::RealtimeWithoutPeriod {
                name: descriptor.name,
            });
        }
        if descriptor.static_priority == Priority::Realtime && self.realtime.is_some() {
            return Err(SchedulerError::DuplicateRealtime {
                name: descriptor.name,
            });
        }
        if self.entries.iter().any(|entry| {
            entry.descriptor.name == descriptor.name
                && entry.descriptor.sub_name == descriptor.sub_name
        }) {
            return Err(SchedulerError::DuplicateName {
                name: descriptor.name,
            });
        }

        descriptor.desired_period_us = self.config.clamp_period(descriptor.desired_period_us);
        let id = TaskId::from_index(self.entries.len());
        let is_realtime = descriptor.static_priority == Priority::Realtime;
        self.entries
            .push(TaskEntry::new(descriptor))
            .map_err(|_| SchedulerError::RegistryFull)?;

        if is_realtime {
            self.realtime = Some(id);
        }
        Ok(id)
    }

    /// Number of registered tasks
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of tasks
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// The task holding realtime priority, if any
    #[inline]
    pub fn realtime(&self) -> Option<TaskId> {
        self.realtime
    }

    /// Entry for `id`
    ///
    /// # Panics
    ///
    /// If `id` was not issued by this registry.
    pub fn get(&self, id: TaskId) -> &TaskEntry<S> {
        assert!(
            id.index() < self.entries.len(),
            "invalid task id {} (registry holds {} tasks)",
            id.index(),
            self.entries.len()
        );
        &self.entries[id.index()]
    }

    /// Mutable entry for `id`
    ///
    /// # Panics
    ///
    /// If `id` was not issued by this registry.
    pub fn get_mut(&mut self, id: TaskId) -> &mut TaskEntry<S> {
        assert!(
            id.index() < self.entries.len(),
            "invalid task id {} (registry holds {} tasks)",
            id.index(),
            self.entries.len()
        );
        &mut self.entries[id.index()]
    }

    /// Look up a task by name and sub-name
    ///
    /// Linear search; meant for setup and diagnostics, not the hot path.
    pub fn find(&self, name: &str, sub_name: Option<&str>) -> Option<TaskId> {
        self.entries
            .iter()
            .position(|entry| entry.descriptor.name == name && entry.descriptor.sub_name == sub_name)
            .map(TaskId::from_index)
    }

    /// Iterate over `(TaskId, entry)` pairs in registration order
    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &TaskEntry<S>)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (TaskId::from_index(index), entry))
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut TaskEntry<S>> {
        self.entries.iter_mut()
    }

    /// Enable or disable a task
    ///
    /// Both transitions clear the task's age. Enabling stamps `now_us` as the
    /// last execution, so the task first runs one full period later instead
    /// of looking maximally overdue. Repeating the current state is a no-op.
    pub fn set_enabled(&mut self, id: TaskId, enabled: bool, now_us: TimeUs) {
        let state = &mut self.get_mut(id).state;
        if state.enabled == enabled {
            return;
        }
        state.enabled = enabled;
        state.dynamic_priority = 0;
        if enabled {
            state.last_executed_at_us = now_us;
            state.last_signaled_at_us = now_us;
        }
    }

    /// Replace the desired period of a task
    ///
    /// # Panics
    ///
    /// If the period is zero and the task has no readiness predicate, or is
    /// the realtime task.
    pub fn reschedule(&mut self, id: TaskId, period_us: u32) {
        let period_us = self.config.clamp_period(period_us);
        assert!(
            period_us > 0 || self.realtime != Some(id),
            "realtime task cannot be rescheduled to a zero period"
        );
        let descriptor = &mut self.get_mut(id).descriptor;
        assert!(
            period_us > 0 || descriptor.check_fn.is_some(),
            "task '{}' cannot be rescheduled to a zero period without a check function",
            descriptor.name
        );
        descriptor.desired_period_us = period_us;
    }
}
