//! Scheduler core
//!
//! One call to [`Scheduler::run_step`] per main-loop iteration:
//!
//! 1. Read the clock and roll the load window if it is due.
//! 2. Run the realtime task if its period has elapsed. It never competes.
//! 3. Re-read the clock and compute the time left before the realtime task
//!    is due again.
//! 4. Evaluate every other enabled task: run readiness predicates, update
//!    dynamic priorities, and pass each candidate through the realtime guard.
//! 5. Run the admitted candidate with the highest dynamic priority (earliest
//!    registered on ties), or nothing.
//!
//! Tasks run to completion. An overrunning task is only noticed afterwards,
//! through its statistics.

use super::config::SchedulerConfig;
use super::error::SchedulerError;
use super::guard::RealtimeGuard;
use super::load::LoadWindow;
use super::priority::{periodic_priority, signaled_priority};
use super::registry::TaskRegistry;
use super::types::{TaskContext, TaskDescriptor, TaskId, TaskInfo};
use crate::traits::{TimeSource, TimeUs};

/// What happened during one scheduler step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// The realtime task ran at the start of the step
    pub realtime_ran: bool,
    /// The candidate that was selected and executed, if any
    pub selected: Option<TaskId>,
    /// The selected task was rejected by the guard but ran anyway
    pub forced: bool,
}

impl StepOutcome {
    /// No candidate was selected; the caller may use the gap for background work
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.selected.is_none()
    }
}

#[derive(Clone, Copy)]
struct Candidate {
    id: TaskId,
    priority: u16,
    estimate_us: u32,
}

/// Cooperative scheduler over a fixed set of tasks
///
/// `S` is the state handed to every task body and readiness predicate, `T`
/// the clock, `N` the registry capacity.
pub struct Scheduler<S, T: TimeSource, const N: usize> {
    time: T,
    config: SchedulerConfig,
    guard: RealtimeGuard,
    registry: TaskRegistry<S, N>,
    load: LoadWindow,
    current: Option<TaskId>,
    calculate_statistics: bool,
    missed_deadlines: u32,
    forced_admissions: u32,
}

impl<S, T: TimeSource, const N: usize> Scheduler<S, T, N> {
    /// Empty scheduler; the load window opens now
    pub fn new(time: T, config: SchedulerConfig) -> Self {
        let now = time.now_time_us();
        Self {
            time,
            guard: RealtimeGuard::new(config.guard_margin_percent),
            registry: TaskRegistry::new(&config),
            load: LoadWindow::new(config.load_window_us, now),
            current: None,
            calculate_statistics: config.calculate_statistics,
            missed_deadlines: 0,
            forced_admissions: 0,
            config,
        }
    }

    /// Register a task. It starts disabled.
    pub fn register(&mut self, descriptor: TaskDescriptor<S>) -> Result<TaskId, SchedulerError> {
        self.registry.register(descriptor)
    }

    /// Enable or disable a task
    ///
    /// A disabled task is never selected. Re-enabling restarts its age from
    /// now, so it next runs one full period later.
    pub fn set_task_enabled(&mut self, id: TaskId, enabled: bool) {
        let now = self.time.now_time_us();
        self.registry.set_enabled(id, enabled, now);
    }

    /// Whether a task is enabled
    pub fn is_task_enabled(&self, id: TaskId) -> bool {
        self.registry.get(id).state.enabled
    }

    /// Change the desired period of a task
    ///
    /// Task bodies reschedule themselves through
    /// [`TaskContext::request_next_period`] instead.
    pub fn reschedule_task(&mut self, id: TaskId, period_us: u32) {
        self.registry.reschedule(id, period_us);
    }

    /// Run one scheduling step
    pub fn run_step(&mut self, state: &mut S) -> StepOutcome {
        let mut outcome = StepOutcome::default();

        let now = self.time.now_time_us();
        if self.load.is_due(now) {
            self.load.roll(now, &mut self.registry);
        }

        let realtime = self.registry.realtime();
        if let Some(id) = realtime {
            if self.registry.get(id).state.enabled && self.evaluate(id, now, state) > 0 {
                self.execute(id, now, None, state);
                outcome.realtime_ran = true;
            }
        }

        let now = self.time.now_time_us();
        let time_left = self.realtime_time_left(now);

        let mut best: Option<Candidate> = None;
        let mut least_risky: Option<Candidate> = None;
        let mut waiting = 0;

        for index in 0..self.registry.len() {
            let id = TaskId::from_index(index);
            if Some(id) == realtime || !self.registry.get(id).state.enabled {
                continue;
            }

            let priority = self.evaluate(id, now, state);
            if priority == 0 {
                continue;
            }
            waiting += 1;

            let entry = self.registry.get_mut(id);
            let candidate = Candidate {
                id,
                priority,
                estimate_us: entry.stats.admission_estimate_us(),
            };
            let admitted = match time_left {
                Some(left) => self.guard.check(left, candidate.estimate_us).is_admitted(),
                None => true,
            };

            if admitted {
                if best.map_or(true, |b| candidate.priority > b.priority) {
                    best = Some(candidate);
                }
            } else {
                entry.guard_rejections = entry.guard_rejections.saturating_add(1);
                let safer = least_risky.map_or(true, |l| {
                    candidate.estimate_us < l.estimate_us
                        || (candidate.estimate_us == l.estimate_us && candidate.priority > l.priority)
                });
                if safer {
                    least_risky = Some(candidate);
                }
            }
        }
        self.load.record_waiting(waiting);

        if best.is_none()
            && self.config.admit_least_risky_when_starved
            && time_left.map_or(false, |left| left > 0)
        {
            if let Some(candidate) = least_risky {
                let entry = self.registry.get_mut(candidate.id);
                entry.forced_admissions = entry.forced_admissions.saturating_add(1);
                self.forced_admissions = self.forced_admissions.saturating_add(1);
                outcome.forced = true;
                best = Some(candidate);
            }
        }

        if let Some(candidate) = best {
            let available = time_left.map(|left| left.max(0) as u32);
            self.execute(candidate.id, now, available, state);
            outcome.selected = Some(candidate.id);
        }

        outcome
    }

    /// Compute and store the dynamic priority of an enabled task
    fn evaluate(&mut self, id: TaskId, now: TimeUs, state: &mut S) -> u16 {
        let (check_fn, latched) = {
            let entry = self.registry.get(id);
            (entry.descriptor.check_fn, entry.state.dynamic_priority > 0)
        };

        let priority = match check_fn {
            None => {
                let entry = self.registry.get(id);
                periodic_priority(
                    now,
                    entry.state.last_executed_at_us,
                    entry.descriptor.desired_period_us,
                    entry.descriptor.static_priority,
                )
            }
            // Once signaled, a task stays a candidate until it runs
            Some(_) if latched => {
                let entry = self.registry.get(id);
                signaled_priority(
                    now,
                    entry.state.last_signaled_at_us,
                    entry.descriptor.desired_period_us,
                    entry.descriptor.static_priority,
                )
            }
            Some(check) => {
                let last_executed = self.registry.get(id).state.last_executed_at_us;
                let started = self.time.now_time_us();
                let ready = check(state, now, last_executed);
                let duration = self.time.now_time_us().wrapping_sub(started);

                let entry = self.registry.get_mut(id);
                if self.calculate_statistics {
                    entry.check_stats.record(duration);
                }
                if ready {
                    entry.state.last_signaled_at_us = now;
                    signaled_priority(
                        now,
                        now,
                        entry.descriptor.desired_period_us,
                        entry.descriptor.static_priority,
                    )
                } else {
                    0
                }
            }
        };

        self.registry.get_mut(id).state.dynamic_priority = priority;
        priority
    }

    fn execute(&mut self, id: TaskId, now: TimeUs, available_us: Option<u32>, state: &mut S) {
        let is_realtime = Some(id) == self.registry.realtime();
        let task_fn = {
            let entry = self.registry.get_mut(id);
            entry.state.latest_delta_us = now.wrapping_sub(entry.state.last_executed_at_us);
            entry.state.last_executed_at_us = now;
            entry.state.dynamic_priority = 0;
            entry.invocation_count = entry.invocation_count.saturating_add(1);

            let period = entry.descriptor.desired_period_us;
            if is_realtime && period > 0 && entry.state.latest_delta_us / period >= 2 {
                self.missed_deadlines = self.missed_deadlines.saturating_add(1);
            }
            entry.descriptor.task_fn
        };

        let mut ctx = TaskContext::new(now, available_us);
        self.current = Some(id);
        let started = self.time.now_time_us();
        task_fn(state, &mut ctx);
        let duration = self.time.now_time_us().wrapping_sub(started);
        self.current = None;

        let entry = self.registry.get_mut(id);
        if self.calculate_statistics && !ctx.is_execution_time_ignored() {
            entry.stats.record(duration);
            if entry.is_overrun(duration) {
                entry.overruns = entry.overruns.saturating_add(1);
            }
        }
        if let Some(period) = ctx.requested_period_us() {
            self.registry.reschedule(id, period);
        }
    }

    /// Time left before the realtime task is due, if it exists and is enabled
    fn realtime_time_left(&self, now: TimeUs) -> Option<i32> {
        let id = self.registry.realtime()?;
        let entry = self.registry.get(id);
        if !entry.state.enabled {
            return None;
        }
        Some(RealtimeGuard::time_left_us(
            now,
            entry.state.last_executed_at_us,
            entry.descriptor.desired_period_us,
        ))
    }

    /// Task currently executing, if called from inside a step
    #[inline]
    pub fn current_task(&self) -> Option<TaskId> {
        self.current
    }

    /// The realtime task, if one is registered
    #[inline]
    pub fn realtime_task(&self) -> Option<TaskId> {
        self.registry.realtime()
    }

    /// Look up a task by name and sub-name
    pub fn find_task(&self, name: &str, sub_name: Option<&str>) -> Option<TaskId> {
        self.registry.find(name, sub_name)
    }

    /// All registered task ids in registration order
    pub fn task_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.registry.iter().map(|(id, _)| id)
    }

    /// Number of registered tasks
    #[inline]
    pub fn task_count(&self) -> usize {
        self.registry.len()
    }

    /// Diagnostic snapshot of one task
    pub fn task_info(&self, id: TaskId) -> TaskInfo {
        self.registry.get(id).info()
    }

    /// Smoothed execution time of a task
    pub fn average_execution_us(&self, id: TaskId) -> u32 {
        self.registry.get(id).stats.average_us()
    }

    /// Worst execution time of a task since its last reset
    pub fn max_execution_us(&self, id: TaskId) -> u32 {
        self.registry.get(id).stats.max_us()
    }

    /// Share of the last load window spent in a task, in 0.1 %
    pub fn task_load_permille(&self, id: TaskId) -> u16 {
        self.registry.get(id).load_permille
    }

    /// Share of the last load window spent executing tasks, in 0.1 %
    #[inline]
    pub fn cpu_load_permille(&self) -> u16 {
        self.load.cpu_load_permille()
    }

    /// Average number of waiting tasks per step in the last window, in percent
    #[inline]
    pub fn system_load_percent(&self) -> u16 {
        self.load.system_load_percent()
    }

    /// Realtime runs that came a whole period or more late
    #[inline]
    pub fn missed_deadlines(&self) -> u32 {
        self.missed_deadlines
    }

    /// Candidates run despite a guard rejection
    #[inline]
    pub fn forced_admissions(&self) -> u32 {
        self.forced_admissions
    }

    /// Start or stop recording execution-time statistics
    pub fn set_calculate_task_statistics(&mut self, enabled: bool) {
        self.calculate_statistics = enabled;
    }

    /// Whether execution-time statistics are being recorded
    #[inline]
    pub fn calculates_task_statistics(&self) -> bool {
        self.calculate_statistics
    }

    /// Clear all statistics of one task
    pub fn reset_task_statistics(&mut self, id: TaskId) {
        self.registry.get_mut(id).reset_statistics();
    }

    /// Clear the statistics of every task and the scheduler-wide counters
    pub fn reset_all_task_statistics(&mut self) {
        for entry in self.registry.entries_mut() {
            entry.reset_statistics();
        }
        self.missed_deadlines = 0;
        self.forced_admissions = 0;
    }

    /// Forget the worst-case execution time of a task
    pub fn reset_task_max_execution_time(&mut self, id: TaskId) {
        self.registry.get_mut(id).stats.reset_max();
    }

    /// Read-only access to the registry
    #[inline]
    pub fn registry(&self) -> &TaskRegistry<S, N> {
        &self.registry
    }

    /// Configuration the scheduler was built with
    #[inline]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The scheduler's clock
    #[inline]
    pub fn time(&self) -> &T {
        &self.time
    }
}
