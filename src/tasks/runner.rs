//! Main-loop wrapper
//!
//! [`FlightScheduler`] owns the scheduler and the flight task table. Each
//! call to [`FlightScheduler::step`] runs one scheduler step; when nothing
//! was selected the gap goes to the application's idle work and, once a
//! second, to the health report.

use flightloop_core::scheduler::{
    Scheduler, SchedulerConfig, SchedulerError, StepOutcome, TaskId, TaskInfo,
};
use flightloop_core::traits::TimeSource;

use super::init::{init_tasks, TaskTable};
use super::{FlightSystem, FlightTask};
use crate::config::{BuildCapabilities, FlightConfig};
use crate::core::scheduler::monitor::{collect_and_report_stats, HealthSummary};

/// Interval between health reports
pub const MONITOR_INTERVAL_MS: u64 = 1_000;

/// Scheduler capacity that holds every flight task
pub const MAX_FLIGHT_TASKS: usize = FlightTask::COUNT;

/// Flight-controller scheduler with its task set registered
pub struct FlightScheduler<F, T: TimeSource, const N: usize = MAX_FLIGHT_TASKS> {
    scheduler: Scheduler<F, T, N>,
    tasks: TaskTable,
    last_report_ms: u64,
    last_health: Option<HealthSummary>,
}

impl<F: FlightSystem, T: TimeSource, const N: usize> FlightScheduler<F, T, N> {
    /// Build the scheduler and initialize the flight task set
    ///
    /// # Errors
    ///
    /// Fails when `N` cannot hold every task the build contains.
    pub fn new(
        time: T,
        config: SchedulerConfig,
        caps: BuildCapabilities,
        flight: &FlightConfig,
    ) -> Result<Self, SchedulerError> {
        let mut scheduler = Scheduler::new(time, config);
        let tasks = init_tasks(&mut scheduler, caps, flight)?;
        let last_report_ms = scheduler.time().now_ms();

        Ok(Self {
            scheduler,
            tasks,
            last_report_ms,
            last_health: None,
        })
    }

    /// Run one main-loop iteration
    pub fn step(&mut self, system: &mut F) -> StepOutcome {
        let outcome = self.scheduler.run_step(system);
        if outcome.is_idle() {
            system.idle_poll();
            self.report_if_due();
        }
        outcome
    }

    fn report_if_due(&mut self) {
        let now_ms = self.scheduler.time().now_ms();
        if now_ms.saturating_sub(self.last_report_ms) < MONITOR_INTERVAL_MS {
            return;
        }
        self.last_report_ms = now_ms;
        self.last_health = Some(collect_and_report_stats(&self.scheduler, now_ms));
    }

    /// Scheduler id of a flight task, if the build contains it
    #[inline]
    pub fn task_id(&self, task: FlightTask) -> Option<TaskId> {
        self.tasks.get(task)
    }

    /// Enable or disable a flight task; ignored when the build lacks it
    pub fn set_task_enabled(&mut self, task: FlightTask, enabled: bool) {
        if let Some(id) = self.tasks.get(task) {
            self.scheduler.set_task_enabled(id, enabled);
        }
    }

    /// Whether a flight task exists and is enabled
    pub fn is_task_enabled(&self, task: FlightTask) -> bool {
        self.tasks
            .get(task)
            .is_some_and(|id| self.scheduler.is_task_enabled(id))
    }

    /// Change the period of a flight task; ignored when the build lacks it
    pub fn reschedule(&mut self, task: FlightTask, period_us: u32) {
        if let Some(id) = self.tasks.get(task) {
            self.scheduler.reschedule_task(id, period_us);
        }
    }

    /// Diagnostic snapshot of a flight task
    pub fn task_info(&self, task: FlightTask) -> Option<TaskInfo> {
        self.tasks.get(task).map(|id| self.scheduler.task_info(id))
    }

    /// Most recent health report
    #[inline]
    pub fn last_health(&self) -> Option<HealthSummary> {
        self.last_health
    }

    #[inline]
    pub fn tasks(&self) -> &TaskTable {
        &self.tasks
    }

    #[inline]
    pub fn scheduler(&self) -> &Scheduler<F, T, N> {
        &self.scheduler
    }

    /// Direct access for statistics control
    #[inline]
    pub fn scheduler_mut(&mut self) -> &mut Scheduler<F, T, N> {
        &mut self.scheduler
    }
}
