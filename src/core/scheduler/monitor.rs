//! Scheduler health reporting
//!
//! Periodically reads the scheduler diagnostics and reports system health:
//! - CPU and system load
//! - Realtime missed deadlines
//! - Forced admissions past the realtime guard
//! - Per-task execution times and overruns

use flightloop_core::scheduler::Scheduler;
use flightloop_core::traits::TimeSource;

/// CPU load warning threshold (tenths of a percent)
const CPU_LOAD_WARNING_PERMILLE: u16 = 750;

/// Snapshot of scheduler-wide health figures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthSummary {
    pub uptime_ms: u64,
    pub cpu_load_permille: u16,
    pub system_load_percent: u16,
    pub missed_deadlines: u32,
    pub forced_admissions: u32,
    /// Warning conditions found during this report
    pub warnings: u32,
}

/// Collect and report statistics for all registered tasks
///
/// Called about once a second from the main loop.
pub fn collect_and_report_stats<S, T: TimeSource, const N: usize>(
    scheduler: &Scheduler<S, T, N>,
    uptime_ms: u64,
) -> HealthSummary {
    let mut summary = HealthSummary {
        uptime_ms,
        cpu_load_permille: scheduler.cpu_load_permille(),
        system_load_percent: scheduler.system_load_percent(),
        missed_deadlines: scheduler.missed_deadlines(),
        forced_admissions: scheduler.forced_admissions(),
        warnings: 0,
    };

    log_scheduler_summary(&summary);
    summary.warnings = check_warnings(scheduler);
    report_task_stats(scheduler);

    summary
}

#[allow(unused_variables)]
fn log_scheduler_summary(summary: &HealthSummary) {
    crate::log_info!(
        "Scheduler: uptime={}ms cpu={}.{}% system={}% missed={} forced={}",
        summary.uptime_ms,
        summary.cpu_load_permille / 10,
        summary.cpu_load_permille % 10,
        summary.system_load_percent,
        summary.missed_deadlines,
        summary.forced_admissions
    );
}

/// Log warning conditions, returning how many were found
#[allow(unused_variables)]
pub fn check_warnings<S, T: TimeSource, const N: usize>(scheduler: &Scheduler<S, T, N>) -> u32 {
    let mut warnings = 0;

    let cpu_load = scheduler.cpu_load_permille();
    if cpu_load >= CPU_LOAD_WARNING_PERMILLE {
        crate::log_warn!("High CPU load: {}.{}%", cpu_load / 10, cpu_load % 10);
        warnings += 1;
    }

    if scheduler.missed_deadlines() > 0 {
        crate::log_warn!(
            "Realtime task missed {} deadlines",
            scheduler.missed_deadlines()
        );
        warnings += 1;
    }

    for id in scheduler.task_ids() {
        let info = scheduler.task_info(id);

        if info.overruns > 0 {
            crate::log_warn!(
                "Task '{}': {} overruns (max {}us, period {}us)",
                info.name,
                info.overruns,
                info.max_execution_us,
                info.desired_period_us
            );
            warnings += 1;
        }

        if info.forced_admissions > 0 {
            crate::log_warn!(
                "Task '{}': started {} times past the realtime guard",
                info.name,
                info.forced_admissions
            );
            warnings += 1;
        }
    }

    warnings
}

/// Log one line per registered task
#[allow(unused_variables)]
pub fn report_task_stats<S, T: TimeSource, const N: usize>(scheduler: &Scheduler<S, T, N>) {
    let count = scheduler.task_count();
    if count == 0 {
        return;
    }

    crate::log_info!("Task statistics ({} tasks):", count);

    for id in scheduler.task_ids() {
        let info = scheduler.task_info(id);
        if !info.enabled {
            continue;
        }

        crate::log_info!(
            "  {}{}{}: prio={} period={}us delta={}us exec avg={}us max={}us load={}.{}% count={}",
            info.name,
            if info.sub_name.is_some() { "/" } else { "" },
            info.sub_name.unwrap_or(""),
            info.static_priority.level(),
            info.desired_period_us,
            info.latest_delta_us,
            info.average_execution_us,
            info.max_execution_us,
            info.load_permille / 10,
            info.load_permille % 10,
            info.invocation_count
        );
    }
}
