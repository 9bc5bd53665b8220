//! Task set initialization
//!
//! Registers every task the build contains, then enables and reschedules
//! them from the detected sensors and the user configuration. Tasks start
//! disabled, so anything not enabled here never runs.

use flightloop_core::scheduler::{period_hz, Scheduler, SchedulerError, TaskId};
use flightloop_core::traits::TimeSource;
use heapless::Vec;

use super::{FlightSystem, FlightTask, FAST_TELEMETRY_PERIOD_US};
use crate::config::{BuildCapabilities, Features, FlightConfig, Sensors};

/// Flight tasks contained in a build, in registration order
pub fn available_tasks(caps: BuildCapabilities) -> Vec<FlightTask, { FlightTask::COUNT }> {
    FlightTask::ALL
        .iter()
        .copied()
        .filter(|task| task.is_available(caps))
        .collect()
}

/// Scheduler ids of the registered flight tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTable {
    ids: [Option<TaskId>; FlightTask::COUNT],
}

impl TaskTable {
    const fn new() -> Self {
        Self {
            ids: [None; FlightTask::COUNT],
        }
    }

    /// Id of `task`, or `None` when the build does not contain it
    #[inline]
    pub fn get(&self, task: FlightTask) -> Option<TaskId> {
        self.ids[task.index()]
    }

    /// Registered tasks with their ids
    pub fn iter(&self) -> impl Iterator<Item = (FlightTask, TaskId)> + '_ {
        FlightTask::ALL
            .iter()
            .filter_map(move |&task| self.get(task).map(|id| (task, id)))
    }

    /// Number of registered tasks
    pub fn len(&self) -> usize {
        self.ids.iter().filter(|id| id.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Register the flight task set and apply the enablement rules
///
/// # Errors
///
/// Propagates registration failures, e.g. a scheduler whose capacity is
/// smaller than the task set of the build.
pub fn init_tasks<F, T, const N: usize>(
    scheduler: &mut Scheduler<F, T, N>,
    caps: BuildCapabilities,
    config: &FlightConfig,
) -> Result<TaskTable, SchedulerError>
where
    F: FlightSystem,
    T: TimeSource,
{
    let mut table = TaskTable::new();
    for task in available_tasks(caps) {
        table.ids[task.index()] = Some(scheduler.register(task.descriptor::<F>())?);
    }

    let mut init = Init {
        scheduler,
        table: &table,
        caps,
    };
    init.apply(config);

    crate::log_info!(
        "Flight tasks: {} registered, {} enabled",
        table.len(),
        table
            .iter()
            .filter(|&(_, id)| init.scheduler.is_task_enabled(id))
            .count()
    );

    Ok(table)
}

struct Init<'a, F, T: TimeSource, const N: usize> {
    scheduler: &'a mut Scheduler<F, T, N>,
    table: &'a TaskTable,
    caps: BuildCapabilities,
}

impl<F, T: TimeSource, const N: usize> Init<'_, F, T, N> {
    fn apply(&mut self, config: &FlightConfig) {
        self.enable(FlightTask::Main, true);

        self.enable(FlightTask::Serial, true);
        if config.serial_update_rate_hz != config.serial_update_rate_hz() {
            crate::log_warn!(
                "Serial update rate {}Hz out of range, using {}Hz",
                config.serial_update_rate_hz,
                config.serial_update_rate_hz()
            );
        }
        self.reschedule(
            FlightTask::Serial,
            period_hz(config.serial_update_rate_hz() as u32),
        );

        let use_voltage = config.voltage_meter.is_present();
        let use_current = config.current_meter.is_present();
        let use_alerts = config.use_vbat_alerts
            || config.use_consumption_alerts
            || config.feature_enabled(Features::OSD);
        self.enable(FlightTask::BatteryVoltage, use_voltage);
        self.enable(FlightTask::BatteryCurrent, use_current);
        self.enable(
            FlightTask::BatteryAlerts,
            (use_voltage || use_current) && use_alerts,
        );

        self.enable(FlightTask::StackCheck, true);

        if config.has_sensor(Sensors::GYRO) {
            if config.gyro_target_looptime_us > 0 {
                self.reschedule(FlightTask::GyroPid, config.gyro_target_looptime_us);
            } else {
                crate::log_warn!("Gyro reported no loop time, keeping the default");
            }
            self.enable(FlightTask::GyroPid, true);
        } else {
            crate::log_warn!("No gyro detected, flight loop disabled");
        }

        if config.has_sensor(Sensors::ACC) {
            self.enable(FlightTask::Accel, true);
            if config.acc_sampling_interval_us > 0 {
                self.reschedule(FlightTask::Accel, config.acc_sampling_interval_us);
            }
            self.enable(FlightTask::Attitude, true);
        }

        if config.has_sensor(Sensors::RANGEFINDER) {
            self.enable(
                FlightTask::Rangefinder,
                config.feature_enabled(Features::RANGEFINDER),
            );
        }

        self.enable(FlightTask::Rx, true);
        self.enable(FlightTask::Dispatch, config.dispatch_enabled);
        self.enable(FlightTask::Beeper, true);
        self.enable(FlightTask::Gps, config.feature_enabled(Features::GPS));
        self.enable(FlightTask::Compass, config.has_sensor(Sensors::MAG));
        self.enable(FlightTask::Baro, config.has_sensor(Sensors::BARO));
        self.enable(
            FlightTask::Altitude,
            config.has_sensor(Sensors::BARO) || config.feature_enabled(Features::GPS),
        );

        if config.feature_enabled(Features::TELEMETRY) {
            self.enable(FlightTask::Telemetry, true);
            if config
                .serial_rx_provider
                .is_some_and(|provider| provider.needs_fast_telemetry())
            {
                self.reschedule(FlightTask::Telemetry, FAST_TELEMETRY_PERIOD_US);
            }
        }

        self.enable(
            FlightTask::LedStrip,
            config.feature_enabled(Features::LED_STRIP),
        );
        self.enable(
            FlightTask::Osd,
            config.feature_enabled(Features::OSD) && config.osd_initialized,
        );
        self.enable(FlightTask::Bst, true);
        self.enable(
            FlightTask::EscSensor,
            config.feature_enabled(Features::ESC_SENSOR),
        );
        self.enable(FlightTask::AdcInternal, true);
        self.enable(FlightTask::PinioBox, true);

        let cms_over_msp = self.caps.contains(BuildCapabilities::MSP_DISPLAYPORT);
        self.enable(
            FlightTask::Cms,
            cms_over_msp || config.feature_enabled(Features::OSD),
        );
    }

    /// Enable a task if the build contains it
    fn enable(&mut self, task: FlightTask, enabled: bool) {
        if let Some(id) = self.table.get(task) {
            self.scheduler.set_task_enabled(id, enabled);
            if enabled {
                crate::log_debug!("Task {} enabled", task.name());
            }
        }
    }

    /// Reschedule a task if the build contains it
    fn reschedule(&mut self, task: FlightTask, period_us: u32) {
        if let Some(id) = self.table.get(task) {
            self.scheduler.reschedule_task(id, period_us);
            crate::log_debug!("Task {} rescheduled to {}us", task.name(), period_us);
        }
    }
}
