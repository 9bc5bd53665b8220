//! Flight-controller task set
//!
//! Every task the flight controller can schedule is listed in [`FlightTask`]
//! together with its default period and priority. Task bodies are supplied
//! by the application through the [`FlightSystem`] trait; the scheduler
//! state type is the application's `FlightSystem` implementation itself.
//!
//! - [`init`]: Registration and enablement rules
//! - [`runner`]: Main-loop wrapper with idle work and health reporting

pub mod init;
pub mod runner;

pub use init::{available_tasks, init_tasks, TaskTable};
pub use runner::FlightScheduler;

use flightloop_core::scheduler::{period_hz, Priority, TaskContext, TaskDescriptor};
use flightloop_core::traits::{cmp_time_us, TimeUs};

use crate::config::BuildCapabilities;

/// Default gyro/PID loop period (8 kHz)
pub const GYROPID_DEFAULT_PERIOD_US: u32 = 125;

/// RX polling fallback when no frame has signalled readiness
pub const RX_FALLBACK_PERIOD_US: u32 = period_hz(33);

/// Telemetry rate for receivers that poll telemetry on every frame
pub const FAST_TELEMETRY_PERIOD_US: u32 = period_hz(500);

/// Subsystem operations invoked by the flight tasks
///
/// Only the flight loop, receiver and serial handling are mandatory; the
/// other subsystems default to doing nothing so a board can implement just
/// what it carries.
pub trait FlightSystem {
    /// Gyro read, filtering, PID and mixer: the realtime task
    fn run_pid_loop(&mut self, now_us: TimeUs);

    /// Whether a receiver frame is waiting
    fn rx_update_check(&mut self, now_us: TimeUs, last_run_us: TimeUs) -> bool;

    /// Decode the receiver frame and update RC commands
    fn process_rx(&mut self, now_us: TimeUs);

    /// MSP and CLI serial processing
    fn handle_serial(&mut self, now_us: TimeUs);

    fn system_update(&mut self, _now_us: TimeUs) {}
    fn update_battery_voltage(&mut self, _now_us: TimeUs) {}
    fn update_battery_current(&mut self, _now_us: TimeUs) {}
    fn update_battery_alerts(&mut self, _now_us: TimeUs) {}
    fn check_stack(&mut self, _now_us: TimeUs) {}
    fn update_accelerometer(&mut self, _now_us: TimeUs) {}
    fn update_attitude(&mut self, _now_us: TimeUs) {}
    fn dispatch(&mut self, _now_us: TimeUs) {}
    fn update_beeper(&mut self, _now_us: TimeUs) {}
    fn update_gps(&mut self, _now_us: TimeUs) {}
    fn update_compass(&mut self, _now_us: TimeUs) {}

    /// Advance the barometer state machine
    ///
    /// Returns the delay until the next conversion is ready, if the driver
    /// wants the task rescheduled.
    fn update_baro(&mut self, _now_us: TimeUs) -> Option<u32> {
        None
    }

    fn calculate_altitude(&mut self, _now_us: TimeUs) {}
    fn update_osd(&mut self, _now_us: TimeUs) {}
    fn process_telemetry(&mut self, _now_us: TimeUs) {}
    fn update_led_strip(&mut self, _now_us: TimeUs) {}
    fn process_bst(&mut self, _now_us: TimeUs) {}
    fn process_esc_sensor(&mut self, _now_us: TimeUs) {}
    fn handle_cms(&mut self, _now_us: TimeUs) {}
    fn process_adc_internal(&mut self, _now_us: TimeUs) {}
    fn update_pinio_box(&mut self, _now_us: TimeUs) {}
    fn update_rangefinder(&mut self, _now_us: TimeUs) {}

    /// Background work run when a scheduler step selected nothing
    fn idle_poll(&mut self) {}
}

/// Every task the flight controller knows about, in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlightTask {
    Main,
    Serial,
    BatteryAlerts,
    BatteryVoltage,
    BatteryCurrent,
    StackCheck,
    GyroPid,
    Accel,
    Attitude,
    Rx,
    Dispatch,
    Beeper,
    Gps,
    Compass,
    Baro,
    Altitude,
    Osd,
    Telemetry,
    LedStrip,
    Bst,
    EscSensor,
    Cms,
    AdcInternal,
    PinioBox,
    Rangefinder,
}

impl FlightTask {
    /// Number of flight tasks
    pub const COUNT: usize = 25;

    /// All tasks in registration order
    pub const ALL: [FlightTask; Self::COUNT] = [
        FlightTask::Main,
        FlightTask::Serial,
        FlightTask::BatteryAlerts,
        FlightTask::BatteryVoltage,
        FlightTask::BatteryCurrent,
        FlightTask::StackCheck,
        FlightTask::GyroPid,
        FlightTask::Accel,
        FlightTask::Attitude,
        FlightTask::Rx,
        FlightTask::Dispatch,
        FlightTask::Beeper,
        FlightTask::Gps,
        FlightTask::Compass,
        FlightTask::Baro,
        FlightTask::Altitude,
        FlightTask::Osd,
        FlightTask::Telemetry,
        FlightTask::LedStrip,
        FlightTask::Bst,
        FlightTask::EscSensor,
        FlightTask::Cms,
        FlightTask::AdcInternal,
        FlightTask::PinioBox,
        FlightTask::Rangefinder,
    ];

    /// Position in [`FlightTask::ALL`]
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            FlightTask::Main => "SYSTEM",
            FlightTask::Serial => "SERIAL",
            FlightTask::BatteryAlerts => "BATTERY_ALERTS",
            FlightTask::BatteryVoltage => "BATTERY_VOLTAGE",
            FlightTask::BatteryCurrent => "BATTERY_CURRENT",
            FlightTask::StackCheck => "STACKCHECK",
            FlightTask::GyroPid => "PID",
            FlightTask::Accel => "ACC",
            FlightTask::Attitude => "ATTITUDE",
            FlightTask::Rx => "RX",
            FlightTask::Dispatch => "DISPATCH",
            FlightTask::Beeper => "BEEPER",
            FlightTask::Gps => "GPS",
            FlightTask::Compass => "COMPASS",
            FlightTask::Baro => "BARO",
            FlightTask::Altitude => "ALTITUDE",
            FlightTask::Osd => "OSD",
            FlightTask::Telemetry => "TELEMETRY",
            FlightTask::LedStrip => "LEDSTRIP",
            FlightTask::Bst => "BST_MASTER_PROCESS",
            FlightTask::EscSensor => "ESC_SENSOR",
            FlightTask::Cms => "CMS",
            FlightTask::AdcInternal => "ADCINTERNAL",
            FlightTask::PinioBox => "PINIOBOX",
            FlightTask::Rangefinder => "RANGEFINDER",
        }
    }

    pub const fn sub_name(self) -> Option<&'static str> {
        match self {
            FlightTask::Main => Some("UPDATE"),
            FlightTask::GyroPid => Some("GYRO"),
            _ => None,
        }
    }

    /// Period the task is registered with, before any rescheduling
    pub const fn default_period_us(self) -> u32 {
        match self {
            FlightTask::Main => period_hz(1000),
            FlightTask::Serial => period_hz(100),
            FlightTask::BatteryAlerts => period_hz(5),
            FlightTask::BatteryVoltage | FlightTask::BatteryCurrent => period_hz(50),
            FlightTask::StackCheck => period_hz(10),
            FlightTask::GyroPid => GYROPID_DEFAULT_PERIOD_US,
            FlightTask::Accel => period_hz(1000),
            FlightTask::Attitude => period_hz(100),
            FlightTask::Rx => RX_FALLBACK_PERIOD_US,
            FlightTask::Dispatch => period_hz(1000),
            FlightTask::Beeper => period_hz(100),
            FlightTask::Gps => period_hz(100),
            FlightTask::Compass => period_hz(10),
            FlightTask::Baro => period_hz(20),
            FlightTask::Altitude => period_hz(40),
            FlightTask::Osd => period_hz(60),
            FlightTask::Telemetry => period_hz(250),
            FlightTask::LedStrip => period_hz(100),
            FlightTask::Bst => period_hz(50),
            FlightTask::EscSensor => period_hz(100),
            FlightTask::Cms => period_hz(60),
            FlightTask::AdcInternal => period_hz(1),
            FlightTask::PinioBox => period_hz(20),
            FlightTask::Rangefinder => period_hz(10),
        }
    }

    pub const fn priority(self) -> Priority {
        match self {
            FlightTask::GyroPid => Priority::Realtime,
            FlightTask::Rx | FlightTask::Dispatch => Priority::High,
            FlightTask::Main => Priority::MediumHigh,
            FlightTask::BatteryAlerts
            | FlightTask::BatteryVoltage
            | FlightTask::BatteryCurrent
            | FlightTask::Accel
            | FlightTask::Attitude
            | FlightTask::Gps => Priority::Medium,
            FlightTask::StackCheck
            | FlightTask::Bst
            | FlightTask::AdcInternal
            | FlightTask::PinioBox
            | FlightTask::Rangefinder => Priority::Idle,
            _ => Priority::Low,
        }
    }

    /// Capabilities of which the build must have at least one for the task
    /// to exist; empty for tasks every build has
    pub const fn requires(self) -> BuildCapabilities {
        match self {
            FlightTask::StackCheck => BuildCapabilities::STACK_CHECK,
            FlightTask::Accel | FlightTask::Attitude => BuildCapabilities::ACC,
            FlightTask::Beeper => BuildCapabilities::BEEPER,
            FlightTask::Gps => BuildCapabilities::GPS,
            FlightTask::Compass => BuildCapabilities::MAG,
            FlightTask::Baro => BuildCapabilities::BARO,
            FlightTask::Altitude => BuildCapabilities::BARO.union(BuildCapabilities::GPS),
            FlightTask::Osd => BuildCapabilities::OSD,
            FlightTask::Telemetry => BuildCapabilities::TELEMETRY,
            FlightTask::LedStrip => BuildCapabilities::LED_STRIP,
            FlightTask::Bst => BuildCapabilities::BST,
            FlightTask::EscSensor => BuildCapabilities::ESC_SENSOR,
            FlightTask::Cms => BuildCapabilities::CMS,
            FlightTask::AdcInternal => BuildCapabilities::ADC_INTERNAL,
            FlightTask::PinioBox => BuildCapabilities::PINIOBOX,
            FlightTask::Rangefinder => BuildCapabilities::RANGEFINDER,
            _ => BuildCapabilities::empty(),
        }
    }

    /// Whether a build with `caps` contains this task
    pub fn is_available(self, caps: BuildCapabilities) -> bool {
        let required = self.requires();
        required.is_empty() || caps.intersects(required)
    }

    /// Scheduler descriptor wiring this task to a [`FlightSystem`]
    pub fn descriptor<F: FlightSystem>(self) -> TaskDescriptor<F> {
        let body: fn(&mut F, &mut TaskContext) = match self {
            FlightTask::Main => task_main::<F>,
            FlightTask::Serial => task_serial::<F>,
            FlightTask::BatteryAlerts => task_battery_alerts::<F>,
            FlightTask::BatteryVoltage => task_battery_voltage::<F>,
            FlightTask::BatteryCurrent => task_battery_current::<F>,
            FlightTask::StackCheck => task_stack_check::<F>,
            FlightTask::GyroPid => task_pid_loop::<F>,
            FlightTask::Accel => task_accelerometer::<F>,
            FlightTask::Attitude => task_attitude::<F>,
            FlightTask::Rx => task_rx::<F>,
            FlightTask::Dispatch => task_dispatch::<F>,
            FlightTask::Beeper => task_beeper::<F>,
            FlightTask::Gps => task_gps::<F>,
            FlightTask::Compass => task_compass::<F>,
            FlightTask::Baro => task_baro::<F>,
            FlightTask::Altitude => task_altitude::<F>,
            FlightTask::Osd => task_osd::<F>,
            FlightTask::Telemetry => task_telemetry::<F>,
            FlightTask::LedStrip => task_led_strip::<F>,
            FlightTask::Bst => task_bst::<F>,
            FlightTask::EscSensor => task_esc_sensor::<F>,
            FlightTask::Cms => task_cms::<F>,
            FlightTask::AdcInternal => task_adc_internal::<F>,
            FlightTask::PinioBox => task_pinio_box::<F>,
            FlightTask::Rangefinder => task_rangefinder::<F>,
        };

        let mut descriptor =
            TaskDescriptor::new(self.name(), body, self.default_period_us(), self.priority());
        if let Some(sub_name) = self.sub_name() {
            descriptor = descriptor.with_sub_name(sub_name);
        }
        if self == FlightTask::Rx {
            descriptor = descriptor.with_check(check_rx::<F>);
        }
        descriptor
    }
}

macro_rules! forward_task {
    ($($fn_name:ident => $method:ident),* $(,)?) => {
        $(
            fn $fn_name<F: FlightSystem>(system: &mut F, ctx: &mut TaskContext) {
                system.$method(ctx.now_us());
            }
        )*
    };
}

forward_task! {
    task_main => system_update,
    task_serial => handle_serial,
    task_battery_alerts => update_battery_alerts,
    task_battery_voltage => update_battery_voltage,
    task_battery_current => update_battery_current,
    task_stack_check => check_stack,
    task_pid_loop => run_pid_loop,
    task_accelerometer => update_accelerometer,
    task_attitude => update_attitude,
    task_rx => process_rx,
    task_dispatch => dispatch,
    task_beeper => update_beeper,
    task_gps => update_gps,
    task_compass => update_compass,
    task_altitude => calculate_altitude,
    task_osd => update_osd,
    task_telemetry => process_telemetry,
    task_led_strip => update_led_strip,
    task_bst => process_bst,
    task_esc_sensor => process_esc_sensor,
    task_cms => handle_cms,
    task_adc_internal => process_adc_internal,
    task_pinio_box => update_pinio_box,
    task_rangefinder => update_rangefinder,
}

fn task_baro<F: FlightSystem>(system: &mut F, ctx: &mut TaskContext) {
    if let Some(next_us) = system.update_baro(ctx.now_us()) {
        if next_us > 0 {
            ctx.request_next_period(next_us);
        }
    }
}

/// Frame waiting, or the receiver has been quiet for a whole fallback period
fn check_rx<F: FlightSystem>(system: &mut F, now_us: TimeUs, last_run_us: TimeUs) -> bool {
    system.rx_update_check(now_us, last_run_us)
        || cmp_time_us(now_us, last_run_us) >= RX_FALLBACK_PERIOD_US as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        pid_runs: u32,
        rx_pending: bool,
    }

    impl FlightSystem for Probe {
        fn run_pid_loop(&mut self, _now_us: TimeUs) {
            self.pid_runs += 1;
        }

        fn rx_update_check(&mut self, _now_us: TimeUs, _last_run_us: TimeUs) -> bool {
            self.rx_pending
        }

        fn process_rx(&mut self, _now_us: TimeUs) {}

        fn handle_serial(&mut self, _now_us: TimeUs) {}
    }

    #[test]
    fn test_all_is_in_index_order() {
        for (index, task) in FlightTask::ALL.iter().enumerate() {
            assert_eq!(task.index(), index);
        }
    }

    #[test]
    fn test_table_values() {
        assert_eq!(FlightTask::Serial.default_period_us(), 10_000);
        assert_eq!(FlightTask::BatteryAlerts.default_period_us(), 200_000);
        assert_eq!(FlightTask::Rx.default_period_us(), 30_303);
        assert_eq!(FlightTask::GyroPid.priority(), Priority::Realtime);
        assert_eq!(FlightTask::Main.priority(), Priority::MediumHigh);
        assert_eq!(FlightTask::AdcInternal.priority(), Priority::Idle);
        assert_eq!(FlightTask::Osd.priority(), Priority::Low);

        let realtime = FlightTask::ALL
            .iter()
            .filter(|task| task.priority() == Priority::Realtime)
            .count();
        assert_eq!(realtime, 1);
    }

    #[test]
    fn test_availability() {
        let caps = BuildCapabilities::BARO;
        assert!(FlightTask::Serial.is_available(caps));
        assert!(FlightTask::Baro.is_available(caps));
        assert!(FlightTask::Altitude.is_available(caps));
        assert!(!FlightTask::Gps.is_available(caps));
        assert!(FlightTask::Altitude.is_available(BuildCapabilities::GPS));
        assert!(!FlightTask::Altitude.is_available(BuildCapabilities::empty()));
    }

    #[test]
    fn test_descriptor_wiring() {
        let pid = FlightTask::GyroPid.descriptor::<Probe>();
        assert_eq!(pid.name, "PID");
        assert_eq!(pid.sub_name, Some("GYRO"));

        let mut probe = Probe::default();
        let mut ctx = TaskContext::new(0, None);
        (pid.task_fn)(&mut probe, &mut ctx);
        assert_eq!(probe.pid_runs, 1);

        let rx = FlightTask::Rx.descriptor::<Probe>();
        assert!(rx.is_event_driven());
        assert!(FlightTask::Serial.descriptor::<Probe>().check_fn.is_none());
    }

    #[test]
    fn test_rx_check_falls_back_to_polling() {
        let mut probe = Probe::default();
        assert!(!check_rx(&mut probe, 10_000, 0));
        assert!(check_rx(&mut probe, RX_FALLBACK_PERIOD_US, 0));

        probe.rx_pending = true;
        assert!(check_rx(&mut probe, 10_000, 0));
    }
}
