//! Build capabilities and runtime flight configuration
//!
//! [`BuildCapabilities`] says which subsystems this firmware image contains.
//! [`FlightConfig`] carries the persisted user settings and what was
//! detected at boot. Together they decide which tasks get registered and
//! which of those get enabled.

use bitflags::bitflags;

/// Lowest accepted serial update rate
pub const SERIAL_UPDATE_RATE_MIN_HZ: u16 = 100;

/// Highest accepted serial update rate
pub const SERIAL_UPDATE_RATE_MAX_HZ: u16 = 2000;

bitflags! {
    /// Subsystems compiled into this firmware image
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BuildCapabilities: u32 {
        const STACK_CHECK = 1 << 0;
        const ACC = 1 << 1;
        const BEEPER = 1 << 2;
        const GPS = 1 << 3;
        const MAG = 1 << 4;
        const BARO = 1 << 5;
        const OSD = 1 << 6;
        const TELEMETRY = 1 << 7;
        const LED_STRIP = 1 << 8;
        const BST = 1 << 9;
        const ESC_SENSOR = 1 << 10;
        const CMS = 1 << 11;
        const ADC_INTERNAL = 1 << 12;
        const PINIOBOX = 1 << 13;
        const RANGEFINDER = 1 << 14;
        /// CMS menus are reachable over an MSP displayport, no OSD chip needed
        const MSP_DISPLAYPORT = 1 << 15;
    }
}

impl BuildCapabilities {
    /// Typical full-featured flight controller image
    pub const fn full() -> Self {
        Self::STACK_CHECK
            .union(Self::ACC)
            .union(Self::BEEPER)
            .union(Self::GPS)
            .union(Self::MAG)
            .union(Self::BARO)
            .union(Self::OSD)
            .union(Self::TELEMETRY)
            .union(Self::LED_STRIP)
            .union(Self::ESC_SENSOR)
            .union(Self::CMS)
            .union(Self::ADC_INTERNAL)
            .union(Self::PINIOBOX)
            .union(Self::RANGEFINDER)
    }
}

bitflags! {
    /// Sensors detected at boot
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Sensors: u8 {
        const GYRO = 1 << 0;
        const ACC = 1 << 1;
        const BARO = 1 << 2;
        const MAG = 1 << 3;
        const RANGEFINDER = 1 << 4;
    }
}

bitflags! {
    /// User-enabled features
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Features: u32 {
        const GPS = 1 << 0;
        const OSD = 1 << 1;
        const TELEMETRY = 1 << 2;
        const LED_STRIP = 1 << 3;
        const ESC_SENSOR = 1 << 4;
        const RANGEFINDER = 1 << 5;
    }
}

/// Where a battery voltage or current reading comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeterSource {
    /// No meter; the corresponding battery task stays disabled
    #[default]
    None,
    Adc,
    Virtual,
    Esc,
    Msp,
}

impl MeterSource {
    #[inline]
    pub fn is_present(self) -> bool {
        self != MeterSource::None
    }
}

/// Serial receiver protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialRxProvider {
    Spektrum1024,
    Spektrum2048,
    Sbus,
    Sumd,
    Ibus,
    JetiExBus,
    Crsf,
    Srxl,
    Fport,
}

impl SerialRxProvider {
    /// Receivers that poll telemetry fast enough to need it at 500 Hz
    pub fn needs_fast_telemetry(self) -> bool {
        matches!(self, SerialRxProvider::JetiExBus | SerialRxProvider::Crsf)
    }
}

/// Runtime configuration consumed when the task set is initialized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlightConfig {
    /// MSP/CLI serial polling rate
    pub serial_update_rate_hz: u16,
    pub voltage_meter: MeterSource,
    pub current_meter: MeterSource,
    pub use_vbat_alerts: bool,
    pub use_consumption_alerts: bool,
    pub features: Features,
    pub sensors: Sensors,
    /// `None` for PPM/PWM or SPI receivers
    pub serial_rx_provider: Option<SerialRxProvider>,
    /// Gyro/PID loop period chosen by the gyro driver
    pub gyro_target_looptime_us: u32,
    /// Accelerometer sampling interval chosen by the accelerometer driver
    pub acc_sampling_interval_us: u32,
    /// At least one dispatch entry is registered
    pub dispatch_enabled: bool,
    /// OSD device was found and initialized
    pub osd_initialized: bool,
}

impl FlightConfig {
    /// Default settings with a gyro and accelerometer detected
    pub const fn new() -> Self {
        Self {
            serial_update_rate_hz: 100,
            voltage_meter: MeterSource::Adc,
            current_meter: MeterSource::None,
            use_vbat_alerts: true,
            use_consumption_alerts: false,
            features: Features::empty(),
            sensors: Sensors::GYRO.union(Sensors::ACC),
            serial_rx_provider: None,
            gyro_target_looptime_us: 125,
            acc_sampling_interval_us: 1_000,
            dispatch_enabled: false,
            osd_initialized: false,
        }
    }

    /// Serial update rate limited to the supported range
    pub fn serial_update_rate_hz(&self) -> u16 {
        self.serial_update_rate_hz
            .clamp(SERIAL_UPDATE_RATE_MIN_HZ, SERIAL_UPDATE_RATE_MAX_HZ)
    }

    #[inline]
    pub fn has_sensor(&self, sensor: Sensors) -> bool {
        self.sensors.contains(sensor)
    }

    #[inline]
    pub fn feature_enabled(&self, feature: Features) -> bool {
        self.features.contains(feature)
    }
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FlightConfig::default();
        assert_eq!(config.serial_update_rate_hz, 100);
        assert!(config.has_sensor(Sensors::GYRO));
        assert!(config.has_sensor(Sensors::ACC));
        assert!(!config.has_sensor(Sensors::BARO));
        assert!(config.voltage_meter.is_present());
        assert!(!config.current_meter.is_present());
    }

    #[test]
    fn test_serial_rate_clamped() {
        let mut config = FlightConfig::default();
        config.serial_update_rate_hz = 0;
        assert_eq!(config.serial_update_rate_hz(), SERIAL_UPDATE_RATE_MIN_HZ);
        config.serial_update_rate_hz = 4000;
        assert_eq!(config.serial_update_rate_hz(), SERIAL_UPDATE_RATE_MAX_HZ);
        config.serial_update_rate_hz = 400;
        assert_eq!(config.serial_update_rate_hz(), 400);
    }

    #[test]
    fn test_fast_telemetry_receivers() {
        assert!(SerialRxProvider::Crsf.needs_fast_telemetry());
        assert!(SerialRxProvider::JetiExBus.needs_fast_telemetry());
        assert!(!SerialRxProvider::Sbus.needs_fast_telemetry());
    }

    #[test]
    fn test_full_capabilities() {
        let caps = BuildCapabilities::full();
        assert!(caps.contains(BuildCapabilities::BARO | BuildCapabilities::OSD));
        assert!(!caps.contains(BuildCapabilities::BST));
        assert!(!caps.contains(BuildCapabilities::MSP_DISPLAYPORT));
    }
}
