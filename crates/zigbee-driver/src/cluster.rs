//! ZCL attribute identifiers and fixed configuration values

pub use zcl_protocol::{clusters as id, commands, profiles};

/// Power Configuration cluster attributes
pub mod power_attrs {
    /// uint8, 100 mV units
    pub const BATTERY_VOLTAGE: u16 = 0x0020;
    /// uint8, half-percent units
    pub const BATTERY_PERCENTAGE_REMAINING: u16 = 0x0021;
}

/// On/Off cluster attributes
pub mod on_off_attrs {
    pub const ON_OFF: u16 = 0x0000;
}

/// Poll Control cluster attributes
pub mod poll_control_attrs {
    /// uint32, quarter seconds
    pub const CHECK_IN_INTERVAL: u16 = 0x0000;
}

/// Temperature Measurement / Thermostat attributes
pub mod temperature_attrs {
    /// int16, hundredths of a degree Celsius (shared id for both clusters)
    pub const MEASURED_VALUE: u16 = 0x0000;
    /// Reported when the sensor has no reading
    pub const INVALID: i16 = i16::MIN;
}

/// Check-in every two minutes, in quarter seconds
pub const CHECK_IN_INTERVAL_QS: u32 = 2 * 60 * 4;

/// On-with-timed-off carries tenths of a second in a u16
pub const MAX_TIMED_ON_MINUTES: u16 = u16::MAX / 600;
