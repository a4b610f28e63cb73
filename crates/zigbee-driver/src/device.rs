//! Device state model
//!
//! Setters apply change detection: a write equal to the current value is a
//! no-op and leaves the companion `changed_at` untouched. Actual changes are
//! timestamped and committed to the capability store.

use crate::ports::{CapabilityStore, Clock, DeviceId};
use crate::profile::DeviceProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Where the device draws power from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSource {
    Battery,
    Line,
}

/// Button position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonState {
    Pressed,
    Released,
}

impl ButtonState {
    /// Parse the attribute-set literal; unknown literals yield `None`
    #[must_use]
    pub fn from_literal(literal: &str) -> Option<Self> {
        match literal {
            "pressed" => Some(ButtonState::Pressed),
            "released" => Some(ButtonState::Released),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerState {
    pub source: PowerSource,
    /// Remaining charge, 0-100
    pub battery_percent: Option<u8>,
    pub voltage: Option<f64>,
    pub changed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionState {
    /// Link quality, 0-100
    pub signal_percent: Option<u8>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub online: bool,
    pub changed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonStatus {
    pub state: ButtonState,
    pub changed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureState {
    pub celsius: Option<f64>,
    pub changed_at: Option<DateTime<Utc>>,
}

/// One irrigation valve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrigationZone {
    /// 1-based
    pub zone_id: u8,
    pub default_duration_minutes: u16,
    pub on: bool,
    /// Last valve state change
    pub changed_at: Option<DateTime<Utc>>,
    pub duration_changed_at: Option<DateTime<Utc>>,
}

/// Identity reported in the hello response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareInfo {
    pub node_id: u16,
    pub manufacturer_id: u16,
    pub device_type: u16,
    /// `major.minor.release`
    pub app_version: String,
    pub hw_version: String,
}

/// A point-in-time copy of a device's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub id: DeviceId,
    pub vendor: String,
    pub model: String,
    pub power: PowerState,
    pub connection: ConnectionState,
    pub button: ButtonStatus,
    pub temperature: TemperatureState,
    pub zones: Vec<IrrigationZone>,
    pub firmware: Option<FirmwareInfo>,
}

/// Capability field names as committed to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Battery,
    Voltage,
    Signal,
    Online,
    Button,
    Temperature,
    ZoneSwitch(u8),
    ZoneDuration(u8),
    Firmware,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Battery => f.write_str("battery"),
            Field::Voltage => f.write_str("voltage"),
            Field::Signal => f.write_str("signal"),
            Field::Online => f.write_str("online"),
            Field::Button => f.write_str("button"),
            Field::Temperature => f.write_str("temperature"),
            Field::ZoneSwitch(zone) => write!(f, "zone{zone}.switch"),
            Field::ZoneDuration(zone) => write!(f, "zone{zone}.duration"),
            Field::Firmware => f.write_str("firmware"),
        }
    }
}

/// Value committed alongside a [`Field`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Percent(u8),
    Volts(f64),
    Celsius(f64),
    Bool(bool),
    Button(ButtonState),
    Minutes(u16),
    Firmware(FirmwareInfo),
}

/// Replace `slot` with `value` when they differ
fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// Owner of one device's state; the only writer
pub struct DeviceModel {
    state: DeviceSnapshot,
    store: Arc<dyn CapabilityStore>,
    clock: Arc<dyn Clock>,
}

impl DeviceModel {
    #[must_use]
    pub fn new(
        id: DeviceId,
        profile: &DeviceProfile,
        store: Arc<dyn CapabilityStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let zones = (1..=profile.zone_count)
            .map(|zone_id| IrrigationZone {
                zone_id,
                default_duration_minutes: profile.default_zone_minutes,
                on: false,
                changed_at: None,
                duration_changed_at: None,
            })
            .collect();

        Self {
            state: DeviceSnapshot {
                id,
                vendor: profile.vendor.clone(),
                model: profile.model.clone(),
                power: PowerState {
                    source: PowerSource::Battery,
                    battery_percent: None,
                    voltage: None,
                    changed_at: None,
                },
                connection: ConnectionState {
                    signal_percent: None,
                    last_heartbeat: None,
                    online: true,
                    changed_at: None,
                },
                button: ButtonStatus {
                    state: ButtonState::Released,
                    changed_at: None,
                },
                temperature: TemperatureState {
                    celsius: None,
                    changed_at: None,
                },
                zones,
                firmware: None,
            },
            store,
            clock,
        }
    }

    /// Latest committed state
    #[must_use]
    pub fn state(&self) -> &DeviceSnapshot {
        &self.state
    }

    /// Owned copy for external readers
    #[must_use]
    pub fn snapshot(&self) -> DeviceSnapshot {
        self.state.clone()
    }

    fn commit(&self, field: Field, value: FieldValue) -> DateTime<Utc> {
        let now = self.clock.now();
        tracing::debug!("{} {} -> {:?}", self.state.id, field, value);
        self.store.commit(&self.state.id, field, value, now);
        now
    }

    /// Values above 100 are clamped
    pub fn set_battery(&mut self, percent: u8) -> bool {
        let percent = percent.min(100);
        if !replace_if_changed(&mut self.state.power.battery_percent, Some(percent)) {
            return false;
        }
        self.state.power.changed_at = Some(self.commit(Field::Battery, FieldValue::Percent(percent)));
        true
    }

    /// Exact comparison; jitter is filtered by the device's reporting thresholds
    #[allow(clippy::float_cmp)]
    pub fn set_voltage(&mut self, volts: f64) -> bool {
        if !replace_if_changed(&mut self.state.power.voltage, Some(volts)) {
            return false;
        }
        self.state.power.changed_at = Some(self.commit(Field::Voltage, FieldValue::Volts(volts)));
        true
    }

    pub fn set_signal(&mut self, percent: u8) -> bool {
        let percent = percent.min(100);
        if !replace_if_changed(&mut self.state.connection.signal_percent, Some(percent)) {
            return false;
        }
        self.state.connection.changed_at = Some(self.commit(Field::Signal, FieldValue::Percent(percent)));
        true
    }

    pub fn set_online(&mut self, online: bool) -> bool {
        if !replace_if_changed(&mut self.state.connection.online, online) {
            return false;
        }
        self.state.connection.changed_at = Some(self.commit(Field::Online, FieldValue::Bool(online)));
        true
    }

    /// Heartbeat bookkeeping; not a capability attribute, so nothing is committed
    pub fn record_heartbeat(&mut self, at: DateTime<Utc>) {
        self.state.connection.last_heartbeat = Some(at);
    }

    pub fn set_button(&mut self, state: ButtonState) -> bool {
        if !replace_if_changed(&mut self.state.button.state, state) {
            return false;
        }
        self.state.button.changed_at = Some(self.commit(Field::Button, FieldValue::Button(state)));
        true
    }

    #[allow(clippy::float_cmp)]
    pub fn set_temperature(&mut self, celsius: f64) -> bool {
        if !replace_if_changed(&mut self.state.temperature.celsius, Some(celsius)) {
            return false;
        }
        self.state.temperature.changed_at = Some(self.commit(Field::Temperature, FieldValue::Celsius(celsius)));
        true
    }

    /// `None` when the zone does not exist
    pub fn set_zone_on(&mut self, zone_id: u8, on: bool) -> Option<bool> {
        let idx = self.zone_index(zone_id)?;
        if !replace_if_changed(&mut self.state.zones[idx].on, on) {
            return Some(false);
        }
        let now = self.commit(Field::ZoneSwitch(zone_id), FieldValue::Bool(on));
        self.state.zones[idx].changed_at = Some(now);
        Some(true)
    }

    /// `None` when the zone does not exist
    pub fn set_zone_duration(&mut self, zone_id: u8, minutes: u16) -> Option<bool> {
        let idx = self.zone_index(zone_id)?;
        if !replace_if_changed(&mut self.state.zones[idx].default_duration_minutes, minutes) {
            return Some(false);
        }
        let now = self.commit(Field::ZoneDuration(zone_id), FieldValue::Minutes(minutes));
        self.state.zones[idx].duration_changed_at = Some(now);
        Some(true)
    }

    pub fn set_firmware(&mut self, info: FirmwareInfo) -> bool {
        if self.state.firmware.as_ref() == Some(&info) {
            return false;
        }
        self.commit(Field::Firmware, FieldValue::Firmware(info.clone()));
        self.state.firmware = Some(info);
        true
    }

    #[must_use]
    pub fn zone(&self, zone_id: u8) -> Option<&IrrigationZone> {
        self.state.zones.iter().find(|z| z.zone_id == zone_id)
    }

    fn zone_index(&self, zone_id: u8) -> Option<usize> {
        self.state.zones.iter().position(|z| z.zone_id == zone_id)
    }
}
