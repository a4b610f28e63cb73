//! Device-type parameters supplied by the external driver loader

use crate::error::DriverError;
use serde::{Deserialize, Serialize};
use zcl_protocol::{endpoints, BatteryCurve};

/// Supported device families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Battery button speaking the AlertMe clusters
    Button,
    /// Multi-zone irrigation controller on the Home Automation profile
    IrrigationController,
}

fn default_first_zone_endpoint() -> u8 {
    1
}

fn default_retry_ceiling() -> u32 {
    10
}

fn default_backoff_base_secs() -> u64 {
    1
}

fn default_zone_minutes() -> u16 {
    10
}

/// Already-resolved parameters for one device type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub kind: DeviceKind,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub model: String,
    /// Full-charge battery voltage
    pub nominal_voltage: f64,
    /// Battery voltage reported as 0%
    pub min_voltage: f64,
    #[serde(default)]
    pub zone_count: u8,
    #[serde(default = "default_first_zone_endpoint")]
    pub first_zone_endpoint: u8,
    pub offline_timeout_secs: u64,
    #[serde(default = "default_retry_ceiling")]
    pub retry_ceiling: u32,
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    #[serde(default = "default_zone_minutes")]
    pub default_zone_minutes: u16,
    /// Also configure thermostat temperature reporting
    #[serde(default)]
    pub thermostat_reporting: bool,
}

impl DeviceProfile {
    /// Battery button (AlertMe clusters)
    #[must_use]
    pub fn button() -> Self {
        Self {
            kind: DeviceKind::Button,
            vendor: "AlertMe".to_string(),
            model: "Button".to_string(),
            nominal_voltage: BatteryCurve::BUTTON.nominal_voltage,
            min_voltage: BatteryCurve::BUTTON.min_voltage,
            zone_count: 0,
            first_zone_endpoint: default_first_zone_endpoint(),
            offline_timeout_secs: 600,
            retry_ceiling: default_retry_ceiling(),
            backoff_base_secs: default_backoff_base_secs(),
            default_zone_minutes: default_zone_minutes(),
            thermostat_reporting: false,
        }
    }

    /// Irrigation controller with `zones` valves on consecutive endpoints
    #[must_use]
    pub fn irrigation_controller(zones: u8) -> Self {
        Self {
            kind: DeviceKind::IrrigationController,
            vendor: "Generic".to_string(),
            model: "Irrigation Controller".to_string(),
            nominal_voltage: 6.0,
            min_voltage: 4.4,
            zone_count: zones,
            first_zone_endpoint: default_first_zone_endpoint(),
            offline_timeout_secs: 1200,
            retry_ceiling: default_retry_ceiling(),
            backoff_base_secs: default_backoff_base_secs(),
            default_zone_minutes: default_zone_minutes(),
            thermostat_reporting: false,
        }
    }

    /// Parse and validate a profile from JSON
    pub fn from_json(json: &str) -> Result<Self, DriverError> {
        let profile: Self = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), DriverError> {
        if self.nominal_voltage.is_nan()
            || self.min_voltage.is_nan()
            || self.nominal_voltage <= self.min_voltage
        {
            return Err(DriverError::InvalidProfile(format!(
                "nominal voltage {} must exceed minimum voltage {}",
                self.nominal_voltage, self.min_voltage
            )));
        }
        if self.retry_ceiling == 0 {
            return Err(DriverError::InvalidProfile(
                "retry ceiling must be at least 1".to_string(),
            ));
        }
        if self.backoff_base_secs == 0 {
            return Err(DriverError::InvalidProfile(
                "backoff base must be at least one second".to_string(),
            ));
        }
        if self.offline_timeout_secs == 0 {
            return Err(DriverError::InvalidProfile(
                "offline timeout must be positive".to_string(),
            ));
        }
        // Zigbee application endpoints stop at 240
        let last_endpoint = u16::from(self.first_zone_endpoint) + u16::from(self.zone_count);
        if self.first_zone_endpoint == 0 || last_endpoint > 241 {
            return Err(DriverError::InvalidProfile(format!(
                "{} zones starting at endpoint {} exceed the endpoint range",
                self.zone_count, self.first_zone_endpoint
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn battery_curve(&self) -> BatteryCurve {
        BatteryCurve {
            nominal_voltage: self.nominal_voltage,
            min_voltage: self.min_voltage,
        }
    }

    /// Endpoint hosting the device-level clusters (power, poll control)
    #[must_use]
    pub fn primary_endpoint(&self) -> u8 {
        match self.kind {
            DeviceKind::Button => endpoints::ALERTME,
            DeviceKind::IrrigationController => self.first_zone_endpoint,
        }
    }

    /// Endpoint for a 1-based zone id
    #[must_use]
    pub fn zone_endpoint(&self, zone: u8) -> Option<u8> {
        if zone == 0 || zone > self.zone_count {
            return None;
        }
        Some(self.first_zone_endpoint + zone - 1)
    }

    /// 1-based zone id for an endpoint
    #[must_use]
    pub fn zone_for_endpoint(&self, endpoint: u8) -> Option<u8> {
        let zone = endpoint.checked_sub(self.first_zone_endpoint)? + 1;
        (zone <= self.zone_count).then_some(zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles_validate() {
        assert!(DeviceProfile::button().validate().is_ok());
        assert!(DeviceProfile::irrigation_controller(8).validate().is_ok());
    }

    #[test]
    fn test_from_json_applies_defaults() {
        let profile = DeviceProfile::from_json(
            r#"{
                "kind": "irrigation_controller",
                "nominal_voltage": 6.0,
                "min_voltage": 4.4,
                "zone_count": 4,
                "offline_timeout_secs": 900
            }"#,
        )
        .unwrap();
        assert_eq!(profile.kind, DeviceKind::IrrigationController);
        assert_eq!(profile.retry_ceiling, 10);
        assert_eq!(profile.backoff_base_secs, 1);
        assert_eq!(profile.first_zone_endpoint, 1);
        assert_eq!(profile.default_zone_minutes, 10);
    }

    #[test]
    fn test_invalid_profiles_rejected() {
        let mut profile = DeviceProfile::button();
        profile.min_voltage = 3.0;
        assert!(matches!(
            profile.validate(),
            Err(DriverError::InvalidProfile(_))
        ));

        let mut profile = DeviceProfile::button();
        profile.retry_ceiling = 0;
        assert!(profile.validate().is_err());

        let mut profile = DeviceProfile::irrigation_controller(250);
        profile.first_zone_endpoint = 1;
        assert!(profile.validate().is_err());

        assert!(matches!(
            DeviceProfile::from_json("{\"kind\": \"toaster\"}"),
            Err(DriverError::Json(_))
        ));
    }

    #[test]
    fn test_zone_endpoint_mapping() {
        let mut profile = DeviceProfile::irrigation_controller(4);
        profile.first_zone_endpoint = 10;
        assert_eq!(profile.zone_endpoint(1), Some(10));
        assert_eq!(profile.zone_endpoint(4), Some(13));
        assert_eq!(profile.zone_endpoint(0), None);
        assert_eq!(profile.zone_endpoint(5), None);
        assert_eq!(profile.zone_for_endpoint(12), Some(3));
        assert_eq!(profile.zone_for_endpoint(9), None);
        assert_eq!(profile.zone_for_endpoint(14), None);
    }

    #[test]
    fn test_zero_backoff_is_rejected() {
        let mut profile = DeviceProfile::irrigation_controller(2);
        profile.backoff_base_secs = 0;
        assert!(matches!(profile.validate(), Err(DriverError::InvalidProfile(_))));
    }
}
