//! Common types used throughout the protocol

use thiserror::Error;

/// Payload decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Payload too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },

    #[error("Unknown ZCL data type: {0:#04X}")]
    UnknownDataType(u8),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Unsupported command {command:#04X} on cluster {cluster:#06X}")]
    UnsupportedCommand { cluster: u16, command: u8 },
}

impl DecodeError {
    /// Fail with `TooShort` unless `data` holds at least `needed` bytes
    pub fn ensure_len(data: &[u8], needed: usize) -> Result<(), DecodeError> {
        if data.len() < needed {
            return Err(DecodeError::TooShort {
                needed,
                actual: data.len(),
            });
        }
        Ok(())
    }
}

/// ZCL profile IDs
pub mod profiles {
    pub const HOME_AUTOMATION: u16 = 0x0104;
    /// Manufacturer profile used by the AlertMe family of battery devices
    pub const ALERTME: u16 = 0xC216;
}

/// ZCL cluster IDs
pub mod clusters {
    pub const POWER_CONFIG: u16 = 0x0001;
    pub const ON_OFF: u16 = 0x0006;
    pub const POLL_CONTROL: u16 = 0x0020;
    pub const THERMOSTAT: u16 = 0x0201;
    pub const TEMPERATURE_MEASUREMENT: u16 = 0x0402;

    // Manufacturer clusters (AlertMe profile)
    pub const ALERTME_GENERAL: u16 = 0x00F0;
    pub const ALERTME_BUTTON: u16 = 0x00F3;
    pub const ALERTME_JOIN: u16 = 0x00F6;
}

/// Well-known endpoints
pub mod endpoints {
    /// Endpoint the AlertMe clusters live on
    pub const ALERTME: u8 = 0x02;
    /// Hub-side source endpoint
    pub const HUB: u8 = 0x01;
}

/// ZCL frame control bits
pub mod frame_control {
    pub const FRAME_TYPE_MASK: u8 = 0x03;
    pub const CLUSTER_SPECIFIC: u8 = 0x01;
    pub const MANUFACTURER_SPECIFIC: u8 = 0x04;
    pub const SERVER_TO_CLIENT: u8 = 0x08;
    pub const DISABLE_DEFAULT_RESPONSE: u8 = 0x10;
}

/// A received ZCL message, already stripped of APS addressing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    pub cluster_id: u16,
    pub command_id: u8,
    pub profile_id: u16,
    pub endpoint: u8,
    /// ZCL frame control byte
    pub flags: u8,
    pub payload: Vec<u8>,
}

impl InboundFrame {
    /// Build a cluster-specific frame
    #[must_use]
    pub fn cluster_specific(
        profile_id: u16,
        endpoint: u8,
        cluster_id: u16,
        command_id: u8,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            cluster_id,
            command_id,
            profile_id,
            endpoint,
            flags: frame_control::CLUSTER_SPECIFIC | frame_control::SERVER_TO_CLIENT,
            payload,
        }
    }

    /// Build a profile-wide (global) frame
    #[must_use]
    pub fn global(
        profile_id: u16,
        endpoint: u8,
        cluster_id: u16,
        command_id: u8,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            cluster_id,
            command_id,
            profile_id,
            endpoint,
            flags: frame_control::SERVER_TO_CLIENT,
            payload,
        }
    }

    /// Check if this is a cluster-specific command (vs global)
    #[must_use]
    pub fn is_cluster_specific(&self) -> bool {
        (self.flags & frame_control::FRAME_TYPE_MASK) == frame_control::CLUSTER_SPECIFIC
    }
}

/// A command headed for the transport
///
/// Fire-and-forget: any acknowledgement comes back later as an [`InboundFrame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCommand {
    pub cluster_id: u16,
    pub command_id: u8,
    pub profile_id: u16,
    pub endpoint: u8,
    pub cluster_specific: bool,
    pub disable_default_response: bool,
    pub payload: Vec<u8>,
}

impl OutboundCommand {
    /// Create a cluster-specific command with default responses disabled
    #[must_use]
    pub fn cluster_command(
        profile_id: u16,
        endpoint: u8,
        cluster_id: u16,
        command_id: u8,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            cluster_id,
            command_id,
            profile_id,
            endpoint,
            cluster_specific: true,
            disable_default_response: true,
            payload,
        }
    }

    /// Create a global (profile-wide) command; the device answers with a response frame
    #[must_use]
    pub fn global_command(
        profile_id: u16,
        endpoint: u8,
        cluster_id: u16,
        command_id: u8,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            cluster_id,
            command_id,
            profile_id,
            endpoint,
            cluster_specific: false,
            disable_default_response: false,
            payload,
        }
    }
}
