//! Error types for the driver runtime

use crate::ports::DeviceId;
use thiserror::Error;

/// Errors that can occur in the driver runtime
#[derive(Error, Debug)]
pub enum DriverError {
    /// No lane registered for the device
    #[error("Device not found: {0}")]
    UnknownDevice(DeviceId),

    /// A lane already exists for the device
    #[error("Device already registered: {0}")]
    DuplicateDevice(DeviceId),

    /// The device lane stopped before the message could be delivered
    #[error("Device lane closed: {0}")]
    LaneClosed(DeviceId),

    /// Device-type parameters are inconsistent
    #[error("Invalid device profile: {0}")]
    InvalidProfile(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
