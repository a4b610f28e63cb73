//! Zigbee device driver runtime
//!
//! This crate reconciles ZCL traffic from battery buttons and irrigation
//! controllers into per-device capability state, drives the reporting
//! configuration handshakes, and tracks heartbeats for offline detection.
//! Each device runs in its own serial lane; lanes run in parallel.

pub mod classifier;
pub mod cluster;
pub mod device;
pub mod driver;
pub mod error;
pub mod handlers;
pub mod handshake;
pub mod heartbeat;
pub mod ports;
pub mod profile;
pub mod runtime;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::{Classifier, Route};
pub use device::{ButtonState, DeviceSnapshot, Field, FieldValue, PowerSource};
pub use driver::{CapabilityCommand, DeviceDriver, LaneMessage};
pub use error::DriverError;
pub use handshake::{TaskKind, TaskStatus};
pub use ports::{CapabilityStore, Clock, DeviceId, Diagnostics, Ports, Scheduler, TaskId, Transport};
pub use profile::{DeviceKind, DeviceProfile};
pub use runtime::DriverRuntime;
pub use scheduler::TokioScheduler;
