//! Interfaces to the collaborators outside this core
//!
//! ```text
//!   Transport ──deliver──▶ DriverRuntime ──send──▶ Transport
//!                               │
//!                               ├──commit──▶ CapabilityStore
//!                               └──schedule_after/cancel──▶ Scheduler
//! ```
//!
//! Every method is a fire-and-forget handoff; none of them may block.

use crate::device::{Field, FieldValue};
use crate::handshake::TaskKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use zcl_protocol::{DecodeError, OutboundCommand};

/// Opaque identity of a paired device
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a scheduled callback is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskPurpose {
    Handshake(TaskKind),
    OfflineTracking,
}

/// Key for a scheduled callback; at most one callback per key is pending
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId {
    pub device: DeviceId,
    pub purpose: TaskPurpose,
}

impl TaskId {
    #[must_use]
    pub fn handshake(device: &DeviceId, kind: TaskKind) -> Self {
        Self {
            device: device.clone(),
            purpose: TaskPurpose::Handshake(kind),
        }
    }

    #[must_use]
    pub fn offline(device: &DeviceId) -> Self {
        Self {
            device: device.clone(),
            purpose: TaskPurpose::OfflineTracking,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.purpose {
            TaskPurpose::Handshake(kind) => write!(f, "{}/handshake/{kind:?}", self.device),
            TaskPurpose::OfflineTracking => write!(f, "{}/offline", self.device),
        }
    }
}

/// Deferred work handed to the [`Scheduler`]
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Byte-oriented link to the Zigbee radio
pub trait Transport: Send + Sync {
    /// Queue a command for transmission
    fn send(&self, device: &DeviceId, command: OutboundCommand);

    /// Tell the connectivity layer how long silence may last before the
    /// device is declared offline
    fn set_offline_timeout(&self, device: &DeviceId, seconds: u64);
}

/// Timer service
pub trait Scheduler: Send + Sync {
    /// Run `callback` after `delay`, replacing any pending callback for `task`
    fn schedule_after(&self, delay: Duration, task: TaskId, callback: Callback);

    /// Drop the pending callback for `task`, if any
    fn cancel(&self, task: &TaskId);
}

/// Capability attribute store; receives only actual changes
pub trait CapabilityStore: Send + Sync {
    fn commit(&self, device: &DeviceId, field: Field, value: FieldValue, changed_at: DateTime<Utc>);
}

/// Telemetry sink for conditions that degrade a device without stopping it
pub trait Diagnostics: Send + Sync {
    fn handshake_exhausted(&self, device: &DeviceId, kind: TaskKind, attempts: u32);

    fn decode_failed(&self, device: &DeviceId, cluster_id: u16, command_id: u8, error: &DecodeError);
}

/// Source of wall-clock time for `*changed` timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Diagnostics sink that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn handshake_exhausted(&self, device: &DeviceId, kind: TaskKind, attempts: u32) {
        tracing::warn!(
            "Handshake {:?} for {} abandoned after {} attempts",
            kind,
            device,
            attempts
        );
    }

    fn decode_failed(&self, device: &DeviceId, cluster_id: u16, command_id: u8, error: &DecodeError) {
        tracing::warn!(
            "Discarded frame from {} cluster={:#06x} cmd={:#04x}: {}",
            device,
            cluster_id,
            command_id,
            error
        );
    }
}

/// The set of collaborators a device lane talks to
#[derive(Clone)]
pub struct Ports {
    pub transport: Arc<dyn Transport>,
    pub scheduler: Arc<dyn Scheduler>,
    pub store: Arc<dyn CapabilityStore>,
    pub diagnostics: Arc<dyn Diagnostics>,
    pub clock: Arc<dyn Clock>,
}

impl Ports {
    /// Ports with the system clock and log-only diagnostics
    pub fn new(
        transport: Arc<dyn Transport>,
        scheduler: Arc<dyn Scheduler>,
        store: Arc<dyn CapabilityStore>,
    ) -> Self {
        Self {
            transport,
            scheduler,
            store,
            diagnostics: Arc::new(LogDiagnostics),
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
