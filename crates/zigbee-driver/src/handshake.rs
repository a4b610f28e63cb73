//! Configuration handshakes
//!
//! Each [`ConfigurationTask`] sends a configuration request, schedules its
//! own retry, and waits for the matching response to come back through the
//! lane. Retries back off linearly (`attempt × base`) up to the profile's
//! ceiling, after which the task is abandoned.

use crate::cluster::{
    id, on_off_attrs, poll_control_attrs, power_attrs, profiles, temperature_attrs,
    CHECK_IN_INTERVAL_QS,
};
use crate::driver::{LaneMessage, LaneSender};
use crate::ports::{DeviceId, Ports, TaskId};
use crate::profile::{DeviceKind, DeviceProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use zcl_protocol::{
    encode, AttributeValue, DataType, OutboundCommand, OutboundPayload, ReportingConfig,
};

/// Configuration aspects negotiated with a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    PowerReporting,
    PollControl,
    OnOffReporting,
    ThermostatReporting,
}

impl TaskKind {
    /// Handshakes run on connect for a profile
    #[must_use]
    pub fn for_profile(profile: &DeviceProfile) -> Vec<TaskKind> {
        match profile.kind {
            DeviceKind::Button => Vec::new(),
            DeviceKind::IrrigationController => {
                let mut kinds = vec![
                    TaskKind::PowerReporting,
                    TaskKind::OnOffReporting,
                    TaskKind::PollControl,
                ];
                if profile.thermostat_reporting {
                    kinds.push(TaskKind::ThermostatReporting);
                }
                kinds
            }
        }
    }

    /// Cluster the request is sent to and the response arrives on
    #[must_use]
    pub fn cluster_id(&self) -> u16 {
        match self {
            TaskKind::PowerReporting => id::POWER_CONFIG,
            TaskKind::PollControl => id::POLL_CONTROL,
            TaskKind::OnOffReporting => id::ON_OFF,
            TaskKind::ThermostatReporting => id::THERMOSTAT,
        }
    }

    /// Task acknowledged by a Configure Reporting Response on `cluster_id`
    #[must_use]
    pub fn from_reporting_response(cluster_id: u16) -> Option<TaskKind> {
        match cluster_id {
            id::POWER_CONFIG => Some(TaskKind::PowerReporting),
            id::ON_OFF => Some(TaskKind::OnOffReporting),
            id::THERMOSTAT => Some(TaskKind::ThermostatReporting),
            _ => None,
        }
    }

    /// Task acknowledged by a Write Attributes Response on `cluster_id`
    #[must_use]
    pub fn from_write_response(cluster_id: u16) -> Option<TaskKind> {
        match cluster_id {
            id::POLL_CONTROL => Some(TaskKind::PollControl),
            _ => None,
        }
    }

    fn payload(&self) -> OutboundPayload {
        match self {
            TaskKind::PowerReporting => OutboundPayload::ConfigureReporting(vec![ReportingConfig {
                attribute_id: power_attrs::BATTERY_VOLTAGE,
                data_type: DataType::Uint8,
                min_interval: 30,
                max_interval: 21600,
                // 0.1 V
                reportable_change: Some(AttributeValue::Uint8(1)),
            }]),
            TaskKind::OnOffReporting => OutboundPayload::ConfigureReporting(vec![ReportingConfig {
                attribute_id: on_off_attrs::ON_OFF,
                data_type: DataType::Boolean,
                min_interval: 0,
                max_interval: 600,
                reportable_change: None,
            }]),
            TaskKind::ThermostatReporting => {
                OutboundPayload::ConfigureReporting(vec![ReportingConfig {
                    attribute_id: temperature_attrs::MEASURED_VALUE,
                    data_type: DataType::Int16,
                    min_interval: 30,
                    max_interval: 3600,
                    // 0.5 °C
                    reportable_change: Some(AttributeValue::Int16(50)),
                }])
            }
            TaskKind::PollControl => OutboundPayload::WriteAttributes(vec![(
                poll_control_attrs::CHECK_IN_INTERVAL,
                AttributeValue::Uint32(CHECK_IN_INTERVAL_QS),
            )]),
        }
    }

    /// The configuration request for this task
    #[must_use]
    pub fn request(&self, profile: &DeviceProfile) -> OutboundCommand {
        let payload = self.payload();
        OutboundCommand::global_command(
            profiles::HOME_AUTOMATION,
            profile.primary_endpoint(),
            self.cluster_id(),
            payload.command_id(),
            encode(&payload),
        )
    }
}

/// Handshake progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Acked,
    Abandoned,
}

/// A handshake in flight
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationTask {
    pub kind: TaskKind,
    /// Requests sent so far; never exceeds the ceiling
    pub attempt_count: u32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub status: TaskStatus,
}

/// Drives every handshake for one device
pub struct HandshakeController {
    device: DeviceId,
    profile: DeviceProfile,
    ports: Ports,
    lane: LaneSender,
    /// Live tasks; removed once acked or abandoned
    tasks: HashMap<TaskKind, ConfigurationTask>,
    /// Terminal status of finished tasks
    outcomes: HashMap<TaskKind, TaskStatus>,
}

impl HandshakeController {
    #[must_use]
    pub fn new(device: DeviceId, profile: DeviceProfile, ports: Ports, lane: LaneSender) -> Self {
        Self {
            device,
            profile,
            ports,
            lane,
            tasks: HashMap::new(),
            outcomes: HashMap::new(),
        }
    }

    /// Start (or restart) a handshake
    pub fn start(&mut self, kind: TaskKind) {
        if self.tasks.contains_key(&kind) {
            self.ports
                .scheduler
                .cancel(&TaskId::handshake(&self.device, kind));
            tracing::debug!("Restarting handshake {:?} for {}", kind, self.device);
        }
        self.outcomes.remove(&kind);
        self.tasks.insert(
            kind,
            ConfigurationTask {
                kind,
                attempt_count: 0,
                next_retry_at: None,
                status: TaskStatus::Pending,
            },
        );
        self.attempt(kind);
    }

    /// Send the next request and arm the retry
    fn attempt(&mut self, kind: TaskKind) {
        let Some(task) = self.tasks.get_mut(&kind) else {
            return;
        };
        task.attempt_count += 1;
        let attempt = task.attempt_count;
        let delay = Duration::from_secs(u64::from(attempt) * self.profile.backoff_base_secs);
        task.next_retry_at = chrono::Duration::from_std(delay)
            .ok()
            .map(|d| self.ports.clock.now() + d);

        tracing::info!(
            "Sending {:?} configuration to {} (attempt {}/{})",
            kind,
            self.device,
            attempt,
            self.profile.retry_ceiling
        );
        self.ports
            .transport
            .send(&self.device, kind.request(&self.profile));

        let lane = self.lane.clone();
        self.ports.scheduler.schedule_after(
            delay,
            TaskId::handshake(&self.device, kind),
            Box::new(move || {
                // Lane already gone means the device was removed
                let _ = lane.send(LaneMessage::RetryDue { kind, attempt });
            }),
        );
    }

    /// A scheduled retry fired; `attempt` is the attempt that armed it
    pub fn retry_due(&mut self, kind: TaskKind, attempt: u32) {
        let Some(task) = self.tasks.get(&kind) else {
            tracing::debug!(
                "Ignoring retry for inactive handshake {:?} on {}",
                kind,
                self.device
            );
            return;
        };
        if task.attempt_count != attempt {
            tracing::debug!(
                "Ignoring stale retry {} for {:?} on {} (now at attempt {})",
                attempt,
                kind,
                self.device,
                task.attempt_count
            );
            return;
        }

        if task.attempt_count >= self.profile.retry_ceiling {
            let attempts = task.attempt_count;
            self.tasks.remove(&kind);
            self.outcomes.insert(kind, TaskStatus::Abandoned);
            tracing::warn!(
                "Handshake {:?} for {} exhausted after {} attempts",
                kind,
                self.device,
                attempts
            );
            self.ports
                .diagnostics
                .handshake_exhausted(&self.device, kind, attempts);
            return;
        }

        self.attempt(kind);
    }

    /// A response for `kind` arrived
    pub fn on_response(&mut self, kind: TaskKind, success: bool) {
        if !self.tasks.contains_key(&kind) {
            tracing::debug!(
                "Response for inactive handshake {:?} on {} (success={})",
                kind,
                self.device,
                success
            );
            return;
        }

        if success {
            self.ports
                .scheduler
                .cancel(&TaskId::handshake(&self.device, kind));
            self.tasks.remove(&kind);
            self.outcomes.insert(kind, TaskStatus::Acked);
            tracing::info!("Handshake {:?} acknowledged by {}", kind, self.device);
        } else {
            tracing::warn!(
                "Handshake {:?} rejected by {}, waiting for retry",
                kind,
                self.device
            );
        }
    }

    /// Cancel every pending retry
    pub fn cancel_all(&mut self) {
        for kind in self.tasks.keys() {
            self.ports
                .scheduler
                .cancel(&TaskId::handshake(&self.device, *kind));
        }
        self.tasks.clear();
    }

    #[must_use]
    pub fn status(&self, kind: TaskKind) -> Option<TaskStatus> {
        self.tasks
            .get(&kind)
            .map(|t| t.status)
            .or_else(|| self.outcomes.get(&kind).copied())
    }

    #[must_use]
    pub fn task(&self, kind: TaskKind) -> Option<&ConfigurationTask> {
        self.tasks.get(&kind)
    }
}
