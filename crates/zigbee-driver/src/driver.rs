//! Per-device lane
//!
//! A [`DeviceDriver`] owns everything about one device and is driven by
//! [`LaneMessage`]s read off a single channel. Transport frames, capability
//! commands and scheduler callbacks all arrive the same way, so state is only
//! ever touched from inside the lane.

use crate::classifier::Classifier;
use crate::device::{DeviceModel, DeviceSnapshot};
use crate::handlers;
use crate::handshake::{HandshakeController, TaskKind, TaskStatus};
use crate::heartbeat::HeartbeatMonitor;
use crate::ports::{DeviceId, Ports};
use crate::profile::{DeviceKind, DeviceProfile};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use zcl_protocol::{InboundFrame, OutboundCommand};

pub type LaneSender = mpsc::UnboundedSender<LaneMessage>;
pub type LaneReceiver = mpsc::UnboundedReceiver<LaneMessage>;

/// Capability commands accepted from the capability layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "args", rename_all = "snake_case")]
pub enum CapabilityCommand {
    /// Attribute-set literal, `"pressed"` or `"released"`
    SetButton(String),
    ZoneOn { zone: u8 },
    ZoneOff { zone: u8 },
    /// Water for `minutes`, or the zone's default duration
    WaterZone { zone: u8, minutes: Option<u16> },
    SetZoneDuration { zone: u8, minutes: u16 },
    Refresh,
    /// Restart every configuration handshake
    Configure,
}

/// Everything a lane can be asked to do
#[derive(Debug)]
pub enum LaneMessage {
    Connect,
    Frame(InboundFrame),
    Command(CapabilityCommand),
    RetryDue { kind: TaskKind, attempt: u32 },
    OfflineCheck,
    OfflineSignal,
    Snapshot(oneshot::Sender<DeviceSnapshot>),
    Shutdown,
}

/// One device's driver state
pub struct DeviceDriver {
    id: DeviceId,
    profile: DeviceProfile,
    classifier: Arc<Classifier>,
    ports: Ports,
    model: DeviceModel,
    handshakes: HandshakeController,
    monitor: HeartbeatMonitor,
}

impl DeviceDriver {
    #[must_use]
    pub fn new(
        id: DeviceId,
        profile: DeviceProfile,
        classifier: Arc<Classifier>,
        ports: Ports,
        lane: LaneSender,
    ) -> Self {
        let model = DeviceModel::new(id.clone(), &profile, ports.store.clone(), ports.clock.clone());
        let handshakes =
            HandshakeController::new(id.clone(), profile.clone(), ports.clone(), lane.clone());
        let monitor =
            HeartbeatMonitor::new(id.clone(), profile.offline_timeout_secs, ports.clone(), lane);
        Self {
            id,
            profile,
            classifier,
            ports,
            model,
            handshakes,
            monitor,
        }
    }

    /// Process messages until shutdown or until every sender is gone
    pub async fn run(mut self, mut rx: LaneReceiver) {
        tracing::debug!("Lane started for {}", self.id);
        while let Some(msg) = rx.recv().await {
            if self.handle(msg).is_break() {
                return;
            }
        }
        self.teardown();
    }

    /// Handle a single message
    pub fn handle(&mut self, msg: LaneMessage) -> ControlFlow<()> {
        match msg {
            LaneMessage::Connect => self.connect(),
            LaneMessage::Frame(frame) => self.process_frame(&frame),
            LaneMessage::Command(command) => self.apply_command(&command),
            LaneMessage::RetryDue { kind, attempt } => self.handshakes.retry_due(kind, attempt),
            LaneMessage::OfflineCheck => {
                let now = self.ports.clock.now();
                if self.monitor.is_overdue(now) {
                    tracing::info!("{} missed its heartbeat window, marking offline", self.id);
                    self.model.set_online(false);
                } else {
                    tracing::debug!("Stale offline check for {}", self.id);
                }
            }
            LaneMessage::OfflineSignal => {
                tracing::info!("{} reported offline", self.id);
                self.model.set_online(false);
            }
            LaneMessage::Snapshot(reply) => {
                // Requester may have given up waiting
                let _ = reply.send(self.model.snapshot());
            }
            LaneMessage::Shutdown => {
                self.teardown();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Identify the device, start handshakes and offline tracking
    pub fn connect(&mut self) {
        tracing::info!("Connecting {} ({:?})", self.id, self.profile.kind);
        let now = self.ports.clock.now();
        self.model.record_heartbeat(now);
        self.model.set_online(true);
        self.monitor.connected();
        self.configure();
    }

    fn configure(&mut self) {
        match self.profile.kind {
            DeviceKind::Button => self.send(handlers::hello_request()),
            DeviceKind::IrrigationController => {
                for kind in TaskKind::for_profile(&self.profile) {
                    self.handshakes.start(kind);
                }
            }
        }
    }

    /// Classify, decode and apply one inbound frame
    pub fn process_frame(&mut self, frame: &InboundFrame) {
        let route = self.classifier.classify(frame);
        tracing::trace!(
            "{}: cluster=0x{:04X} cmd=0x{:02X} -> {:?}",
            self.id,
            frame.cluster_id,
            frame.command_id,
            route
        );

        let outcome = match handlers::reconcile(route, frame, &mut self.model, &self.profile) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    "Discarding frame from {} (cluster 0x{:04X}, cmd 0x{:02X}): {}",
                    self.id,
                    frame.cluster_id,
                    frame.command_id,
                    e
                );
                self.ports
                    .diagnostics
                    .decode_failed(&self.id, frame.cluster_id, frame.command_id, &e);
                return;
            }
        };

        if outcome.heartbeat {
            let now = self.ports.clock.now();
            self.model.record_heartbeat(now);
            self.model.set_online(true);
            self.monitor.heartbeat(now);
        }
        for (kind, success) in outcome.acks {
            self.handshakes.on_response(kind, success);
        }
        for command in outcome.outbound {
            self.send(command);
        }
    }

    pub fn apply_command(&mut self, command: &CapabilityCommand) {
        tracing::debug!("{} <- {:?}", self.id, command);
        if *command == CapabilityCommand::Configure {
            self.configure();
            return;
        }
        let outcome = handlers::execute(command, &mut self.model, &self.profile);
        for command in outcome.outbound {
            self.send(command);
        }
    }

    fn send(&self, command: OutboundCommand) {
        self.ports.transport.send(&self.id, command);
    }

    /// Cancel everything scheduled on behalf of this device
    pub fn teardown(&mut self) {
        tracing::info!("Stopping lane for {}", self.id);
        self.handshakes.cancel_all();
        self.monitor.cancel();
    }

    #[must_use]
    pub fn snapshot(&self) -> DeviceSnapshot {
        self.model.snapshot()
    }

    #[must_use]
    pub fn handshake_status(&self, kind: TaskKind) -> Option<TaskStatus> {
        self.handshakes.status(kind)
    }
}
