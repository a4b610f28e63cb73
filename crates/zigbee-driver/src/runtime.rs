//! Driver runtime
//!
//! Owns one lane per device. Calls for different devices never contend on
//! anything but the lane map; calls for the same device are serialized by
//! that device's channel.

use crate::classifier::Classifier;
use crate::device::DeviceSnapshot;
use crate::driver::{CapabilityCommand, DeviceDriver, LaneMessage, LaneSender};
use crate::error::DriverError;
use crate::ports::{DeviceId, Ports};
use crate::profile::{DeviceKind, DeviceProfile};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use zcl_protocol::InboundFrame;

struct Lane {
    tx: LaneSender,
    task: JoinHandle<()>,
}

/// Entry point for transport, capability and connectivity layers
pub struct DriverRuntime {
    lanes: Arc<DashMap<DeviceId, Lane>>,
    /// Built once per device kind, shared by its lanes
    classifiers: HashMap<DeviceKind, Arc<Classifier>>,
    ports: Ports,
}

impl DriverRuntime {
    #[must_use]
    pub fn new(ports: Ports) -> Self {
        let classifiers = [DeviceKind::Button, DeviceKind::IrrigationController]
            .into_iter()
            .map(|kind| (kind, Arc::new(Classifier::for_kind(kind))))
            .collect();
        Self {
            lanes: Arc::new(DashMap::new()),
            classifiers,
            ports,
        }
    }

    /// Register a paired device and start its lane
    pub fn add_device(&self, id: DeviceId, profile: DeviceProfile) -> Result<(), DriverError> {
        profile.validate()?;
        let classifier = self
            .classifiers
            .get(&profile.kind)
            .cloned()
            .unwrap_or_else(|| Arc::new(Classifier::for_kind(profile.kind)));

        match self.lanes.entry(id.clone()) {
            Entry::Occupied(_) => Err(DriverError::DuplicateDevice(id)),
            Entry::Vacant(slot) => {
                let (tx, rx) = mpsc::unbounded_channel();
                tracing::info!("Adding {} as {:?}", id, profile.kind);
                let driver = DeviceDriver::new(id, profile, classifier, self.ports.clone(), tx.clone());
                let task = tokio::spawn(driver.run(rx));
                slot.insert(Lane { tx, task });
                Ok(())
            }
        }
    }

    fn post(&self, id: &DeviceId, msg: LaneMessage) -> Result<(), DriverError> {
        let lane = self
            .lanes
            .get(id)
            .ok_or_else(|| DriverError::UnknownDevice(id.clone()))?;
        lane.tx
            .send(msg)
            .map_err(|_| DriverError::LaneClosed(id.clone()))
    }

    /// Device (re)joined: identify it and start configuration
    pub fn connect(&self, id: &DeviceId) -> Result<(), DriverError> {
        self.post(id, LaneMessage::Connect)
    }

    /// Hand an inbound frame to the device's lane
    pub fn deliver(&self, id: &DeviceId, frame: InboundFrame) -> Result<(), DriverError> {
        self.post(id, LaneMessage::Frame(frame))
    }

    pub fn command(&self, id: &DeviceId, command: CapabilityCommand) -> Result<(), DriverError> {
        self.post(id, LaneMessage::Command(command))
    }

    /// The connectivity layer declared the device offline
    pub fn offline_signal(&self, id: &DeviceId) -> Result<(), DriverError> {
        self.post(id, LaneMessage::OfflineSignal)
    }

    /// Copy of the device state after every earlier message was processed
    pub async fn snapshot(&self, id: &DeviceId) -> Result<DeviceSnapshot, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.post(id, LaneMessage::Snapshot(reply))?;
        rx.await.map_err(|_| DriverError::LaneClosed(id.clone()))
    }

    /// Cancel everything scheduled for the device and stop its lane
    pub async fn remove_device(&self, id: &DeviceId) -> Result<(), DriverError> {
        let (_, lane) = self
            .lanes
            .remove(id)
            .ok_or_else(|| DriverError::UnknownDevice(id.clone()))?;
        if lane.tx.send(LaneMessage::Shutdown).is_err() {
            return Err(DriverError::LaneClosed(id.clone()));
        }
        if let Err(e) = lane.task.await {
            tracing::error!("Lane for {} ended abnormally: {}", id, e);
            return Err(DriverError::LaneClosed(id.clone()));
        }
        tracing::info!("Removed {}", id);
        Ok(())
    }

    #[must_use]
    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.lanes.iter().map(|lane| lane.key().clone()).collect()
    }

    #[must_use]
    pub fn device_count(&self) -> usize {
        self.lanes.len()
    }
}

impl Drop for DriverRuntime {
    fn drop(&mut self) {
        for lane in self.lanes.iter() {
            lane.task.abort();
        }
    }
}
