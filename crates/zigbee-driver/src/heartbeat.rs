//! Offline detection
//!
//! The transport gets the timeout as a hint, but the driver also keeps its
//! own timer: every heartbeat re-arms an offline check one timeout ahead.

use crate::driver::{LaneMessage, LaneSender};
use crate::ports::{DeviceId, Ports, TaskId};
use chrono::{DateTime, Utc};
use std::time::Duration;

pub struct HeartbeatMonitor {
    device: DeviceId,
    timeout_secs: u64,
    ports: Ports,
    lane: LaneSender,
    last_heartbeat: Option<DateTime<Utc>>,
}

impl HeartbeatMonitor {
    #[must_use]
    pub fn new(device: DeviceId, timeout_secs: u64, ports: Ports, lane: LaneSender) -> Self {
        Self {
            device,
            timeout_secs,
            ports,
            lane,
            last_heartbeat: None,
        }
    }

    /// Hand the timeout to the transport and start tracking
    pub fn connected(&mut self) {
        self.ports
            .transport
            .set_offline_timeout(&self.device, self.timeout_secs);
        self.last_heartbeat = Some(self.ports.clock.now());
        self.arm();
    }

    /// Record a liveness signal and push the offline check out
    pub fn heartbeat(&mut self, at: DateTime<Utc>) {
        self.last_heartbeat = Some(at);
        self.arm();
    }

    fn arm(&self) {
        let task = TaskId::offline(&self.device);
        self.ports.scheduler.cancel(&task);
        let lane = self.lane.clone();
        self.ports.scheduler.schedule_after(
            Duration::from_secs(self.timeout_secs),
            task,
            Box::new(move || {
                let _ = lane.send(LaneMessage::OfflineCheck);
            }),
        );
    }

    /// True when no heartbeat arrived within the timeout
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        let Some(last) = self.last_heartbeat else {
            return false;
        };
        let timeout = i64::try_from(self.timeout_secs).unwrap_or(i64::MAX);
        (now - last).num_seconds() >= timeout
    }

    #[must_use]
    pub fn last_heartbeat(&self) -> Option<DateTime<Utc>> {
        self.last_heartbeat
    }

    pub fn cancel(&mut self) {
        self.ports.scheduler.cancel(&TaskId::offline(&self.device));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Clock;
    use crate::testing::Fakes;
    use tokio::sync::mpsc;

    #[test]
    fn test_heartbeat_rearms_check() {
        let fakes = Fakes::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let device = DeviceId::new("button-1");
        let mut monitor = HeartbeatMonitor::new(device.clone(), 600, fakes.ports(), tx);

        monitor.connected();
        assert_eq!(fakes.transport.timeouts(), vec![(device.clone(), 600)]);
        let task = TaskId::offline(&device);
        assert_eq!(fakes.scheduler.pending_delay(&task), Some(Duration::from_secs(600)));

        fakes.clock.advance_secs(300);
        monitor.heartbeat(fakes.clock.now());
        assert_eq!(fakes.scheduler.delays_for(&task).len(), 2);
        assert_eq!(fakes.scheduler.pending_count(), 1);

        fakes.clock.advance_secs(599);
        assert!(!monitor.is_overdue(fakes.clock.now()));
        fakes.clock.advance_secs(1);
        assert!(monitor.is_overdue(fakes.clock.now()));

        assert!(fakes.scheduler.fire(&task));
        assert!(matches!(rx.try_recv(), Ok(LaneMessage::OfflineCheck)));
    }

    #[test]
    fn test_cancel() {
        let fakes = Fakes::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut monitor = HeartbeatMonitor::new(DeviceId::new("b"), 60, fakes.ports(), tx);
        assert!(!monitor.is_overdue(fakes.clock.now()));
        monitor.connected();
        monitor.cancel();
        assert_eq!(fakes.scheduler.pending_count(), 0);
    }
}
