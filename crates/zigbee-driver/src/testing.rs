//! Recording fakes for the external interfaces

use crate::device::{Field, FieldValue};
use crate::handshake::TaskKind;
use crate::ports::{
    Callback, CapabilityStore, Clock, DeviceId, Diagnostics, Ports, Scheduler, TaskId, Transport,
};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zcl_protocol::{DecodeError, OutboundCommand};

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(DeviceId, OutboundCommand)>>,
    timeouts: Mutex<Vec<(DeviceId, u64)>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<OutboundCommand> {
        self.sent.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn sent_to(&self, device: &DeviceId) -> Vec<OutboundCommand> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(d, _)| d == device)
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn count_command(&self, cluster_id: u16, command_id: u8) -> usize {
        self.sent()
            .iter()
            .filter(|c| c.cluster_id == cluster_id && c.command_id == command_id)
            .count()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    pub fn timeouts(&self) -> Vec<(DeviceId, u64)> {
        self.timeouts.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, device: &DeviceId, command: OutboundCommand) {
        self.sent.lock().unwrap().push((device.clone(), command));
    }

    fn set_offline_timeout(&self, device: &DeviceId, seconds: u64) {
        self.timeouts.lock().unwrap().push((device.clone(), seconds));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub device: DeviceId,
    pub field: Field,
    pub value: FieldValue,
    pub changed_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct RecordingStore {
    commits: Mutex<Vec<Commit>>,
}

impl RecordingStore {
    pub fn commits(&self) -> Vec<Commit> {
        self.commits.lock().unwrap().clone()
    }
}

impl CapabilityStore for RecordingStore {
    fn commit(&self, device: &DeviceId, field: Field, value: FieldValue, changed_at: DateTime<Utc>) {
        self.commits.lock().unwrap().push(Commit {
            device: device.clone(),
            field,
            value,
            changed_at,
        });
    }
}

/// Scheduler whose callbacks run only when a test fires them
#[derive(Default)]
pub struct ManualScheduler {
    pending: Mutex<HashMap<TaskId, (Duration, Callback)>>,
    history: Mutex<Vec<(TaskId, Duration)>>,
}

impl ManualScheduler {
    /// Run the pending callback for `task`; false if none was pending
    pub fn fire(&self, task: &TaskId) -> bool {
        let entry = self.pending.lock().unwrap().remove(task);
        match entry {
            Some((_, callback)) => {
                callback();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, task: &TaskId) -> bool {
        self.pending.lock().unwrap().contains_key(task)
    }

    pub fn pending_delay(&self, task: &TaskId) -> Option<Duration> {
        self.pending.lock().unwrap().get(task).map(|(d, _)| *d)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Every delay ever scheduled for `task`, in order
    pub fn delays_for(&self, task: &TaskId) -> Vec<Duration> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == task)
            .map(|(_, d)| *d)
            .collect()
    }

    /// Remove a pending callback without running or cancelling it
    pub fn take(&self, task: &TaskId) -> Option<Callback> {
        self.pending.lock().unwrap().remove(task).map(|(_, cb)| cb)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_after(&self, delay: Duration, task: TaskId, callback: Callback) {
        self.history.lock().unwrap().push((task.clone(), delay));
        self.pending.lock().unwrap().insert(task, (delay, callback));
    }

    fn cancel(&self, task: &TaskId) {
        self.pending.lock().unwrap().remove(task);
    }
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        *self.now.lock().unwrap() += ChronoDuration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
pub struct RecordingDiagnostics {
    exhausted: Mutex<Vec<(DeviceId, TaskKind, u32)>>,
    decode_failures: Mutex<Vec<(u16, u8, DecodeError)>>,
}

impl RecordingDiagnostics {
    pub fn exhausted(&self) -> Vec<(DeviceId, TaskKind, u32)> {
        self.exhausted.lock().unwrap().clone()
    }

    pub fn decode_failures(&self) -> Vec<(u16, u8, DecodeError)> {
        self.decode_failures.lock().unwrap().clone()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn handshake_exhausted(&self, device: &DeviceId, kind: TaskKind, attempts: u32) {
        self.exhausted
            .lock()
            .unwrap()
            .push((device.clone(), kind, attempts));
    }

    fn decode_failed(&self, _device: &DeviceId, cluster_id: u16, command_id: u8, error: &DecodeError) {
        self.decode_failures
            .lock()
            .unwrap()
            .push((cluster_id, command_id, error.clone()));
    }
}

/// One of each fake, wired into [`Ports`] on demand
pub struct Fakes {
    pub transport: Arc<RecordingTransport>,
    pub scheduler: Arc<ManualScheduler>,
    pub store: Arc<RecordingStore>,
    pub diagnostics: Arc<RecordingDiagnostics>,
    pub clock: Arc<ManualClock>,
}

impl Fakes {
    pub fn new() -> Self {
        Self {
            transport: Arc::new(RecordingTransport::default()),
            scheduler: Arc::new(ManualScheduler::default()),
            store: Arc::new(RecordingStore::default()),
            diagnostics: Arc::new(RecordingDiagnostics::default()),
            clock: Arc::new(ManualClock::new()),
        }
    }

    pub fn ports(&self) -> Ports {
        Ports {
            transport: self.transport.clone(),
            scheduler: self.scheduler.clone(),
            store: self.store.clone(),
            diagnostics: self.diagnostics.clone(),
            clock: self.clock.clone(),
        }
    }
}

/// Route test logs through the test harness writer
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with_test_writer()
        .try_init();
}
