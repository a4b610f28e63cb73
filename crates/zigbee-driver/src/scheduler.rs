//! Tokio-backed [`Scheduler`]
//!
//! One sleeping task per [`TaskId`]. Scheduling an id that is already
//! pending replaces the earlier timer.

use crate::ports::{Callback, Scheduler, TaskId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Delayed callbacks on the ambient tokio runtime
pub struct TokioScheduler {
    /// Active timers with the generation that armed them
    timers: Arc<DashMap<TaskId, (u64, JoinHandle<()>)>>,
    generation: AtomicU64,
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TokioScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            timers: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Timers that have not fired or been cancelled
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.timers.len()
    }
}

impl Scheduler for TokioScheduler {
    /// Must be called from within a tokio runtime
    fn schedule_after(&self, delay: Duration, task: TaskId, callback: Callback) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let timers = Arc::clone(&self.timers);
        let key = task.clone();
        tracing::trace!("Scheduled {} in {:?}", task, delay);

        // The slot stays locked until the handle is stored, so a timer that
        // fires immediately always finds its own generation.
        match self.timers.entry(task) {
            Entry::Occupied(mut slot) => {
                let handle = spawn_timer(timers, key, generation, delay, callback);
                let (_, previous) = slot.insert((generation, handle));
                previous.abort();
            }
            Entry::Vacant(slot) => {
                let handle = spawn_timer(timers, key, generation, delay, callback);
                slot.insert((generation, handle));
            }
        }
    }

    fn cancel(&self, task: &TaskId) {
        if let Some((_, (_, handle))) = self.timers.remove(task) {
            handle.abort();
            tracing::trace!("Cancelled timer {}", task);
        }
    }
}

fn spawn_timer(
    timers: Arc<DashMap<TaskId, (u64, JoinHandle<()>)>>,
    key: TaskId,
    generation: u64,
    delay: Duration,
    callback: Callback,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        // A newer timer for the same id owns the slot
        if timers.remove_if(&key, |_, (g, _)| *g == generation).is_some() {
            tracing::trace!("Timer {} fired", key);
            callback();
        }
    })
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for entry in self.timers.iter() {
            entry.value().1.abort();
        }
    }
}
