//! Timers backed by the tokio runtime.

use crate::DaemonEvent;
use std::collections::HashMap;
use std::time::Duration;
use tessellate_controller::{Scheduler, TimerId, TimerTask};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Spawns one sleeping task per timer; the task posts
/// [`DaemonEvent::TimerFired`] to the event loop when it wakes.
pub struct TokioScheduler {
    next_id: u64,
    timers: HashMap<TimerId, JoinHandle<()>>,
    event_tx: mpsc::Sender<DaemonEvent>,
}

impl TokioScheduler {
    pub fn new(event_tx: mpsc::Sender<DaemonEvent>) -> Self {
        Self {
            next_id: 0,
            timers: HashMap::new(),
            event_tx,
        }
    }

    /// Timers scheduled and not yet fired or cancelled.
    pub fn active(&self) -> usize {
        self.timers.values().filter(|h| !h.is_finished()).count()
    }

    /// Abort every pending timer.
    pub fn cancel_all(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration, task: TimerTask) -> TimerId {
        self.timers.retain(|_, handle| !handle.is_finished());

        let id = TimerId(self.next_id);
        self.next_id += 1;

        let event_tx = self.event_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = event_tx.send(DaemonEvent::TimerFired(id, task)).await;
        });
        self.timers.insert(id, handle);
        trace!("Scheduled timer {:?} in {:?}", id, delay);
        id
    }

    fn cancel(&mut self, timer: TimerId) {
        if let Some(handle) = self.timers.remove(&timer) {
            handle.abort();
            trace!("Cancelled timer {:?}", timer);
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(2);

    async fn next_timer(rx: &mut mpsc::Receiver<DaemonEvent>) -> (TimerId, TimerTask) {
        match tokio::time::timeout(WAIT, rx.recv()).await {
            Ok(Some(DaemonEvent::TimerFired(id, task))) => (id, task),
            _ => panic!("Expected a fired timer"),
        }
    }

    #[tokio::test]
    async fn test_timer_fires_with_task() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut scheduler = TokioScheduler::new(tx);

        let id = scheduler.schedule(Duration::from_millis(5), TimerTask::TileCheck(42));

        assert_eq!(next_timer(&mut rx).await, (id, TimerTask::TileCheck(42)));
    }

    #[tokio::test]
    async fn test_cancelled_timer_does_not_fire() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut scheduler = TokioScheduler::new(tx);

        let cancelled = scheduler.schedule(Duration::from_millis(20), TimerTask::TileCheck(1));
        let kept = scheduler.schedule(Duration::from_millis(60), TimerTask::TileCheck(2));
        scheduler.cancel(cancelled);

        let (id, _) = next_timer(&mut rx).await;
        assert_eq!(id, kept);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let (tx, _rx) = mpsc::channel(8);
        let mut scheduler = TokioScheduler::new(tx);

        let a = scheduler.schedule(Duration::from_secs(60), TimerTask::TileCheck(1));
        let b = scheduler.schedule(Duration::from_secs(60), TimerTask::TileCheck(1));
        assert_ne!(a, b);
        assert_eq!(scheduler.active(), 2);

        scheduler.cancel_all();
        assert_eq!(scheduler.active(), 0);
    }
}
