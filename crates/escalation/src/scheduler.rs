//! Timer Scheduler Implementation

use protocol::AlertId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Default escalation window: 15 seconds from alert creation
pub const DEFAULT_ESCALATION_WINDOW_MS: u64 = 15_000;

/// Scheduler owning one single-shot timer per armed alert.
///
/// Fired alert ids arrive on the channel returned by [`new`](Self::new).
/// The consumer must treat a fire for an alert that is no longer pending
/// as a no-op: a timer may complete after `disarm` was decided but before
/// it ran.
pub struct EscalationScheduler {
    window: Duration,
    fire_tx: mpsc::UnboundedSender<AlertId>,
    timers: HashMap<AlertId, JoinHandle<()>>,
}

impl EscalationScheduler {
    /// Create a scheduler and the receiving end of its fire channel
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<AlertId>) {
        let (fire_tx, fire_rx) = mpsc::unbounded_channel();
        info!("Escalation scheduler created, window {:?}", window);
        (
            Self {
                window,
                fire_tx,
                timers: HashMap::new(),
            },
            fire_rx,
        )
    }

    /// Arm the timer for an alert.
    ///
    /// Re-arming an already armed id replaces the old timer.
    pub fn arm(&mut self, alert_id: AlertId) {
        let window = self.window;
        let fire_tx = self.fire_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            // Receiver gone means the engine is shutting down.
            let _ = fire_tx.send(alert_id);
        });

        if let Some(old) = self.timers.insert(alert_id, handle) {
            old.abort();
            debug!("Replaced armed timer for alert {}", alert_id);
        } else {
            debug!("Armed {:?} timer for alert {}", window, alert_id);
        }
    }

    /// Disarm the timer for an alert, if one is armed.
    ///
    /// Idempotent. Returns whether a handle was present.
    pub fn disarm(&mut self, alert_id: &AlertId) -> bool {
        match self.timers.remove(alert_id) {
            Some(handle) => {
                handle.abort();
                debug!("Disarmed timer for alert {}", alert_id);
                true
            }
            None => false,
        }
    }

    /// Number of currently armed timers
    pub fn active(&self) -> usize {
        self.timers.len()
    }
}

impl Drop for EscalationScheduler {
    fn drop(&mut self) {
        for handle in self.timers.values() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_window() {
        let (mut scheduler, mut fire_rx) = EscalationScheduler::new(Duration::from_millis(100));
        let alert_id = Uuid::new_v4();

        scheduler.arm(alert_id);
        assert_eq!(scheduler.active(), 1);

        let fired = fire_rx.recv().await.unwrap();
        assert_eq!(fired, alert_id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_prevents_fire() {
        let (mut scheduler, mut fire_rx) = EscalationScheduler::new(Duration::from_millis(100));
        let alert_id = Uuid::new_v4();

        scheduler.arm(alert_id);
        assert!(scheduler.disarm(&alert_id));
        assert_eq!(scheduler.active(), 0);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(fire_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_unknown_is_noop() {
        let (mut scheduler, _fire_rx) = EscalationScheduler::new(Duration::from_millis(100));
        assert!(!scheduler.disarm(&Uuid::new_v4()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_timer() {
        let (mut scheduler, mut fire_rx) = EscalationScheduler::new(Duration::from_millis(100));
        let alert_id = Uuid::new_v4();

        scheduler.arm(alert_id);
        tokio::time::sleep(Duration::from_millis(60)).await;
        scheduler.arm(alert_id);
        assert_eq!(scheduler.active(), 1);

        // The replaced timer would have fired at 100ms; the new one at 160ms.
        let fired = fire_rx.recv().await.unwrap();
        assert_eq!(fired, alert_id);
        assert!(fire_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_timers() {
        let (mut scheduler, mut fire_rx) = EscalationScheduler::new(Duration::from_millis(100));
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        scheduler.arm(first);
        scheduler.arm(second);
        assert!(scheduler.disarm(&first));

        let fired = fire_rx.recv().await.unwrap();
        assert_eq!(fired, second);
        assert!(fire_rx.try_recv().is_err());
    }
}
