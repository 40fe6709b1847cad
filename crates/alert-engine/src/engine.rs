//! Engine Actor Implementation

use crate::alert::{Alert, AlertState, TerminalHistory};
use device_registry::{ConnectionId, Device, DeviceRegistry};
use escalation::{EscalationScheduler, DEFAULT_ESCALATION_WINDOW_MS};
use event_bus::EventBus;
use protocol::{AlertId, DeviceRole, LogEvent, RoleCounts, ServerMessage, Severity};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Escalation window from alert creation. Severity-independent.
    pub escalation_window: Duration,
    /// Recently terminal alerts kept for audit logging
    pub terminal_retention: usize,
    /// Command channel depth
    pub command_capacity: usize,
    /// All-clients broadcast channel depth
    pub broadcast_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            escalation_window: Duration::from_millis(DEFAULT_ESCALATION_WINDOW_MS),
            terminal_retention: 256,
            command_capacity: 128,
            broadcast_capacity: 64,
        }
    }
}

/// Engine error types
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("alert engine is not running")]
    Unavailable,
}

enum Command {
    Register(Device),
    Unregister(ConnectionId),
    CreateAlert {
        zone: String,
        severity: Severity,
        reply: oneshot::Sender<Alert>,
    },
    CreateScenario {
        epicenter_zone: String,
        magnitude: f64,
        reply: oneshot::Sender<Vec<Alert>>,
    },
    Ack {
        alert_id: AlertId,
        worker_id: String,
    },
    ListActive {
        reply: oneshot::Sender<Vec<Alert>>,
    },
    DeviceCounts {
        reply: oneshot::Sender<RoleCounts>,
    },
    Inspect {
        alert_id: AlertId,
        reply: oneshot::Sender<Option<Alert>>,
    },
}

/// Cloneable handle to the engine actor.
///
/// Commands are applied in send order; calls that return a value complete
/// once the engine has processed everything sent before them.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    bus: EventBus,
}

impl EngineHandle {
    async fn send(&self, command: Command) -> Result<(), EngineError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| EngineError::Unavailable)
    }

    async fn request<T>(
        &self,
        command: Command,
        reply: oneshot::Receiver<T>,
    ) -> Result<T, EngineError> {
        self.send(command).await?;
        reply.await.map_err(|_| EngineError::Unavailable)
    }

    /// Insert or overwrite a device entry
    pub async fn register(&self, device: Device) -> Result<(), EngineError> {
        self.send(Command::Register(device)).await
    }

    /// Remove a device entry; unknown ids are a no-op
    pub async fn unregister(&self, connection_id: ConnectionId) -> Result<(), EngineError> {
        self.send(Command::Unregister(connection_id)).await
    }

    /// Create an alert and arm its escalation timer
    pub async fn create_alert(
        &self,
        zone: impl Into<String>,
        severity: Severity,
    ) -> Result<Alert, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.request(
            Command::CreateAlert {
                zone: zone.into(),
                severity,
                reply: tx,
            },
            rx,
        )
        .await
    }

    /// Expand a scenario into alerts
    pub async fn create_scenario(
        &self,
        epicenter_zone: impl Into<String>,
        magnitude: f64,
    ) -> Result<Vec<Alert>, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.request(
            Command::CreateScenario {
                epicenter_zone: epicenter_zone.into(),
                magnitude,
                reply: tx,
            },
            rx,
        )
        .await
    }

    /// Acknowledge an alert on behalf of a worker
    pub async fn ack(
        &self,
        alert_id: AlertId,
        worker_id: impl Into<String>,
    ) -> Result<(), EngineError> {
        self.send(Command::Ack {
            alert_id,
            worker_id: worker_id.into(),
        })
        .await
    }

    /// Snapshot of all pending alerts, oldest first
    pub async fn list_active(&self) -> Result<Vec<Alert>, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.request(Command::ListActive { reply: tx }, rx).await
    }

    /// Connected-device counts per role
    pub async fn device_counts(&self) -> Result<RoleCounts, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.request(Command::DeviceCounts { reply: tx }, rx).await
    }

    /// Snapshot of one alert, live or recently terminal
    pub async fn inspect(&self, alert_id: AlertId) -> Result<Option<Alert>, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.request(Command::Inspect { alert_id, reply: tx }, rx)
            .await
    }

    /// Subscribe to the all-clients broadcast channel
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.bus.subscribe()
    }
}

/// The lifecycle actor.
///
/// Exclusively owns the alert table, the device registry, the scheduler
/// and the event bus. Every handler runs to completion without awaiting,
/// so no other operation ever observes a half-applied transition.
pub struct AlertEngine {
    registry: DeviceRegistry,
    scheduler: EscalationScheduler,
    bus: EventBus,
    alerts: HashMap<AlertId, Alert>,
    history: TerminalHistory,
    commands: mpsc::Receiver<Command>,
    fires: mpsc::UnboundedReceiver<AlertId>,
}

impl AlertEngine {
    /// Spawn the engine task and return its handle
    pub fn spawn(config: EngineConfig) -> (EngineHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
        let (scheduler, fire_rx) = EscalationScheduler::new(config.escalation_window);
        let bus = EventBus::new(config.broadcast_capacity);

        let engine = Self {
            registry: DeviceRegistry::new(),
            scheduler,
            bus: bus.clone(),
            alerts: HashMap::new(),
            history: TerminalHistory::new(config.terminal_retention),
            commands: command_rx,
            fires: fire_rx,
        };
        let task = tokio::spawn(engine.run());

        (
            EngineHandle {
                commands: command_tx,
                bus,
            },
            task,
        )
    }

    async fn run(mut self) {
        info!("Alert engine started");
        loop {
            tokio::select! {
                // Drain queued timer fires ahead of commands so a fire and
                // an acknowledgement racing at the deadline resolve in one
                // deterministic order. Whichever side loses no-ops on the
                // pending re-check either way.
                biased;
                Some(alert_id) = self.fires.recv() => self.handle_fire(alert_id),
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
        }
        info!("Alert engine stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Register(device) => {
                self.registry.register(device);
                self.publish_counts();
            }
            Command::Unregister(connection_id) => {
                if self.registry.unregister(&connection_id) {
                    self.publish_counts();
                }
            }
            Command::CreateAlert { zone, severity, reply } => {
                let alert = self.create_alert(zone, severity);
                let _ = reply.send(alert);
            }
            Command::CreateScenario {
                epicenter_zone,
                magnitude,
                reply,
            } => {
                let alerts = self.create_scenario(epicenter_zone, magnitude);
                let _ = reply.send(alerts);
            }
            Command::Ack { alert_id, worker_id } => self.acknowledge(alert_id, worker_id),
            Command::ListActive { reply } => {
                let mut active: Vec<Alert> = self.alerts.values().cloned().collect();
                active.sort_by_key(|a| a.created_at);
                let _ = reply.send(active);
            }
            Command::DeviceCounts { reply } => {
                let _ = reply.send(self.registry.counts_by_role());
            }
            Command::Inspect { alert_id, reply } => {
                let snapshot = self
                    .alerts
                    .get(&alert_id)
                    .or_else(|| self.history.get(&alert_id))
                    .cloned();
                let _ = reply.send(snapshot);
            }
        }
    }

    fn create_alert(&mut self, zone: String, severity: Severity) -> Alert {
        let alert = Alert::new(zone, severity);
        info!(
            "Alert {} created: zone={} severity={:?}",
            alert.alert_id, alert.zone, severity
        );

        for band in self.registry.zone_targets(DeviceRole::Band, &alert.zone) {
            band.push(ServerMessage::Alert {
                alert_id: alert.alert_id,
                zone: alert.zone.clone(),
                severity,
                timestamp: alert.created_at,
            });
        }

        self.scheduler.arm(alert.alert_id);
        self.bus.publish_log(
            self.registry.dashboards(),
            LogEvent::Created {
                alert_id: alert.alert_id,
                zone: alert.zone.clone(),
                severity,
                timestamp: alert.created_at,
            },
        );
        self.alerts.insert(alert.alert_id, alert.clone());
        alert
    }

    fn create_scenario(&mut self, epicenter_zone: String, magnitude: f64) -> Vec<Alert> {
        let severity = Severity::from_magnitude(magnitude);
        info!(
            "Scenario at {}: magnitude={} severity={:?}",
            epicenter_zone, magnitude, severity
        );

        // Blast radius is the epicenter zone itself, nothing propagates
        // to neighboring zones.
        let alerts = vec![self.create_alert(epicenter_zone.clone(), severity)];

        self.bus.publish_log(
            self.registry.dashboards(),
            LogEvent::Scenario {
                epicenter_zone,
                magnitude,
                severity,
                alert_ids: alerts.iter().map(|a| a.alert_id).collect(),
            },
        );
        alerts
    }

    fn acknowledge(&mut self, alert_id: AlertId, worker_id: String) {
        if let Some(mut alert) = self.alerts.remove(&alert_id) {
            // The live table only holds pending alerts, so this is the
            // first acknowledgement: it wins, everything later is audit.
            alert.acked_by.insert(worker_id.clone());
            alert.state = AlertState::Resolved;
            self.scheduler.disarm(&alert_id);
            info!("Alert {} resolved by {}", alert_id, worker_id);

            for siren in self.registry.zone_targets(DeviceRole::Siren, &alert.zone) {
                siren.push(ServerMessage::SirenCancel { alert_id });
            }
            self.bus.publish_log(
                self.registry.dashboards(),
                LogEvent::Ack {
                    alert_id,
                    worker_id,
                    resolved: true,
                },
            );
            self.history.push(alert);
        } else if let Some(alert) = self.history.get_mut(&alert_id) {
            // Known but terminal: keep the audit trail, no transition.
            alert.acked_by.insert(worker_id.clone());
            let resolved = alert.state == AlertState::Resolved;
            debug!("Late ack for terminal alert {} by {}", alert_id, worker_id);
            self.bus.publish_log(
                self.registry.dashboards(),
                LogEvent::Ack {
                    alert_id,
                    worker_id,
                    resolved,
                },
            );
        } else {
            debug!("Ack for unknown alert {} dropped", alert_id);
        }
    }

    fn handle_fire(&mut self, alert_id: AlertId) {
        // Drop the completed timer handle.
        self.scheduler.disarm(&alert_id);

        // Re-check: an acknowledgement may have won the race while this
        // fire sat in the queue.
        let Some(mut alert) = self.alerts.remove(&alert_id) else {
            debug!("Timer fire for non-pending alert {} ignored", alert_id);
            return;
        };

        alert.state = AlertState::Escalated;
        warn!(
            "Alert {} unacknowledged after window, escalating zone {}",
            alert_id, alert.zone
        );

        for siren in self.registry.zone_targets(DeviceRole::Siren, &alert.zone) {
            siren.push(ServerMessage::Siren {
                alert_id,
                zone: alert.zone.clone(),
                severity: alert.severity,
            });
        }
        self.bus.publish_log(
            self.registry.dashboards(),
            LogEvent::Escalated {
                alert_id,
                zone: alert.zone.clone(),
            },
        );
        self.history.push(alert);
    }

    fn publish_counts(&self) {
        self.bus
            .broadcast(ServerMessage::DeviceUpdate(self.registry.counts_by_role()));
    }
}
