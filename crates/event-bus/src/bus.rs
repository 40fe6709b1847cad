//! Bus Implementation

use device_registry::Device;
use protocol::{LogEvent, ServerMessage};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Fan-out of events to dashboard observers and the all-clients channel.
///
/// Two legs with disjoint traffic so no client sees the same event twice:
/// structured log records go straight to each dashboard's outbound
/// channel, while registry changes travel the process-wide broadcast
/// channel that every connection mirrors to its socket.
#[derive(Clone)]
pub struct EventBus {
    all_clients: broadcast::Sender<ServerMessage>,
}

impl EventBus {
    /// Create a bus whose broadcast leg holds at most `capacity` messages
    /// per lagging receiver before it starts skipping.
    pub fn new(capacity: usize) -> Self {
        let (all_clients, _) = broadcast::channel(capacity);
        Self { all_clients }
    }

    /// Subscribe to the all-clients channel
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.all_clients.subscribe()
    }

    /// Broadcast a message to every connected client.
    ///
    /// Having no subscribers is normal at startup.
    pub fn broadcast(&self, message: ServerMessage) {
        match self.all_clients.send(message) {
            Ok(receivers) => trace!("Broadcast reached {} receivers", receivers),
            Err(_) => debug!("Broadcast with no connected receivers"),
        }
    }

    /// Deliver a log event to every dashboard observer
    pub fn publish_log<'a>(
        &self,
        dashboards: impl Iterator<Item = &'a Device>,
        event: LogEvent,
    ) {
        for dashboard in dashboards {
            dashboard.push(ServerMessage::Log(event.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device_registry::DeviceRegistry;
    use protocol::{DeviceRole, RoleCounts};
    use std::collections::HashSet;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers() {
        let bus = EventBus::new(16);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.broadcast(ServerMessage::DeviceUpdate(RoleCounts {
            bands: 1,
            sirens: 0,
            dashboards: 0,
        }));

        for rx in [&mut first, &mut second] {
            match rx.recv().await.unwrap() {
                ServerMessage::DeviceUpdate(counts) => assert_eq!(counts.bands, 1),
                other => panic!("unexpected message: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers_is_fine() {
        let bus = EventBus::new(16);
        bus.broadcast(ServerMessage::SirenCancel { alert_id: Uuid::nil() });
    }

    #[tokio::test]
    async fn test_logs_reach_dashboards_only() {
        let bus = EventBus::new(16);
        let mut registry = DeviceRegistry::new();

        let (dash_tx, mut dash_rx) = mpsc::channel(8);
        let (band_tx, mut band_rx) = mpsc::channel(8);
        registry.register(Device::new(
            Uuid::new_v4(),
            Some(DeviceRole::Dashboard),
            HashSet::new(),
            None,
            dash_tx,
        ));
        registry.register(Device::new(
            Uuid::new_v4(),
            Some(DeviceRole::Band),
            HashSet::new(),
            None,
            band_tx,
        ));

        let event = LogEvent::Escalated {
            alert_id: Uuid::nil(),
            zone: "Unit-3".to_string(),
        };
        bus.publish_log(registry.dashboards(), event.clone());

        assert_eq!(dash_rx.try_recv().unwrap(), ServerMessage::Log(event));
        assert!(band_rx.try_recv().is_err());
    }
}
