//! Registry Implementation

use protocol::{DeviceRole, RoleCounts, ServerMessage};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Unique identifier of one live connection
pub type ConnectionId = Uuid;

/// A registered live connection.
///
/// `role` is `None` for connections that registered with an unknown role
/// string: they occupy a connection slot but belong to no role bucket and
/// never receive targeted traffic.
#[derive(Debug)]
pub struct Device {
    pub connection_id: ConnectionId,
    pub role: Option<DeviceRole>,
    pub zones: HashSet<String>,
    pub worker_id: Option<String>,
    sender: mpsc::Sender<ServerMessage>,
}

impl Device {
    /// Create a device entry around its outbound channel
    pub fn new(
        connection_id: ConnectionId,
        role: Option<DeviceRole>,
        zones: HashSet<String>,
        worker_id: Option<String>,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            connection_id,
            role,
            zones,
            worker_id,
            sender,
        }
    }

    /// Whether the device subscribes to the given zone
    pub fn covers_zone(&self, zone: &str) -> bool {
        self.zones.contains(zone)
    }

    /// Push a message to the device without blocking.
    ///
    /// A saturated or closed outbound channel drops this one delivery;
    /// delivery is at-most-once per device per event.
    pub fn push(&self, message: ServerMessage) -> bool {
        match self.sender.try_send(message) {
            Ok(()) => true,
            Err(e) => {
                debug!(
                    "Dropped delivery to device {}: {}",
                    self.connection_id, e
                );
                false
            }
        }
    }
}

/// Registry of currently-connected devices
pub struct DeviceRegistry {
    devices: HashMap<ConnectionId, Device>,
}

impl DeviceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            devices: HashMap::new(),
        }
    }

    /// Insert or overwrite the entry for a connection.
    ///
    /// Re-registering an existing connection replaces its role, zones and
    /// worker id wholesale.
    pub fn register(&mut self, device: Device) {
        match device.role {
            Some(role) => info!(
                "Device registered: {} role={} zones={:?}",
                device.connection_id, role, device.zones
            ),
            None => warn!(
                "Device {} registered with unknown role, treating as inert",
                device.connection_id
            ),
        }
        self.devices.insert(device.connection_id, device);
    }

    /// Remove a connection. Unregistering an unknown id is a no-op.
    pub fn unregister(&mut self, connection_id: &ConnectionId) -> bool {
        let removed = self.devices.remove(connection_id).is_some();
        if removed {
            info!("Device unregistered: {}", connection_id);
        }
        removed
    }

    /// Whether a connection has a registered entry
    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.devices.contains_key(connection_id)
    }

    /// All devices registered in the given role bucket
    pub fn devices_by_role(&self, role: DeviceRole) -> impl Iterator<Item = &Device> {
        self.devices
            .values()
            .filter(move |d| d.role == Some(role))
    }

    /// Devices of a role subscribed to the given zone
    pub fn zone_targets<'a>(
        &'a self,
        role: DeviceRole,
        zone: &'a str,
    ) -> impl Iterator<Item = &'a Device> {
        self.devices_by_role(role).filter(move |d| d.covers_zone(zone))
    }

    /// Dashboard observers. Exempt from zone filtering.
    pub fn dashboards(&self) -> impl Iterator<Item = &Device> {
        self.devices_by_role(DeviceRole::Dashboard)
    }

    /// Connected-device counts per role. Inert devices count in none.
    pub fn counts_by_role(&self) -> RoleCounts {
        let mut counts = RoleCounts::default();
        for device in self.devices.values() {
            match device.role {
                Some(DeviceRole::Band) => counts.bands += 1,
                Some(DeviceRole::Siren) => counts.sirens += 1,
                Some(DeviceRole::Dashboard) => counts.dashboards += 1,
                None => {}
            }
        }
        counts
    }

    /// Total connection slots in use, inert devices included
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether no device is connected
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
