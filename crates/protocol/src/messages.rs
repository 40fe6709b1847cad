//! Socket message envelopes
//!
//! Every frame on the device channel is a JSON object tagged by `event`
//! with its payload under `data`. Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AlertId, Severity};

/// Messages a device sends to the core.
///
/// `register.role` stays a raw string: an unknown role must survive
/// deserialization so the registry can accept the connection as inert
/// instead of dropping the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Register {
        role: String,
        #[serde(default)]
        zones: Vec<String>,
        #[serde(default)]
        worker_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    CreateAlert {
        zone: String,
        #[serde(default)]
        severity: Option<Severity>,
    },
    #[serde(rename_all = "camelCase")]
    CreateScenario { epicenter_zone: String, magnitude: f64 },
    #[serde(rename_all = "camelCase")]
    Ack { alert_id: AlertId, worker_id: String },
}

/// Messages the core pushes to devices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Hazard notification, sent to zone-matching bands
    #[serde(rename_all = "camelCase")]
    Alert {
        alert_id: AlertId,
        zone: String,
        severity: Severity,
        timestamp: DateTime<Utc>,
    },
    /// Activation order, sent to zone-matching sirens on escalation
    #[serde(rename_all = "camelCase")]
    Siren {
        alert_id: AlertId,
        zone: String,
        severity: Severity,
    },
    /// Stand-down, sent to zone-matching sirens on first acknowledgement
    #[serde(rename_all = "camelCase")]
    SirenCancel { alert_id: AlertId },
    /// Registry change, broadcast to every connected client
    DeviceUpdate(RoleCounts),
    /// Lifecycle audit record, delivered to dashboards
    Log(LogEvent),
}

/// Connected-device counts per role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCounts {
    pub bands: usize,
    pub sirens: usize,
    pub dashboards: usize,
}

/// Structured lifecycle log records for dashboard observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LogEvent {
    #[serde(rename_all = "camelCase")]
    Created {
        alert_id: AlertId,
        zone: String,
        severity: Severity,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Scenario {
        epicenter_zone: String,
        magnitude: f64,
        severity: Severity,
        alert_ids: Vec<AlertId>,
    },
    #[serde(rename_all = "camelCase")]
    Ack {
        alert_id: AlertId,
        worker_id: String,
        resolved: bool,
    },
    #[serde(rename_all = "camelCase")]
    Escalated { alert_id: AlertId, zone: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_register_accepts_unknown_role() {
        let raw = r#"{"event":"register","data":{"role":"drone","zones":["Unit-3"]}}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        match msg {
            ClientMessage::Register { role, zones, worker_id } => {
                assert_eq!(role, "drone");
                assert_eq!(zones, vec!["Unit-3"]);
                assert!(worker_id.is_none());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_ack_wire_shape() {
        let alert_id = Uuid::new_v4();
        let raw = format!(
            r#"{{"event":"ack","data":{{"alertId":"{}","workerId":"W1"}}}}"#,
            alert_id
        );
        let msg: ClientMessage = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Ack {
                alert_id,
                worker_id: "W1".to_string(),
            }
        );
    }

    #[test]
    fn test_severity_serializes_as_integer() {
        let raw = r#"{"event":"createAlert","data":{"zone":"Unit-3","severity":2}}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(
            msg,
            ClientMessage::CreateAlert {
                zone: "Unit-3".to_string(),
                severity: Some(Severity::Medium),
            }
        );

        let out = serde_json::to_value(ServerMessage::Siren {
            alert_id: Uuid::nil(),
            zone: "Unit-3".to_string(),
            severity: Severity::High,
        })
        .unwrap();
        assert_eq!(out["event"], "siren");
        assert_eq!(out["data"]["severity"], 3);
    }

    #[test]
    fn test_out_of_range_severity_rejected() {
        let raw = r#"{"event":"createAlert","data":{"zone":"Unit-3","severity":9}}"#;
        assert!(serde_json::from_str::<ClientMessage>(raw).is_err());
    }

    #[test]
    fn test_log_event_tagging() {
        let out = serde_json::to_value(ServerMessage::Log(LogEvent::Escalated {
            alert_id: Uuid::nil(),
            zone: "North-Pit".to_string(),
        }))
        .unwrap();
        assert_eq!(out["event"], "log");
        assert_eq!(out["data"]["type"], "escalated");
        assert_eq!(out["data"]["zone"], "North-Pit");
    }
}
