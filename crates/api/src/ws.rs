//! Device WebSocket Channel
//!
//! One socket per device. Inbound frames are JSON `ClientMessage`s;
//! outbound traffic merges the device's targeted channel with the
//! all-clients broadcast. Malformed frames are logged and dropped — a
//! live hazard channel never wedges on bad input.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use device_registry::Device;
use futures::{SinkExt, StreamExt};
use protocol::{ClientMessage, DeviceRole, ServerMessage};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::AppState;

/// Upgrade handler for `GET /ws`
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: Arc<AppState>, socket: WebSocket) {
    let connection_id = Uuid::new_v4();
    let (outbound_tx, mut outbound_rx) =
        mpsc::channel::<ServerMessage>(state.config.device_channel_capacity);
    let mut all_clients = state.engine.subscribe();
    let (mut sink, mut stream) = socket.split();

    info!("Connection {} opened", connection_id);

    let writer = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                Some(message) = outbound_rx.recv() => message,
                result = all_clients.recv() => match result {
                    Ok(message) => message,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Connection fell behind, skipped {} broadcasts", skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };
            match serde_json::to_string(&message) {
                Ok(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Failed to encode outbound message: {}", e),
            }
        }
    });

    while let Some(Ok(frame)) = stream.next().await {
        let Message::Text(text) = frame else { continue };
        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(message) => dispatch(&state, connection_id, &outbound_tx, message).await,
            Err(e) => debug!("Dropping malformed frame from {}: {}", connection_id, e),
        }
    }

    info!("Connection {} closed", connection_id);
    if state.engine.unregister(connection_id).await.is_err() {
        warn!("Engine unavailable while unregistering {}", connection_id);
    }
    writer.abort();
}

async fn dispatch(
    state: &Arc<AppState>,
    connection_id: Uuid,
    outbound: &mpsc::Sender<ServerMessage>,
    message: ClientMessage,
) {
    let result = match message {
        ClientMessage::Register {
            role,
            zones,
            worker_id,
        } => {
            // An unknown role is accepted as an inert entry, not an error.
            let role = role.parse::<DeviceRole>().ok();
            let device = Device::new(
                connection_id,
                role,
                zones.into_iter().collect(),
                worker_id,
                outbound.clone(),
            );
            state.engine.register(device).await
        }
        ClientMessage::CreateAlert { zone, severity } => {
            if zone.trim().is_empty() {
                debug!("Dropping createAlert with empty zone from {}", connection_id);
                return;
            }
            state
                .engine
                .create_alert(zone, severity.unwrap_or_default())
                .await
                .map(|_| ())
        }
        ClientMessage::CreateScenario {
            epicenter_zone,
            magnitude,
        } => {
            if epicenter_zone.trim().is_empty() {
                debug!(
                    "Dropping createScenario with empty epicenter from {}",
                    connection_id
                );
                return;
            }
            state
                .engine
                .create_scenario(epicenter_zone, magnitude)
                .await
                .map(|_| ())
        }
        ClientMessage::Ack {
            alert_id,
            worker_id,
        } => state.engine.ack(alert_id, worker_id).await,
    };

    if result.is_err() {
        warn!("Engine unavailable for message from {}", connection_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_state;
    use protocol::RoleCounts;

    #[tokio::test]
    async fn test_register_dispatch_fills_bucket() {
        let state = test_state();
        let (tx, mut rx) = mpsc::channel(8);

        dispatch(
            &state,
            Uuid::new_v4(),
            &tx,
            ClientMessage::Register {
                role: "band".to_string(),
                zones: vec!["Unit-3".to_string()],
                worker_id: Some("W1".to_string()),
            },
        )
        .await;

        let counts = state.engine.device_counts().await.unwrap();
        assert_eq!(counts.bands, 1);

        dispatch(
            &state,
            Uuid::new_v4(),
            &tx,
            ClientMessage::CreateAlert {
                zone: "Unit-3".to_string(),
                severity: None,
            },
        )
        .await;

        match rx.recv().await.unwrap() {
            ServerMessage::Alert { zone, .. } => assert_eq!(zone, "Unit-3"),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_role_joins_no_bucket() {
        let state = test_state();
        let (tx, _rx) = mpsc::channel(8);

        dispatch(
            &state,
            Uuid::new_v4(),
            &tx,
            ClientMessage::Register {
                role: "drone".to_string(),
                zones: vec!["Unit-3".to_string()],
                worker_id: None,
            },
        )
        .await;

        let counts = state.engine.device_counts().await.unwrap();
        assert_eq!(counts, RoleCounts::default());
    }

    #[tokio::test]
    async fn test_empty_zone_is_dropped() {
        let state = test_state();
        let (tx, _rx) = mpsc::channel(8);

        dispatch(
            &state,
            Uuid::new_v4(),
            &tx,
            ClientMessage::CreateAlert {
                zone: "  ".to_string(),
                severity: None,
            },
        )
        .await;

        assert!(state.engine.list_active().await.unwrap().is_empty());
    }
}
