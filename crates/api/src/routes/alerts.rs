//! Alert Routes
//!
//! Thin synchronous wrappers over the engine operations. Validation is
//! strict here — these requests come from operator tooling, not from
//! field devices.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use protocol::{AlertId, Severity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;

/// Request body for alert creation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertRequest {
    pub zone: String,
    #[serde(default)]
    pub severity: Option<Severity>,
}

/// Request body for scenario creation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScenarioRequest {
    pub epicenter_zone: String,
    pub magnitude: f64,
}

/// Error body for client and service errors
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn client_error(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn engine_unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: "alert engine is not running".to_string(),
        }),
    )
        .into_response()
}

/// Create an alert
pub async fn create_alert(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateAlertRequest>,
) -> Response {
    if request.zone.trim().is_empty() {
        return client_error("zone must not be empty");
    }

    match state
        .engine
        .create_alert(request.zone, request.severity.unwrap_or_default())
        .await
    {
        Ok(alert) => (StatusCode::CREATED, Json(alert)).into_response(),
        Err(_) => engine_unavailable(),
    }
}

/// Create a scenario
pub async fn create_scenario(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateScenarioRequest>,
) -> Response {
    if request.epicenter_zone.trim().is_empty() {
        return client_error("epicenterZone must not be empty");
    }
    if !request.magnitude.is_finite() {
        return client_error("magnitude must be a finite number");
    }

    match state
        .engine
        .create_scenario(request.epicenter_zone, request.magnitude)
        .await
    {
        Ok(alerts) => (StatusCode::CREATED, Json(alerts)).into_response(),
        Err(_) => engine_unavailable(),
    }
}

/// List pending alerts, oldest first
pub async fn list_active(State(state): State<Arc<AppState>>) -> Response {
    match state.engine.list_active().await {
        Ok(alerts) => Json(alerts).into_response(),
        Err(_) => engine_unavailable(),
    }
}

/// Get one alert, live or recently terminal
pub async fn get_alert(
    State(state): State<Arc<AppState>>,
    Path(alert_id): Path<AlertId>,
) -> Response {
    match state.engine.inspect(alert_id).await {
        Ok(Some(alert)) => Json(alert).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "unknown alert".to_string(),
            }),
        )
            .into_response(),
        Err(_) => engine_unavailable(),
    }
}
