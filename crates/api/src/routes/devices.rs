//! Device Routes

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::AppState;

/// Get connected-device counts per role
pub async fn get_counts(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.engine.device_counts().await {
        Ok(counts) => Json(counts).into_response(),
        Err(_) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_state;

    #[tokio::test]
    async fn test_counts_start_empty() {
        let state = test_state();
        let response = get_counts(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
