//! Hazard Core API Server
//!
//! Serves the persistent device WebSocket channel and the administrative
//! HTTP surface over one listener. The engine actor is spawned here and
//! shared through [`AppState`].

use alert_engine::{AlertEngine, EngineConfig, EngineHandle};
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use protocol::RoleCounts;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::GovernorLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod config;
mod rate_limit;
mod routes;
mod ws;

pub use config::AppConfig;

/// Application state shared across handlers
pub struct AppState {
    /// Handle to the engine actor
    pub engine: EngineHandle,
    /// Runtime configuration
    pub config: AppConfig,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub devices: RoleCounts,
    pub active_alerts: usize,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let governor_config = rate_limit::create_governor_config(&rate_limit::RateLimitConfig {
        per_second: state.config.rate_limit_per_second,
        burst_size: state.config.rate_limit_burst,
    });

    let admin = Router::new()
        .route("/api/v1/alerts", post(routes::alerts::create_alert))
        .route("/api/v1/scenarios", post(routes::alerts::create_scenario))
        .layer(GovernorLayer {
            config: governor_config,
        })
        .route("/api/v1/alerts/active", get(routes::alerts::list_active))
        .route("/api/v1/alerts/:id", get(routes::alerts::get_alert))
        .route("/api/v1/devices/counts", get(routes::devices::get_counts))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_token,
        ));

    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/ws", get(ws::ws_handler))
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Admin boundary stub: authorization proper lives outside this core, the
/// router only honors a statically configured bearer token.
async fn require_admin_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let expected = state.config.admin_token.as_str();
    if expected.is_empty() {
        return next.run(request).await;
    }

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token == expected)
        .unwrap_or(false);

    if authorized {
        next.run(request).await
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let devices = state.engine.device_counts().await.unwrap_or_default();
    let active_alerts = state
        .engine
        .list_active()
        .await
        .map(|alerts| alerts.len())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        devices,
        active_alerts,
    })
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Spawn the engine and run the server
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (engine, _engine_task) = AlertEngine::spawn(EngineConfig {
        escalation_window: Duration::from_millis(config.escalation_timeout_ms),
        terminal_retention: config.terminal_retention,
        command_capacity: config.command_capacity,
        broadcast_capacity: config.broadcast_capacity,
    });

    let state = Arc::new(AppState {
        engine,
        version: env!("CARGO_PKG_VERSION").to_string(),
        start_time: std::time::Instant::now(),
        config,
    });
    let app = create_router(state.clone());

    info!("Starting hazard core on {}", state.config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) fn test_state() -> Arc<AppState> {
    let (engine, _task) = AlertEngine::spawn(EngineConfig::default());
    Arc::new(AppState {
        engine,
        config: AppConfig::default(),
        version: "test".to_string(),
        start_time: std::time::Instant::now(),
    })
}
