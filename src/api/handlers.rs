//! HTTP API handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tokio::sync::watch;
use tracing::warn;

use crate::simulator::{FeedState, ParamsUpdate, SharedSimulator, SimulationReport};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// The simulator; parameter updates take the write lock.
    pub simulator: SharedSimulator,
    /// Latest report published by the reporter task.
    pub reports: watch::Receiver<SimulationReport>,
    /// Prometheus handle, absent when no recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state.
    pub fn new(simulator: SharedSimulator, reports: watch::Receiver<SimulationReport>) -> Self {
        Self {
            simulator,
            reports,
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether snapshots are flowing.
    pub ready: bool,
    /// Simulator lifecycle state.
    pub state: FeedState,
}

/// Error body for rejected requests.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable reason.
    pub error: String,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 while streaming, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let feed_state = state.simulator.read().await.state();
    let is_ready = feed_state == FeedState::Streaming;

    let response = ReadyResponse {
        ready: is_ready,
        state: feed_state,
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Latest published report.
pub async fn report(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.reports.borrow().clone();
    Json(report)
}

/// Current order parameters.
pub async fn get_params(State(state): State<AppState>) -> impl IntoResponse {
    let params = state.simulator.read().await.params().clone();
    Json(params)
}

/// Partially update the order parameters. Invalid values leave them unchanged.
pub async fn put_params(
    State(state): State<AppState>,
    Json(update): Json<ParamsUpdate>,
) -> Response {
    let mut simulator = state.simulator.write().await;
    match simulator.update_params(&update) {
        Ok(params) => (StatusCode::OK, Json(params.clone())).into_response(),
        Err(e) => {
            warn!(error = %e, "Rejected parameter update");
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
