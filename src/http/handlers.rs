//! Request handlers.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::config::schema::WorkloadConfig;
use crate::http::server::AppState;
use crate::workload::Outcome;

/// Active configuration as reported by `GET /config`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigStatus {
    pub generation: u64,
    pub configured: bool,
    pub config: Option<WorkloadConfig>,
    pub memory_buffer_bytes: usize,
}

/// Synthetic workload. Answers every method and every unmatched path.
pub async fn workload(State(state): State<AppState>) -> Response {
    match state.generator.handle().await {
        Outcome::Success(body) => (StatusCode::OK, Json(body)).into_response(),
        Outcome::SimulatedFailure { .. } | Outcome::BurnFailed { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Outcome::Unconfigured => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub async fn config(State(state): State<AppState>) -> Json<ConfigStatus> {
    let snapshot = state.generator.store().snapshot();
    Json(ConfigStatus {
        generation: snapshot.generation(),
        configured: snapshot.config().is_some(),
        config: snapshot.config().cloned(),
        memory_buffer_bytes: snapshot.buffer_len(),
    })
}
