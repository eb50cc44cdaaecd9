//! HTTP request handlers.

use super::AppState;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;

// ============================================================================
// Snapshot
// ============================================================================

pub async fn handle_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scheduler.snapshot().await)
}

pub async fn handle_get_targets(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scheduler.registry().all().to_vec())
}

// ============================================================================
// Control
// ============================================================================

pub async fn handle_start(State(state): State<AppState>) -> impl IntoResponse {
    state.scheduler.start().await;
    Json(state.scheduler.snapshot().await)
}

pub async fn handle_stop(State(state): State<AppState>) -> impl IntoResponse {
    state.scheduler.stop().await;
    Json(state.scheduler.snapshot().await)
}

pub async fn handle_reset(State(state): State<AppState>) -> impl IntoResponse {
    state.scheduler.reset().await;
    Json(state.scheduler.snapshot().await)
}

pub async fn handle_select_target(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.scheduler.select_target(&id).await {
        Ok(_) => Json(state.scheduler.snapshot().await).into_response(),
        Err(e) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
    }
}

// ============================================================================
// Summary
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub text: String,
}

pub async fn handle_summary(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.scheduler.snapshot().await;
    let text = state
        .analyzer
        .summarize(&snapshot.stats, &snapshot.target.name)
        .await;
    Json(SummaryResponse { text })
}
