//! Departure HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::services::departure::DepartureService;
use crate::AppState;

pub async fn list_pending(State(state): State<AppState>) -> impl IntoResponse {
    let service = DepartureService::new(state.db.clone());

    match service.pending().await {
        Ok(manifests) => (StatusCode::OK, Json(serde_json::json!({ "manifests": manifests }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn record_departure(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    let service = DepartureService::new(state.db.clone());

    match service.record(id).await {
        Ok(manifest) => (StatusCode::OK, Json(manifest)).into_response(),
        Err(e) => e.into_response(),
    }
}
