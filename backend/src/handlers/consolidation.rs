//! Order consolidation HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::middleware::CurrentUser;
use crate::services::consolidation::{
    ConsolidationService, EditCrtInput, GenerateOrderInput, ProgrammedVolumeInput,
};
use crate::AppState;

fn service(state: &AppState) -> ConsolidationService {
    ConsolidationService::new(state.db.clone(), state.events.clone())
}

/// Per-CRT volumes awaiting an order
pub async fn list_summaries(State(state): State<AppState>) -> impl IntoResponse {
    match service(&state).list_summaries().await {
        Ok(summaries) => (StatusCode::OK, Json(serde_json::json!({ "crts": summaries }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn set_programmed_volume(
    State(state): State<AppState>,
    Path(crt): Path<String>,
    Json(input): Json<ProgrammedVolumeInput>,
) -> impl IntoResponse {
    match service(&state).set_programmed_volume(&crt, input).await {
        Ok(volume) => (StatusCode::OK, Json(volume)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn generate_order(
    State(state): State<AppState>,
    Path(crt): Path<String>,
    Json(input): Json<GenerateOrderInput>,
) -> impl IntoResponse {
    match service(&state).generate_order(&crt, input).await {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Audited edit of a CRT's rolls and number
pub async fn edit_crt(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(crt): Path<String>,
    Json(input): Json<EditCrtInput>,
) -> impl IntoResponse {
    match service(&state)
        .edit_crt(&crt, input, &current_user.0.audit_name())
        .await
    {
        Ok(entries) => (StatusCode::OK, Json(serde_json::json!({ "changes": entries }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_history(State(state): State<AppState>, Path(crt): Path<String>) -> impl IntoResponse {
    match service(&state).history(&crt).await {
        Ok(entries) => (StatusCode::OK, Json(serde_json::json!({ "history": entries }))).into_response(),
        Err(e) => e.into_response(),
    }
}
