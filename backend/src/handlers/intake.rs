//! Intake HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::services::intake::{IntakeService, RegisterIntakeRequest};
use crate::AppState;

/// Whether a CRT is already used by registered rolls
pub async fn check_crt(State(state): State<AppState>, Path(crt): Path<String>) -> impl IntoResponse {
    let service = IntakeService::new(state.db.clone());

    match service.check_crt(&crt).await {
        Ok(availability) => (StatusCode::OK, Json(availability)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Pre-registration data for the intake form, if announced
pub async fn prefill(State(state): State<AppState>, Path(crt): Path<String>) -> impl IntoResponse {
    let service = IntakeService::new(state.db.clone());

    match service.prefill(&crt).await {
        Ok(pre) => (StatusCode::OK, Json(serde_json::json!({ "pre_registration": pre }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Register a CRT's invoices and rolls
pub async fn register_intake(
    State(state): State<AppState>,
    Json(request): Json<RegisterIntakeRequest>,
) -> impl IntoResponse {
    let service = IntakeService::new(state.db.clone());

    match service.register(request).await {
        Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Err(e) => e.into_response(),
    }
}
