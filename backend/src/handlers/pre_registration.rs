//! Pre-registration HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::middleware::{require_permission, CurrentUser};
use crate::services::pre_registration::{
    DeletePreRegistrationInput, ExclusionQuery, PreRegistrationInput, PreRegistrationService,
};
use crate::AppState;

pub async fn list_pre_registrations(State(state): State<AppState>) -> impl IntoResponse {
    let service = PreRegistrationService::new(state.db.clone(), state.events.clone());

    match service.list().await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "pre_registrations": items }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_pre_registration(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    let service = PreRegistrationService::new(state.db.clone(), state.events.clone());

    match service.get(id).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_pre_registration(
    State(state): State<AppState>,
    Json(input): Json<PreRegistrationInput>,
) -> impl IntoResponse {
    let service = PreRegistrationService::new(state.db.clone(), state.events.clone());

    match service.create(input).await {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_pre_registration(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<PreRegistrationInput>,
) -> impl IntoResponse {
    let service = PreRegistrationService::new(state.db.clone(), state.events.clone());

    match service.update(id, input).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Delete with justification, cascading to the CRT's rolls, invoices and
/// order; needs the `crt:delete` permission
pub async fn delete_pre_registration(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<DeletePreRegistrationInput>,
) -> impl IntoResponse {
    if let Err(e) = require_permission(&current_user.0, "crt", "delete") {
        return e.into_response();
    }
    let service = PreRegistrationService::new(state.db.clone(), state.events.clone());

    match service
        .delete(id, &input.justification, &current_user.0.audit_name())
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Exclusion log of cascade deletes
pub async fn list_exclusions(
    State(state): State<AppState>,
    Query(query): Query<ExclusionQuery>,
) -> impl IntoResponse {
    let service = PreRegistrationService::new(state.db.clone(), state.events.clone());

    match service.exclusions(query.crt.as_deref()).await {
        Ok(entries) => (StatusCode::OK, Json(serde_json::json!({ "exclusions": entries }))).into_response(),
        Err(e) => e.into_response(),
    }
}
