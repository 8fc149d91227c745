//! Manifest (romaneio) HTTP handlers

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::WaybillFields;
use crate::services::manifest::{CreateManifestInput, ManifestService};
use crate::AppState;

fn service(state: &AppState) -> ManifestService {
    ManifestService::new(state.db.clone(), state.events.clone())
}

fn html(body: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], body)
}

/// Trucks (destinations) of the CRT's order
pub async fn list_trucks(State(state): State<AppState>, Path(crt): Path<String>) -> impl IntoResponse {
    match service(&state).trucks(&crt).await {
        Ok(trucks) => (StatusCode::OK, Json(serde_json::json!({ "trucks": trucks }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn available_rolls(State(state): State<AppState>, Path(crt): Path<String>) -> impl IntoResponse {
    match service(&state).available_rolls(&crt).await {
        Ok(rolls) => (StatusCode::OK, Json(serde_json::json!({ "rolls": rolls }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_manifest(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateManifestInput>,
) -> impl IntoResponse {
    match service(&state).create(input, &current_user.0.audit_name()).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_manifest(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match service(&state).get(id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Printable manifest
pub async fn manifest_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let body = service(&state).render_manifest(id).await?;
    Ok(html(body))
}

/// Printable waybill; the posted fields override the defaults
pub async fn waybill_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(fields): Json<WaybillFields>,
) -> AppResult<impl IntoResponse> {
    let body = service(&state).render_waybill(id, &fields).await?;
    Ok(html(body))
}
