//! Freight table HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::services::freight::{FreightService, QuoteQuery, UpsertRateInput};
use crate::AppState;

pub async fn list_vehicles(State(state): State<AppState>) -> impl IntoResponse {
    let service = FreightService::new(state.db.clone());

    match service.list_vehicles().await {
        Ok(vehicles) => (StatusCode::OK, Json(serde_json::json!({ "vehicles": vehicles }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_rates(State(state): State<AppState>) -> impl IntoResponse {
    let service = FreightService::new(state.db.clone());

    match service.list_rates().await {
        Ok(rates) => (StatusCode::OK, Json(serde_json::json!({ "rates": rates }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_complements(State(state): State<AppState>) -> impl IntoResponse {
    let service = FreightService::new(state.db.clone());

    match service.list_complements().await {
        Ok(charges) => (StatusCode::OK, Json(serde_json::json!({ "complements": charges }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn upsert_rate(State(state): State<AppState>, Json(input): Json<UpsertRateInput>) -> impl IntoResponse {
    let service = FreightService::new(state.db.clone());

    match service.upsert_rate(input).await {
        Ok(rate) => (StatusCode::OK, Json(rate)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Freight quote for a manifest on `?vehicle_id=`
pub async fn quote_manifest(
    State(state): State<AppState>,
    Path(manifest_id): Path<Uuid>,
    Query(query): Query<QuoteQuery>,
) -> impl IntoResponse {
    let service = FreightService::new(state.db.clone());

    match service.quote(manifest_id, query.vehicle_id).await {
        Ok(quote) => (StatusCode::OK, Json(quote)).into_response(),
        Err(e) => e.into_response(),
    }
}
