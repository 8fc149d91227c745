//! Stock view HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::error::AppResult;
use crate::services::consolidation::ConsolidationService;
use crate::services::stock::{SetInvoiceInput, StockQuery, StockService};
use crate::AppState;

/// In-stock rolls, optionally filtered with `?search=`
pub async fn list_stock(State(state): State<AppState>, Query(query): Query<StockQuery>) -> impl IntoResponse {
    let service = StockService::new(state.db.clone());

    match service.list_in_stock(&query).await {
        Ok(rolls) => (StatusCode::OK, Json(serde_json::json!({ "rolls": rolls }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// CSV download of the filtered stock view
pub async fn export_stock_csv(
    State(state): State<AppState>,
    Query(query): Query<StockQuery>,
) -> AppResult<impl IntoResponse> {
    let service = StockService::new(state.db.clone());
    let csv = service.export_csv(&query).await?;
    let filename = format!("estoque_{}.csv", chrono::Utc::now().format("%Y%m%d"));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        csv,
    ))
}

pub async fn set_invoice_number(
    State(state): State<AppState>,
    Path(crt): Path<String>,
    Json(input): Json<SetInvoiceInput>,
) -> impl IntoResponse {
    let service = StockService::new(state.db.clone());

    match service.set_invoice_number(&crt, &input.invoice_number).await {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Arrival of in-transit rolls
pub async fn receive_crt(State(state): State<AppState>, Path(crt): Path<String>) -> impl IntoResponse {
    let service = StockService::new(state.db.clone());

    match service.receive(&crt).await {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Same operation as the consolidation screen's "load complete"
pub async fn mark_load_complete(State(state): State<AppState>, Path(crt): Path<String>) -> impl IntoResponse {
    let service = ConsolidationService::new(state.db.clone(), state.events.clone());

    match service.mark_load_complete(&crt).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => e.into_response(),
    }
}
