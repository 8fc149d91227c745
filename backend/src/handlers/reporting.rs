//! Reporting handlers

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use shared::analytics::{OtifReport, ProductLine, StatusTotal};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::reporting::{OtifQuery, ReportingService};
use crate::AppState;

fn service(state: &AppState) -> ReportingService {
    ReportingService::new(state.db.clone(), state.config.reporting.clone())
}

/// Count and weight per roll status
pub async fn get_status_summary(State(state): State<AppState>) -> AppResult<Json<Vec<StatusTotal>>> {
    let totals = service(&state).status_summary().await?;
    Ok(Json(totals))
}

/// Planned vs stored vs in-transit per order
pub async fn get_detailed_products(State(state): State<AppState>) -> AppResult<Json<Vec<ProductLine>>> {
    let lines = service(&state).detailed_products().await?;
    Ok(Json(lines))
}

/// On-time delivery report; `?start_point=dip_processed&target_days=7`
pub async fn get_otif(
    State(state): State<AppState>,
    Query(query): Query<OtifQuery>,
) -> AppResult<Json<OtifReport>> {
    let report = service(&state).otif(&query).await?;
    Ok(Json(report))
}

/// Plain-text order summary
pub async fn get_order_summary(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let text = service(&state).order_summary_text(order_id).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}
