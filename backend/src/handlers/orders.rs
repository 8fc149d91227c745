//! Customs/delivery status HTTP handlers and the order change stream

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use crate::services::orders::{AdvanceStatusInput, CancelOrderInput, OrderService};
use crate::AppState;

fn service(state: &AppState) -> OrderService {
    OrderService::new(state.db.clone(), state.events.clone())
}

pub async fn list_orders(State(state): State<AppState>) -> impl IntoResponse {
    match service(&state).list_orders().await {
        Ok(orders) => (StatusCode::OK, Json(serde_json::json!({ "orders": orders }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_order(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match service(&state).get_order(id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn advance_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<AdvanceStatusInput>,
) -> impl IntoResponse {
    match service(&state).advance_status(id, input.status).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn mark_dip_processed(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match service(&state).mark_dip_processed(id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CancelOrderInput>,
) -> impl IntoResponse {
    match service(&state).cancel(id, &input.justification).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Server-sent events for every committed order change
pub async fn order_events(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.events.subscribe()).filter_map(|message| match message {
        Ok(change) => match Event::default().event(change.kind.as_str()).json_data(&change) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode order change");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::debug!(skipped, "order event subscriber lagged");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
