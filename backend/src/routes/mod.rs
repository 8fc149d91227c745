//! Route definitions for the Bobina Tracker

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - intake registration
        .nest("/intake", intake_routes())
        // Protected routes - CRT templates
        .nest("/pre-registrations", pre_registration_routes())
        .nest("/exclusions", exclusion_routes())
        // Protected routes - stock view
        .nest("/stock", stock_routes())
        // Protected routes - consolidation per CRT
        .nest("/crts", crt_routes())
        // Protected routes - customs/delivery tracking
        .nest("/orders", order_routes())
        // Protected routes - manifests and departures
        .nest("/manifests", manifest_routes())
        .nest("/departures", departure_routes())
        // Protected routes - reports
        .nest("/reports", reporting_routes())
        // Protected routes - freight tables
        .nest("/freight", freight_routes())
}

/// Intake routes (protected)
fn intake_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::register_intake))
        .route("/check/:crt", get(handlers::check_crt))
        .route("/prefill/:crt", get(handlers::prefill))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Pre-registration routes (protected)
fn pre_registration_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_pre_registrations).post(handlers::create_pre_registration),
        )
        .route(
            "/:id",
            get(handlers::get_pre_registration)
                .put(handlers::update_pre_registration)
                .delete(handlers::delete_pre_registration),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Exclusion log routes (protected)
fn exclusion_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_exclusions))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Stock routes (protected)
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock))
        .route("/export", get(handlers::export_stock_csv))
        .route("/:crt/invoice", put(handlers::set_invoice_number))
        .route("/:crt/receive", post(handlers::receive_crt))
        .route("/:crt/load-complete", post(handlers::mark_load_complete))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Consolidation routes (protected)
fn crt_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_summaries))
        .route("/:crt", put(handlers::edit_crt))
        .route("/:crt/load-complete", post(handlers::mark_load_complete))
        .route("/:crt/programmed-volume", put(handlers::set_programmed_volume))
        .route("/:crt/order", post(handlers::generate_order))
        .route("/:crt/history", get(handlers::get_history))
        .route("/:crt/trucks", get(handlers::list_trucks))
        .route("/:crt/available-rolls", get(handlers::available_rolls))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Order tracking routes (protected)
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders))
        .route("/events", get(handlers::order_events))
        .route("/:id", get(handlers::get_order))
        .route("/:id/status", put(handlers::advance_status))
        .route("/:id/dip", post(handlers::mark_dip_processed))
        .route("/:id/cancel", post(handlers::cancel_order))
        .route("/:id/summary", get(handlers::get_order_summary))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Manifest routes (protected)
fn manifest_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_manifest))
        .route("/:id", get(handlers::get_manifest))
        .route("/:id/document", get(handlers::manifest_document))
        .route("/:id/waybill", post(handlers::waybill_document))
        .route("/:id/freight-quote", get(handlers::quote_manifest))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Departure routes (protected)
fn departure_routes() -> Router<AppState> {
    Router::new()
        .route("/pending", get(handlers::list_pending))
        .route("/:id", post(handlers::record_departure))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Reporting routes (protected)
fn reporting_routes() -> Router<AppState> {
    Router::new()
        .route("/status-summary", get(handlers::get_status_summary))
        .route("/products", get(handlers::get_detailed_products))
        .route("/otif", get(handlers::get_otif))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Freight routes (protected)
fn freight_routes() -> Router<AppState> {
    Router::new()
        .route("/vehicles", get(handlers::list_vehicles))
        .route("/rates", get(handlers::list_rates).put(handlers::upsert_rate))
        .route("/complements", get(handlers::list_complements))
        .route_layer(middleware::from_fn(auth_middleware))
}
