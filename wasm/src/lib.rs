//! WebAssembly module for the Bobina Tracker
//!
//! Provides client-side computation for:
//! - Intake form validation
//! - Stock filtering
//! - Consolidation table and pipeline position
//! - OTIF

use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::analytics::{compute_otif, OtifStartPoint};
use shared::consolidation::summarize_crts;
use shared::stock::{filter_stock, STOCK_COLUMNS};
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn parse<T: DeserializeOwned>(json: &str, what: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {} JSON: {}", what, e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization failed: {}", e))
}

fn js_error(message: String) -> JsValue {
    web_sys::console::warn_1(&JsValue::from_str(&message));
    JsValue::from_str(&message)
}

fn language(code: &str) -> Language {
    match code {
        "en" => Language::English,
        _ => Language::Portuguese,
    }
}

fn intake_message(input_json: &str, lang: &str) -> Result<Option<String>, String> {
    let input: IntakeInput = parse(input_json, "intake")?;
    Ok(validate_intake(&input)
        .err()
        .map(|issue| issue.message(&language(lang)).to_string()))
}

fn stock_view(rolls_json: &str, query: &str) -> Result<String, String> {
    let rolls: Vec<Roll> = parse(rolls_json, "rolls")?;
    let query = Some(query).filter(|q| !q.trim().is_empty());
    to_json(&filter_stock(&rolls, query))
}

fn consolidation_view(
    rolls_json: &str,
    orders_json: &str,
    volumes_json: &str,
    pre_registrations_json: &str,
) -> Result<String, String> {
    let rolls: Vec<Roll> = parse(rolls_json, "rolls")?;
    let orders: Vec<Order> = parse(orders_json, "orders")?;
    let volumes: Vec<ProgrammedVolume> = parse(volumes_json, "volumes")?;
    let pres: Vec<PreRegistration> = parse(pre_registrations_json, "pre-registrations")?;
    to_json(&summarize_crts(&rolls, &orders, &volumes, &pres))
}

fn otif_view(orders_json: &str, start_point: &str, target_days: i32) -> Result<String, String> {
    let orders: Vec<Order> = parse(orders_json, "orders")?;
    let start = OtifStartPoint::parse(start_point).unwrap_or_default();
    to_json(&compute_otif(&orders, start, i64::from(target_days), None))
}

/// Validate the intake form. Returns the first problem in the operator's
/// language (`pt` or `en`), or nothing when the form is valid.
#[wasm_bindgen]
pub fn validate_intake_form(input_json: &str, lang: &str) -> Result<Option<String>, JsValue> {
    intake_message(input_json, lang).map_err(js_error)
}

/// Canonical CRT number used for the uniqueness check
#[wasm_bindgen]
pub fn normalize_crt_number(crt: &str) -> String {
    normalize_crt(crt)
}

/// In-stock rolls matching the search box, as JSON
#[wasm_bindgen]
pub fn filter_stock_rolls(rolls_json: &str, query: &str) -> Result<String, JsValue> {
    stock_view(rolls_json, query).map_err(js_error)
}

/// Stock table headers, as JSON
#[wasm_bindgen]
pub fn stock_columns() -> String {
    serde_json::to_string(&STOCK_COLUMNS).unwrap_or_else(|_| "[]".to_string())
}

/// Consolidation table, as JSON
#[wasm_bindgen]
pub fn consolidation_table(
    rolls_json: &str,
    orders_json: &str,
    volumes_json: &str,
    pre_registrations_json: &str,
) -> Result<String, JsValue> {
    consolidation_view(rolls_json, orders_json, volumes_json, pre_registrations_json)
        .map_err(js_error)
}

/// Index of the last completed pipeline stage
#[wasm_bindgen]
pub fn completed_stage_index(status: Option<String>, dip_processed: bool) -> usize {
    pipeline_index(status.as_deref().and_then(OrderStatus::parse), dip_processed)
}

/// Operator-facing label of a pipeline stage
#[wasm_bindgen]
pub fn stage_label(status: &str) -> Option<String> {
    OrderStatus::parse(status).map(|s| s.label().to_string())
}

/// OTIF report, as JSON. Unknown start points count from order creation.
#[wasm_bindgen]
pub fn otif_report(orders_json: &str, start_point: &str, target_days: i32) -> Result<String, JsValue> {
    otif_view(orders_json, start_point, target_days).map_err(js_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn roll(number: &str, status: RollStatus) -> Roll {
        Roll {
            id: uuid_from(number),
            roll_number: number.to_string(),
            crt_number: "BR77".to_string(),
            purchase_order: None,
            invoice_id: None,
            invoice_number: None,
            sales_order: None,
            paper_type: "Kraft".to_string(),
            grammage: 80,
            format: "1600".to_string(),
            weight_kg: Decimal::from(1000),
            origin: None,
            exporter: Some("Papelera Sur".to_string()),
            importer: None,
            location: WarehouseLocation::default(),
            status,
            load_complete: false,
            created_at: Utc::now(),
        }
    }

    fn uuid_from(seed: &str) -> uuid::Uuid {
        let mut bytes = [0u8; 16];
        for (i, b) in seed.bytes().enumerate().take(16) {
            bytes[i] = b;
        }
        uuid::Uuid::from_bytes(bytes)
    }

    #[test]
    fn test_intake_message_in_requested_language() {
        let json = r#"{"crt_number":"BR1","invoices":[],"rolls":[]}"#;
        assert_eq!(
            intake_message(json, "pt").unwrap().as_deref(),
            Some("Informe ao menos uma nota fiscal")
        );
        assert_eq!(
            intake_message(json, "en").unwrap().as_deref(),
            Some("At least one invoice is required")
        );
        assert!(intake_message("not json", "pt").is_err());
    }

    #[test]
    fn test_stock_filter_roundtrip() {
        let rolls = vec![
            roll("B-1", RollStatus::InStock),
            roll("B-2", RollStatus::Loaded),
        ];
        let json = serde_json::to_string(&rolls).unwrap();

        let filtered: Vec<Roll> = serde_json::from_str(&filter_stock_rolls(&json, "").unwrap()).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].roll_number, "B-1");

        let none: Vec<Roll> = serde_json::from_str(&filter_stock_rolls(&json, "celulosa").unwrap()).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_stage_helpers() {
        assert_eq!(completed_stage_index(None, true), 2);
        assert_eq!(completed_stage_index(Some("rota".to_string()), false), 6);
        assert_eq!(completed_stage_index(Some("bogus".to_string()), false), 0);
        assert_eq!(stage_label("aduana_ar").as_deref(), Some("Aduana Argentina"));
        assert_eq!(stage_label("bogus"), None);
        assert_eq!(normalize_crt_number(" br 77 "), "BR77");
    }

    #[test]
    fn test_otif_report_json() {
        let created_at = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        let order = Order {
            id: uuid_from("order"),
            crt_number: "BR77".to_string(),
            paper_type: None,
            grammage: None,
            format: None,
            purchase_order: None,
            invoice_number: None,
            planned_rolls: None,
            planned_weight_kg: None,
            destination: Some("Rosario".to_string()),
            priority: None,
            order_status: Some(OrderStatus::Entregue),
            dip_processed: false,
            dip_processed_at: None,
            load_complete: true,
            cancelled: false,
            cancellation_reason: None,
            cancelled_at: None,
            delivered_at: Some(created_at + Duration::days(4)),
            created_at,
            updated_at: created_at,
        };
        let json = serde_json::to_string(&vec![order]).unwrap();
        let report: serde_json::Value = serde_json::from_str(&otif_report(&json, "order_created", 10).unwrap()).unwrap();
        assert_eq!(report["on_time"], 1);
        assert_eq!(report["percentage"], 100.0);
    }

    #[test]
    fn test_consolidation_table_json() {
        let rolls = serde_json::to_string(&vec![roll("B-1", RollStatus::InTransit)]).unwrap();
        let table = consolidation_table(&rolls, "[]", "[]", "[]").unwrap();
        let rows: serde_json::Value = serde_json::from_str(&table).unwrap();
        assert_eq!(rows[0]["crt_number"], "BR77");
        assert_eq!(rows[0]["state"], "em_transito");
    }

    #[test]
    fn test_stock_columns_json() {
        let columns: Vec<String> = serde_json::from_str(&stock_columns()).unwrap();
        assert_eq!(columns.len(), STOCK_COLUMNS.len());
        assert_eq!(columns[0], "Bobina");
    }
}
