//! Database models for the Bobina Tracker
//!
//! Re-exports models from the shared crate and adds backend-specific models

pub use shared::models::*;

/// Column list for a [`Roll`] joined with its invoice number.
///
/// Use with `FROM bobinas b LEFT JOIN notas_fiscais nf ON nf.id = b.invoice_id`.
pub const ROLL_COLUMNS: &str = "b.id, b.roll_number, b.crt_number, b.purchase_order, b.invoice_id, \
     nf.number AS invoice_number, b.sales_order, b.paper_type, b.grammage, b.format, b.weight_kg, \
     b.origin, b.exporter, b.importer, b.street, b.block, b.shelf_row, b.status, b.load_complete, \
     b.created_at";

/// Roll select with the invoice join, ready for a `WHERE` clause
pub fn roll_select() -> String {
    format!(
        "SELECT {} FROM bobinas b LEFT JOIN notas_fiscais nf ON nf.id = b.invoice_id",
        ROLL_COLUMNS
    )
}

/// Column list for an [`Order`]
pub const ORDER_COLUMNS: &str = "id, crt_number, paper_type, grammage, format, purchase_order, \
     invoice_number, planned_rolls, planned_weight_kg, destination, priority, order_status, \
     dip_processed, dip_processed_at, load_complete, cancelled, cancellation_reason, cancelled_at, \
     delivered_at, created_at, updated_at";

pub const MANIFEST_COLUMNS: &str = "id, manifest_date, manifest_time, driver_name, trailer_plate, \
     truck_plate, crt_number, invoice_number, destination, order_id, departed_at, created_by, \
     created_at";
