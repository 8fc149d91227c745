//! Stock view logic: filtering and the export column layout

use crate::models::{Roll, RollStatus};

/// Columns shown in the stock table, in display order. The CSV export
/// writes exactly these, in this order.
pub const STOCK_COLUMNS: [&str; 13] = [
    "Bobina",
    "CRT",
    "Nota Fiscal",
    "Pedido de Compra",
    "Ordem de Venda",
    "Tipo de Papel",
    "Gramatura",
    "Formato",
    "Peso (kg)",
    "Exportador",
    "Importador",
    "Localização",
    "Carga Completa",
];

/// Whether a roll matches a free-text search, case-insensitively, on
/// roll number, CRT, sales order, paper type, exporter or importer
pub fn matches_search(roll: &Roll, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    [
        Some(roll.roll_number.as_str()),
        Some(roll.crt_number.as_str()),
        roll.sales_order.as_deref(),
        Some(roll.paper_type.as_str()),
        roll.exporter.as_deref(),
        roll.importer.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|value| value.to_lowercase().contains(&needle))
}

/// In-stock rolls matching the search, in the order given
pub fn filter_stock<'a>(rolls: &'a [Roll], query: Option<&str>) -> Vec<&'a Roll> {
    rolls
        .iter()
        .filter(|r| r.status == RollStatus::InStock)
        .filter(|r| query.map_or(true, |q| matches_search(r, q)))
        .collect()
}

/// One table row, aligned with [`STOCK_COLUMNS`]
pub fn stock_row(roll: &Roll) -> Vec<String> {
    vec![
        roll.roll_number.clone(),
        roll.crt_number.clone(),
        roll.invoice_number.clone().unwrap_or_default(),
        roll.purchase_order.clone().unwrap_or_default(),
        roll.sales_order.clone().unwrap_or_default(),
        roll.paper_type.clone(),
        roll.grammage.to_string(),
        roll.format.clone(),
        roll.weight_kg.normalize().to_string(),
        roll.exporter.clone().unwrap_or_default(),
        roll.importer.clone().unwrap_or_default(),
        roll.location.label(),
        if roll.load_complete { "Sim" } else { "Não" }.to_string(),
    ]
}
