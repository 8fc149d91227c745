//! Paper roll (bobina) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A physical paper roll tracked individually through the warehouse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Roll {
    pub id: Uuid,
    pub roll_number: String,
    /// Cargo tracking number grouping one shipment's rolls
    pub crt_number: String,
    pub purchase_order: Option<String>,
    pub invoice_id: Option<Uuid>,
    /// Joined from `notas_fiscais`, not stored on the roll
    pub invoice_number: Option<String>,
    pub sales_order: Option<String>,
    pub paper_type: String,
    /// Grammage in g/m²
    pub grammage: i32,
    pub format: String,
    pub weight_kg: Decimal,
    pub origin: Option<String>,
    pub exporter: Option<String>,
    pub importer: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub location: WarehouseLocation,
    pub status: RollStatus,
    pub load_complete: bool,
    pub created_at: DateTime<Utc>,
}

/// Street/block/row position inside the warehouse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct WarehouseLocation {
    pub street: Option<String>,
    pub block: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "shelf_row"))]
    pub row: Option<String>,
}

impl WarehouseLocation {
    /// Compact label such as `R3-B12-F2`; empty parts are skipped
    pub fn label(&self) -> String {
        [
            self.street.as_deref().map(|s| format!("R{}", s.trim())),
            self.block.as_deref().map(|b| format!("B{}", b.trim())),
            self.row.as_deref().map(|r| format!("F{}", r.trim())),
        ]
        .into_iter()
        .flatten()
        .filter(|part| part.len() > 1)
        .collect::<Vec<_>>()
        .join("-")
    }
}

/// Lifecycle status of a roll
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "VARCHAR", rename_all = "snake_case")
)]
pub enum RollStatus {
    InTransit,
    InStock,
    Loaded,
}

impl RollStatus {
    pub const ALL: [RollStatus; 3] = [RollStatus::InTransit, RollStatus::InStock, RollStatus::Loaded];

    pub fn as_str(&self) -> &'static str {
        match self {
            RollStatus::InTransit => "in_transit",
            RollStatus::InStock => "in_stock",
            RollStatus::Loaded => "loaded",
        }
    }
}

impl std::fmt::Display for RollStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollStatus::InTransit => write!(f, "In Transit"),
            RollStatus::InStock => write!(f, "In Stock"),
            RollStatus::Loaded => write!(f, "Loaded"),
        }
    }
}

/// Editable roll fields tracked by the audit log
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RollPatch {
    pub roll_number: Option<String>,
    pub purchase_order: Option<String>,
    pub sales_order: Option<String>,
    pub paper_type: Option<String>,
    pub grammage: Option<i32>,
    pub format: Option<String>,
    pub weight_kg: Option<Decimal>,
    pub origin: Option<String>,
    pub exporter: Option<String>,
    pub importer: Option<String>,
    pub street: Option<String>,
    pub block: Option<String>,
    pub row: Option<String>,
}

impl RollPatch {
    pub fn is_empty(&self) -> bool {
        *self == RollPatch::default()
    }

    /// Write the patch onto a roll. Text values are trimmed and a blank
    /// value clears an optional field.
    pub fn apply_to(&self, roll: &mut Roll) {
        fn text(target: &mut String, value: &Option<String>) {
            if let Some(v) = value {
                *target = v.trim().to_string();
            }
        }
        fn optional(target: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = value {
                let v = v.trim();
                *target = (!v.is_empty()).then(|| v.to_string());
            }
        }

        text(&mut roll.roll_number, &self.roll_number);
        optional(&mut roll.purchase_order, &self.purchase_order);
        optional(&mut roll.sales_order, &self.sales_order);
        text(&mut roll.paper_type, &self.paper_type);
        if let Some(grammage) = self.grammage {
            roll.grammage = grammage;
        }
        text(&mut roll.format, &self.format);
        if let Some(weight) = self.weight_kg {
            roll.weight_kg = weight;
        }
        optional(&mut roll.origin, &self.origin);
        optional(&mut roll.exporter, &self.exporter);
        optional(&mut roll.importer, &self.importer);
        optional(&mut roll.location.street, &self.street);
        optional(&mut roll.location.block, &self.block);
        optional(&mut roll.location.row, &self.row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names_match_serde() {
        for status in RollStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_location_label() {
        let location = WarehouseLocation {
            street: Some("3".to_string()),
            block: Some(" 12 ".to_string()),
            row: None,
        };
        assert_eq!(location.label(), "R3-B12");
        assert_eq!(WarehouseLocation::default().label(), "");
    }

    #[test]
    fn test_apply_patch_trims_and_clears() {
        let mut roll = Roll {
            id: Uuid::new_v4(),
            roll_number: "B-1".to_string(),
            crt_number: "BR1".to_string(),
            purchase_order: Some("PO-1".to_string()),
            invoice_id: None,
            invoice_number: None,
            sales_order: None,
            paper_type: "Kraft".to_string(),
            grammage: 80,
            format: "1600".to_string(),
            weight_kg: Decimal::from(1000),
            origin: None,
            exporter: None,
            importer: None,
            location: WarehouseLocation::default(),
            status: RollStatus::InStock,
            load_complete: false,
            created_at: Utc::now(),
        };
        let patch = RollPatch {
            paper_type: Some(" Testliner ".to_string()),
            purchase_order: Some("  ".to_string()),
            grammage: Some(120),
            block: Some("7".to_string()),
            ..Default::default()
        };
        patch.apply_to(&mut roll);
        assert_eq!(roll.paper_type, "Testliner");
        assert_eq!(roll.purchase_order, None);
        assert_eq!(roll.grammage, 120);
        assert_eq!(roll.location.block.as_deref(), Some("7"));
        assert_eq!(roll.roll_number, "B-1");
    }

    #[test]
    fn test_empty_patch() {
        assert!(RollPatch::default().is_empty());
        let patch = RollPatch {
            grammage: Some(80),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
