//! Append-only audit trail models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Invoice, Order, PreRegistration, Roll, RollPatch};

/// One field-level change recorded against a CRT
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct EditHistoryEntry {
    pub id: Uuid,
    pub crt_number: String,
    pub roll_id: Option<Uuid>,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub justification: String,
    pub edited_by: Option<String>,
    pub edited_at: DateTime<Utc>,
}

/// Record of a deletion, with a JSON snapshot of what was removed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ExclusionLogEntry {
    pub id: Uuid,
    pub entity: String,
    pub crt_number: String,
    pub justification: String,
    pub snapshot: serde_json::Value,
    pub deleted_by: Option<String>,
    pub deleted_at: DateTime<Utc>,
}

/// Everything a pre-registration delete removes for one CRT
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrtSnapshot {
    pub crt_number: String,
    pub pre_registration: PreRegistration,
    pub order: Option<Order>,
    pub invoices: Vec<Invoice>,
    pub rolls: Vec<Roll>,
}

impl CrtSnapshot {
    pub fn new(
        pre_registration: PreRegistration,
        order: Option<Order>,
        invoices: Vec<Invoice>,
        rolls: Vec<Roll>,
    ) -> Self {
        Self {
            crt_number: pre_registration.crt_number.clone(),
            pre_registration,
            order,
            invoices,
            rolls,
        }
    }

    /// JSON stored in the exclusion log
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// A pending field change, before it is written to the audit log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldChange {
    pub roll_id: Option<Uuid>,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl FieldChange {
    pub fn crt_rename(old: &str, new: &str) -> Self {
        Self {
            roll_id: None,
            field: "crt_number".to_string(),
            old_value: Some(old.to_string()),
            new_value: Some(new.to_string()),
        }
    }
}

fn blank_to_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn push_text(
    changes: &mut Vec<FieldChange>,
    roll_id: Uuid,
    field: &str,
    current: Option<&str>,
    proposed: Option<&String>,
) {
    let Some(proposed) = proposed else {
        return;
    };
    let new_value = blank_to_none(proposed);
    let old_value = current.and_then(blank_to_none);
    if old_value != new_value {
        changes.push(FieldChange {
            roll_id: Some(roll_id),
            field: field.to_string(),
            old_value,
            new_value,
        });
    }
}

/// Compute one change per field the patch actually modifies.
///
/// Fields absent from the patch are untouched; text fields are compared
/// after trimming, and a blank text value clears the field.
pub fn diff_roll(roll: &Roll, patch: &RollPatch) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    let id = roll.id;

    push_text(&mut changes, id, "roll_number", Some(&roll.roll_number), patch.roll_number.as_ref());
    push_text(&mut changes, id, "purchase_order", roll.purchase_order.as_deref(), patch.purchase_order.as_ref());
    push_text(&mut changes, id, "sales_order", roll.sales_order.as_deref(), patch.sales_order.as_ref());
    push_text(&mut changes, id, "paper_type", Some(&roll.paper_type), patch.paper_type.as_ref());

    if let Some(grammage) = patch.grammage {
        if grammage != roll.grammage {
            changes.push(FieldChange {
                roll_id: Some(id),
                field: "grammage".to_string(),
                old_value: Some(roll.grammage.to_string()),
                new_value: Some(grammage.to_string()),
            });
        }
    }

    push_text(&mut changes, id, "format", Some(&roll.format), patch.format.as_ref());

    if let Some(weight) = patch.weight_kg {
        if weight != roll.weight_kg {
            changes.push(FieldChange {
                roll_id: Some(id),
                field: "weight_kg".to_string(),
                old_value: Some(roll.weight_kg.normalize().to_string()),
                new_value: Some(weight.normalize().to_string()),
            });
        }
    }

    push_text(&mut changes, id, "origin", roll.origin.as_deref(), patch.origin.as_ref());
    push_text(&mut changes, id, "exporter", roll.exporter.as_deref(), patch.exporter.as_ref());
    push_text(&mut changes, id, "importer", roll.importer.as_deref(), patch.importer.as_ref());
    push_text(&mut changes, id, "street", roll.location.street.as_deref(), patch.street.as_ref());
    push_text(&mut changes, id, "block", roll.location.block.as_deref(), patch.block.as_ref());
    push_text(&mut changes, id, "row", roll.location.row.as_deref(), patch.row.as_ref());

    changes
}
