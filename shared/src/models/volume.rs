//! Programmed volume overrides

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-CRT override of the planned roll count and weight
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProgrammedVolume {
    pub crt_number: String,
    pub planned_rolls: i32,
    pub planned_weight_kg: Decimal,
    pub updated_at: DateTime<Utc>,
}
