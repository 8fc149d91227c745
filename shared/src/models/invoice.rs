//! Invoice (nota fiscal) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An invoice linked many-to-one from rolls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: Uuid,
    pub number: String,
    pub value: Option<Decimal>,
    pub crt_number: String,
    pub created_at: DateTime<Utc>,
}
