//! Pre-registration (pre-cadastro) models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shipment template keyed by CRT, used to prefill intake
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PreRegistration {
    pub id: Uuid,
    pub crt_number: String,
    pub exporter: Option<String>,
    pub importer: Option<String>,
    pub origin: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub planned_rolls: Option<i32>,
    pub planned_weight_kg: Option<Decimal>,
    pub paper_type: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
