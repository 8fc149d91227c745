//! Shipment manifest (romaneio) and waybill (remito) models

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One truck leaving for one destination with a set of rolls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Manifest {
    pub id: Uuid,
    pub manifest_date: NaiveDate,
    pub manifest_time: NaiveTime,
    pub driver_name: String,
    pub trailer_plate: String,
    pub truck_plate: Option<String>,
    pub crt_number: String,
    pub invoice_number: Option<String>,
    pub destination: String,
    pub order_id: Option<Uuid>,
    pub departed_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A numbered truck slot derived from an order destination
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Truck {
    pub number: i32,
    pub destination: String,
    /// Manifests already issued for this destination
    pub manifests_issued: i64,
}

/// Free-text fields an operator can edit before printing a waybill
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct WaybillFields {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub carrier: Option<String>,
    pub observations: Option<String>,
}
