//! Reporting aggregations over fetched rolls and orders

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consolidation::Volume;
use crate::models::{Order, OrderStatus, Roll, RollStatus};
use crate::types::DateRange;

/// Orders delivered within this many days count as on time
pub const DEFAULT_OTIF_TARGET_DAYS: i64 = 10;

/// Count and weight for one roll status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusTotal {
    pub status: RollStatus,
    pub rolls: i64,
    pub weight_kg: Decimal,
}

/// Totals for every roll status, in lifecycle order
pub fn summarize_by_status(rolls: &[Roll]) -> Vec<StatusTotal> {
    RollStatus::ALL
        .iter()
        .map(|status| {
            let (count, weight) = rolls
                .iter()
                .filter(|r| r.status == *status)
                .fold((0i64, Decimal::ZERO), |(c, w), r| (c + 1, w + r.weight_kg));
            StatusTotal {
                status: *status,
                rolls: count,
                weight_kg: weight,
            }
        })
        .collect()
}

/// One line of the detailed product table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductLine {
    pub order_id: Uuid,
    pub crt_number: String,
    pub purchase_order: Option<String>,
    pub invoice_number: Option<String>,
    pub paper_type: Option<String>,
    pub grammage: Option<i32>,
    pub format: Option<String>,
    pub destination: Option<String>,
    pub order_status: Option<OrderStatus>,
    pub planned: Volume,
    pub stored: Volume,
    pub in_transit: Volume,
    pub loaded: Volume,
    /// DIP processed
    pub customs_cleared: bool,
}

fn field_matches<T: PartialEq + ?Sized>(wanted: Option<&T>, actual: Option<&T>) -> bool {
    match wanted {
        None => true,
        Some(w) => actual == Some(w),
    }
}

/// Whether a roll belongs to an order line. Order fields left empty match anything.
pub fn roll_matches_order(order: &Order, roll: &Roll) -> bool {
    order.crt_number == roll.crt_number
        && field_matches(order.purchase_order.as_deref(), roll.purchase_order.as_deref())
        && field_matches(order.invoice_number.as_deref(), roll.invoice_number.as_deref())
        && field_matches(order.paper_type.as_deref(), Some(roll.paper_type.as_str()))
        && field_matches(order.grammage.as_ref(), Some(&roll.grammage))
        && field_matches(order.format.as_deref(), Some(roll.format.as_str()))
}

/// Planned vs stored vs in-transit for every non-cancelled order
pub fn detailed_products(orders: &[Order], rolls: &[Roll]) -> Vec<ProductLine> {
    orders
        .iter()
        .filter(|o| !o.cancelled)
        .map(|order| {
            let mut stored = Volume::default();
            let mut in_transit = Volume::default();
            let mut loaded = Volume::default();
            for roll in rolls.iter().filter(|r| roll_matches_order(order, r)) {
                match roll.status {
                    RollStatus::InStock => stored.add(roll.weight_kg),
                    RollStatus::InTransit => in_transit.add(roll.weight_kg),
                    RollStatus::Loaded => loaded.add(roll.weight_kg),
                }
            }
            ProductLine {
                order_id: order.id,
                crt_number: order.crt_number.clone(),
                purchase_order: order.purchase_order.clone(),
                invoice_number: order.invoice_number.clone(),
                paper_type: order.paper_type.clone(),
                grammage: order.grammage,
                format: order.format.clone(),
                destination: order.destination.clone(),
                order_status: order.order_status,
                planned: Volume {
                    rolls: order.planned_rolls.map(i64::from).unwrap_or(0),
                    weight_kg: order.planned_weight_kg.unwrap_or(Decimal::ZERO),
                },
                stored,
                in_transit,
                loaded,
                customs_cleared: order.dip_processed,
            }
        })
        .collect()
}

// ============================================================================
// OTIF
// ============================================================================

/// Where the OTIF clock starts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OtifStartPoint {
    #[default]
    OrderCreated,
    DipProcessed,
}

impl OtifStartPoint {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "order_created" => Some(OtifStartPoint::OrderCreated),
            "dip_processed" => Some(OtifStartPoint::DipProcessed),
            _ => None,
        }
    }
}

/// Delivery timing of one order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtifEntry {
    pub order_id: Uuid,
    pub crt_number: String,
    pub started_at: DateTime<Utc>,
    pub delivered_at: DateTime<Utc>,
    pub elapsed_days: i64,
    pub on_time: bool,
}

/// OTIF summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtifReport {
    pub start_point: OtifStartPoint,
    pub target_days: i64,
    pub total: usize,
    pub on_time: usize,
    pub late: usize,
    /// 0–100; 0 when nothing was delivered
    pub percentage: f64,
    pub entries: Vec<OtifEntry>,
}

/// On-time count, late count and percentage for a set of elapsed times
pub fn otif_percentage(elapsed_days: &[i64], target_days: i64) -> (usize, usize, f64) {
    let on_time = elapsed_days.iter().filter(|d| **d <= target_days).count();
    let late = elapsed_days.len() - on_time;
    let percentage = if elapsed_days.is_empty() {
        0.0
    } else {
        on_time as f64 / elapsed_days.len() as f64 * 100.0
    };
    (on_time, late, percentage)
}

/// OTIF over delivered, non-cancelled orders.
///
/// When the start point is the DIP date and an order has none, its
/// creation date is used instead. `range` filters on delivery date.
pub fn compute_otif(
    orders: &[Order],
    start_point: OtifStartPoint,
    target_days: i64,
    range: Option<&DateRange>,
) -> OtifReport {
    let entries: Vec<OtifEntry> = orders
        .iter()
        .filter(|o| !o.cancelled && o.order_status == Some(OrderStatus::Entregue))
        .filter_map(|o| {
            let delivered_at = o.delivered_at?;
            if let Some(range) = range {
                if !range.contains(delivered_at.date_naive()) {
                    return None;
                }
            }
            let started_at = match start_point {
                OtifStartPoint::OrderCreated => o.created_at,
                OtifStartPoint::DipProcessed => o.dip_processed_at.unwrap_or(o.created_at),
            };
            let elapsed_days = (delivered_at - started_at).num_days();
            Some(OtifEntry {
                order_id: o.id,
                crt_number: o.crt_number.clone(),
                started_at,
                delivered_at,
                elapsed_days,
                on_time: elapsed_days <= target_days,
            })
        })
        .collect();

    let elapsed: Vec<i64> = entries.iter().map(|e| e.elapsed_days).collect();
    let (on_time, late, percentage) = otif_percentage(&elapsed, target_days);

    OtifReport {
        start_point,
        target_days,
        total: entries.len(),
        on_time,
        late,
        percentage,
        entries,
    }
}
