//! Order consolidation: per-CRT volume accounting and the load-complete rules

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    ConsolidationState, Order, OrderStatus, PreRegistration, ProgrammedVolume, Roll, RollStatus,
};

/// Roll count and total weight
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Volume {
    pub rolls: i64,
    pub weight_kg: Decimal,
}

impl Volume {
    pub fn add(&mut self, weight_kg: Decimal) {
        self.rolls += 1;
        self.weight_kg += weight_kg;
    }
}

impl std::ops::Add for Volume {
    type Output = Volume;

    fn add(self, other: Volume) -> Volume {
        Volume {
            rolls: self.rolls + other.rolls,
            weight_kg: self.weight_kg + other.weight_kg,
        }
    }
}

/// Where a CRT's programmed volume came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VolumeSource {
    Override,
    PreRegistration,
    Actuals,
}

/// Consolidation row for one CRT
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrtSummary {
    pub crt_number: String,
    pub paper_type: Option<String>,
    pub exporter: Option<String>,
    pub importer: Option<String>,
    pub in_transit: Volume,
    pub in_stock: Volume,
    pub loaded: Volume,
    pub programmed: Volume,
    pub programmed_source: VolumeSource,
    /// Programmed minus stored minus in transit; negative when over-delivered
    pub pending: Volume,
    pub state: ConsolidationState,
    pub order_id: Option<Uuid>,
}

/// Why a load cannot be marked complete
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadCompleteBlock {
    #[error("load for CRT {0} is already marked complete")]
    AlreadyComplete(String),
    #[error("an order was already generated for CRT {0}")]
    AlreadyGenerated(String),
    #[error("CRT {crt} still has {count} roll(s) in transit")]
    RollsInTransit { crt: String, count: usize },
    #[error("CRT {0} has no rolls in stock")]
    NothingInStock(String),
}

/// Why an order cannot be generated
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateBlock {
    #[error("load for CRT {0} is not marked complete")]
    LoadNotComplete(String),
    #[error("an order was already generated for CRT {0}")]
    AlreadyGenerated(String),
}

/// Why a generated order cannot be cancelled
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CancelBlock {
    #[error("order for CRT {0} has not been generated")]
    NotGenerated(String),
    #[error("order for CRT {0} is already cancelled")]
    AlreadyCancelled(String),
    #[error("order for CRT {0} was already delivered")]
    Delivered(String),
}

/// Why a CRT's records cannot be deleted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeleteBlock {
    #[error("CRT {crt} has {count} roll(s) already loaded")]
    RollsLoaded { crt: String, count: usize },
}

/// Classify a CRT that has no generated order
pub fn classify_crt(order: Option<&Order>, rolls: &[&Roll]) -> ConsolidationState {
    if order.is_some_and(Order::is_complete_placeholder) {
        ConsolidationState::Completa
    } else if rolls.iter().any(|r| r.status == RollStatus::InTransit) {
        ConsolidationState::EmTransito
    } else {
        ConsolidationState::EmEstoque
    }
}

/// Check the rules for marking a CRT's load complete
pub fn check_can_mark_complete(
    crt_number: &str,
    order: Option<&Order>,
    rolls: &[Roll],
) -> Result<(), LoadCompleteBlock> {
    if let Some(order) = order {
        if order.is_generated() {
            return Err(LoadCompleteBlock::AlreadyGenerated(crt_number.to_string()));
        }
        if order.load_complete {
            return Err(LoadCompleteBlock::AlreadyComplete(crt_number.to_string()));
        }
    }
    let in_transit = rolls.iter().filter(|r| r.status == RollStatus::InTransit).count();
    if in_transit > 0 {
        return Err(LoadCompleteBlock::RollsInTransit {
            crt: crt_number.to_string(),
            count: in_transit,
        });
    }
    if !rolls.iter().any(|r| r.status == RollStatus::InStock) {
        return Err(LoadCompleteBlock::NothingInStock(crt_number.to_string()));
    }
    Ok(())
}

/// Check the rules for turning a placeholder into a generated order
pub fn check_can_generate(order: &Order) -> Result<(), GenerateBlock> {
    if order.is_generated() {
        return Err(GenerateBlock::AlreadyGenerated(order.crt_number.clone()));
    }
    if !order.load_complete {
        return Err(GenerateBlock::LoadNotComplete(order.crt_number.clone()));
    }
    Ok(())
}

/// Check the rules for cancelling an order
pub fn check_can_cancel(order: &Order) -> Result<(), CancelBlock> {
    if order.cancelled {
        return Err(CancelBlock::AlreadyCancelled(order.crt_number.clone()));
    }
    if !order.is_generated() {
        return Err(CancelBlock::NotGenerated(order.crt_number.clone()));
    }
    if order.order_status == Some(OrderStatus::Entregue) {
        return Err(CancelBlock::Delivered(order.crt_number.clone()));
    }
    Ok(())
}

/// The order row as it reads after cancellation.
///
/// Destination, pipeline status and the load-complete flag are cleared so
/// the CRT drops back into consolidation; roll statuses are not touched.
pub fn cancelled_order(order: &Order, reason: &str, at: DateTime<Utc>) -> Order {
    Order {
        destination: None,
        order_status: None,
        load_complete: false,
        cancelled: true,
        cancellation_reason: Some(reason.to_string()),
        cancelled_at: Some(at),
        updated_at: at,
        ..order.clone()
    }
}

/// Rolls that already left on a truck keep their CRT records alive
pub fn check_can_delete(crt_number: &str, rolls: &[Roll]) -> Result<(), DeleteBlock> {
    let loaded = rolls.iter().filter(|r| r.status == RollStatus::Loaded).count();
    if loaded > 0 {
        return Err(DeleteBlock::RollsLoaded {
            crt: crt_number.to_string(),
            count: loaded,
        });
    }
    Ok(())
}

/// Build the consolidation table.
///
/// CRTs with a generated order, or whose rolls are all loaded, are left
/// out. The programmed volume is the explicit override when present, then
/// the pre-registration plan, then the in-transit plus in-stock actuals.
pub fn summarize_crts(
    rolls: &[Roll],
    orders: &[Order],
    volumes: &[ProgrammedVolume],
    pre_registrations: &[PreRegistration],
) -> Vec<CrtSummary> {
    let mut by_crt: BTreeMap<&str, Vec<&Roll>> = BTreeMap::new();
    for roll in rolls {
        by_crt.entry(roll.crt_number.as_str()).or_default().push(roll);
    }

    by_crt
        .into_iter()
        .filter_map(|(crt, crt_rolls)| {
            let order = orders.iter().find(|o| o.crt_number == crt);
            if order.is_some_and(Order::is_generated) {
                return None;
            }

            let mut in_transit = Volume::default();
            let mut in_stock = Volume::default();
            let mut loaded = Volume::default();
            for roll in &crt_rolls {
                match roll.status {
                    RollStatus::InTransit => in_transit.add(roll.weight_kg),
                    RollStatus::InStock => in_stock.add(roll.weight_kg),
                    RollStatus::Loaded => loaded.add(roll.weight_kg),
                }
            }
            if in_transit.rolls + in_stock.rolls == 0 {
                return None;
            }

            let (programmed, programmed_source) = programmed_volume(
                crt,
                volumes,
                pre_registrations,
                in_transit + in_stock,
            );
            let pending = Volume {
                rolls: programmed.rolls - in_stock.rolls - in_transit.rolls,
                weight_kg: programmed.weight_kg - in_stock.weight_kg - in_transit.weight_kg,
            };

            let first = crt_rolls[0];
            Some(CrtSummary {
                crt_number: crt.to_string(),
                paper_type: Some(first.paper_type.clone()),
                exporter: first.exporter.clone(),
                importer: first.importer.clone(),
                in_transit,
                in_stock,
                loaded,
                programmed,
                programmed_source,
                pending,
                state: classify_crt(order, &crt_rolls),
                order_id: order.map(|o| o.id),
            })
        })
        .collect()
}

fn programmed_volume(
    crt: &str,
    volumes: &[ProgrammedVolume],
    pre_registrations: &[PreRegistration],
    actuals: Volume,
) -> (Volume, VolumeSource) {
    if let Some(v) = volumes.iter().find(|v| v.crt_number == crt) {
        return (
            Volume {
                rolls: i64::from(v.planned_rolls),
                weight_kg: v.planned_weight_kg,
            },
            VolumeSource::Override,
        );
    }
    if let Some(p) = pre_registrations.iter().find(|p| p.crt_number == crt) {
        if let (Some(rolls), Some(weight_kg)) = (p.planned_rolls, p.planned_weight_kg) {
            return (
                Volume {
                    rolls: i64::from(rolls),
                    weight_kg,
                },
                VolumeSource::PreRegistration,
            );
        }
    }
    (actuals, VolumeSource::Actuals)
}
