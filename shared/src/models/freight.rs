//! Freight tables and quoting

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Vehicle catalogue entry (`frete_veiculos`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct FreightVehicle {
    pub id: Uuid,
    pub name: String,
    pub capacity_kg: Decimal,
    pub axles: i32,
}

/// Rate for a destination and vehicle (`tabela_frete`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct FreightRate {
    pub id: Uuid,
    pub destination: String,
    pub vehicle_id: Uuid,
    pub rate_per_ton: Decimal,
    pub minimum_charge: Decimal,
}

/// Additional charge applied on top of the base freight (`frete_complementar_config`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ComplementaryCharge {
    pub id: Uuid,
    pub name: String,
    /// Percentage of the base freight
    pub percent: Option<Decimal>,
    pub fixed_amount: Option<Decimal>,
    pub active: bool,
}

/// One priced line of a quote
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuoteLine {
    pub name: String,
    pub amount: Decimal,
}

/// Freight quote for a load
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FreightQuote {
    pub destination: String,
    pub vehicle: String,
    pub weight_kg: Decimal,
    pub base_amount: Decimal,
    pub minimum_applied: bool,
    pub complements: Vec<QuoteLine>,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuoteError {
    #[error("load of {weight_kg} kg exceeds vehicle capacity of {capacity_kg} kg")]
    OverCapacity { weight_kg: Decimal, capacity_kg: Decimal },
    #[error("rate does not belong to the selected vehicle")]
    VehicleMismatch,
}

/// Price a load: tonnes × rate, raised to the minimum charge, plus active complements
pub fn quote_freight(
    weight_kg: Decimal,
    vehicle: &FreightVehicle,
    rate: &FreightRate,
    complements: &[ComplementaryCharge],
) -> Result<FreightQuote, QuoteError> {
    if rate.vehicle_id != vehicle.id {
        return Err(QuoteError::VehicleMismatch);
    }
    if weight_kg > vehicle.capacity_kg {
        return Err(QuoteError::OverCapacity {
            weight_kg,
            capacity_kg: vehicle.capacity_kg,
        });
    }

    let by_weight = (weight_kg / Decimal::from(1000) * rate.rate_per_ton).round_dp(2);
    let minimum_applied = by_weight < rate.minimum_charge;
    let base_amount = by_weight.max(rate.minimum_charge);

    let lines: Vec<QuoteLine> = complements
        .iter()
        .filter(|c| c.active)
        .map(|c| {
            let percent_part = c
                .percent
                .map(|p| base_amount * p / Decimal::from(100))
                .unwrap_or(Decimal::ZERO);
            QuoteLine {
                name: c.name.clone(),
                amount: (percent_part + c.fixed_amount.unwrap_or(Decimal::ZERO)).round_dp(2),
            }
        })
        .collect();

    let total = base_amount + lines.iter().map(|l| l.amount).sum::<Decimal>();

    Ok(FreightQuote {
        destination: rate.destination.clone(),
        vehicle: vehicle.name.clone(),
        weight_kg,
        base_amount,
        minimum_applied,
        complements: lines,
        total,
    })
}
