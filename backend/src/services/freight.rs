//! Freight tables and quotes for manifests

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{quote_freight, ComplementaryCharge, FreightQuote, FreightRate, FreightVehicle};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct FreightService {
    db: PgPool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertRateInput {
    #[validate(length(min = 1, max = 200))]
    pub destination: String,
    pub vehicle_id: Uuid,
    pub rate_per_ton: Decimal,
    #[serde(default)]
    pub minimum_charge: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub vehicle_id: Uuid,
}

fn non_negative(field: &str, value: Decimal) -> AppResult<()> {
    if value.is_sign_negative() {
        return Err(AppError::Validation {
            field: field.to_string(),
            message: "Value must not be negative".to_string(),
            message_pt: "O valor não pode ser negativo".to_string(),
        });
    }
    Ok(())
}

impl FreightService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_vehicles(&self) -> AppResult<Vec<FreightVehicle>> {
        let vehicles = sqlx::query_as::<_, FreightVehicle>(
            "SELECT id, name, capacity_kg, axles FROM frete_veiculos ORDER BY capacity_kg, name",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(vehicles)
    }

    pub async fn list_rates(&self) -> AppResult<Vec<FreightRate>> {
        let rates = sqlx::query_as::<_, FreightRate>(
            "SELECT id, destination, vehicle_id, rate_per_ton, minimum_charge FROM tabela_frete ORDER BY destination",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rates)
    }

    pub async fn list_complements(&self) -> AppResult<Vec<ComplementaryCharge>> {
        let charges = sqlx::query_as::<_, ComplementaryCharge>(
            "SELECT id, name, percent, fixed_amount, active FROM frete_complementar_config ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(charges)
    }

    /// Create or replace the rate for a destination and vehicle
    pub async fn upsert_rate(&self, input: UpsertRateInput) -> AppResult<FreightRate> {
        input.validate()?;
        non_negative("rate_per_ton", input.rate_per_ton)?;
        non_negative("minimum_charge", input.minimum_charge)?;

        let rate = sqlx::query_as::<_, FreightRate>(
            r#"
            INSERT INTO tabela_frete (destination, vehicle_id, rate_per_ton, minimum_charge)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (destination, vehicle_id)
            DO UPDATE SET rate_per_ton = EXCLUDED.rate_per_ton, minimum_charge = EXCLUDED.minimum_charge
            RETURNING id, destination, vehicle_id, rate_per_ton, minimum_charge
            "#,
        )
        .bind(input.destination.trim())
        .bind(input.vehicle_id)
        .bind(input.rate_per_ton)
        .bind(input.minimum_charge)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(destination = %rate.destination, vehicle_id = %rate.vehicle_id, "freight rate saved");
        Ok(rate)
    }

    /// Price a manifest's load on the given vehicle
    pub async fn quote(&self, manifest_id: Uuid, vehicle_id: Uuid) -> AppResult<FreightQuote> {
        let destination: String = sqlx::query_scalar("SELECT destination FROM romaneios WHERE id = $1")
            .bind(manifest_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Manifest".to_string()))?;

        let weight_kg: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(b.weight_kg), 0)
            FROM romaneios_bobinas rb
            JOIN bobinas b ON b.id = rb.roll_id
            WHERE rb.manifest_id = $1
            "#,
        )
        .bind(manifest_id)
        .fetch_one(&self.db)
        .await?;

        let vehicle = sqlx::query_as::<_, FreightVehicle>(
            "SELECT id, name, capacity_kg, axles FROM frete_veiculos WHERE id = $1",
        )
        .bind(vehicle_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Vehicle".to_string()))?;

        let rate = sqlx::query_as::<_, FreightRate>(
            r#"
            SELECT id, destination, vehicle_id, rate_per_ton, minimum_charge
            FROM tabela_frete
            WHERE lower(destination) = lower($1) AND vehicle_id = $2
            "#,
        )
        .bind(destination.trim())
        .bind(vehicle_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Freight rate for {} / {}", destination, vehicle.name)))?;

        let complements = self.list_complements().await?;
        let quote = quote_freight(weight_kg, &vehicle, &rate, &complements)?;

        tracing::debug!(manifest_id = %manifest_id, vehicle = %vehicle.name, total = %quote.total, "freight quoted");
        Ok(quote)
    }
}
