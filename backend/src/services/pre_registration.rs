//! Pre-registration (pre-cadastro) service
//!
//! CRT templates announced before the shipment arrives. Intake prefills from
//! them and consolidation falls back to their planned volume.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::consolidation::check_can_delete;
use shared::{validate_crt_number, validate_justification};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::events::{OrderChangeKind, OrderEvents};
use crate::models::{CrtSnapshot, ExclusionLogEntry, Invoice, PreRegistration};
use crate::services::consolidation::{crt_rolls, lock_crt};
use crate::services::orders::fetch_order_by_crt;

#[derive(Clone)]
pub struct PreRegistrationService {
    db: PgPool,
    events: OrderEvents,
}

/// Input for creating or replacing a pre-registration
#[derive(Debug, Deserialize, Validate)]
pub struct PreRegistrationInput {
    #[validate(length(min = 1, max = 40))]
    pub crt_number: String,
    pub exporter: Option<String>,
    pub importer: Option<String>,
    pub origin: Option<String>,
    pub issue_date: Option<NaiveDate>,
    #[validate(range(min = 0))]
    pub planned_rolls: Option<i32>,
    pub planned_weight_kg: Option<Decimal>,
    pub paper_type: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeletePreRegistrationInput {
    pub justification: String,
}

#[derive(Debug, Deserialize)]
pub struct ExclusionQuery {
    pub crt: Option<String>,
}

const COLUMNS: &str = "id, crt_number, exporter, importer, origin, issue_date, planned_rolls, \
     planned_weight_kg, paper_type, notes, created_at";

/// Pre-registration for an already-normalized CRT
pub async fn find_by_crt<'e, E>(executor: E, crt_number: &str) -> AppResult<Option<PreRegistration>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, PreRegistration>(&format!(
        "SELECT {} FROM pre_cadastro WHERE crt_number = $1",
        COLUMNS
    ))
    .bind(crt_number)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

impl PreRegistrationService {
    pub fn new(db: PgPool, events: OrderEvents) -> Self {
        Self { db, events }
    }

    pub async fn list(&self) -> AppResult<Vec<PreRegistration>> {
        let rows = sqlx::query_as::<_, PreRegistration>(&format!(
            "SELECT {} FROM pre_cadastro ORDER BY created_at DESC",
            COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<PreRegistration> {
        sqlx::query_as::<_, PreRegistration>(&format!(
            "SELECT {} FROM pre_cadastro WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Pre-registration".to_string()))
    }

    fn check(input: &PreRegistrationInput) -> AppResult<String> {
        input.validate()?;
        if matches!(input.planned_weight_kg, Some(w) if w < Decimal::ZERO) {
            return Err(AppError::Validation {
                field: "planned_weight_kg".to_string(),
                message: "Planned weight cannot be negative".to_string(),
                message_pt: "O peso programado não pode ser negativo".to_string(),
            });
        }
        Ok(validate_crt_number(&input.crt_number)?)
    }

    pub async fn create(&self, input: PreRegistrationInput) -> AppResult<PreRegistration> {
        let crt = Self::check(&input)?;

        let row = sqlx::query_as::<_, PreRegistration>(&format!(
            r#"
            INSERT INTO pre_cadastro (
                crt_number, exporter, importer, origin, issue_date,
                planned_rolls, planned_weight_kg, paper_type, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(&crt)
        .bind(&input.exporter)
        .bind(&input.importer)
        .bind(&input.origin)
        .bind(input.issue_date)
        .bind(input.planned_rolls)
        .bind(input.planned_weight_kg)
        .bind(&input.paper_type)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(crt = %crt, "pre-registration created");
        Ok(row)
    }

    pub async fn update(&self, id: Uuid, input: PreRegistrationInput) -> AppResult<PreRegistration> {
        let crt = Self::check(&input)?;

        sqlx::query_as::<_, PreRegistration>(&format!(
            r#"
            UPDATE pre_cadastro
            SET crt_number = $1, exporter = $2, importer = $3, origin = $4, issue_date = $5,
                planned_rolls = $6, planned_weight_kg = $7, paper_type = $8, notes = $9
            WHERE id = $10
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(&crt)
        .bind(&input.exporter)
        .bind(&input.importer)
        .bind(&input.origin)
        .bind(input.issue_date)
        .bind(input.planned_rolls)
        .bind(input.planned_weight_kg)
        .bind(&input.paper_type)
        .bind(&input.notes)
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Pre-registration".to_string()))
    }

    /// Delete a pre-registration together with everything registered under
    /// its CRT: rolls, invoices, the order and the volume override.
    ///
    /// One exclusion-log row keeps a snapshot of all removed records.
    /// Rejected once any roll of the CRT has been loaded.
    pub async fn delete(&self, id: Uuid, justification: &str, deleted_by: &str) -> AppResult<()> {
        let justification = validate_justification(justification)?;
        let existing = self.get(id).await?;
        let crt = existing.crt_number.clone();

        let mut tx = self.db.begin().await?;
        lock_crt(&mut tx, &crt).await?;

        let pre_registration = sqlx::query_as::<_, PreRegistration>(&format!(
            "SELECT {} FROM pre_cadastro WHERE id = $1 FOR UPDATE",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Pre-registration".to_string()))?;

        let rolls = crt_rolls(&mut tx, &crt).await?;
        check_can_delete(&crt, &rolls)?;
        let order = fetch_order_by_crt(&mut tx, &crt).await?;
        let invoices = sqlx::query_as::<_, Invoice>(
            "SELECT id, number, value, crt_number, created_at FROM notas_fiscais WHERE crt_number = $1 ORDER BY number",
        )
        .bind(&crt)
        .fetch_all(&mut *tx)
        .await?;

        let snapshot = CrtSnapshot::new(pre_registration, order, invoices, rolls);
        let snapshot_json = snapshot
            .to_json()
            .map_err(|e| AppError::Internal(format!("snapshot failed: {}", e)))?;

        for statement in [
            "DELETE FROM pedidos WHERE crt_number = $1",
            "DELETE FROM bobinas WHERE crt_number = $1",
            "DELETE FROM notas_fiscais WHERE crt_number = $1",
            "DELETE FROM crt_volumes_programados WHERE crt_number = $1",
        ] {
            sqlx::query(statement).bind(&crt).execute(&mut *tx).await?;
        }
        sqlx::query("DELETE FROM pre_cadastro WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO exclusao_log (entity, crt_number, justification, snapshot, deleted_by)
            VALUES ('pre_cadastro', $1, $2, $3, $4)
            "#,
        )
        .bind(&crt)
        .bind(&justification)
        .bind(&snapshot_json)
        .bind(deleted_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::warn!(
            crt = %crt,
            rolls = snapshot.rolls.len(),
            invoices = snapshot.invoices.len(),
            "pre-registration deleted with its CRT records"
        );
        if let Some(order) = &snapshot.order {
            self.events.publish(order.id, &crt, OrderChangeKind::Deleted);
        }
        Ok(())
    }

    /// Exclusion log, newest first, optionally for one CRT
    pub async fn exclusions(&self, crt_number: Option<&str>) -> AppResult<Vec<ExclusionLogEntry>> {
        let crt = crt_number.map(validate_crt_number).transpose()?;
        let rows = sqlx::query_as::<_, ExclusionLogEntry>(
            r#"
            SELECT id, entity, crt_number, justification, snapshot, deleted_by, deleted_at
            FROM exclusao_log
            WHERE $1::VARCHAR IS NULL OR crt_number = $1
            ORDER BY deleted_at DESC
            "#,
        )
        .bind(crt)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(crt: &str) -> PreRegistrationInput {
        PreRegistrationInput {
            crt_number: crt.to_string(),
            exporter: None,
            importer: None,
            origin: None,
            issue_date: None,
            planned_rolls: Some(40),
            planned_weight_kg: Some(Decimal::from(48_000)),
            paper_type: None,
            notes: None,
        }
    }

    #[test]
    fn test_check_normalizes_crt() {
        assert_eq!(PreRegistrationService::check(&input(" br 77 ")).unwrap(), "BR77");
    }

    #[test]
    fn test_check_rejects_negative_plan() {
        let mut bad = input("BR1");
        bad.planned_rolls = Some(-1);
        assert!(PreRegistrationService::check(&bad).is_err());

        let mut bad = input("BR1");
        bad.planned_weight_kg = Some(Decimal::from(-5));
        assert!(PreRegistrationService::check(&bad).is_err());
    }

    #[test]
    fn test_check_rejects_empty_crt() {
        assert!(PreRegistrationService::check(&input("")).is_err());
    }
}
