//! Intake registration: a CRT's invoices and rolls in one write

use serde::{Deserialize, Serialize};
use shared::{validate_crt_number, validate_intake, IntakeInput, Invoice, RollStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::PreRegistration;
use crate::services::pre_registration;

/// Intake service for registering arriving shipments
#[derive(Clone)]
pub struct IntakeService {
    db: PgPool,
}

/// Intake request as posted by the client
#[derive(Debug, Deserialize)]
pub struct RegisterIntakeRequest {
    #[serde(flatten)]
    pub input: IntakeInput,
    /// Register the rolls as announced but not yet arrived
    #[serde(default)]
    pub in_transit: bool,
}

/// Result of a successful intake
#[derive(Debug, Serialize)]
pub struct IntakeReceipt {
    pub crt_number: String,
    pub invoices: Vec<Invoice>,
    pub rolls_created: usize,
    pub status: RollStatus,
}

#[derive(Debug, Serialize)]
pub struct CrtAvailability {
    pub crt_number: String,
    pub in_use: bool,
}

/// SQL expression normalizing a stored CRT the same way `normalize_crt` does
const NORMALIZED_CRT: &str = "upper(regexp_replace(crt_number, '\\s', '', 'g'))";

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl IntakeService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Whether any roll already uses the CRT, compared in normalized form
    pub async fn check_crt(&self, crt_number: &str) -> AppResult<CrtAvailability> {
        let crt = validate_crt_number(crt_number)?;
        let in_use = self.crt_in_use(&self.db, &crt).await?;
        Ok(CrtAvailability { crt_number: crt, in_use })
    }

    async fn crt_in_use<'e, E>(&self, executor: E, normalized: &str) -> AppResult<bool>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let query = format!(
            "SELECT EXISTS(SELECT 1 FROM bobinas WHERE {} = $1)",
            NORMALIZED_CRT
        );
        let in_use: bool = sqlx::query_scalar(&query)
            .bind(normalized)
            .fetch_one(executor)
            .await?;
        Ok(in_use)
    }

    /// Pre-registration data to prefill the intake form
    pub async fn prefill(&self, crt_number: &str) -> AppResult<Option<PreRegistration>> {
        let crt = validate_crt_number(crt_number)?;
        pre_registration::find_by_crt(&self.db, &crt).await
    }

    /// Register a shipment.
    ///
    /// Invoices and rolls are written in one transaction holding a
    /// transaction-scoped advisory lock on the CRT, so concurrent intakes of
    /// the same CRT serialize and the loser sees it as already in use.
    pub async fn register(&self, request: RegisterIntakeRequest) -> AppResult<IntakeReceipt> {
        let RegisterIntakeRequest { input, in_transit } = request;
        validate_intake(&input)?;
        let crt = validate_crt_number(&input.crt_number)?;
        let status = if in_transit {
            RollStatus::InTransit
        } else {
            RollStatus::InStock
        };

        let mut tx = self.db.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&crt)
            .execute(&mut *tx)
            .await?;

        if self.crt_in_use(&mut *tx, &crt).await? {
            return Err(AppError::Validation {
                field: "crt_number".to_string(),
                message: format!("CRT {} is already registered", crt),
                message_pt: format!("O CRT {} já está cadastrado", crt),
            });
        }

        let mut invoices = Vec::with_capacity(input.invoices.len());
        for invoice in &input.invoices {
            let row = sqlx::query_as::<_, Invoice>(
                r#"
                INSERT INTO notas_fiscais (number, value, crt_number)
                VALUES ($1, $2, $3)
                RETURNING id, number, value, crt_number, created_at
                "#,
            )
            .bind(invoice.number.trim())
            .bind(invoice.value)
            .bind(&crt)
            .fetch_one(&mut *tx)
            .await?;
            invoices.push(row);
        }

        let invoice_ids: Vec<Uuid> = invoices.iter().map(|i| i.id).collect();

        for roll in &input.rolls {
            // Index and required fields were checked by validate_intake
            let invoice_id = invoice_ids.get(roll.invoice_index).copied().ok_or_else(|| {
                AppError::Internal(format!("invoice index {} out of range", roll.invoice_index))
            })?;

            sqlx::query(
                r#"
                INSERT INTO bobinas (
                    roll_number, crt_number, purchase_order, invoice_id, sales_order,
                    paper_type, grammage, format, weight_kg, origin, exporter, importer,
                    street, block, shelf_row, status
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
                "#,
            )
            .bind(roll.roll_number.trim())
            .bind(&crt)
            .bind(clean(&roll.purchase_order))
            .bind(invoice_id)
            .bind(clean(&roll.sales_order))
            .bind(roll.paper_type.trim())
            .bind(roll.grammage)
            .bind(roll.format.trim())
            .bind(roll.weight_kg)
            .bind(clean(&roll.origin))
            .bind(clean(&roll.exporter))
            .bind(clean(&roll.importer))
            .bind(clean(&roll.street))
            .bind(clean(&roll.block))
            .bind(clean(&roll.row))
            .bind(status)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            crt = %crt,
            invoices = invoices.len(),
            rolls = input.rolls.len(),
            status = status.as_str(),
            "intake registered"
        );

        Ok(IntakeReceipt {
            crt_number: crt,
            invoices,
            rolls_created: input.rolls.len(),
            status,
        })
    }
}
