//! Order consolidation: per-CRT volumes, load-complete flagging, order
//! generation and audited CRT edits

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::consolidation::{check_can_generate, check_can_mark_complete, summarize_crts, CrtSummary, GenerateBlock};
use shared::{
    diff_roll, normalize_crt, validate_crt_number, validate_destinations, validate_justification,
    validate_roll_patch, validate_unique_roll_ids, FieldChange,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::events::{OrderChangeKind, OrderEvents};
use crate::models::{
    roll_select, EditHistoryEntry, Order, PreRegistration, Priority, ProgrammedVolume, Roll,
    RollPatch, RollStatus, ORDER_COLUMNS,
};
use crate::services::orders::{fetch_order_by_crt, OrderDetail, OrderService};

#[derive(Clone)]
pub struct ConsolidationService {
    db: PgPool,
    events: OrderEvents,
}

#[derive(Debug, Deserialize)]
pub struct ProgrammedVolumeInput {
    pub planned_rolls: i32,
    pub planned_weight_kg: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct GenerateOrderInput {
    pub destinations: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
}

/// Edits to one roll of the CRT
#[derive(Debug, Deserialize)]
pub struct RollEdit {
    pub roll_id: Uuid,
    #[serde(flatten)]
    pub patch: RollPatch,
}

#[derive(Debug, Deserialize)]
pub struct EditCrtInput {
    pub new_crt_number: Option<String>,
    #[serde(default)]
    pub rolls: Vec<RollEdit>,
    pub justification: String,
}

const AUDIT_COLUMNS: &str =
    "id, crt_number, roll_id, field, old_value, new_value, justification, edited_by, edited_at";

/// Serialize writes to one CRT for the rest of the transaction
pub(crate) async fn lock_crt(conn: &mut PgConnection, crt: &str) -> AppResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(crt)
        .execute(conn)
        .await?;
    Ok(())
}

/// CRTs an edit must lock, in the order every writer takes them
fn edit_lock_keys<'a>(crt: &'a str, new_crt: Option<&'a str>) -> Vec<&'a str> {
    let mut keys = vec![crt];
    keys.extend(new_crt);
    keys.sort_unstable();
    keys
}

pub(crate) async fn crt_rolls(conn: &mut PgConnection, crt: &str) -> AppResult<Vec<Roll>> {
    let rolls = sqlx::query_as::<_, Roll>(&format!(
        "{} WHERE b.crt_number = $1 ORDER BY b.roll_number",
        roll_select()
    ))
    .bind(crt)
    .fetch_all(conn)
    .await?;
    Ok(rolls)
}

impl ConsolidationService {
    pub fn new(db: PgPool, events: OrderEvents) -> Self {
        Self { db, events }
    }

    /// The consolidation table
    pub async fn list_summaries(&self) -> AppResult<Vec<CrtSummary>> {
        let rolls = sqlx::query_as::<_, Roll>(&format!("{} ORDER BY b.crt_number", roll_select()))
            .fetch_all(&self.db)
            .await?;
        let orders = sqlx::query_as::<_, Order>(&format!("SELECT {} FROM pedidos", ORDER_COLUMNS))
            .fetch_all(&self.db)
            .await?;
        let volumes = sqlx::query_as::<_, ProgrammedVolume>(
            "SELECT crt_number, planned_rolls, planned_weight_kg, updated_at FROM crt_volumes_programados",
        )
        .fetch_all(&self.db)
        .await?;
        let pre_registrations = sqlx::query_as::<_, PreRegistration>(
            r#"
            SELECT id, crt_number, exporter, importer, origin, issue_date, planned_rolls,
                   planned_weight_kg, paper_type, notes, created_at
            FROM pre_cadastro
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(summarize_crts(&rolls, &orders, &volumes, &pre_registrations))
    }

    /// Flag the CRT's in-stock rolls and upsert the placeholder order
    pub async fn mark_load_complete(&self, crt_number: &str) -> AppResult<Order> {
        let crt = validate_crt_number(crt_number)?;
        let mut tx = self.db.begin().await?;
        lock_crt(&mut tx, &crt).await?;

        let rolls = crt_rolls(&mut tx, &crt).await?;
        if rolls.is_empty() {
            return Err(AppError::NotFound(format!("CRT {}", crt)));
        }
        let existing = fetch_order_by_crt(&mut tx, &crt).await?;
        check_can_mark_complete(&crt, existing.as_ref(), &rolls)?;

        // Planned figures follow the same precedence as the consolidation table
        let volumes = sqlx::query_as::<_, ProgrammedVolume>(
            "SELECT crt_number, planned_rolls, planned_weight_kg, updated_at FROM crt_volumes_programados WHERE crt_number = $1",
        )
        .bind(&crt)
        .fetch_all(&mut *tx)
        .await?;
        let pre_registrations = sqlx::query_as::<_, PreRegistration>(
            r#"
            SELECT id, crt_number, exporter, importer, origin, issue_date, planned_rolls,
                   planned_weight_kg, paper_type, notes, created_at
            FROM pre_cadastro WHERE crt_number = $1
            "#,
        )
        .bind(&crt)
        .fetch_all(&mut *tx)
        .await?;
        let summary = summarize_crts(&rolls, &[], &volumes, &pre_registrations)
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal(format!("no summary for CRT {}", crt)))?;

        sqlx::query("UPDATE bobinas SET load_complete = TRUE WHERE crt_number = $1 AND status = $2")
            .bind(&crt)
            .bind(RollStatus::InStock)
            .execute(&mut *tx)
            .await?;

        let first = rolls
            .iter()
            .find(|r| r.status == RollStatus::InStock)
            .unwrap_or(&rolls[0]);

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO pedidos (
                crt_number, paper_type, grammage, format, purchase_order, invoice_number,
                planned_rolls, planned_weight_kg, load_complete
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE)
            ON CONFLICT (crt_number) DO UPDATE
            SET load_complete = TRUE,
                paper_type = EXCLUDED.paper_type,
                grammage = EXCLUDED.grammage,
                format = EXCLUDED.format,
                purchase_order = EXCLUDED.purchase_order,
                invoice_number = EXCLUDED.invoice_number,
                planned_rolls = EXCLUDED.planned_rolls,
                planned_weight_kg = EXCLUDED.planned_weight_kg,
                cancelled = FALSE,
                cancellation_reason = NULL,
                cancelled_at = NULL,
                updated_at = NOW()
            WHERE pedidos.load_complete = FALSE AND pedidos.destination IS NULL
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(&crt)
        .bind(&first.paper_type)
        .bind(first.grammage)
        .bind(&first.format)
        .bind(&first.purchase_order)
        .bind(&first.invoice_number)
        .bind(i32::try_from(summary.programmed.rolls).unwrap_or(i32::MAX))
        .bind(summary.programmed.weight_kg)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| shared::consolidation::LoadCompleteBlock::AlreadyComplete(crt.clone()))?;

        tx.commit().await?;

        tracing::info!(crt = %crt, order_id = %order.id, "load marked complete");
        self.events.publish(order.id, &crt, OrderChangeKind::LoadComplete);
        Ok(order)
    }

    /// Upsert the programmed-volume override for a CRT
    pub async fn set_programmed_volume(
        &self,
        crt_number: &str,
        input: ProgrammedVolumeInput,
    ) -> AppResult<ProgrammedVolume> {
        let crt = validate_crt_number(crt_number)?;
        if input.planned_rolls < 0 || input.planned_weight_kg < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "planned_rolls".to_string(),
                message: "Programmed volume cannot be negative".to_string(),
                message_pt: "O volume programado não pode ser negativo".to_string(),
            });
        }

        let volume = sqlx::query_as::<_, ProgrammedVolume>(
            r#"
            INSERT INTO crt_volumes_programados (crt_number, planned_rolls, planned_weight_kg)
            VALUES ($1, $2, $3)
            ON CONFLICT (crt_number) DO UPDATE
            SET planned_rolls = EXCLUDED.planned_rolls,
                planned_weight_kg = EXCLUDED.planned_weight_kg,
                updated_at = NOW()
            RETURNING crt_number, planned_rolls, planned_weight_kg, updated_at
            "#,
        )
        .bind(&crt)
        .bind(input.planned_rolls)
        .bind(input.planned_weight_kg)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(crt = %crt, rolls = volume.planned_rolls, "programmed volume set");
        Ok(volume)
    }

    /// Turn a load-complete placeholder into a generated order
    pub async fn generate_order(&self, crt_number: &str, input: GenerateOrderInput) -> AppResult<OrderDetail> {
        let crt = validate_crt_number(crt_number)?;
        let destinations = validate_destinations(&input.destinations)?;

        let mut tx = self.db.begin().await?;
        lock_crt(&mut tx, &crt).await?;

        let placeholder = fetch_order_by_crt(&mut tx, &crt)
            .await?
            .ok_or_else(|| GenerateBlock::LoadNotComplete(crt.clone()))?;
        check_can_generate(&placeholder)?;

        let rolls: Vec<Roll> = crt_rolls(&mut tx, &crt)
            .await?
            .into_iter()
            .filter(|r| r.load_complete && r.status == RollStatus::InStock)
            .collect();
        let snapshot = rolls.first();

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE pedidos
            SET destination = $1, priority = $2, order_status = 'recebido',
                paper_type = COALESCE($3, paper_type),
                grammage = COALESCE($4, grammage),
                format = COALESCE($5, format),
                purchase_order = COALESCE($6, purchase_order),
                invoice_number = COALESCE($7, invoice_number),
                updated_at = NOW()
            WHERE id = $8
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(&destinations[0])
        .bind(input.priority)
        .bind(snapshot.map(|r| r.paper_type.clone()))
        .bind(snapshot.map(|r| r.grammage))
        .bind(snapshot.map(|r| r.format.clone()))
        .bind(snapshot.and_then(|r| r.purchase_order.clone()))
        .bind(snapshot.and_then(|r| r.invoice_number.clone()))
        .bind(placeholder.id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM pedidos_destinos WHERE order_id = $1")
            .bind(order.id)
            .execute(&mut *tx)
            .await?;
        for (i, destination) in destinations.iter().enumerate() {
            sqlx::query(
                "INSERT INTO pedidos_destinos (order_id, position, destination) VALUES ($1, $2, $3)",
            )
            .bind(order.id)
            .bind(i as i32 + 1)
            .bind(destination)
            .execute(&mut *tx)
            .await?;
        }

        for roll in &rolls {
            sqlx::query(
                "INSERT INTO pedidos_bobinas (order_id, roll_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(order.id)
            .bind(roll.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            crt = %crt,
            order_id = %order.id,
            destinations = destinations.len(),
            rolls = rolls.len(),
            "order generated"
        );
        self.events.publish(order.id, &crt, OrderChangeKind::Generated);

        OrderService::new(self.db.clone(), self.events.clone())
            .get_order(order.id)
            .await
    }

    /// Apply audited edits to a CRT and its rolls.
    ///
    /// Every changed field gets one history row, all scoped to the CRT as it
    /// reads after the edit.
    pub async fn edit_crt(
        &self,
        crt_number: &str,
        input: EditCrtInput,
        edited_by: &str,
    ) -> AppResult<Vec<EditHistoryEntry>> {
        let crt = validate_crt_number(crt_number)?;
        let justification = validate_justification(&input.justification)?;
        validate_unique_roll_ids(input.rolls.iter().map(|edit| edit.roll_id))?;
        for edit in &input.rolls {
            validate_roll_patch(&edit.patch)?;
        }
        let new_crt = match &input.new_crt_number {
            Some(new) if normalize_crt(new) != crt => Some(validate_crt_number(new)?),
            _ => None,
        };

        let mut tx = self.db.begin().await?;
        // A rename also holds the target CRT so no intake can claim it meanwhile
        for key in edit_lock_keys(&crt, new_crt.as_deref()) {
            lock_crt(&mut tx, key).await?;
        }

        let rolls = crt_rolls(&mut tx, &crt).await?;
        if rolls.is_empty() {
            return Err(AppError::NotFound(format!("CRT {}", crt)));
        }

        let mut changes: Vec<FieldChange> = Vec::new();
        for edit in &input.rolls {
            let current = rolls
                .iter()
                .find(|r| r.id == edit.roll_id)
                .ok_or_else(|| AppError::NotFound(format!("Roll {} in CRT {}", edit.roll_id, crt)))?;
            let roll_changes = diff_roll(current, &edit.patch);
            if roll_changes.is_empty() {
                continue;
            }

            let mut updated = current.clone();
            edit.patch.apply_to(&mut updated);
            sqlx::query(
                r#"
                UPDATE bobinas
                SET roll_number = $1, purchase_order = $2, sales_order = $3, paper_type = $4,
                    grammage = $5, format = $6, weight_kg = $7, origin = $8, exporter = $9,
                    importer = $10, street = $11, block = $12, shelf_row = $13
                WHERE id = $14
                "#,
            )
            .bind(&updated.roll_number)
            .bind(&updated.purchase_order)
            .bind(&updated.sales_order)
            .bind(&updated.paper_type)
            .bind(updated.grammage)
            .bind(&updated.format)
            .bind(updated.weight_kg)
            .bind(&updated.origin)
            .bind(&updated.exporter)
            .bind(&updated.importer)
            .bind(&updated.location.street)
            .bind(&updated.location.block)
            .bind(&updated.location.row)
            .bind(updated.id)
            .execute(&mut *tx)
            .await?;

            changes.extend(roll_changes);
        }

        let resulting_crt = match &new_crt {
            Some(new) => {
                let taken: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM bobinas WHERE crt_number = $1)",
                )
                .bind(new)
                .fetch_one(&mut *tx)
                .await?;
                if taken {
                    return Err(AppError::Validation {
                        field: "new_crt_number".to_string(),
                        message: format!("CRT {} is already registered", new),
                        message_pt: format!("O CRT {} já está cadastrado", new),
                    });
                }

                for table in [
                    "bobinas",
                    "notas_fiscais",
                    "pedidos",
                    "romaneios",
                    "crt_volumes_programados",
                    "pre_cadastro",
                    "crt_edit_history",
                ] {
                    sqlx::query(&format!("UPDATE {} SET crt_number = $1 WHERE crt_number = $2", table))
                        .bind(new)
                        .bind(&crt)
                        .execute(&mut *tx)
                        .await?;
                }
                changes.insert(0, FieldChange::crt_rename(&crt, new));
                new.clone()
            }
            None => crt.clone(),
        };

        if changes.is_empty() {
            return Err(AppError::ValidationError("No field was changed".to_string()));
        }

        let mut entries = Vec::with_capacity(changes.len());
        for change in &changes {
            let entry = sqlx::query_as::<_, EditHistoryEntry>(&format!(
                r#"
                INSERT INTO crt_edit_history (crt_number, roll_id, field, old_value, new_value, justification, edited_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING {}
                "#,
                AUDIT_COLUMNS
            ))
            .bind(&resulting_crt)
            .bind(change.roll_id)
            .bind(&change.field)
            .bind(&change.old_value)
            .bind(&change.new_value)
            .bind(&justification)
            .bind(edited_by)
            .fetch_one(&mut *tx)
            .await?;
            entries.push(entry);
        }

        let order_id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM pedidos WHERE crt_number = $1")
            .bind(&resulting_crt)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(crt = %resulting_crt, changes = entries.len(), "CRT edited");
        if let Some(order_id) = order_id {
            self.events.publish(order_id, &resulting_crt, OrderChangeKind::Edited);
        }
        Ok(entries)
    }

    /// Audit rows for a CRT, newest first
    pub async fn history(&self, crt_number: &str) -> AppResult<Vec<EditHistoryEntry>> {
        let crt = validate_crt_number(crt_number)?;
        let entries = sqlx::query_as::<_, EditHistoryEntry>(&format!(
            "SELECT {} FROM crt_edit_history WHERE crt_number = $1 ORDER BY edited_at DESC, id",
            AUDIT_COLUMNS
        ))
        .bind(&crt)
        .fetch_all(&self.db)
        .await?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_locks_both_crts_in_sorted_order() {
        assert_eq!(edit_lock_keys("BR200", None), vec!["BR200"]);
        assert_eq!(edit_lock_keys("BR200", Some("AR15")), vec!["AR15", "BR200"]);
        // Two opposite renames take the locks in the same order
        assert_eq!(edit_lock_keys("AR15", Some("BR200")), edit_lock_keys("BR200", Some("AR15")));
    }
}
