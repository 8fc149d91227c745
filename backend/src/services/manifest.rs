//! Manifest (romaneio) generation: trucks per destination, loading rolls
//! and the printable documents

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use shared::{validate_crt_number, OrderStatus};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::events::{OrderChangeKind, OrderEvents};
use crate::models::{
    roll_select, Manifest, Order, Roll, RollStatus, Truck, WaybillFields, MANIFEST_COLUMNS, ORDER_COLUMNS,
};
use crate::services::documents;
use crate::services::orders::fetch_order_by_crt;

#[derive(Clone)]
pub struct ManifestService {
    db: PgPool,
    events: OrderEvents,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateManifestInput {
    #[validate(length(min = 1, max = 40))]
    pub crt_number: String,
    pub manifest_date: NaiveDate,
    pub manifest_time: NaiveTime,
    #[validate(length(min = 1, max = 200))]
    pub driver_name: String,
    #[validate(length(min = 1, max = 20))]
    pub trailer_plate: String,
    #[validate(length(max = 20))]
    pub truck_plate: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub destination: String,
    #[validate(length(min = 1))]
    pub roll_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestDetail {
    #[serde(flatten)]
    pub manifest: Manifest,
    pub rolls: Vec<Roll>,
}

/// Outcome of loading rolls onto a truck
#[derive(Debug, Serialize)]
pub struct ManifestCreated {
    #[serde(flatten)]
    pub detail: ManifestDetail,
    /// In-stock rolls left for the CRT after this load
    pub remaining_in_stock: i64,
    pub order_advanced: bool,
}

fn required(field: &str, value: &str, label_en: &str, label_pt: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation {
            field: field.to_string(),
            message: format!("{} is required", label_en),
            message_pt: format!("Informe {}", label_pt),
        });
    }
    Ok(trimmed.to_string())
}

/// The order's own spelling of a requested destination, matched without
/// regard to case or surrounding blanks
pub fn match_destination<'a>(destinations: &'a [String], requested: &str) -> Option<&'a str> {
    let wanted = requested.trim().to_lowercase();
    destinations
        .iter()
        .map(|d| d.trim())
        .find(|d| d.to_lowercase() == wanted)
}

/// Check the selected rolls can go on this truck
pub fn check_selection(crt: &str, requested: &[Uuid], found: &[Roll]) -> AppResult<()> {
    let unique: BTreeSet<Uuid> = requested.iter().copied().collect();
    if unique.len() != found.len() {
        return Err(AppError::NotFound("One or more selected rolls".to_string()));
    }
    for roll in found {
        if roll.crt_number != crt {
            return Err(AppError::Validation {
                field: "roll_ids".to_string(),
                message: format!("Roll {} does not belong to CRT {}", roll.roll_number, crt),
                message_pt: format!("A bobina {} não pertence ao CRT {}", roll.roll_number, crt),
            });
        }
        if roll.status != RollStatus::InStock {
            return Err(AppError::InvalidStateTransition(format!(
                "roll {} is {} and cannot be loaded",
                roll.roll_number,
                roll.status.as_str()
            )));
        }
    }
    Ok(())
}

/// Invoice numbers of the selected rolls, deduplicated and sorted
pub fn invoice_label(rolls: &[Roll]) -> Option<String> {
    let numbers: BTreeSet<&str> = rolls.iter().filter_map(|r| r.invoice_number.as_deref()).collect();
    if numbers.is_empty() {
        None
    } else {
        Some(numbers.into_iter().collect::<Vec<_>>().join(", "))
    }
}

async fn manifest_rolls(conn: &mut PgConnection, manifest_id: Uuid) -> AppResult<Vec<Roll>> {
    let rolls = sqlx::query_as::<_, Roll>(&format!(
        "{} JOIN romaneios_bobinas rb ON rb.roll_id = b.id WHERE rb.manifest_id = $1 ORDER BY b.roll_number",
        roll_select()
    ))
    .bind(manifest_id)
    .fetch_all(conn)
    .await?;
    Ok(rolls)
}

impl ManifestService {
    pub fn new(db: PgPool, events: OrderEvents) -> Self {
        Self { db, events }
    }

    /// The order's destinations as numbered trucks
    pub async fn trucks(&self, crt_number: &str) -> AppResult<Vec<Truck>> {
        let crt = validate_crt_number(crt_number)?;
        let trucks = sqlx::query_as::<_, Truck>(
            r#"
            SELECT d.position AS number, d.destination,
                   (SELECT COUNT(*) FROM romaneios r
                    WHERE r.order_id = p.id AND r.destination = d.destination) AS manifests_issued
            FROM pedidos p
            JOIN pedidos_destinos d ON d.order_id = p.id
            WHERE p.crt_number = $1 AND p.destination IS NOT NULL
            ORDER BY d.position
            "#,
        )
        .bind(&crt)
        .fetch_all(&self.db)
        .await?;

        if trucks.is_empty() {
            return Err(AppError::NotFound(format!("Generated order for CRT {}", crt)));
        }
        Ok(trucks)
    }

    /// In-stock rolls of the CRT, available for any of its trucks
    pub async fn available_rolls(&self, crt_number: &str) -> AppResult<Vec<Roll>> {
        let crt = validate_crt_number(crt_number)?;
        let rolls = sqlx::query_as::<_, Roll>(&format!(
            "{} WHERE b.crt_number = $1 AND b.status = $2 ORDER BY b.roll_number",
            roll_select()
        ))
        .bind(&crt)
        .bind(RollStatus::InStock)
        .fetch_all(&self.db)
        .await?;
        Ok(rolls)
    }

    /// Load the selected rolls onto a truck.
    ///
    /// When no in-stock roll is left for the CRT the order moves to
    /// `carregamento`, unless it is already further along.
    pub async fn create(&self, input: CreateManifestInput, created_by: &str) -> AppResult<ManifestCreated> {
        input.validate()?;
        let crt = validate_crt_number(&input.crt_number)?;
        let driver = required("driver_name", &input.driver_name, "Driver", "o motorista")?;
        let plate = required("trailer_plate", &input.trailer_plate, "Plate", "a placa")?;
        let destination = required("destination", &input.destination, "Destination", "o destino")?;
        let truck_plate = input
            .truck_plate
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        let roll_ids: Vec<Uuid> = input
            .roll_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut tx = self.db.begin().await?;

        let order = fetch_order_by_crt(&mut tx, &crt)
            .await?
            .filter(|o| o.is_generated() && !o.cancelled)
            .ok_or_else(|| AppError::NotFound(format!("Generated order for CRT {}", crt)))?;

        let destinations: Vec<String> =
            sqlx::query_scalar("SELECT destination FROM pedidos_destinos WHERE order_id = $1 ORDER BY position")
                .bind(order.id)
                .fetch_all(&mut *tx)
                .await?;
        let destination = match_destination(&destinations, &destination)
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation {
                field: "destination".to_string(),
                message: format!("{} is not a destination of this order", destination),
                message_pt: format!("{} não é um destino deste pedido", destination),
            })?;

        let rolls = sqlx::query_as::<_, Roll>(&format!(
            "{} WHERE b.id = ANY($1) ORDER BY b.roll_number FOR UPDATE OF b",
            roll_select()
        ))
        .bind(&roll_ids)
        .fetch_all(&mut *tx)
        .await?;
        check_selection(&crt, &roll_ids, &rolls)?;

        let manifest = sqlx::query_as::<_, Manifest>(&format!(
            r#"
            INSERT INTO romaneios (
                manifest_date, manifest_time, driver_name, trailer_plate, truck_plate,
                crt_number, invoice_number, destination, order_id, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            MANIFEST_COLUMNS
        ))
        .bind(input.manifest_date)
        .bind(input.manifest_time)
        .bind(&driver)
        .bind(&plate)
        .bind(&truck_plate)
        .bind(&crt)
        .bind(invoice_label(&rolls))
        .bind(&destination)
        .bind(order.id)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        for roll_id in &roll_ids {
            sqlx::query("INSERT INTO romaneios_bobinas (manifest_id, roll_id) VALUES ($1, $2)")
                .bind(manifest.id)
                .bind(roll_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("UPDATE bobinas SET status = $1 WHERE id = ANY($2)")
            .bind(RollStatus::Loaded)
            .bind(&roll_ids)
            .execute(&mut *tx)
            .await?;

        let remaining_in_stock: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM bobinas WHERE crt_number = $1 AND status = $2")
                .bind(&crt)
                .bind(RollStatus::InStock)
                .fetch_one(&mut *tx)
                .await?;

        let order_advanced =
            remaining_in_stock == 0 && order.pipeline_index() < OrderStatus::Carregamento.index();
        if order_advanced {
            sqlx::query("UPDATE pedidos SET order_status = $1, updated_at = NOW() WHERE id = $2")
                .bind(OrderStatus::Carregamento)
                .bind(order.id)
                .execute(&mut *tx)
                .await?;
        }

        let loaded = manifest_rolls(&mut tx, manifest.id).await?;

        tx.commit().await?;

        tracing::info!(
            manifest_id = %manifest.id,
            crt = %crt,
            destination = %destination,
            rolls = loaded.len(),
            remaining_in_stock,
            "manifest created"
        );
        if order_advanced {
            self.events.publish(order.id, &crt, OrderChangeKind::StatusAdvanced);
        }

        Ok(ManifestCreated {
            detail: ManifestDetail {
                manifest,
                rolls: loaded,
            },
            remaining_in_stock,
            order_advanced,
        })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<ManifestDetail> {
        let mut conn = self.db.acquire().await?;
        let manifest = sqlx::query_as::<_, Manifest>(&format!(
            "SELECT {} FROM romaneios WHERE id = $1",
            MANIFEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Manifest".to_string()))?;
        let rolls = manifest_rolls(&mut conn, id).await?;
        Ok(ManifestDetail { manifest, rolls })
    }

    pub async fn render_manifest(&self, id: Uuid) -> AppResult<String> {
        let detail = self.get(id).await?;
        Ok(documents::manifest_html(&detail.manifest, &detail.rolls))
    }

    /// Waybill with operator-edited free-text fields
    pub async fn render_waybill(&self, id: Uuid, fields: &WaybillFields) -> AppResult<String> {
        let detail = self.get(id).await?;
        let order = match detail.manifest.order_id {
            Some(order_id) => {
                sqlx::query_as::<_, Order>(&format!("SELECT {} FROM pedidos WHERE id = $1", ORDER_COLUMNS))
                    .bind(order_id)
                    .fetch_optional(&self.db)
                    .await?
            }
            None => None,
        };
        Ok(documents::waybill_html(
            &detail.manifest,
            order.as_ref(),
            &detail.rolls,
            fields,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WarehouseLocation;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn roll(crt: &str, status: RollStatus, invoice: Option<&str>) -> Roll {
        Roll {
            id: Uuid::new_v4(),
            roll_number: format!("B-{}", &Uuid::new_v4().to_string()[..4]),
            crt_number: crt.to_string(),
            purchase_order: None,
            invoice_id: None,
            invoice_number: invoice.map(str::to_string),
            sales_order: None,
            paper_type: "Kraft".to_string(),
            grammage: 80,
            format: "1600".to_string(),
            weight_kg: Decimal::from(1000),
            origin: None,
            exporter: None,
            importer: None,
            location: WarehouseLocation::default(),
            status,
            load_complete: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_selection_must_be_in_stock_and_same_crt() {
        let ok = roll("BR1", RollStatus::InStock, None);
        assert!(check_selection("BR1", &[ok.id], &[ok.clone()]).is_ok());

        let loaded = roll("BR1", RollStatus::Loaded, None);
        assert!(matches!(
            check_selection("BR1", &[loaded.id], &[loaded.clone()]),
            Err(AppError::InvalidStateTransition(_))
        ));

        let other = roll("BR2", RollStatus::InStock, None);
        assert!(matches!(
            check_selection("BR1", &[other.id], &[other.clone()]),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_missing_roll_is_reported() {
        let ok = roll("BR1", RollStatus::InStock, None);
        assert!(matches!(
            check_selection("BR1", &[ok.id, Uuid::new_v4()], &[ok.clone()]),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_destination_takes_the_order_spelling() {
        let destinations = vec!["Buenos Aires".to_string(), "São Paulo".to_string(), " Rosario ".to_string()];
        assert_eq!(match_destination(&destinations, "buenos aires"), Some("Buenos Aires"));
        assert_eq!(match_destination(&destinations, "  SÃO PAULO"), Some("São Paulo"));
        assert_eq!(match_destination(&destinations, "rosario"), Some("Rosario"));
        assert_eq!(match_destination(&destinations, "Sao Paulo"), None);
        assert_eq!(match_destination(&destinations, "Córdoba"), None);
    }

    #[test]
    fn test_invoice_label_dedupes() {
        let rolls = vec![
            roll("BR1", RollStatus::InStock, Some("NF-2")),
            roll("BR1", RollStatus::InStock, Some("NF-1")),
            roll("BR1", RollStatus::InStock, Some("NF-2")),
            roll("BR1", RollStatus::InStock, None),
        ];
        assert_eq!(invoice_label(&rolls).as_deref(), Some("NF-1, NF-2"));
        assert_eq!(invoice_label(&[]), None);
    }

    #[test]
    fn test_required_trims() {
        assert_eq!(required("driver_name", "  Ana ", "Driver", "o motorista").unwrap(), "Ana");
        assert!(required("driver_name", "   ", "Driver", "o motorista").is_err());
    }
}
