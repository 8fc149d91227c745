//! Stock view service: in-stock rolls, invoice tagging and CSV export

use serde::{Deserialize, Serialize};
use shared::stock::{filter_stock, stock_row, STOCK_COLUMNS};
use shared::validate_crt_number;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{roll_select, Roll, RollStatus};

#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

#[derive(Debug, Default, Deserialize)]
pub struct StockQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetInvoiceInput {
    pub invoice_number: String,
}

#[derive(Debug, Serialize)]
pub struct RollsUpdated {
    pub crt_number: String,
    pub rolls_updated: u64,
}

impl StockService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn fetch_in_stock(&self) -> AppResult<Vec<Roll>> {
        let rolls = sqlx::query_as::<_, Roll>(&format!(
            "{} WHERE b.status = $1 ORDER BY b.crt_number, b.roll_number",
            roll_select()
        ))
        .bind(RollStatus::InStock)
        .fetch_all(&self.db)
        .await?;
        Ok(rolls)
    }

    /// In-stock rolls, filtered the same way the browser filters them
    pub async fn list_in_stock(&self, query: &StockQuery) -> AppResult<Vec<Roll>> {
        let rolls = self.fetch_in_stock().await?;
        Ok(filter_stock(&rolls, query.search.as_deref())
            .into_iter()
            .cloned()
            .collect())
    }

    /// Tag every in-stock roll of a CRT with an invoice number, creating the
    /// invoice row for the CRT when it does not exist yet
    pub async fn set_invoice_number(&self, crt_number: &str, number: &str) -> AppResult<RollsUpdated> {
        let crt = validate_crt_number(crt_number)?;
        let number = number.trim();
        if number.is_empty() {
            return Err(AppError::Validation {
                field: "invoice_number".to_string(),
                message: "Invoice number is required".to_string(),
                message_pt: "Informe o número da nota fiscal".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let existing: Option<uuid::Uuid> = sqlx::query_scalar(
            "SELECT id FROM notas_fiscais WHERE crt_number = $1 AND number = $2 LIMIT 1",
        )
        .bind(&crt)
        .bind(number)
        .fetch_optional(&mut *tx)
        .await?;

        let invoice_id = match existing {
            Some(id) => id,
            None => {
                sqlx::query_scalar(
                    "INSERT INTO notas_fiscais (number, crt_number) VALUES ($1, $2) RETURNING id",
                )
                .bind(number)
                .bind(&crt)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        let result = sqlx::query(
            "UPDATE bobinas SET invoice_id = $1 WHERE crt_number = $2 AND status = $3",
        )
        .bind(invoice_id)
        .bind(&crt)
        .bind(RollStatus::InStock)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("In-stock rolls for CRT {}", crt)));
        }

        tx.commit().await?;

        tracing::info!(crt = %crt, invoice = number, rolls = result.rows_affected(), "invoice tagged");
        Ok(RollsUpdated {
            crt_number: crt,
            rolls_updated: result.rows_affected(),
        })
    }

    /// Record the arrival of a CRT's in-transit rolls
    pub async fn receive(&self, crt_number: &str) -> AppResult<RollsUpdated> {
        let crt = validate_crt_number(crt_number)?;
        let result = sqlx::query("UPDATE bobinas SET status = $1 WHERE crt_number = $2 AND status = $3")
            .bind(RollStatus::InStock)
            .bind(&crt)
            .bind(RollStatus::InTransit)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidStateTransition(format!(
                "CRT {} has no rolls in transit",
                crt
            )));
        }

        tracing::info!(crt = %crt, rolls = result.rows_affected(), "rolls received");
        Ok(RollsUpdated {
            crt_number: crt,
            rolls_updated: result.rows_affected(),
        })
    }

    /// CSV of the filtered stock view
    pub async fn export_csv(&self, query: &StockQuery) -> AppResult<String> {
        let rolls = self.fetch_in_stock().await?;
        let filtered = filter_stock(&rolls, query.search.as_deref());
        write_stock_csv(&filtered)
    }
}

/// Header equals the displayed columns; one record per roll
pub fn write_stock_csv(rolls: &[&Roll]) -> AppResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(STOCK_COLUMNS)
        .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
    for roll in rolls {
        wtr.write_record(stock_row(roll))
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WarehouseLocation;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn roll(number: &str, exporter: &str, status: RollStatus) -> Roll {
        Roll {
            id: Uuid::new_v4(),
            roll_number: number.to_string(),
            crt_number: "BR500".to_string(),
            purchase_order: None,
            invoice_id: None,
            invoice_number: Some("NF-9".to_string()),
            sales_order: Some("OV-1".to_string()),
            paper_type: "Kraft, natural".to_string(),
            grammage: 80,
            format: "1600".to_string(),
            weight_kg: Decimal::new(9875, 1),
            origin: None,
            exporter: Some(exporter.to_string()),
            importer: None,
            location: WarehouseLocation::default(),
            status,
            load_complete: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_csv_header_and_row_count_follow_filter() {
        let rolls = vec![
            roll("B-1", "Papelera Sur", RollStatus::InStock),
            roll("B-2", "Celulosa Norte", RollStatus::InStock),
            roll("B-3", "Papelera Sur", RollStatus::Loaded),
        ];
        let filtered = filter_stock(&rolls, Some("papelera"));
        let csv = write_stock_csv(&filtered).unwrap();

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(headers, STOCK_COLUMNS.to_vec());

        let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), filtered.len());
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], "B-1");
        // Quoted field with a comma survives
        assert_eq!(&records[0][5], "Kraft, natural");
    }

    #[test]
    fn test_empty_export_still_has_header() {
        let csv = write_stock_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
