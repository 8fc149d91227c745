//! Reporting service: status totals, product table, OTIF and order summary

use serde::Deserialize;
use shared::analytics::{
    compute_otif, detailed_products, summarize_by_status, OtifReport, OtifStartPoint, ProductLine, StatusTotal,
};
use shared::DateRange;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::ReportingConfig;
use crate::error::{AppError, AppResult};
use crate::models::{roll_select, Order, OrderDestination, Roll, ORDER_COLUMNS};
use crate::services::documents;

#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
    settings: ReportingConfig,
}

/// OTIF query parameters; unset fields fall back to configuration
#[derive(Debug, Default, Deserialize)]
pub struct OtifQuery {
    pub start_point: Option<OtifStartPoint>,
    pub target_days: Option<i64>,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
}

impl OtifQuery {
    pub fn range(&self) -> AppResult<Option<DateRange>> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start > end => Err(AppError::Validation {
                field: "start_date".to_string(),
                message: "Start date must not be after end date".to_string(),
                message_pt: "A data inicial não pode ser posterior à data final".to_string(),
            }),
            (Some(start), Some(end)) => Ok(Some(DateRange { start, end })),
            (Some(start), None) => Ok(Some(DateRange {
                start,
                end: chrono::NaiveDate::MAX,
            })),
            (None, Some(end)) => Ok(Some(DateRange {
                start: chrono::NaiveDate::MIN,
                end,
            })),
            (None, None) => Ok(None),
        }
    }
}

impl ReportingService {
    pub fn new(db: PgPool, settings: ReportingConfig) -> Self {
        Self { db, settings }
    }

    async fn all_rolls(&self) -> AppResult<Vec<Roll>> {
        let rolls = sqlx::query_as::<_, Roll>(&roll_select())
            .fetch_all(&self.db)
            .await?;
        Ok(rolls)
    }

    async fn all_orders(&self) -> AppResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM pedidos ORDER BY created_at",
            ORDER_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(orders)
    }

    pub async fn status_summary(&self) -> AppResult<Vec<StatusTotal>> {
        let rolls = self.all_rolls().await?;
        Ok(summarize_by_status(&rolls))
    }

    pub async fn detailed_products(&self) -> AppResult<Vec<ProductLine>> {
        let orders = self.all_orders().await?;
        let rolls = self.all_rolls().await?;
        Ok(detailed_products(&orders, &rolls))
    }

    pub async fn otif(&self, query: &OtifQuery) -> AppResult<OtifReport> {
        let range = query.range()?;
        let target_days = query.target_days.unwrap_or(self.settings.otif_target_days);
        if target_days < 0 {
            return Err(AppError::Validation {
                field: "target_days".to_string(),
                message: "Target days must not be negative".to_string(),
                message_pt: "O prazo alvo não pode ser negativo".to_string(),
            });
        }
        let start_point = query.start_point.unwrap_or(self.settings.otif_start_point);

        let orders = self.all_orders().await?;
        let report = compute_otif(&orders, start_point, target_days, range.as_ref());
        tracing::debug!(
            total = report.total,
            on_time = report.on_time,
            percentage = report.percentage,
            "OTIF computed"
        );
        Ok(report)
    }

    /// Plain-text summary of one order, with its linked rolls
    pub async fn order_summary_text(&self, order_id: Uuid) -> AppResult<String> {
        let order = sqlx::query_as::<_, Order>(&format!("SELECT {} FROM pedidos WHERE id = $1", ORDER_COLUMNS))
            .bind(order_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let destinations = sqlx::query_as::<_, OrderDestination>(
            "SELECT id, order_id, position, destination FROM pedidos_destinos WHERE order_id = $1 ORDER BY position",
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        let rolls = sqlx::query_as::<_, Roll>(&format!(
            "{} JOIN pedidos_bobinas pb ON pb.roll_id = b.id WHERE pb.order_id = $1 ORDER BY b.roll_number",
            roll_select()
        ))
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        Ok(documents::order_summary_text(&order, &destinations, &rolls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_open_ended_ranges() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let query = OtifQuery {
            start_date: Some(day),
            ..Default::default()
        };
        let range = query.range().unwrap().unwrap();
        assert!(range.contains(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 4, 30).unwrap()));

        assert!(OtifQuery::default().range().unwrap().is_none());
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let query = OtifQuery {
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            ..Default::default()
        };
        assert!(matches!(query.range(), Err(AppError::Validation { .. })));
    }
}
