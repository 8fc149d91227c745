//! Customs/delivery status tracking for generated orders

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::consolidation::{cancelled_order, check_can_cancel};
use shared::validate_justification;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::events::{OrderChangeKind, OrderEvents};
use crate::models::{Order, OrderDestination, OrderStatus, ORDER_COLUMNS};

#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
    events: OrderEvents,
}

/// A generated order with its destinations and pipeline position
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub destinations: Vec<OrderDestination>,
    /// Index of the last completed pipeline stage
    pub completed_index: usize,
    pub stage_label: &'static str,
}

impl OrderDetail {
    pub fn new(order: Order, destinations: Vec<OrderDestination>) -> Self {
        let completed_index = order.pipeline_index();
        let stage_label = shared::ORDER_PIPELINE
            .get(completed_index)
            .map(OrderStatus::label)
            .unwrap_or_default();
        Self {
            order,
            destinations,
            completed_index,
            stage_label,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdvanceStatusInput {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct CancelOrderInput {
    pub justification: String,
}

/// The order for a CRT, locked for the rest of the transaction
pub async fn fetch_order_by_crt(conn: &mut PgConnection, crt: &str) -> AppResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {} FROM pedidos WHERE crt_number = $1 FOR UPDATE",
        ORDER_COLUMNS
    ))
    .bind(crt)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

async fn fetch_order_for_update(conn: &mut PgConnection, id: Uuid) -> AppResult<Order> {
    sqlx::query_as::<_, Order>(&format!(
        "SELECT {} FROM pedidos WHERE id = $1 FOR UPDATE",
        ORDER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Order".to_string()))
}

/// Where the order may move next, if anywhere
pub fn check_advance(order: &Order, target: OrderStatus) -> AppResult<()> {
    if order.cancelled || !order.is_generated() {
        return Err(AppError::InvalidStateTransition(format!(
            "order for CRT {} has not been generated",
            order.crt_number
        )));
    }
    let current = order.pipeline_index();
    if target.index() <= current {
        let from = shared::ORDER_PIPELINE
            .get(current)
            .map(|s| s.as_str())
            .unwrap_or("unknown");
        return Err(AppError::InvalidStateTransition(format!(
            "cannot move order for CRT {} from {} to {}",
            order.crt_number,
            from,
            target.as_str()
        )));
    }
    Ok(())
}

/// Status after DIP processing: early stages jump to separation
pub fn status_after_dip(current: Option<OrderStatus>) -> OrderStatus {
    match current {
        None | Some(OrderStatus::Recebido) | Some(OrderStatus::AguardandoDip) => OrderStatus::Separacao,
        Some(later) => later,
    }
}

impl OrderService {
    pub fn new(db: PgPool, events: OrderEvents) -> Self {
        Self { db, events }
    }

    async fn destinations_for(&self, order_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<OrderDestination>>> {
        let rows = sqlx::query_as::<_, OrderDestination>(
            r#"
            SELECT id, order_id, position, destination
            FROM pedidos_destinos
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<OrderDestination>> = HashMap::new();
        for row in rows {
            grouped.entry(row.order_id).or_default().push(row);
        }
        Ok(grouped)
    }

    /// Generated orders, newest first
    pub async fn list_orders(&self) -> AppResult<Vec<OrderDetail>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM pedidos WHERE destination IS NOT NULL AND cancelled = FALSE ORDER BY created_at DESC",
            ORDER_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let mut destinations = self.destinations_for(&ids).await?;

        Ok(orders
            .into_iter()
            .map(|order| {
                let dest = destinations.remove(&order.id).unwrap_or_default();
                OrderDetail::new(order, dest)
            })
            .collect())
    }

    pub async fn get_order(&self, id: Uuid) -> AppResult<OrderDetail> {
        let order = sqlx::query_as::<_, Order>(&format!("SELECT {} FROM pedidos WHERE id = $1", ORDER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        let destinations = self
            .destinations_for(&[id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(OrderDetail::new(order, destinations))
    }

    /// Move an order forward along the pipeline
    pub async fn advance_status(&self, id: Uuid, target: OrderStatus) -> AppResult<OrderDetail> {
        let mut tx = self.db.begin().await?;
        let order = fetch_order_for_update(&mut tx, id).await?;
        check_advance(&order, target)?;

        sqlx::query(
            r#"
            UPDATE pedidos
            SET order_status = $1,
                delivered_at = CASE WHEN $1 = 'entregue' THEN NOW() ELSE delivered_at END,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(target)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %id, crt = %order.crt_number, status = target.as_str(), "order status advanced");
        self.events.publish(id, &order.crt_number, OrderChangeKind::StatusAdvanced);
        self.get_order(id).await
    }

    /// Record that the DIP customs paperwork is complete
    pub async fn mark_dip_processed(&self, id: Uuid) -> AppResult<OrderDetail> {
        let mut tx = self.db.begin().await?;
        let order = fetch_order_for_update(&mut tx, id).await?;
        if order.cancelled || !order.is_generated() {
            return Err(AppError::InvalidStateTransition(format!(
                "order for CRT {} has not been generated",
                order.crt_number
            )));
        }
        if order.dip_processed {
            return Err(AppError::conflict(
                "dip_processed",
                format!("DIP for CRT {} was already processed", order.crt_number),
                format!("A DIP do CRT {} já foi processada", order.crt_number),
            ));
        }

        let status = status_after_dip(order.order_status);
        sqlx::query(
            r#"
            UPDATE pedidos
            SET dip_processed = TRUE, dip_processed_at = NOW(), order_status = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(status)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %id, crt = %order.crt_number, "DIP processed");
        self.events.publish(id, &order.crt_number, OrderChangeKind::DipProcessed);
        self.get_order(id).await
    }

    /// Cancel a generated order. Order fields and destination rows are
    /// reset; roll statuses are left alone.
    pub async fn cancel(&self, id: Uuid, justification: &str) -> AppResult<Order> {
        let justification = validate_justification(justification)?;

        let mut tx = self.db.begin().await?;
        let order = fetch_order_for_update(&mut tx, id).await?;
        check_can_cancel(&order)?;
        let reset = cancelled_order(&order, &justification, Utc::now());

        sqlx::query("DELETE FROM pedidos_destinos WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM pedidos_bobinas WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let cancelled = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE pedidos
            SET destination = $1, order_status = $2, load_complete = $3, cancelled = $4,
                cancellation_reason = $5, cancelled_at = $6, updated_at = $7
            WHERE id = $8
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(&reset.destination)
        .bind(reset.order_status)
        .bind(reset.load_complete)
        .bind(reset.cancelled)
        .bind(&reset.cancellation_reason)
        .bind(reset.cancelled_at)
        .bind(reset.updated_at)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %id, crt = %cancelled.crt_number, "order cancelled");
        self.events.publish(id, &cancelled.crt_number, OrderChangeKind::Cancelled);
        Ok(cancelled)
    }
}
