//! Order (pedido) models and the customs/delivery pipeline

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A consolidated shipment for one CRT.
///
/// The row exists in two phases: a placeholder created when the load is
/// marked complete (`destination` is `None`) and a generated order once
/// destinations are filled in and the pipeline starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: Uuid,
    pub crt_number: String,
    pub paper_type: Option<String>,
    pub grammage: Option<i32>,
    pub format: Option<String>,
    pub purchase_order: Option<String>,
    pub invoice_number: Option<String>,
    pub planned_rolls: Option<i32>,
    pub planned_weight_kg: Option<Decimal>,
    /// First destination, kept on the order row for quick lookups
    pub destination: Option<String>,
    pub priority: Option<Priority>,
    pub order_status: Option<OrderStatus>,
    pub dip_processed: bool,
    pub dip_processed_at: Option<DateTime<Utc>>,
    pub load_complete: bool,
    pub cancelled: bool,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Generated orders carry a destination; placeholders do not
    pub fn is_generated(&self) -> bool {
        self.destination.is_some()
    }

    /// A placeholder waiting for the order form
    pub fn is_complete_placeholder(&self) -> bool {
        self.destination.is_none() && self.load_complete
    }

    /// Index of the last completed pipeline stage
    pub fn pipeline_index(&self) -> usize {
        pipeline_index(self.order_status, self.dip_processed)
    }
}

/// One destination ("truck") of an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderDestination {
    pub id: Uuid,
    pub order_id: Uuid,
    /// 1-based position, also the truck number
    pub position: i32,
    pub destination: String,
}

/// Order priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "VARCHAR", rename_all = "lowercase")
)]
pub enum Priority {
    Baixa,
    #[default]
    Normal,
    Alta,
    Urgente,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Baixa => "baixa",
            Priority::Normal => "normal",
            Priority::Alta => "alta",
            Priority::Urgente => "urgente",
        }
    }
}

/// Fixed linear customs/delivery pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "VARCHAR", rename_all = "snake_case")
)]
pub enum OrderStatus {
    Recebido,
    AguardandoDip,
    Separacao,
    Carregamento,
    AduanaBr,
    AduanaAr,
    Rota,
    Entregue,
}

/// Pipeline in order
pub const ORDER_PIPELINE: [OrderStatus; 8] = [
    OrderStatus::Recebido,
    OrderStatus::AguardandoDip,
    OrderStatus::Separacao,
    OrderStatus::Carregamento,
    OrderStatus::AduanaBr,
    OrderStatus::AduanaAr,
    OrderStatus::Rota,
    OrderStatus::Entregue,
];

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Recebido => "recebido",
            OrderStatus::AguardandoDip => "aguardando_dip",
            OrderStatus::Separacao => "separacao",
            OrderStatus::Carregamento => "carregamento",
            OrderStatus::AduanaBr => "aduana_br",
            OrderStatus::AduanaAr => "aduana_ar",
            OrderStatus::Rota => "rota",
            OrderStatus::Entregue => "entregue",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        ORDER_PIPELINE.iter().copied().find(|status| status.as_str() == s)
    }

    /// Position in [`ORDER_PIPELINE`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Operator-facing label
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Recebido => "Pedido recebido",
            OrderStatus::AguardandoDip => "Aguardando DIP",
            OrderStatus::Separacao => "Separação",
            OrderStatus::Carregamento => "Carregamento",
            OrderStatus::AduanaBr => "Aduana Brasil",
            OrderStatus::AduanaAr => "Aduana Argentina",
            OrderStatus::Rota => "Em rota",
            OrderStatus::Entregue => "Entregue",
        }
    }

    /// Statuses only move forward along the pipeline
    pub fn can_advance_to(&self, next: OrderStatus) -> bool {
        next > *self
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Completed-up-to index for an order.
///
/// Uses the explicit status when present; otherwise derives it from the
/// DIP flag (processed paperwork means the order is in separation).
pub fn pipeline_index(status: Option<OrderStatus>, dip_processed: bool) -> usize {
    match status {
        Some(status) => status.index(),
        None if dip_processed => OrderStatus::Separacao.index(),
        None => OrderStatus::Recebido.index(),
    }
}

/// Consolidation state of a CRT that has no generated order yet
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidationState {
    /// A load-complete placeholder order exists
    Completa,
    /// At least one roll is still in transit
    EmTransito,
    /// Every roll is in stock but the load is not marked complete
    EmEstoque,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_indices_are_sequential() {
        for (i, status) in ORDER_PIPELINE.iter().enumerate() {
            assert_eq!(status.index(), i);
            assert_eq!(OrderStatus::parse(status.as_str()), Some(*status));
        }
    }

    #[test]
    fn test_advance_is_forward_only() {
        assert!(OrderStatus::Recebido.can_advance_to(OrderStatus::Carregamento));
        assert!(!OrderStatus::Carregamento.can_advance_to(OrderStatus::Carregamento));
        assert!(!OrderStatus::Rota.can_advance_to(OrderStatus::AduanaBr));
    }

    #[test]
    fn test_pipeline_index_falls_back_to_dip_flag() {
        assert_eq!(pipeline_index(Some(OrderStatus::AduanaAr), false), 5);
        assert_eq!(pipeline_index(None, true), 2);
        assert_eq!(pipeline_index(None, false), 0);
    }

    #[test]
    fn test_priority_defaults_to_normal() {
        assert_eq!(Priority::default(), Priority::Normal);
        assert_eq!(Priority::Urgente.as_str(), "urgente");
    }
}
