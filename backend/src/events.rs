//! Order change notifications
//!
//! Every committed write to `pedidos` publishes an [`OrderChanged`] event on a
//! broadcast channel. Clients subscribe over SSE and re-fetch; delivery is
//! best effort and lagging subscribers simply miss events.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Buffered events per subscriber before it starts lagging
pub const EVENT_BUFFER: usize = 256;

/// Kind of change applied to an order row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderChangeKind {
    LoadComplete,
    Generated,
    Edited,
    StatusAdvanced,
    DipProcessed,
    Cancelled,
    Deleted,
}

impl OrderChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderChangeKind::LoadComplete => "load_complete",
            OrderChangeKind::Generated => "generated",
            OrderChangeKind::Edited => "edited",
            OrderChangeKind::StatusAdvanced => "status_advanced",
            OrderChangeKind::DipProcessed => "dip_processed",
            OrderChangeKind::Cancelled => "cancelled",
            OrderChangeKind::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderChanged {
    pub order_id: Uuid,
    pub crt_number: String,
    pub kind: OrderChangeKind,
}

/// Fan-out of order changes to any number of subscribers
#[derive(Clone)]
pub struct OrderEvents {
    sender: broadcast::Sender<OrderChanged>,
}

impl OrderEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a change; having no subscribers is not an error
    pub fn publish(&self, order_id: Uuid, crt_number: &str, kind: OrderChangeKind) {
        let event = OrderChanged {
            order_id,
            crt_number: crt_number.to_string(),
            kind,
        };
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!(%order_id, kind = kind.as_str(), receivers, "order change published"),
            Err(_) => tracing::trace!(%order_id, "order change dropped, no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderChanged> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for OrderEvents {
    fn default() -> Self {
        Self::new(EVENT_BUFFER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_published_change() {
        let events = OrderEvents::default();
        let mut rx = events.subscribe();
        assert_eq!(events.subscriber_count(), 1);
        let order_id = Uuid::new_v4();

        events.publish(order_id, "BR123", OrderChangeKind::Cancelled);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.order_id, order_id);
        assert_eq!(received.crt_number, "BR123");
        assert_eq!(received.kind, OrderChangeKind::Cancelled);
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let events = OrderEvents::new(0);
        events.publish(Uuid::new_v4(), "BR1", OrderChangeKind::Generated);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_old_events() {
        let events = OrderEvents::new(2);
        let mut rx = events.subscribe();
        for _ in 0..5 {
            events.publish(Uuid::new_v4(), "BR1", OrderChangeKind::Edited);
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        assert!(rx.recv().await.is_ok());
    }
}
