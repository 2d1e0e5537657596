//--------------------------------------------------------------------------------------------------
// STRUCTS & ENUMS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods       |
// |-------------------------|---------------------------------------------------|------------------|
// | MarketEvent             | Event variants for the placement service          | clone, send, sync |
// | EventError              | Error types for event processing                  | error, from       |
//--------------------------------------------------------------------------------------------------

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::types::{Order, OrderItem, OrderStatus};

/// Errors that can occur in the event system
#[derive(Error, Debug, Clone)]
pub enum EventError {
    /// Failed to publish an event (e.g., channel closed)
    #[error("Failed to publish event: {0}")]
    PublishError(String),
}

/// Type alias for Result with EventError
pub type EventResult<T> = Result<T, EventError>;

/// Events emitted by the placement service after their effects are durable.
///
/// Events are published only once the originating write has committed, so a
/// subscriber never observes an order or stock level that later rolls back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MarketEvent {
    /// Generated when an order commits
    OrderPlaced {
        /// The committed order header
        order: Order,
        /// The item snapshots captured at placement time
        items: Vec<OrderItem>,
        /// Timestamp when the event occurred
        timestamp: chrono::DateTime<Utc>,
    },

    /// Generated when a placement drains a product's stock to zero
    StockDepleted {
        /// The product that ran out
        product_id: Uuid,
        /// Timestamp when the event occurred
        timestamp: chrono::DateTime<Utc>,
    },

    /// Generated when an order's status changes
    OrderStatusChanged {
        /// The order ID
        order_id: Uuid,
        /// Previous status
        previous_status: OrderStatus,
        /// New status
        new_status: OrderStatus,
        /// Timestamp when the event occurred
        timestamp: chrono::DateTime<Utc>,
    },
}
