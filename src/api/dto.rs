//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                     | Description                               | Key Methods         |
// |--------------------------|-------------------------------------------|---------------------|
// | CreateOrderRequest       | Cart submitted by a customer              | try_into_cart       |
// | OrderItemResponse        | One order line on the wire                | from                |
// | OrderResponse            | Order header, optionally with items       | from                |
// | ProductRequest           | Catalog create/replace payload            | validate, into_*    |
// | ProductResponse          | Catalog entry on the wire                 | from                |
// | UpdateOrderStatusRequest | Administrative status change payload      | parsed_status       |
// | TransactionResponse      | Settlement row joined with its customer   | from                |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::domain::models::types::{
    CartLine, CartRequest, Order, OrderItem, OrderStatus, PlacedOrder, Product, TransactionStatus,
};
use crate::store::{ProductUpdate, TransactionWithUser};

/// One requested line of an incoming cart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRequest {
    /// Identifier of the product being ordered
    #[serde(rename = "productId")]
    pub product_id: Uuid,
    /// Requested unit count
    pub quantity: i64,
}

/// Request to place a new order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Ordered list of cart lines
    pub items: Vec<OrderItemRequest>,
}

impl CreateOrderRequest {
    /// Converts the request into a cart, rejecting empty carts and lines
    /// whose quantity is not a positive integer that fits in a u32.
    pub fn try_into_cart(self) -> Option<CartRequest> {
        if self.items.is_empty() {
            return None;
        }
        let mut items = Vec::with_capacity(self.items.len());
        for line in self.items {
            let quantity = u32::try_from(line.quantity).ok().filter(|q| *q > 0)?;
            items.push(CartLine {
                product_id: line.product_id,
                quantity,
            });
        }
        Some(CartRequest { items })
    }
}

/// One order line on the wire, named as the storefront expects it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemResponse {
    /// Identifier of the product the line refers to
    #[serde(rename = "productId")]
    pub product_id: Uuid,
    /// Product name captured at placement time
    pub name: String,
    /// Unit price captured at placement time
    pub price: Decimal,
    /// Units ordered
    pub quantity: u32,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.product_name,
            price: item.unit_price,
            quantity: item.quantity,
        }
    }
}

/// Response for an order. `items` is present everywhere except status
/// updates, which return the bare header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    /// Unique identifier for the order
    pub id: Uuid,
    /// The customer that placed the order
    pub user_id: Uuid,
    /// Sum of line totals at placement time
    pub total_amount: Decimal,
    /// Current lifecycle status
    pub status: OrderStatus,
    /// Timestamp of placement
    pub created_at: DateTime<Utc>,
    /// Settlement reference, unique across orders
    pub transaction_ref: String,
    /// Per-line snapshots, in cart order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<OrderItemResponse>>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            total_amount: order.total_amount,
            status: order.status,
            created_at: order.created_at,
            transaction_ref: order.transaction_ref,
            items: None,
        }
    }
}

impl From<PlacedOrder> for OrderResponse {
    fn from(placed: PlacedOrder) -> Self {
        let items = placed
            .items
            .into_iter()
            .map(OrderItemResponse::from)
            .collect();
        Self {
            items: Some(items),
            ..Self::from(placed.order)
        }
    }
}

/// Request to create or fully replace a catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRequest {
    /// Display name (1..=255 characters)
    pub name: String,
    /// Free-form description, defaults to empty
    #[serde(default)]
    pub description: String,
    /// Unit price, non-negative
    pub price: Decimal,
    /// Available-to-sell count, non-negative
    pub stock: i64,
    /// Whether the product is visible and orderable, defaults to true
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ProductRequest {
    /// Validates field constraints, returning the first violation message.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("\"name\" is not allowed to be empty".to_string());
        }
        if self.name.len() > 255 {
            return Err(
                "\"name\" length must be less than or equal to 255 characters long".to_string(),
            );
        }
        if self.price < Decimal::ZERO {
            return Err("\"price\" must be greater than or equal to 0".to_string());
        }
        if self.stock < 0 {
            return Err("\"stock\" must be greater than or equal to 0".to_string());
        }
        if self.stock > i64::from(u32::MAX) {
            return Err(format!(
                "\"stock\" must be less than or equal to {}",
                u32::MAX
            ));
        }
        Ok(())
    }

    /// Converts the request into a fresh catalog entry. Callers run
    /// `validate` first; `stock` is within u32 range after it passes.
    pub fn into_product(self) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            price: self.price,
            stock: self.stock as u32,
            active: self.active,
            created_at: Utc::now(),
        }
    }

    /// Converts the request into a full-replace update for an existing entry.
    /// Same `validate`-first contract as `into_product`.
    pub fn into_update(self) -> ProductUpdate {
        ProductUpdate {
            name: self.name,
            description: self.description,
            price: self.price,
            stock: self.stock as u32,
            active: self.active,
        }
    }
}

/// Catalog entry on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductResponse {
    /// Unique identifier for the product
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Unit price
    pub price: Decimal,
    /// Available-to-sell count
    pub stock: u32,
    /// Whether the product is visible and orderable
    pub active: bool,
    /// Timestamp of catalog insertion
    pub created_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            active: product.active,
            created_at: product.created_at,
        }
    }
}

/// Request to advance an order's lifecycle status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    /// Target status, one of the persisted status names
    pub status: String,
}

impl UpdateOrderStatusRequest {
    /// Parses the raw status string against the persisted vocabulary.
    pub fn parsed_status(&self) -> Option<OrderStatus> {
        match self.status.as_str() {
            "Pending" => Some(OrderStatus::Pending),
            "Paid" => Some(OrderStatus::Paid),
            "Processing" => Some(OrderStatus::Processing),
            "Completed" => Some(OrderStatus::Completed),
            "Cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// Settlement row joined with the customer that placed the order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    /// Unique identifier for the transaction
    pub id: Uuid,
    /// The order this settlement belongs to
    pub order_id: Uuid,
    /// Settled amount
    pub amount: Decimal,
    /// Settlement outcome
    pub status: TransactionStatus,
    /// Opaque identifier of the gateway attempt
    pub gateway_ref: String,
    /// Timestamp of the attempt
    pub created_at: DateTime<Utc>,
    /// The customer behind the order, joined from the order header
    pub user_id: Uuid,
}

impl From<TransactionWithUser> for TransactionResponse {
    fn from(row: TransactionWithUser) -> Self {
        Self {
            id: row.transaction.id,
            order_id: row.transaction.order_id,
            amount: row.transaction.amount,
            status: row.transaction.status,
            gateway_ref: row.transaction.gateway_ref,
            created_at: row.transaction.created_at,
            user_id: row.user_id,
        }
    }
}
