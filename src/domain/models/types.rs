//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the core data types used throughout the order placement service,
// including products, carts, orders, transactions, and various status/role enums.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ENUMS              | Defines discrete sets of values (OrderStatus, Role...).          |
// | STRUCTS            | Defines the structure of Products, Orders and Transactions.      |
// | REFERENCES         | Generators for transaction and gateway reference strings.        |
// | TESTS              | Contains unit tests for the defined types.                       |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use rand::{Rng, distributions::Alphanumeric};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//--------------------------------------------------------------------------------------------------
//  ENUMS
//--------------------------------------------------------------------------------------------------
// | Name               | Description                                  |
// |--------------------|----------------------------------------------|
// | OrderStatus        | Lifecycle status of an order.                |
// | TransactionStatus  | Settlement outcome of a transaction.         |
// | Role               | Access role carried by an auth token.        |
//--------------------------------------------------------------------------------------------------

/// Lifecycle status of an order.
///
/// Orders progress `Pending -> Paid -> Processing -> Completed`, with `Cancelled`
/// reachable from any non-terminal state. The placement engine only ever creates
/// orders as `Pending`; later advancement is an administrative operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// The order has been placed but payment has not settled yet.
    Pending,
    /// Payment has settled.
    Paid,
    /// The order is being prepared for fulfilment.
    Processing,
    /// The order has been fulfilled. Terminal.
    Completed,
    /// The order was cancelled. Terminal.
    Cancelled,
}

impl OrderStatus {
    /// Returns true when no further status change is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the administrative progression allows moving to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Paid) => true,
            (Self::Paid, Self::Processing) => true,
            (Self::Processing, Self::Completed) => true,
            (from, Self::Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Settlement outcome recorded in the transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    /// The gateway accepted the settlement.
    Success,
    /// The gateway rejected the settlement.
    Failed,
    /// The settlement outcome is not yet known.
    Pending,
}

/// Access role carried by an authentication token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular customer.
    User,
    /// Back-office administrator.
    Admin,
}

impl Role {
    /// Stable string form used inside bearer tokens.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Parses the token string form back into a role.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

//--------------------------------------------------------------------------------------------------
//  STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                       |
// |---------------|---------------------------------------------------|
// | Product       | A catalog entry with live stock.                  |
// | CartLine      | One requested (product, quantity) pair.           |
// | CartRequest   | The full cart submitted for placement.            |
// | OrderItem     | Immutable per-line snapshot inside an order.      |
// | Order         | A placed order header.                            |
// | PlacedOrder   | Order header plus its item snapshots.             |
// | Transaction   | One settlement attempt for an order.              |
//--------------------------------------------------------------------------------------------------

/// A catalog entry. `stock` is the available-to-sell count and never goes
/// negative; `price` is copied into order lines at placement time, so later
/// catalog edits do not affect existing orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier for the product.
    pub id: Uuid,
    /// Display name (1..=255 characters).
    pub name: String,
    /// Free-form description, possibly empty.
    pub description: String,
    /// Unit price. Non-negative. Stored as Decimal.
    pub price: Decimal,
    /// Available-to-sell count.
    pub stock: u32,
    /// Inactive products are hidden from customers and refuse orders.
    pub active: bool,
    /// Timestamp of catalog insertion.
    pub created_at: DateTime<Utc>,
}

/// One requested line of a cart: which product, how many units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    /// The product being ordered.
    pub product_id: Uuid,
    /// Requested unit count. Must be strictly positive.
    pub quantity: u32,
}

/// The cart submitted to the placement engine. Ephemeral, never persisted.
///
/// Lines are processed in the order given. A product id may repeat across
/// lines; each line is checked against the stock state current inside the
/// transactional scope, so earlier lines' decrements are visible to later
/// ones.
#[derive(Debug, Clone, Default)]
pub struct CartRequest {
    /// Ordered list of requested lines.
    pub items: Vec<CartLine>,
}

/// Immutable snapshot of one order line, captured at placement time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Product the line refers to.
    pub product_id: Uuid,
    /// Product name at placement time.
    pub product_name: String,
    /// Unit price at placement time. Never recomputed from the catalog.
    pub unit_price: Decimal,
    /// Units ordered.
    pub quantity: u32,
}

impl OrderItem {
    /// Line total: unit price times quantity, in exact decimal arithmetic.
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A placed order header. `total_amount` equals the sum of its item line
/// totals, evaluated once at creation and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier for the order.
    pub id: Uuid,
    /// The customer that placed the order.
    pub user_id: Uuid,
    /// Sum of line totals at placement time.
    pub total_amount: Decimal,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Timestamp of placement.
    pub created_at: DateTime<Utc>,
    /// Human-readable settlement reference, unique across orders.
    pub transaction_ref: String,
}

/// An order header together with its item snapshots, as returned by the
/// placement engine and by read-back queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedOrder {
    /// The order header.
    pub order: Order,
    /// Per-line snapshots, in cart order.
    pub items: Vec<OrderItem>,
}

/// One settlement attempt, recorded in the same atomic unit as its order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier for the transaction.
    pub id: Uuid,
    /// The order this settlement belongs to. Exactly one per placed order.
    pub order_id: Uuid,
    /// Settled amount. Equals the order's total.
    pub amount: Decimal,
    /// Settlement outcome.
    pub status: TransactionStatus,
    /// Opaque identifier of the gateway attempt, unrelated to order identity.
    pub gateway_ref: String,
    /// Timestamp of the attempt.
    pub created_at: DateTime<Utc>,
}

//--------------------------------------------------------------------------------------------------
//  REFERENCES
//--------------------------------------------------------------------------------------------------
// | Name                 | Description                                  |
// |----------------------|----------------------------------------------|
// | new_transaction_ref  | TXN-{unix_millis}-{9 uppercase alnum}        |
// | new_gateway_ref      | GW-{random below 1_000_000}                  |
//--------------------------------------------------------------------------------------------------

/// Generates a settlement reference of the form `TXN-{unix_millis}-{suffix}`,
/// where the suffix is 9 uppercase alphanumeric characters.
///
/// Collision probability is negligible but not zero. The store enforces
/// uniqueness; a placement hitting the constraint fails as a storage error
/// and the caller retries with a fresh reference.
pub fn new_transaction_ref() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    format!("TXN-{}-{}", Utc::now().timestamp_millis(), suffix)
}

/// Generates an opaque gateway reference of the form `GW-{n}` with n below
/// one million.
pub fn new_gateway_ref() -> String {
    format!("GW-{}", rand::thread_rng().gen_range(0..1_000_000))
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                          | Description                                      |
// |-------------------------------|--------------------------------------------------|
// | test_status_progression       | Verify the administrative status chain.          |
// | test_cancel_from_non_terminal | Cancelled reachable from non-terminal only.      |
// | test_line_total_is_decimal    | Line totals carry no floating point drift.       |
// | test_reference_formats        | Reference strings follow the documented shape.   |
// | test_role_round_trip          | Role string form parses back.                    |
// | test_status_wire_names        | Wire names match the persisted vocabulary.       |
//--------------------------------------------------------------------------------------------------
