use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::types::{
    Order, OrderItem, OrderStatus, PlacedOrder, Product, Transaction,
};

pub mod memory;

// Re-exports
pub use memory::MemoryStore;

/// Editable catalog fields, applied as a full replace on update.
/// Identity and creation timestamp are never touched.
#[derive(Debug, Clone)]
pub struct ProductUpdate {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: u32,
    pub active: bool,
}

/// A transaction joined with the owning order's customer, for admin listings.
#[derive(Debug, Clone)]
pub struct TransactionWithUser {
    pub transaction: Transaction,
    pub user_id: Uuid,
}

/// Persistence port for the marketplace.
///
/// This trait defines the interface for catalog reads and writes, order
/// read-back, and opening a transactional scope for order placement.
/// Implementations must be thread-safe to support concurrent access.
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Opens a transactional scope.
    ///
    /// All reads and writes performed through the returned scope happen
    /// atomically: either `commit` makes every write visible at once, or
    /// dropping the scope leaves the store exactly as it was. While a scope
    /// is open no other placement can interleave with it.
    ///
    /// # Returns
    /// * `Ok(Box<dyn StoreScope>)` - The open scope
    /// * `Err(StoreError)` - If the scope could not be opened
    async fn begin(&self) -> StoreResult<Box<dyn StoreScope>>;

    /// Lists active catalog entries, newest first.
    async fn active_products(&self) -> StoreResult<Vec<Product>>;

    /// Lists the entire catalog including inactive entries, newest first.
    async fn all_products(&self) -> StoreResult<Vec<Product>>;

    /// Inserts a fully-built catalog entry.
    ///
    /// # Returns
    /// * `Ok(Product)` - The stored entry
    /// * `Err(StoreError::Conflict)` - If the id is already taken
    async fn insert_product(&self, product: Product) -> StoreResult<Product>;

    /// Replaces the editable fields of a catalog entry.
    ///
    /// # Returns
    /// * `Ok(Product)` - The updated entry
    /// * `Err(StoreError::NotFound)` - If no entry has this id
    async fn update_product(&self, id: Uuid, update: ProductUpdate) -> StoreResult<Product>;

    /// Removes a catalog entry. Existing order lines keep their snapshots.
    ///
    /// # Returns
    /// * `Ok(())` - If the entry was removed
    /// * `Err(StoreError::NotFound)` - If no entry has this id
    async fn delete_product(&self, id: Uuid) -> StoreResult<()>;

    /// Lists one customer's orders with their item snapshots, newest first.
    async fn orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<PlacedOrder>>;

    /// Lists every order with its item snapshots, newest first.
    async fn all_orders(&self) -> StoreResult<Vec<PlacedOrder>>;

    /// Fetches one order with its item snapshots.
    ///
    /// # Returns
    /// * `Ok(PlacedOrder)` - The order and its lines
    /// * `Err(StoreError::NotFound)` - If no order has this id
    async fn order_with_items(&self, order_id: Uuid) -> StoreResult<PlacedOrder>;

    /// Moves an order to `next` along the administrative progression.
    ///
    /// # Returns
    /// * `Ok((OrderStatus, Order))` - The previous status and the updated header
    /// * `Err(StoreError::NotFound)` - If no order has this id
    /// * `Err(StoreError::Conflict)` - If the transition is not allowed
    async fn update_order_status(
        &self,
        order_id: Uuid,
        next: OrderStatus,
    ) -> StoreResult<(OrderStatus, Order)>;

    /// Lists the most recent settlement attempts (at most 100), newest first,
    /// each joined with the ordering customer.
    async fn transactions(&self) -> StoreResult<Vec<TransactionWithUser>>;
}

/// One open transactional scope over the store.
///
/// A scope reads its own writes: a stock decrement performed through the
/// scope is visible to later `product_for_update` calls in the same scope.
/// Dropping a scope without calling `commit` rolls every write back.
#[async_trait]
pub trait StoreScope: Send {
    /// Reads a catalog entry for update, reflecting writes already made in
    /// this scope.
    ///
    /// # Returns
    /// * `Ok(Product)` - The current row
    /// * `Err(StoreError::NotFound)` - If no entry has this id
    async fn product_for_update(&mut self, product_id: Uuid) -> StoreResult<Product>;

    /// Subtracts `quantity` units from a product's stock.
    ///
    /// # Returns
    /// * `Ok(())` - If the stock was decremented
    /// * `Err(StoreError::NotFound)` - If no entry has this id
    /// * `Err(StoreError::Conflict)` - If the product lacks `quantity` units
    async fn decrement_stock(&mut self, product_id: Uuid, quantity: u32) -> StoreResult<()>;

    /// Inserts an order header together with its item snapshots.
    ///
    /// # Returns
    /// * `Ok(())` - If the order was staged
    /// * `Err(StoreError::Conflict)` - If the order id or the transaction
    ///   reference is already taken
    async fn insert_order(&mut self, order: &Order, items: &[OrderItem]) -> StoreResult<()>;

    /// Inserts a settlement record for an order staged in this scope.
    /// Gateway references are opaque labels and may repeat across records.
    ///
    /// # Returns
    /// * `Ok(())` - If the record was staged
    /// * `Err(StoreError::Conflict)` - If the owning order is not staged
    async fn insert_transaction(&mut self, transaction: &Transaction) -> StoreResult<()>;

    /// Makes every write in this scope durable at once.
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed row does not exist.
    #[error("not found")]
    NotFound,

    /// A uniqueness or state constraint was violated.
    #[error("{0}")]
    Conflict(String),

    /// The backend failed in a way the caller cannot reason about.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;
