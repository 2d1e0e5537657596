//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the core order placement logic: cart validation, price snapshotting,
// stock reservation and the all-or-nothing write of order, items and settlement record.
//
// | Component                | Description                                                |
// |--------------------------|-----------------------------------------------------------|
// | PlacementEngine          | Main engine for validating carts and placing orders       |
// | PlacementError           | Error types specific to the placement process             |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Return Type      |
// |-------------------------|---------------------------------------------------|------------------|
// | place_order             | Validate a cart and place the order atomically    | PlacementResult  |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::models::types::{
    CartRequest, Order, OrderItem, OrderStatus, PlacedOrder, Transaction, TransactionStatus,
    new_gateway_ref, new_transaction_ref,
};
use crate::domain::services::events::{EventBus, MarketEvent};
use crate::store::{MarketStore, StoreError};

use super::{PlacementError, PlacementResult};

/// Logs the store detail and collapses it into the opaque placement error.
fn storage_failure(err: StoreError) -> PlacementError {
    error!("placement aborted by store: {err}");
    PlacementError::StorageFailure(err)
}

/// The core engine responsible for turning carts into orders.
///
/// # Overview
///
/// The placement engine is the only component that writes orders. For each
/// cart it:
///
/// * Validates that the cart is non-empty and every quantity is positive
/// * Re-reads each product inside a transactional scope and checks it is
///   active with sufficient stock
/// * Snapshots name and price into immutable order lines
/// * Accumulates the total in exact decimal arithmetic
/// * Decrements stock, never below zero
/// * Writes the order, its lines and a settlement record in one atomic unit
///
/// # Atomicity
///
/// All validation reads and all writes happen inside a single store scope.
/// If any line fails, the scope is dropped and the store is left exactly as
/// it was; no partial decrement or half-written order is ever visible.
///
/// # Concurrency
///
/// The store serializes scopes, so two placements touching the same product
/// cannot interleave. When a cart repeats a product id, later lines see the
/// decrements of earlier ones.
///
/// # Events
///
/// After a successful commit the engine publishes `OrderPlaced`, plus one
/// `StockDepleted` per product whose stock reached zero. Events are never
/// published for placements that roll back.
#[derive(Clone)]
pub struct PlacementEngine {
    /// Persistence port used for scopes and reads
    store: Arc<dyn MarketStore>,

    /// Bus for post-commit notifications
    event_bus: EventBus,
}

impl PlacementEngine {
    /// Creates a new placement engine.
    ///
    /// # Arguments
    ///
    /// * `store` - The persistence port orders are written through
    /// * `event_bus` - The bus post-commit events are published to
    ///
    /// # Returns
    ///
    /// A new `PlacementEngine` instance
    pub fn new(store: Arc<dyn MarketStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Validates a cart and places the order atomically.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The customer placing the order
    /// * `cart` - The requested lines
    ///
    /// # Returns
    ///
    /// A `PlacedOrder` carrying the committed header and its item snapshots
    ///
    /// # Errors
    ///
    /// Returns `PlacementError` if:
    /// * The cart is empty or a quantity is zero (`InvalidRequest`)
    /// * A product is missing or inactive (`ProductUnavailable`)
    /// * A product has fewer units than requested (`InsufficientStock`)
    /// * The store fails or the total overflows (`StorageFailure`)
    ///
    /// In every error case the store is left untouched.
    pub async fn place_order(
        &self,
        user_id: Uuid,
        cart: CartRequest,
    ) -> PlacementResult<PlacedOrder> {
        if cart.items.is_empty() || cart.items.iter().any(|line| line.quantity == 0) {
            return Err(PlacementError::InvalidRequest);
        }

        debug!(user_id = %user_id, lines = cart.items.len(), "placing order");

        // Everything from here to commit happens under one exclusive scope;
        // early returns drop the scope and roll back.
        let mut scope = self
            .store
            .begin()
            .await
            .map_err(storage_failure)?;

        let mut total = Decimal::ZERO;
        let mut items: Vec<OrderItem> = Vec::with_capacity(cart.items.len());
        let mut depleted: Vec<Uuid> = Vec::new();

        for line in &cart.items {
            let product = match scope.product_for_update(line.product_id).await {
                Ok(product) => product,
                Err(StoreError::NotFound) => {
                    return Err(PlacementError::ProductUnavailable {
                        product_id: line.product_id,
                    });
                }
                Err(e) => return Err(storage_failure(e)),
            };

            if !product.active {
                return Err(PlacementError::ProductUnavailable {
                    product_id: line.product_id,
                });
            }
            if product.stock < line.quantity {
                return Err(PlacementError::InsufficientStock {
                    product_id: product.id,
                    product_name: product.name,
                    available: product.stock,
                    requested: line.quantity,
                });
            }
            if product.stock == line.quantity {
                depleted.push(product.id);
            }

            total = product
                .price
                .checked_mul(Decimal::from(line.quantity))
                .and_then(|line_total| total.checked_add(line_total))
                .ok_or_else(|| {
                    storage_failure(StoreError::Backend(format!(
                        "order total overflow on product {}",
                        product.id
                    )))
                })?;
            items.push(OrderItem {
                product_id: product.id,
                product_name: product.name,
                unit_price: product.price,
                quantity: line.quantity,
            });

            scope
                .decrement_stock(line.product_id, line.quantity)
                .await
                .map_err(storage_failure)?;
        }

        let order = Order {
            id: Uuid::new_v4(),
            user_id,
            total_amount: total,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            transaction_ref: new_transaction_ref(),
        };
        scope
            .insert_order(&order, &items)
            .await
            .map_err(storage_failure)?;

        let transaction = Transaction {
            id: Uuid::new_v4(),
            order_id: order.id,
            amount: order.total_amount,
            status: TransactionStatus::Success,
            gateway_ref: new_gateway_ref(),
            created_at: Utc::now(),
        };
        scope
            .insert_transaction(&transaction)
            .await
            .map_err(storage_failure)?;

        scope.commit().await.map_err(storage_failure)?;

        info!(
            order_id = %order.id,
            user_id = %user_id,
            total = %order.total_amount,
            transaction_ref = %order.transaction_ref,
            "order placed"
        );

        let now = Utc::now();
        if let Err(e) = self.event_bus.publish(MarketEvent::OrderPlaced {
            order: order.clone(),
            items: items.clone(),
            timestamp: now,
        }) {
            warn!("Failed to publish order placed event: {}", e);
        }
        for product_id in depleted {
            if let Err(e) = self.event_bus.publish(MarketEvent::StockDepleted {
                product_id,
                timestamp: now,
            }) {
                warn!("Failed to publish stock depleted event: {}", e);
            }
        }

        Ok(PlacedOrder { order, items })
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                             | Description                                         |
// |----------------------------------|-----------------------------------------------------|
// | test_place_order_happy_path      | Multi-line cart commits with correct totals.        |
// | test_empty_cart_rejected         | Empty carts never open a scope.                     |
// | test_zero_quantity_rejected      | Non-positive quantities are invalid.                |
// | test_unknown_product             | Missing products abort the placement.               |
// | test_inactive_product            | Inactive products refuse orders.                    |
// | test_insufficient_stock          | Over-asking fails and decrements nothing.           |
// | test_failed_line_rolls_back      | A bad later line undoes earlier reservations.       |
// | test_repeated_lines_share_stock  | Duplicate product ids draw from one pool.           |
// | test_concurrent_last_unit        | Two racers for the last unit; exactly one wins.     |
// | test_price_snapshot_immunity     | Later catalog edits leave placed orders untouched.  |
// | test_events_after_commit         | OrderPlaced and StockDepleted reach subscribers.    |
// | test_storage_failure_is_opaque   | Backend failures surface as a generic message.      |
// | test_total_overflow_aborts       | Unrepresentable totals fail without panicking.      |
// | test_high_volume_placements      | Thousands of sequential placements all commit.      |
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::types::{CartLine, Product};
    use crate::store::memory::MemoryStore;
    use crate::store::{ProductUpdate, StoreResult, StoreScope, TransactionWithUser};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    fn create_test_product(name: &str, price: Decimal, stock: u32, active: bool) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            price,
            stock,
            active,
            created_at: Utc::now(),
        }
    }

    fn cart_of(lines: &[(Uuid, u32)]) -> CartRequest {
        CartRequest {
            items: lines
                .iter()
                .map(|&(product_id, quantity)| CartLine {
                    product_id,
                    quantity,
                })
                .collect(),
        }
    }

    fn setup_engine() -> (PlacementEngine, MemoryStore, EventBus) {
        let store = MemoryStore::new();
        let event_bus = EventBus::new(64);
        let engine = PlacementEngine::new(Arc::new(store.clone()), event_bus.clone());
        (engine, store, event_bus)
    }

    #[tokio::test]
    async fn test_place_order_happy_path() {
        let (engine, store, _) = setup_engine();
        let widget = create_test_product("Widget", dec!(10.00), 5, true);
        let gadget = create_test_product("Gadget", dec!(3.50), 8, true);
        store.insert_product(widget.clone()).await.unwrap();
        store.insert_product(gadget.clone()).await.unwrap();

        let user_id = Uuid::new_v4();
        let placed = engine
            .place_order(user_id, cart_of(&[(widget.id, 2), (gadget.id, 3)]))
            .await
            .unwrap();

        assert_eq!(placed.order.user_id, user_id);
        assert_eq!(placed.order.status, OrderStatus::Pending);
        assert_eq!(placed.order.total_amount, dec!(30.50));
        assert_eq!(placed.items.len(), 2);
        assert_eq!(placed.items[0].product_name, "Widget");
        assert_eq!(placed.items[0].unit_price, dec!(10.00));
        assert_eq!(placed.items[1].quantity, 3);
        assert!(placed.order.transaction_ref.starts_with("TXN-"));

        // Read-back returns the same snapshot
        let read_back = store.order_with_items(placed.order.id).await.unwrap();
        assert_eq!(read_back, placed);

        // Stock was reserved
        let products = store.all_products().await.unwrap();
        let stock_of = |id: Uuid| products.iter().find(|p| p.id == id).unwrap().stock;
        assert_eq!(stock_of(widget.id), 3);
        assert_eq!(stock_of(gadget.id), 5);

        // Exactly one successful settlement for the full amount
        let transactions = store.transactions().await.unwrap();
        assert_eq!(transactions.len(), 1);
        let TransactionWithUser { transaction, user_id: tx_user } = &transactions[0];
        assert_eq!(transaction.order_id, placed.order.id);
        assert_eq!(transaction.amount, dec!(30.50));
        assert_eq!(transaction.status, TransactionStatus::Success);
        assert!(transaction.gateway_ref.starts_with("GW-"));
        assert_eq!(*tx_user, user_id);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let (engine, store, _) = setup_engine();
        let result = engine
            .place_order(Uuid::new_v4(), CartRequest::default())
            .await;
        assert!(matches!(result, Err(PlacementError::InvalidRequest)));
        assert!(store.all_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let (engine, store, _) = setup_engine();
        let widget = create_test_product("Widget", dec!(1.00), 5, true);
        store.insert_product(widget.clone()).await.unwrap();

        let result = engine
            .place_order(Uuid::new_v4(), cart_of(&[(widget.id, 0)]))
            .await;
        assert!(matches!(result, Err(PlacementError::InvalidRequest)));
        assert_eq!(store.all_products().await.unwrap()[0].stock, 5);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let (engine, store, _) = setup_engine();
        let ghost = Uuid::new_v4();
        let result = engine.place_order(Uuid::new_v4(), cart_of(&[(ghost, 1)])).await;
        match result {
            Err(PlacementError::ProductUnavailable { product_id }) => {
                assert_eq!(product_id, ghost);
            }
            other => panic!("expected ProductUnavailable, got {other:?}"),
        }
        assert!(store.all_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_product() {
        let (engine, store, _) = setup_engine();
        let retired = create_test_product("Retired", dec!(2.00), 9, false);
        store.insert_product(retired.clone()).await.unwrap();

        let result = engine
            .place_order(Uuid::new_v4(), cart_of(&[(retired.id, 1)]))
            .await;
        assert!(matches!(
            result,
            Err(PlacementError::ProductUnavailable { .. })
        ));
        assert_eq!(store.all_products().await.unwrap()[0].stock, 9);
    }

    #[tokio::test]
    async fn test_insufficient_stock() {
        let (engine, store, _) = setup_engine();
        let scarce = create_test_product("Scarce", dec!(5.00), 2, true);
        store.insert_product(scarce.clone()).await.unwrap();

        let result = engine
            .place_order(Uuid::new_v4(), cart_of(&[(scarce.id, 3)]))
            .await;
        match result {
            Err(PlacementError::InsufficientStock {
                product_id,
                product_name,
                available,
                requested,
            }) => {
                assert_eq!(product_id, scarce.id);
                assert_eq!(product_name, "Scarce");
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(store.all_products().await.unwrap()[0].stock, 2);
        assert!(store.transactions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_line_rolls_back() {
        let (engine, store, _) = setup_engine();
        let plenty = create_test_product("Plenty", dec!(1.00), 10, true);
        let scarce = create_test_product("Scarce", dec!(1.00), 1, true);
        store.insert_product(plenty.clone()).await.unwrap();
        store.insert_product(scarce.clone()).await.unwrap();

        // First line reserves, second line fails; the reservation must undo
        let result = engine
            .place_order(
                Uuid::new_v4(),
                cart_of(&[(plenty.id, 4), (scarce.id, 2)]),
            )
            .await;
        assert!(matches!(
            result,
            Err(PlacementError::InsufficientStock { .. })
        ));

        let products = store.all_products().await.unwrap();
        let stock_of = |id: Uuid| products.iter().find(|p| p.id == id).unwrap().stock;
        assert_eq!(stock_of(plenty.id), 10);
        assert_eq!(stock_of(scarce.id), 1);
        assert!(store.all_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_lines_share_stock() {
        let (engine, store, _) = setup_engine();
        let widget = create_test_product("Widget", dec!(2.00), 5, true);
        store.insert_product(widget.clone()).await.unwrap();

        // 3 + 3 exceeds the pool of 5: the second line must see 2 remaining
        let result = engine
            .place_order(Uuid::new_v4(), cart_of(&[(widget.id, 3), (widget.id, 3)]))
            .await;
        match result {
            Err(PlacementError::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(store.all_products().await.unwrap()[0].stock, 5);

        // 3 + 2 drains the pool exactly
        let placed = engine
            .place_order(Uuid::new_v4(), cart_of(&[(widget.id, 3), (widget.id, 2)]))
            .await
            .unwrap();
        assert_eq!(placed.order.total_amount, dec!(10.00));
        assert_eq!(placed.items.len(), 2);
        assert_eq!(store.all_products().await.unwrap()[0].stock, 0);
    }

    #[tokio::test]
    async fn test_concurrent_last_unit() {
        let (engine, store, _) = setup_engine();
        let last = create_test_product("Last unit", dec!(99.99), 1, true);
        store.insert_product(last.clone()).await.unwrap();

        let first = tokio::spawn({
            let engine = engine.clone();
            let cart = cart_of(&[(last.id, 1)]);
            async move { engine.place_order(Uuid::new_v4(), cart).await }
        });
        let second = tokio::spawn({
            let engine = engine.clone();
            let cart = cart_of(&[(last.id, 1)]);
            async move { engine.place_order(Uuid::new_v4(), cart).await }
        });

        let results = [first.await.unwrap(), second.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);

        let failure = results.iter().find(|r| r.is_err()).unwrap();
        assert!(matches!(
            failure.as_ref().unwrap_err(),
            PlacementError::InsufficientStock { .. }
        ));

        assert_eq!(store.all_products().await.unwrap()[0].stock, 0);
        assert_eq!(store.all_orders().await.unwrap().len(), 1);
        assert_eq!(store.transactions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_price_snapshot_immunity() {
        let (engine, store, _) = setup_engine();
        let widget = create_test_product("Widget", dec!(10.00), 5, true);
        store.insert_product(widget.clone()).await.unwrap();

        let placed = engine
            .place_order(Uuid::new_v4(), cart_of(&[(widget.id, 2)]))
            .await
            .unwrap();
        assert_eq!(placed.order.total_amount, dec!(20.00));

        // Reprice and rename the product after the order committed
        store
            .update_product(
                widget.id,
                ProductUpdate {
                    name: "Widget Pro".to_string(),
                    description: String::new(),
                    price: dec!(95.00),
                    stock: 3,
                    active: true,
                },
            )
            .await
            .unwrap();

        // The stored order still carries the placement-time snapshot
        let read_back = store.order_with_items(placed.order.id).await.unwrap();
        assert_eq!(read_back.order.total_amount, dec!(20.00));
        assert_eq!(read_back.items[0].product_name, "Widget");
        assert_eq!(read_back.items[0].unit_price, dec!(10.00));
    }

    #[tokio::test]
    async fn test_events_after_commit() {
        let (engine, store, event_bus) = setup_engine();
        let widget = create_test_product("Widget", dec!(4.00), 2, true);
        store.insert_product(widget.clone()).await.unwrap();

        let mut subscriber = event_bus.subscribe();

        // A failed placement publishes nothing
        let _ = engine
            .place_order(Uuid::new_v4(), cart_of(&[(widget.id, 3)]))
            .await;

        // This one drains the stock and commits
        let placed = engine
            .place_order(Uuid::new_v4(), cart_of(&[(widget.id, 2)]))
            .await
            .unwrap();

        match subscriber.recv().await.unwrap() {
            MarketEvent::OrderPlaced { order, items, .. } => {
                assert_eq!(order.id, placed.order.id);
                assert_eq!(items.len(), 1);
            }
            other => panic!("expected OrderPlaced, got {other:?}"),
        }
        match subscriber.recv().await.unwrap() {
            MarketEvent::StockDepleted { product_id, .. } => {
                assert_eq!(product_id, widget.id);
            }
            other => panic!("expected StockDepleted, got {other:?}"),
        }
    }

    /// Store double whose scope can never be opened.
    struct FailingStore;

    #[async_trait]
    impl MarketStore for FailingStore {
        async fn begin(&self) -> StoreResult<Box<dyn StoreScope>> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
        async fn active_products(&self) -> StoreResult<Vec<Product>> {
            unimplemented!()
        }
        async fn all_products(&self) -> StoreResult<Vec<Product>> {
            unimplemented!()
        }
        async fn insert_product(&self, _product: Product) -> StoreResult<Product> {
            unimplemented!()
        }
        async fn update_product(&self, _id: Uuid, _update: ProductUpdate) -> StoreResult<Product> {
            unimplemented!()
        }
        async fn delete_product(&self, _id: Uuid) -> StoreResult<()> {
            unimplemented!()
        }
        async fn orders_for_user(&self, _user_id: Uuid) -> StoreResult<Vec<PlacedOrder>> {
            unimplemented!()
        }
        async fn all_orders(&self) -> StoreResult<Vec<PlacedOrder>> {
            unimplemented!()
        }
        async fn order_with_items(&self, _order_id: Uuid) -> StoreResult<PlacedOrder> {
            unimplemented!()
        }
        async fn update_order_status(
            &self,
            _order_id: Uuid,
            _next: OrderStatus,
        ) -> StoreResult<(OrderStatus, Order)> {
            unimplemented!()
        }
        async fn transactions(&self) -> StoreResult<Vec<TransactionWithUser>> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn test_storage_failure_is_opaque() {
        let engine = PlacementEngine::new(Arc::new(FailingStore), EventBus::new(8));
        let widget_id = Uuid::new_v4();

        let result = engine
            .place_order(Uuid::new_v4(), cart_of(&[(widget_id, 1)]))
            .await;
        match result {
            Err(e @ PlacementError::StorageFailure(_)) => {
                // The caller-facing message carries no backend detail
                assert_eq!(e.to_string(), "Failed to create order");
            }
            other => panic!("expected StorageFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_total_overflow_aborts() {
        let (engine, store, _) = setup_engine();
        let ingot = create_test_product("Ingot", Decimal::MAX, 5, true);
        store.insert_product(ingot.clone()).await.unwrap();

        // Two units at the ceiling price cannot be represented
        let result = engine
            .place_order(Uuid::new_v4(), cart_of(&[(ingot.id, 2)]))
            .await;
        match result {
            Err(e @ PlacementError::StorageFailure(_)) => {
                assert_eq!(e.to_string(), "Failed to create order");
            }
            other => panic!("expected StorageFailure, got {other:?}"),
        }

        // Overflow on a later line undoes the earlier reservation
        let result = engine
            .place_order(Uuid::new_v4(), cart_of(&[(ingot.id, 1), (ingot.id, 1)]))
            .await;
        assert!(matches!(result, Err(PlacementError::StorageFailure(_))));

        assert_eq!(store.all_products().await.unwrap()[0].stock, 5);
        assert!(store.all_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_high_volume_placements() {
        let (engine, store, _) = setup_engine();
        let widget = create_test_product("Widget", dec!(1.00), 10_000, true);
        store.insert_product(widget.clone()).await.unwrap();

        // Gateway references are drawn from a small keyspace and repeat well
        // before this many orders; a repeat must not fail a valid placement.
        for _ in 0..5_000 {
            engine
                .place_order(Uuid::new_v4(), cart_of(&[(widget.id, 1)]))
                .await
                .unwrap();
        }

        assert_eq!(store.all_products().await.unwrap()[0].stock, 5_000);
        assert_eq!(store.all_orders().await.unwrap().len(), 5_000);
    }
}
