//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the in-memory store backend. All tables live in one StoreState behind
// a tokio RwLock; a transactional scope takes the write half exclusively, records an undo entry
// for every mutation, and replays the undo log in reverse if it is dropped without commit.
//
// | Component     | Description                                                 |
// |---------------|-------------------------------------------------------------|
// | MemoryStore   | Shared handle implementing the MarketStore port             |
// | MemoryScope   | One open placement scope holding the exclusive write guard  |
// | StoreState    | The tables: products, orders, order items, transactions     |
// | UndoOp        | One reversible mutation recorded inside a scope             |
//--------------------------------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::domain::models::types::{
    Order, OrderItem, OrderStatus, PlacedOrder, Product, Transaction,
};
use crate::store::{
    MarketStore, ProductUpdate, StoreError, StoreResult, StoreScope, TransactionWithUser,
};

/// The tables of the in-memory backend.
#[derive(Debug, Default)]
struct StoreState {
    products: HashMap<Uuid, Product>,
    orders: HashMap<Uuid, Order>,
    order_items: HashMap<Uuid, Vec<OrderItem>>,
    transactions: Vec<Transaction>,
    /// Uniqueness set for `Order::transaction_ref`.
    transaction_refs: HashSet<String>,
}

/// One reversible mutation recorded by an open scope.
#[derive(Debug)]
enum UndoOp {
    RestoreStock {
        product_id: Uuid,
        quantity: u32,
    },
    RemoveOrder {
        order_id: Uuid,
        transaction_ref: String,
    },
    RemoveTransaction {
        transaction_id: Uuid,
    },
}

/// In-memory implementation of the `MarketStore` port.
///
/// Cloning the handle shares the underlying state. Placement scopes hold the
/// write half of the lock for their whole lifetime, so overlapping placements
/// serialize and none of them can observe another's intermediate writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// An open placement scope over the in-memory tables.
///
/// The owned write guard keeps every other store operation parked until the
/// scope ends. The undo log makes the scope all-or-nothing: `commit` keeps
/// the writes, dropping the scope replays the log in reverse first.
struct MemoryScope {
    guard: OwnedRwLockWriteGuard<StoreState>,
    undo: Vec<UndoOp>,
    committed: bool,
}

impl Drop for MemoryScope {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if !self.undo.is_empty() {
            debug!(ops = self.undo.len(), "rolling back uncommitted scope");
        }
        let state = &mut *self.guard;
        for op in self.undo.drain(..).rev() {
            match op {
                UndoOp::RestoreStock {
                    product_id,
                    quantity,
                } => {
                    if let Some(product) = state.products.get_mut(&product_id) {
                        product.stock += quantity;
                    }
                }
                UndoOp::RemoveOrder {
                    order_id,
                    transaction_ref,
                } => {
                    state.orders.remove(&order_id);
                    state.order_items.remove(&order_id);
                    state.transaction_refs.remove(&transaction_ref);
                }
                UndoOp::RemoveTransaction { transaction_id } => {
                    state.transactions.retain(|t| t.id != transaction_id);
                }
            }
        }
    }
}

#[async_trait]
impl StoreScope for MemoryScope {
    async fn product_for_update(&mut self, product_id: Uuid) -> StoreResult<Product> {
        self.guard
            .products
            .get(&product_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn decrement_stock(&mut self, product_id: Uuid, quantity: u32) -> StoreResult<()> {
        let product = self
            .guard
            .products
            .get_mut(&product_id)
            .ok_or(StoreError::NotFound)?;
        let remaining = product.stock.checked_sub(quantity).ok_or_else(|| {
            StoreError::Conflict(format!("insufficient stock for product {product_id}"))
        })?;
        product.stock = remaining;
        self.undo.push(UndoOp::RestoreStock {
            product_id,
            quantity,
        });
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order, items: &[OrderItem]) -> StoreResult<()> {
        if self.guard.orders.contains_key(&order.id) {
            return Err(StoreError::Conflict(format!(
                "order {} already exists",
                order.id
            )));
        }
        if self.guard.transaction_refs.contains(&order.transaction_ref) {
            return Err(StoreError::Conflict(format!(
                "transaction reference {} already used",
                order.transaction_ref
            )));
        }
        self.guard.orders.insert(order.id, order.clone());
        self.guard.order_items.insert(order.id, items.to_vec());
        self.guard
            .transaction_refs
            .insert(order.transaction_ref.clone());
        self.undo.push(UndoOp::RemoveOrder {
            order_id: order.id,
            transaction_ref: order.transaction_ref.clone(),
        });
        Ok(())
    }

    // Gateway references are opaque labels, not identities; repeats are fine.
    async fn insert_transaction(&mut self, transaction: &Transaction) -> StoreResult<()> {
        if !self.guard.orders.contains_key(&transaction.order_id) {
            return Err(StoreError::Conflict(format!(
                "order {} does not exist",
                transaction.order_id
            )));
        }
        self.guard.transactions.push(transaction.clone());
        self.undo.push(UndoOp::RemoveTransaction {
            transaction_id: transaction.id,
        });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut this = self;
        this.committed = true;
        debug!(ops = this.undo.len(), "scope committed");
        Ok(())
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreScope>> {
        let guard = Arc::clone(&self.state).write_owned().await;
        Ok(Box::new(MemoryScope {
            guard,
            undo: Vec::new(),
            committed: false,
        }))
    }

    async fn active_products(&self) -> StoreResult<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.active)
            .cloned()
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn all_products(&self) -> StoreResult<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn insert_product(&self, product: Product) -> StoreResult<Product> {
        let mut state = self.state.write().await;
        if state.products.contains_key(&product.id) {
            return Err(StoreError::Conflict(format!(
                "product {} already exists",
                product.id
            )));
        }
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: Uuid, update: ProductUpdate) -> StoreResult<Product> {
        let mut state = self.state.write().await;
        let product = state.products.get_mut(&id).ok_or(StoreError::NotFound)?;
        product.name = update.name;
        product.description = update.description;
        product.price = update.price;
        product.stock = update.stock;
        product.active = update.active;
        Ok(product.clone())
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<PlacedOrder>> {
        let state = self.state.read().await;
        let mut orders: Vec<PlacedOrder> = state
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .map(|o| PlacedOrder {
                order: o.clone(),
                items: state.order_items.get(&o.id).cloned().unwrap_or_default(),
            })
            .collect();
        orders.sort_by(|a, b| b.order.created_at.cmp(&a.order.created_at));
        Ok(orders)
    }

    async fn all_orders(&self) -> StoreResult<Vec<PlacedOrder>> {
        let state = self.state.read().await;
        let mut orders: Vec<PlacedOrder> = state
            .orders
            .values()
            .map(|o| PlacedOrder {
                order: o.clone(),
                items: state.order_items.get(&o.id).cloned().unwrap_or_default(),
            })
            .collect();
        orders.sort_by(|a, b| b.order.created_at.cmp(&a.order.created_at));
        Ok(orders)
    }

    async fn order_with_items(&self, order_id: Uuid) -> StoreResult<PlacedOrder> {
        let state = self.state.read().await;
        let order = state
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;
        let items = state
            .order_items
            .get(&order_id)
            .cloned()
            .unwrap_or_default();
        Ok(PlacedOrder { order, items })
    }

    async fn update_order_status(
        &self,
        order_id: Uuid,
        next: OrderStatus,
    ) -> StoreResult<(OrderStatus, Order)> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::NotFound)?;
        let previous = order.status;
        if !previous.can_transition_to(next) {
            return Err(StoreError::Conflict(format!(
                "Invalid status transition from {previous:?} to {next:?}"
            )));
        }
        order.status = next;
        Ok((previous, order.clone()))
    }

    async fn transactions(&self) -> StoreResult<Vec<TransactionWithUser>> {
        let state = self.state.read().await;
        let mut transactions: Vec<TransactionWithUser> = state
            .transactions
            .iter()
            .filter_map(|t| {
                state.orders.get(&t.order_id).map(|o| TransactionWithUser {
                    transaction: t.clone(),
                    user_id: o.user_id,
                })
            })
            .collect();
        transactions.sort_by(|a, b| b.transaction.created_at.cmp(&a.transaction.created_at));
        transactions.truncate(100);
        Ok(transactions)
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                                  | Description                                    |
// |---------------------------------------|------------------------------------------------|
// | test_scope_commit_persists            | Committed writes survive the scope.            |
// | test_scope_drop_rolls_back            | Dropping an uncommitted scope undoes writes.   |
// | test_scope_reads_own_writes           | Decrements are visible inside the same scope.  |
// | test_decrement_underflow_is_conflict  | Stock can never go below zero.                 |
// | test_duplicate_transaction_ref        | Settlement references are unique.              |
// | test_status_update_follows_progression| Status moves obey the lifecycle.               |
// | test_product_listings                 | Active filter and newest-first ordering.       |
// | test_transactions_join_customer       | Admin listing carries the ordering user.       |
// | test_orders_for_user_filters_and_sorts| History is per-customer, newest first.         |
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::types::{TransactionStatus, new_gateway_ref, new_transaction_ref};
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
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

    fn create_test_order(user_id: Uuid, total: Decimal) -> Order {
        Order {
            id: Uuid::new_v4(),
            user_id,
            total_amount: total,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            transaction_ref: new_transaction_ref(),
        }
    }

    fn create_test_item(product: &Product, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: product.id,
            product_name: product.name.clone(),
            unit_price: product.price,
            quantity,
        }
    }

    /// Runs a full placement scope against the store and commits it.
    async fn place_test_order(store: &MemoryStore, user_id: Uuid, product: &Product, quantity: u32) -> Order {
        let order = create_test_order(user_id, product.price * Decimal::from(quantity));
        let items = vec![create_test_item(product, quantity)];
        let mut scope = store.begin().await.unwrap();
        scope.decrement_stock(product.id, quantity).await.unwrap();
        scope.insert_order(&order, &items).await.unwrap();
        scope
            .insert_transaction(&Transaction {
                id: Uuid::new_v4(),
                order_id: order.id,
                amount: order.total_amount,
                status: TransactionStatus::Success,
                gateway_ref: new_gateway_ref(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        scope.commit().await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_scope_commit_persists() {
        let store = MemoryStore::new();
        let product = create_test_product("Widget", dec!(10.00), 5, true);
        store.insert_product(product.clone()).await.unwrap();

        let user_id = Uuid::new_v4();
        let order = place_test_order(&store, user_id, &product, 2).await;

        let placed = store.order_with_items(order.id).await.unwrap();
        assert_eq!(placed.order.id, order.id);
        assert_eq!(placed.order.total_amount, dec!(20.00));
        assert_eq!(placed.items.len(), 1);
        assert_eq!(placed.items[0].quantity, 2);

        let products = store.all_products().await.unwrap();
        assert_eq!(products[0].stock, 3);
    }

    #[tokio::test]
    async fn test_scope_drop_rolls_back() {
        let store = MemoryStore::new();
        let product = create_test_product("Widget", dec!(10.00), 5, true);
        store.insert_product(product.clone()).await.unwrap();

        let order = create_test_order(Uuid::new_v4(), dec!(30.00));
        {
            let mut scope = store.begin().await.unwrap();
            scope.decrement_stock(product.id, 3).await.unwrap();
            scope
                .insert_order(&order, &[create_test_item(&product, 3)])
                .await
                .unwrap();
            // Dropped here without commit
        }

        let products = store.all_products().await.unwrap();
        assert_eq!(products[0].stock, 5);
        assert!(matches!(
            store.order_with_items(order.id).await,
            Err(StoreError::NotFound)
        ));
        assert!(store.all_orders().await.unwrap().is_empty());

        // The rolled-back reference is free again
        let mut scope = store.begin().await.unwrap();
        scope
            .insert_order(&order, &[create_test_item(&product, 3)])
            .await
            .unwrap();
        scope.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_scope_reads_own_writes() {
        let store = MemoryStore::new();
        let product = create_test_product("Widget", dec!(1.00), 5, true);
        store.insert_product(product.clone()).await.unwrap();

        let mut scope = store.begin().await.unwrap();
        assert_eq!(scope.product_for_update(product.id).await.unwrap().stock, 5);
        scope.decrement_stock(product.id, 2).await.unwrap();
        assert_eq!(scope.product_for_update(product.id).await.unwrap().stock, 3);
        scope.decrement_stock(product.id, 3).await.unwrap();
        assert_eq!(scope.product_for_update(product.id).await.unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_decrement_underflow_is_conflict() {
        let store = MemoryStore::new();
        let product = create_test_product("Widget", dec!(1.00), 2, true);
        store.insert_product(product.clone()).await.unwrap();

        let mut scope = store.begin().await.unwrap();
        let result = scope.decrement_stock(product.id, 3).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        drop(scope);

        assert_eq!(store.all_products().await.unwrap()[0].stock, 2);

        let mut scope = store.begin().await.unwrap();
        assert!(matches!(
            scope.decrement_stock(Uuid::new_v4(), 1).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_transaction_ref() {
        let store = MemoryStore::new();
        let product = create_test_product("Widget", dec!(1.00), 10, true);
        store.insert_product(product.clone()).await.unwrap();

        let first = create_test_order(Uuid::new_v4(), dec!(1.00));
        let mut scope = store.begin().await.unwrap();
        scope
            .insert_order(&first, &[create_test_item(&product, 1)])
            .await
            .unwrap();
        scope.commit().await.unwrap();

        let mut clashing = create_test_order(Uuid::new_v4(), dec!(1.00));
        clashing.transaction_ref = first.transaction_ref.clone();
        let mut scope = store.begin().await.unwrap();
        let result = scope
            .insert_order(&clashing, &[create_test_item(&product, 1)])
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_status_update_follows_progression() {
        let store = MemoryStore::new();
        let product = create_test_product("Widget", dec!(5.00), 10, true);
        store.insert_product(product.clone()).await.unwrap();
        let order = place_test_order(&store, Uuid::new_v4(), &product, 1).await;

        let (previous, updated) = store
            .update_order_status(order.id, OrderStatus::Paid)
            .await
            .unwrap();
        assert_eq!(previous, OrderStatus::Pending);
        assert_eq!(updated.status, OrderStatus::Paid);

        // Paid cannot jump straight to Completed
        let result = store
            .update_order_status(order.id, OrderStatus::Completed)
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));

        store
            .update_order_status(order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        let result = store.update_order_status(order.id, OrderStatus::Paid).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));

        assert!(matches!(
            store
                .update_order_status(Uuid::new_v4(), OrderStatus::Paid)
                .await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_product_listings() {
        let store = MemoryStore::new();
        let mut older = create_test_product("Older", dec!(1.00), 1, true);
        older.created_at = Utc::now() - Duration::seconds(60);
        let hidden = create_test_product("Hidden", dec!(2.00), 1, false);
        let newer = create_test_product("Newer", dec!(3.00), 1, true);

        store.insert_product(older.clone()).await.unwrap();
        store.insert_product(hidden.clone()).await.unwrap();
        store.insert_product(newer.clone()).await.unwrap();

        let active = store.active_products().await.unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].name, "Newer");
        assert_eq!(active[1].name, "Older");

        let all = store.all_products().await.unwrap();
        assert_eq!(all.len(), 3);

        // Duplicate insert refuses
        assert!(matches!(
            store.insert_product(newer.clone()).await,
            Err(StoreError::Conflict(_))
        ));

        store.delete_product(hidden.id).await.unwrap();
        assert!(matches!(
            store.delete_product(hidden.id).await,
            Err(StoreError::NotFound)
        ));
        assert_eq!(store.all_products().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_transactions_join_customer() {
        let store = MemoryStore::new();
        let product = create_test_product("Widget", dec!(4.00), 10, true);
        store.insert_product(product.clone()).await.unwrap();

        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        place_test_order(&store, alice, &product, 1).await;
        place_test_order(&store, bob, &product, 2).await;

        let transactions = store.transactions().await.unwrap();
        assert_eq!(transactions.len(), 2);
        let users: Vec<Uuid> = transactions.iter().map(|t| t.user_id).collect();
        assert!(users.contains(&alice));
        assert!(users.contains(&bob));
    }

    #[tokio::test]
    async fn test_orders_for_user_filters_and_sorts() {
        let store = MemoryStore::new();
        let product = create_test_product("Widget", dec!(2.50), 20, true);
        store.insert_product(product.clone()).await.unwrap();

        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        place_test_order(&store, alice, &product, 1).await;
        place_test_order(&store, bob, &product, 1).await;
        place_test_order(&store, alice, &product, 4).await;

        let mine = store.orders_for_user(alice).await.unwrap();
        assert_eq!(mine.len(), 2);
        // Newest first
        assert!(mine[0].order.created_at >= mine[1].order.created_at);
        assert_eq!(mine[0].order.total_amount, dec!(10.00));

        assert_eq!(store.all_orders().await.unwrap().len(), 3);
    }
}
