// Expose the modules
pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod store;

// Re-export key types for easier usage
pub use domain::models::types::{
    CartLine, CartRequest, Order, OrderItem, OrderStatus, PlacedOrder, Product, Role,
    Transaction, TransactionStatus,
};
pub use domain::services::events::{EventBus, EventError, EventResult, MarketEvent};
pub use domain::services::placement::{PlacementEngine, PlacementError, PlacementResult};
pub use store::{MarketStore, MemoryStore, StoreError, StoreResult, StoreScope};
