use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

pub mod engine;

/// Re-export key types for convenience
pub use self::engine::PlacementEngine;

/// Errors that can occur during order placement.
///
/// The first three variants are caller mistakes and safe to report verbatim.
/// `StorageFailure` is opaque: the backend detail goes to the logs, the
/// caller only learns that the placement did not happen and may be retried.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// The cart is empty or contains a non-positive quantity
    #[error("Invalid order items")]
    InvalidRequest,

    /// The product does not exist or is not open for ordering
    #[error("Product {product_id} not found or inactive")]
    ProductUnavailable { product_id: Uuid },

    /// The product has fewer units than the cart requests
    #[error("Insufficient stock for {product_name}")]
    InsufficientStock {
        product_id: Uuid,
        product_name: String,
        available: u32,
        requested: u32,
    },

    /// The store failed; nothing was written
    #[error("Failed to create order")]
    StorageFailure(#[source] StoreError),
}

/// Type alias for Result with PlacementError
pub type PlacementResult<T> = Result<T, PlacementError>;
