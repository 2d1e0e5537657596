//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                            | Return Type         |
// |-----------------------|----------------------------------------|---------------------|
// | health                | Health check endpoint                  | Response            |
// | get_active_products   | List products visible to customers     | ApiResult<Response> |
// | get_all_products      | List the whole catalog (admin)         | ApiResult<Response> |
// | create_product        | Add a catalog entry (admin)            | ApiResult<Response> |
// | update_product        | Replace a catalog entry (admin)        | ApiResult<Response> |
// | delete_product        | Remove a catalog entry (admin)         | ApiResult<Response> |
// | create_order          | Place an order from a cart             | ApiResult<Response> |
// | get_my_orders         | List the caller's orders               | ApiResult<Response> |
// | get_all_orders        | List every order (admin)               | ApiResult<Response> |
// | get_order             | Get one order with its items           | ApiResult<Response> |
// | update_order_status   | Advance an order's status (admin)      | ApiResult<Response> |
// | get_transactions      | List settlement records (admin)        | ApiResult<Response> |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;
use axum::{
    extract::{Path, Extension},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use super::{
    AppState,
    ApiError,
    ApiResult,
    CreateOrderRequest,
    OrderResponse,
    ProductRequest,
    ProductResponse,
    TransactionResponse,
    UpdateOrderStatusRequest,
};
use crate::auth::{AuthClaims, AuthError};
use crate::domain::models::types::Role;
use crate::domain::services::events::MarketEvent;
use crate::store::StoreError;

/// Pulls the bearer token out of the Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Verifies the caller's token and returns its claims
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthClaims, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
    state.authenticator.verify(token)
}

/// Like `authenticate`, but additionally requires the admin role
fn authenticate_admin(state: &AppState, headers: &HeaderMap) -> Result<AuthClaims, AuthError> {
    let claims = authenticate(state, headers)?;
    if claims.role != Role::Admin {
        return Err(AuthError::AdminRequired);
    }
    Ok(claims)
}

/// Maps a store error onto the wire, logging backend detail server-side only
fn map_store_error(err: StoreError, not_found: &str, internal: &str) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::NotFound(not_found.to_string()),
        StoreError::Conflict(msg) => ApiError::BadRequest(msg),
        StoreError::Backend(detail) => {
            error!("store failure: {detail}");
            ApiError::Internal(internal.to_string())
        }
    }
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

/// List products visible to customers
pub async fn get_active_products(
    Extension(state): Extension<Arc<AppState>>,
) -> ApiResult<Response> {
    let products = state
        .store
        .active_products()
        .await
        .map_err(|e| map_store_error(e, "Product not found", "Failed to fetch products"))?;

    let products: Vec<ProductResponse> =
        products.into_iter().map(ProductResponse::from).collect();
    Ok((StatusCode::OK, Json(json!({ "products": products }))).into_response())
}

/// List the whole catalog, inactive entries included
pub async fn get_all_products(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    authenticate_admin(&state, &headers)?;

    let products = state
        .store
        .all_products()
        .await
        .map_err(|e| map_store_error(e, "Product not found", "Failed to fetch products"))?;

    let products: Vec<ProductResponse> =
        products.into_iter().map(ProductResponse::from).collect();
    Ok((StatusCode::OK, Json(json!({ "products": products }))).into_response())
}

/// Add a new catalog entry
pub async fn create_product(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ProductRequest>,
) -> ApiResult<Response> {
    authenticate_admin(&state, &headers)?;
    req.validate().map_err(ApiError::BadRequest)?;

    let product = state
        .store
        .insert_product(req.into_product())
        .await
        .map_err(|e| map_store_error(e, "Product not found", "Failed to create product"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "product": ProductResponse::from(product) })),
    )
        .into_response())
}

/// Replace an existing catalog entry
pub async fn update_product(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<ProductRequest>,
) -> ApiResult<Response> {
    authenticate_admin(&state, &headers)?;
    req.validate().map_err(ApiError::BadRequest)?;

    let product = state
        .store
        .update_product(id, req.into_update())
        .await
        .map_err(|e| map_store_error(e, "Product not found", "Failed to update product"))?;

    Ok((
        StatusCode::OK,
        Json(json!({ "product": ProductResponse::from(product) })),
    )
        .into_response())
}

/// Remove a catalog entry
pub async fn delete_product(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    authenticate_admin(&state, &headers)?;

    state
        .store
        .delete_product(id)
        .await
        .map_err(|e| map_store_error(e, "Product not found", "Failed to delete product"))?;

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Product deleted successfully" })),
    )
        .into_response())
}

/// Place an order from the caller's cart
pub async fn create_order(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<Response> {
    let claims = authenticate(&state, &headers)?;

    let cart = req
        .try_into_cart()
        .ok_or_else(|| ApiError::BadRequest("Invalid order items".to_string()))?;

    let placed = state.engine.place_order(claims.user_id, cart).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "order": OrderResponse::from(placed) })),
    )
        .into_response())
}

/// List the caller's own orders, items included
pub async fn get_my_orders(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let claims = authenticate(&state, &headers)?;

    let orders = state
        .store
        .orders_for_user(claims.user_id)
        .await
        .map_err(|e| map_store_error(e, "Order not found", "Failed to fetch orders"))?;

    let orders: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok((StatusCode::OK, Json(json!({ "orders": orders }))).into_response())
}

/// List every order in the system, items included
pub async fn get_all_orders(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    authenticate_admin(&state, &headers)?;

    let orders = state
        .store
        .all_orders()
        .await
        .map_err(|e| map_store_error(e, "Order not found", "Failed to fetch orders"))?;

    let orders: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok((StatusCode::OK, Json(json!({ "orders": orders }))).into_response())
}

/// Get one order with its items. Customers only see their own orders;
/// someone else's order id answers 404 rather than revealing it exists.
pub async fn get_order(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let claims = authenticate(&state, &headers)?;

    let placed = state
        .store
        .order_with_items(id)
        .await
        .map_err(|e| map_store_error(e, "Order not found", "Failed to fetch orders"))?;

    if claims.role != Role::Admin && placed.order.user_id != claims.user_id {
        return Err(ApiError::NotFound("Order not found".to_string()));
    }

    Ok((
        StatusCode::OK,
        Json(json!({ "order": OrderResponse::from(placed) })),
    )
        .into_response())
}

/// Advance an order along the administrative status progression
pub async fn update_order_status(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> ApiResult<Response> {
    authenticate_admin(&state, &headers)?;

    let next = req
        .parsed_status()
        .ok_or_else(|| ApiError::BadRequest("Invalid status".to_string()))?;

    let (previous, order) = state
        .store
        .update_order_status(id, next)
        .await
        .map_err(|e| map_store_error(e, "Order not found", "Failed to update order status"))?;

    let event = MarketEvent::OrderStatusChanged {
        order_id: order.id,
        previous_status: previous,
        new_status: order.status,
        timestamp: Utc::now(),
    };
    if let Err(e) = state.event_bus.publish(event) {
        warn!("failed to publish status change event: {e}");
    }

    Ok((
        StatusCode::OK,
        Json(json!({ "order": OrderResponse::from(order) })),
    )
        .into_response())
}

/// List the most recent settlement records
pub async fn get_transactions(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    authenticate_admin(&state, &headers)?;

    let transactions = state
        .store
        .transactions()
        .await
        .map_err(|e| map_store_error(e, "Order not found", "Failed to fetch transactions"))?;

    let transactions: Vec<TransactionResponse> = transactions
        .into_iter()
        .map(TransactionResponse::from)
        .collect();
    Ok((StatusCode::OK, Json(json!({ "transactions": transactions }))).into_response())
}
