//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements a REST API using Axum for the order placement service.
// It provides endpoints for catalog management, order placement, and back-office reads.
//
// | Component      | Description                                                |
// |----------------|-----------------------------------------------------------|
// | API            | Main API structure coordinating routes and services        |
// | Routes         | Handler functions for API endpoints                        |
// | States         | Shared application state                                   |
// | DTOs           | Data transfer objects for API requests/responses           |
//
//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name           | Description                                       | Key Methods       |
// |----------------|---------------------------------------------------|------------------|
// | AppState       | Shared application state                         | new               |
// | Api            | Main API structure                               | serve             |
// | Error          | API error types                                  | from              |
//--------------------------------------------------------------------------------------------------

mod routes;
mod dto;
mod error;

use std::sync::Arc;
use std::net::SocketAddr;
use axum::{
    Router,
    Extension,
    routing::{get, post, put, delete, patch},
    http::{Method, header, HeaderValue},
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::TokenAuthenticator;
use crate::domain::services::events::EventBus;
use crate::domain::services::placement::PlacementEngine;
use crate::store::MarketStore;

pub use error::{ApiError, ApiResult};
pub use dto::*;

/// Shared application state accessible by all handlers
pub struct AppState {
    /// Persistent market state behind the store port
    pub store: Arc<dyn MarketStore>,
    /// Placement engine driving the order workflow
    pub engine: PlacementEngine,
    /// Verifier and issuer of bearer tokens
    pub authenticator: TokenAuthenticator,
    /// Shared event bus
    pub event_bus: EventBus,
}

impl AppState {
    /// Creates a new application state, wiring the engine to the same store
    /// and event bus the handlers see
    pub fn new(
        store: Arc<dyn MarketStore>,
        authenticator: TokenAuthenticator,
        event_bus: EventBus,
    ) -> Self {
        let engine = PlacementEngine::new(Arc::clone(&store), event_bus.clone());
        Self {
            store,
            engine,
            authenticator,
            event_bus,
        }
    }
}

/// Main API structure
pub struct Api {
    /// API address
    addr: SocketAddr,
    /// Shared application state
    state: Arc<AppState>,
}

impl Api {
    /// Creates a new API instance
    pub fn new(addr: SocketAddr, state: Arc<AppState>) -> Self {
        Self { addr, state }
    }

    /// Creates all routes for the API
    pub fn routes(&self) -> Router {
        // Create a CORS layer that allows requests from specific origins
        let cors = CorsLayer::new()
            // Allow requests from localhost origins
            .allow_origin([
                "http://localhost:3000".parse::<HeaderValue>().unwrap(),
                "http://127.0.0.1:3000".parse::<HeaderValue>().unwrap(),
                "http://localhost:3001".parse::<HeaderValue>().unwrap(),
                "http://127.0.0.1:3001".parse::<HeaderValue>().unwrap(),
            ])
            // Allow standard methods
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            // Allow specific headers
            .allow_headers([
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                header::ACCEPT,
            ])
            // Allow credentials
            .allow_credentials(true);

        Router::new()
            // Health check
            .route("/health", get(routes::health))

            // Catalog
            .route("/products/active", get(routes::get_active_products))
            .route("/products/all", get(routes::get_all_products))
            .route("/products", post(routes::create_product))
            .route("/products/:id", put(routes::update_product))
            .route("/products/:id", delete(routes::delete_product))

            // Orders
            .route("/orders", post(routes::create_order))
            .route("/orders/my-orders", get(routes::get_my_orders))
            .route("/orders/all", get(routes::get_all_orders))
            .route("/orders/:id", get(routes::get_order))
            .route("/orders/:id/status", patch(routes::update_order_status))

            // Back office
            .route("/admin/transactions", get(routes::get_transactions))

            // Attach application state
            .layer(Extension(self.state.clone()))
            // Request/response tracing
            .layer(TraceLayer::new_for_http())
            // Add CORS layer
            .layer(cors)
    }

    /// Starts the API server and runs until shutdown
    pub async fn serve(self) -> std::io::Result<()> {
        let app = self.routes();

        info!("API listening on {}", self.addr);
        // Create a TcpListener first, then pass it to axum::serve
        let listener = TcpListener::bind(self.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
