//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This is the main entry point for the API server.
// It loads configuration, optionally seeds a demo catalog, wires the event
// system, and starts listening for requests.
//--------------------------------------------------------------------------------------------------

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use clap::Parser;
use rust_decimal_macros::dec;
use tokio::sync::broadcast;
use tracing::{info, warn, Level};
use uuid::Uuid;

use marketmaster::api::{Api, AppState};
use marketmaster::auth::TokenAuthenticator;
use marketmaster::config::Config;
use marketmaster::domain::models::types::{Product, Role};
use marketmaster::store::{MarketStore, MemoryStore, StoreResult};
use marketmaster::{EventBus, MarketEvent};

/// Command line arguments for the API server
#[derive(Parser, Debug)]
#[command(author, version, about = "Order placement API server")]
struct Args {
    /// Bind host, overriding the HOST environment variable
    #[arg(long)]
    host: Option<String>,

    /// Bind port, overriding the PORT environment variable
    #[arg(long)]
    port: Option<u16>,

    /// Seed a demo catalog and print demo tokens on startup
    #[arg(long)]
    seed: bool,
}

/// Inserts a handful of demo products so the API is usable out of the box
async fn seed_demo_catalog(store: &MemoryStore) -> StoreResult<()> {
    let demo = [
        ("Mechanical Keyboard", "Hot-swappable 87-key board", dec!(89.99), 25),
        ("Wireless Mouse", "Low-latency 2.4GHz mouse", dec!(34.50), 40),
        ("USB-C Hub", "7-port aluminium hub", dec!(45.00), 15),
        ("Laptop Stand", "Adjustable aluminium stand", dec!(27.90), 30),
        ("Webcam Cover", "Slide cover, 3-pack", dec!(5.25), 200),
    ];

    for (name, description, price, stock) in demo {
        let product = Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            price,
            stock,
            active: true,
            created_at: Utc::now(),
        };
        store.insert_product(product).await?;
    }

    info!("seeded demo catalog with 5 products");
    Ok(())
}

/// Spawns a task that mirrors every bus event into the log
fn spawn_event_logger(event_bus: &EventBus) {
    let mut receiver = event_bus.subscribe();
    info!(
        subscribers = event_bus.subscriber_count(),
        capacity = event_bus.capacity(),
        "event logger attached"
    );
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(MarketEvent::OrderPlaced { order, items, .. }) => {
                    info!(
                        order_id = %order.id,
                        lines = items.len(),
                        total = %order.total_amount,
                        "event: order placed"
                    );
                }
                Ok(MarketEvent::StockDepleted { product_id, .. }) => {
                    info!(product_id = %product_id, "event: product stock depleted");
                }
                Ok(MarketEvent::OrderStatusChanged {
                    order_id,
                    previous_status,
                    new_status,
                    ..
                }) => {
                    info!(
                        order_id = %order_id,
                        ?previous_status,
                        ?new_status,
                        "event: order status changed"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("event logger lagged, skipped {missed} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    info!("Starting order placement API server");

    // Set up the event system
    let event_bus = EventBus::new(config.event_capacity);
    spawn_event_logger(&event_bus);

    // Build the store and, when asked, a demo catalog with usable tokens
    let store = MemoryStore::new();
    let authenticator = TokenAuthenticator::new(&config.auth_secret);

    if args.seed {
        seed_demo_catalog(&store).await?;

        let ttl = Duration::hours(config.token_ttl_hours);
        let user_token = authenticator.issue(Uuid::new_v4(), Role::User, ttl);
        let admin_token = authenticator.issue(Uuid::new_v4(), Role::Admin, ttl);
        info!("demo user token: {user_token}");
        info!("demo admin token: {admin_token}");
    }

    let state = Arc::new(AppState::new(Arc::new(store), authenticator, event_bus));

    // Create and serve the API
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.host, config.port))?;

    let api = Api::new(addr, state);
    api.serve().await?;

    Ok(())
}
