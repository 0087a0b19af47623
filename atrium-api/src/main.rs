use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use uuid::Uuid;

use atrium_api::{app, cors_layer, AppState};
use atrium_booking::AvailabilityBroadcaster;
use atrium_catalog::{Coupon, PriceTier, RoomCategory};
use atrium_core::notify::LogNotifier;
use atrium_core::payment::AutoSettleProcessor;
use atrium_store::app_config::Config;
use atrium_store::{Database, MemoryStore, PgStore};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atrium_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;

    let broadcaster = AvailabilityBroadcaster::new(config.booking.broadcast_capacity);
    let notifier = Arc::new(LogNotifier);
    let processor = Arc::new(AutoSettleProcessor);
    let currency = config.booking.currency.clone();

    let state = if config.database.url == "memory" {
        tracing::warn!("Using the in-memory store; all data is lost on shutdown");
        let store = Arc::new(MemoryStore::new());
        seed_demo_inventory(&store);
        AppState::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            processor,
            notifier,
            broadcaster,
            currency,
        )
    } else {
        let db = Database::connect(&config.database)
            .await
            .context("Failed to connect to the database")?;
        db.migrate().await.context("Failed to run migrations")?;
        let store = Arc::new(PgStore::new(db.pool.clone()));
        AppState::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            processor,
            notifier,
            broadcaster,
            currency,
        )
    };

    let router = app(state, cors_layer(&config.cors.allowed_origin));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host / server.port")?;
    tracing::info!("Atrium API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind listen address")?;
    axum::serve(listener, router)
        .await
        .context("Server terminated")?;

    Ok(())
}

/// Give the in-memory mode something to book against so the API is usable
/// out of the box. Ids are logged at startup.
fn seed_demo_inventory(store: &MemoryStore) {
    let hotel_id = Uuid::new_v4();
    let operator_id = Uuid::new_v4();
    store.insert_hotel(hotel_id, operator_id);

    let deluxe = RoomCategory::new(hotel_id, "Deluxe Double", 4, 2_000_00, 5);
    store.insert_price_tier(PriceTier::new(deluxe.id, 1, 1_500_00));
    store.insert_price_tier(PriceTier::new(deluxe.id, 3, 2_500_00));
    let single = RoomCategory::new(hotel_id, "Single", 2, 1_200_00, 8);

    let now = Utc::now();
    store.insert_coupon(Coupon {
        code: "WELCOME10".to_string(),
        discount: 10,
        is_percentage: true,
        min_amount: Some(1_000_00),
        max_discount: Some(500_00),
        valid_from: now - Duration::days(1),
        valid_to: now + Duration::days(90),
        usage_limit: Some(100),
        used_count: 0,
    });

    tracing::info!(
        %hotel_id,
        %operator_id,
        deluxe_id = %deluxe.id,
        single_id = %single.id,
        "Seeded demo inventory, coupon WELCOME10"
    );
    store.insert_room_category(deluxe);
    store.insert_room_category(single);
}
