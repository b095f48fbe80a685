mod api;
mod freshness;
mod views;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use mapdb_engine::{
    router::Router as PathRouter, Config, Freshness, HttpGateway, MapDb, ReplicaStore,
    SqliteReplica, SyncReport, Synchronizer,
};
use tokio::sync::RwLock;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<MapDb>,
    pub sync: Synchronizer,
    pub report: Arc<SyncReport>,
    pub loaded_at: DateTime<Utc>,
    pub freshness: Arc<RwLock<Option<Freshness>>>,
    pub views: Arc<PathRouter<views::ViewHandler>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mapdb_engine=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    let gateway = HttpGateway::new(
        &config.remote_base_url,
        &config.dataset_path,
        &config.stamp_path,
    )?;
    let replica: Option<Arc<dyn ReplicaStore>> = if config.disable_cache {
        None
    } else {
        let mut store = SqliteReplica::new(&config.store_path);
        if let Some(quota) = config.store_quota_bytes {
            store = store.with_quota_bytes(quota);
        }
        Some(Arc::new(store))
    };
    let sync = Synchronizer::new(Arc::new(gateway), replica);

    let (db, report) = MapDb::load(&sync, config.query, |phase| {
        info!(phase = ?phase, "{}", phase.message());
    })
    .await
    .context("Failed to load room dataset")?;

    if report.is_degraded() {
        warn!(degradations = ?report.degradations, "Room dataset loaded in degraded mode");
    }
    info!(
        rooms = db.room_count(),
        stamp = db.stamp().unwrap_or(""),
        source = ?report.source,
        "Loaded {} rooms",
        db.room_count()
    );

    let state = AppState {
        db: Arc::new(db),
        sync,
        report: Arc::new(report),
        loaded_at: Utc::now(),
        freshness: Arc::new(RwLock::new(None)),
        views: Arc::new(views::view_router()),
    };

    freshness::spawn_freshness_worker(state.clone(), config.freshness_interval_seconds);

    let app = Router::new()
        .route("/healthz", get(api::healthz))
        .route("/api/status", get(api::status))
        .route("/api/tags", get(api::tags))
        .route("/api/tags/suggest", get(api::suggest_tags))
        .route("/api/maps", get(api::map_categories))
        .route("/api/images/{tag}", get(api::images_for_tag))
        .route("/api/locations/{image}", get(api::locations_for_image))
        .route("/api/rooms/{key}", get(api::get_room))
        .route("/api/rooms/{key}/map", get(api::room_map))
        .route("/api/search", get(api::search))
        .route("/api/tagged-room", get(api::tagged_room))
        .route("/api/freshness", get(api::freshness))
        .route("/api/view", get(api::view))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("mapdb-engine listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
