mod common;

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    extract::State,
    http::{header::CACHE_CONTROL, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use mapdb_engine::{
    config::parse_base_url, DataSource, GatewayError, HttpGateway, MapDb, QuerySettings,
    RemoteSource, ReplicaStore, Room, SqliteReplica, Synchronizer,
};
use serde_json::{json, Value};

#[derive(Clone)]
struct Published {
    rooms: Arc<Vec<Room>>,
    body_requests: Arc<AtomicUsize>,
}

async fn stamp(headers: HeaderMap) -> String {
    let bypassed = headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("no-store"));
    // An intermediate cache would answer with an older stamp.
    if bypassed {
        "  2026-10-01T12:00:00Z\n".to_string()
    } else {
        "cached".to_string()
    }
}

async fn dataset(State(published): State<Published>) -> Json<Vec<Room>> {
    published.body_requests.fetch_add(1, Ordering::SeqCst);
    Json(published.rooms.as_ref().clone())
}

async fn serve(published: Published) -> SocketAddr {
    let app = Router::new()
        .route("/lich/data/updated_at", get(stamp))
        .route("/lich/data/map.json", get(dataset))
        .route(
            "/broken/data/map.json",
            get(|| async { (StatusCode::OK, "{ not json") }),
        )
        .route(
            "/reshaped/data/map.json",
            get(|| async { Json(json!({ "rooms": [] })) }),
        )
        .route(
            "/broken/data/updated_at",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        )
        .with_state(published);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

fn published() -> Published {
    Published {
        rooms: Arc::new(common::town()),
        body_requests: Arc::new(AtomicUsize::new(0)),
    }
}

fn gateway(addr: SocketAddr, prefix: &str) -> HttpGateway {
    let base = parse_base_url(&format!("http://{addr}/{prefix}")).expect("base");
    HttpGateway::new(&base, "data/map.json", "data/updated_at").expect("gateway")
}

#[tokio::test]
async fn stamp_bypasses_caches_and_is_trimmed() {
    let addr = serve(published()).await;
    let stamp = gateway(addr, "lich").fetch_stamp().await.expect("stamp");
    assert_eq!(stamp, "2026-10-01T12:00:00Z");
}

#[tokio::test]
async fn dataset_decodes_in_order() {
    let addr = serve(published()).await;
    let rooms = gateway(addr, "lich").fetch_rooms().await.expect("rooms");
    assert_eq!(rooms, common::town());
    assert_eq!(rooms[0].exit_room_ids().collect::<Vec<_>>(), vec![2, 3]);
}

#[tokio::test]
async fn missing_and_failing_resources_map_to_errors() {
    let addr = serve(published()).await;

    let err = gateway(addr, "nowhere")
        .fetch_rooms()
        .await
        .expect_err("404");
    assert!(matches!(err, GatewayError::Status { status: 404, .. }));

    let err = gateway(addr, "broken")
        .fetch_stamp()
        .await
        .expect_err("503");
    assert!(matches!(err, GatewayError::Status { status: 503, .. }));

    let err = gateway(addr, "broken")
        .fetch_rooms()
        .await
        .expect_err("bad json");
    assert!(matches!(err, GatewayError::Decode { .. }));

    let err = gateway(addr, "reshaped")
        .fetch_rooms()
        .await
        .expect_err("object body");
    match err {
        GatewayError::Decode { url, .. } => assert!(url.ends_with("/reshaped/data/map.json")),
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn full_pipeline_over_http_reuses_replica() {
    let published = published();
    let body_requests = Arc::clone(&published.body_requests);
    let addr = serve(published).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let replica: Arc<dyn ReplicaStore> =
        Arc::new(SqliteReplica::new(dir.path().join("cache/replica.sqlite")));
    let sync = Synchronizer::new(Arc::new(gateway(addr, "lich")), Some(replica));

    let (db, report) = MapDb::load(&sync, QuerySettings::default(), |_| {})
        .await
        .expect("first load");
    assert_eq!(report.source, DataSource::Downloaded);
    assert_eq!(db.stamp(), Some("2026-10-01T12:00:00Z"));

    let (db, report) = MapDb::load(&sync, QuerySettings::default(), |_| {})
        .await
        .expect("second load");
    assert_eq!(report.source, DataSource::CacheHit);
    assert_eq!(body_requests.load(Ordering::SeqCst), 1);

    let room: Value = serde_json::to_value(db.lookup("u7001").expect("room")).expect("json");
    assert_eq!(room["uid"][0], 7001);
    assert_eq!(room["wayto"]["3"], "go gate");
}
