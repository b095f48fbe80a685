use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use mapdb_engine::MapFilter;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use url::form_urlencoded;
use uuid::Uuid;

use crate::{views, AppState};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default)]
    map: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Deserialize)]
pub struct LocationParams {
    #[serde(default)]
    tag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TaggedRoomParams {
    tag: String,
    image: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ViewParams {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    map: Option<String>,
}

pub async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true, "timestamp": Utc::now() }))
}

pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let freshness = state.freshness.read().await.clone();
    Json(json!({
        "roomCount": state.db.room_count(),
        "updatedAt": state.db.stamp(),
        "loadedAt": state.loaded_at,
        "sync": &*state.report,
        "altIdCollisions": state.db.indices().alt_id_collisions(),
        "freshness": freshness,
    }))
}

pub async fn tags(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!(state.db.tags()))
}

pub async fn suggest_tags(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> impl IntoResponse {
    Json(json!(state.db.suggest_tags(&params.q)))
}

pub async fn map_categories(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!(state.db.map_categories()))
}

pub async fn images_for_tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> impl IntoResponse {
    Json(json!(state.db.images_for_tag(&tag)))
}

pub async fn locations_for_image(
    State(state): State<AppState>,
    Path(image): Path<String>,
    Query(params): Query<LocationParams>,
) -> impl IntoResponse {
    let tag = params.tag.as_deref().filter(|t| !t.is_empty());
    Json(json!(state.db.locations_for_image(&image, tag)))
}

pub async fn get_room(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    match state.db.lookup(&key) {
        Some(room) => (StatusCode::OK, Json(json!(room))).into_response(),
        None => room_not_found(&key),
    }
}

pub async fn room_map(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    match state.db.lookup(&key) {
        Some(room) => {
            (StatusCode::OK, Json(views::map_context(&state.db, room))).into_response()
        }
        None => room_not_found(&key),
    }
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let filter = params.map.as_deref().and_then(MapFilter::parse);
    let outcome = state.db.search(&params.q, filter.as_ref());
    Json(json!({
        "term": params.q.trim(),
        "mapFilter": filter.as_ref().map(MapFilter::as_param),
        "outcome": outcome,
    }))
}

pub async fn tagged_room(
    State(state): State<AppState>,
    Query(params): Query<TaggedRoomParams>,
) -> Response {
    let location = params.location.as_deref().filter(|l| !l.is_empty());
    let Some(room) = state
        .db
        .first_tagged_room(&params.tag, &params.image, location)
    else {
        return error_response(
            StatusCode::NOT_FOUND,
            "NO_MATCHING_ROOM",
            "No matching room found.",
        );
    };

    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("highlight_tag", &params.tag);
    if let Some(location) = location {
        query.append_pair("highlight_location", location);
    }
    let path = format!("/room/{}?{}", room.id, query.finish());

    (StatusCode::OK, Json(json!({ "room": room, "path": path }))).into_response()
}

pub async fn freshness(State(state): State<AppState>) -> impl IntoResponse {
    let freshness = state.db.check_freshness(&state.sync).await;
    if freshness.stale {
        info!(
            remote = ?freshness.remote_stamp,
            effective = ?freshness.effective_stamp,
            "Remote dataset has advanced"
        );
    }
    *state.freshness.write().await = Some(freshness.clone());
    Json(json!(freshness))
}

pub async fn view(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> impl IntoResponse {
    let path = params
        .path
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| mapdb_engine::router::DEFAULT_PATH.to_string());
    let extras = [("q", params.q.as_deref()), ("map", params.map.as_deref())]
        .into_iter()
        .filter_map(|(key, value)| value.filter(|v| !v.is_empty()).map(|v| (key, v)))
        .collect::<Vec<_>>();
    let path = views::merge_query(&path, &extras);
    Json(views::render(&state.db, &state.views, &path))
}

fn room_not_found(key: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "ROOM_NOT_FOUND",
        &format!("No room with id or uid {key}."),
    )
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error": {
                "code": code,
                "message": message,
                "traceId": Uuid::new_v4().to_string(),
            }
        })),
    )
        .into_response()
}
