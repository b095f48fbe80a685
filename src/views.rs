use mapdb_engine::{
    router::{parse_query, Params, Resolution, Router},
    MapDb, MapFilter, Room, SearchOutcome,
};
use serde_json::{json, Value};
use url::form_urlencoded;

#[derive(Debug, Default)]
pub struct ViewRequest {
    pub path: String,
    pub params: Params,
    pub query: Params,
}

pub type ViewHandler = fn(&MapDb, &ViewRequest) -> Value;

pub fn view_router() -> Router<ViewHandler> {
    let mut router: Router<ViewHandler> = Router::new();
    router.add_route("/room/:id", room_view);
    router.add_route("/search", search_view);
    router.set_not_found(not_found_view);
    router
}

/// Appends `extras` the app path's own query lacks. An unencoded `path=/search?q=x&map=y`
/// arrives with `map` split off into the outer query; this puts it back.
pub fn merge_query(app_path: &str, extras: &[(&str, &str)]) -> String {
    let (path, query) = app_path.split_once('?').unwrap_or((app_path, ""));
    let existing = parse_query(Some(query));
    let missing = extras
        .iter()
        .filter(|(key, _)| !existing.contains_key(*key))
        .collect::<Vec<_>>();
    if missing.is_empty() {
        return app_path.to_string();
    }

    let mut serializer = form_urlencoded::Serializer::for_suffix(query.to_string(), 0);
    for (key, value) in missing {
        serializer.append_pair(key, value);
    }
    format!("{path}?{}", serializer.finish())
}

pub fn render(db: &MapDb, router: &Router<ViewHandler>, app_path: &str) -> Value {
    match router.resolve(app_path) {
        Resolution::Matched(route) => {
            let request = ViewRequest {
                path: app_path.to_string(),
                params: route.params,
                query: route.query,
            };
            (route.handler)(db, &request)
        }
        Resolution::NotFound { handler, path } => handler(
            db,
            &ViewRequest {
                path,
                ..ViewRequest::default()
            },
        ),
        Resolution::Unhandled => json!({ "view": "none", "path": app_path }),
    }
}

fn search_view(db: &MapDb, request: &ViewRequest) -> Value {
    let term = request.query.get("q").map(String::as_str).unwrap_or("");
    let filter = request
        .query
        .get("map")
        .and_then(|raw| MapFilter::parse(raw));

    if term.trim().is_empty() {
        return json!({
            "view": "search",
            "mapCategories": db.map_categories(),
            "updatedAt": db.stamp(),
        });
    }

    let outcome = db.search(term, filter.as_ref());
    if let SearchOutcome::Redirect { room, .. } = &outcome {
        return json!({
            "view": "redirect",
            "location": format!("/room/{}", room.id),
            "outcome": outcome,
        });
    }

    json!({
        "view": "search",
        "term": term.trim(),
        "mapFilter": filter.as_ref().map(MapFilter::as_param),
        "outcome": outcome,
        "mapCategories": db.map_categories(),
        "updatedAt": db.stamp(),
    })
}

fn room_view(db: &MapDb, request: &ViewRequest) -> Value {
    let key = request.params.get("id").map(String::as_str).unwrap_or("");
    let Some(room) = db.lookup(key) else {
        return json!({
            "view": "room_not_found",
            "key": key,
            "mapCategories": db.map_categories(),
        });
    };

    json!({
        "view": "room",
        "room": room,
        "highlightTag": request.query.get("highlight_tag"),
        "highlightLocation": request.query.get("highlight_location"),
        "map": map_context(db, room),
        "mapCategories": db.map_categories(),
        "updatedAt": db.stamp(),
    })
}

fn not_found_view(db: &MapDb, request: &ViewRequest) -> Value {
    json!({
        "view": "not_found",
        "path": request.path,
        "mapCategories": db.map_categories(),
        "updatedAt": db.stamp(),
    })
}

pub fn map_context(db: &MapDb, room: &Room) -> Value {
    let Some(image) = room.image() else {
        return Value::Null;
    };
    let neighbours = db
        .rooms_on_map(image)
        .into_iter()
        .map(|r| json!({ "id": r.id, "title": r.primary_title(), "imageCoords": r.image_coords }))
        .collect::<Vec<_>>();

    json!({
        "image": image,
        "displayName": db.indices().display_name(image),
        "imageCoords": room.image_coords,
        "rooms": neighbours,
        "tags": db.image_tags(image),
        "locations": db.image_locations(image),
        "adjacentMaps": db.adjacent_maps(room),
    })
}
