#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use mapdb_engine::{GatewayError, RemoteSource, Room};
use serde_json::{json, Value};

pub fn room(value: Value) -> Room {
    serde_json::from_value(value).expect("room fixture")
}

/// Room drawn on `image` with `tags`.
pub fn placed(id: i64, image: &str, tags: &[&str]) -> Room {
    room(json!({
        "id": id,
        "title": [format!("[Room {id}]")],
        "tags": tags,
        "image": image,
        "image_coords": [0, 0, 10, 10],
    }))
}

pub fn unplaced(id: i64, tags: &[&str]) -> Room {
    room(json!({ "id": id, "title": [format!("[Room {id}]")], "tags": tags }))
}

/// Small town with two maps joined by an exit, one unmapped room and alt ids.
pub fn town() -> Vec<Room> {
    vec![
        room(json!({
            "id": 1, "uid": [7001], "title": ["[Town Square]"],
            "description": ["A busy square with a fountain."],
            "tags": ["bank", "meta:mapname:Landing", "meta:mapcategory:Towns"],
            "location": "Landing", "image": "landing.png", "image_coords": [0, 0, 8, 8],
            "wayto": { "2": "north", "3": "go gate" }
        })),
        room(json!({
            "id": 2, "uid": ["landing-bank"], "title": ["[Landing Bank]"],
            "tags": ["bank", "locker"], "location": "Landing",
            "image": "landing.png", "image_coords": [8, 0, 16, 8],
            "wayto": { "1": "south" }
        })),
        room(json!({
            "id": 3, "title": ["[North Gate]"], "tags": ["gate", "meta:mapcategory:Roads"],
            "location": "North Road", "image": "road.png", "image_coords": [0, 0, 4, 4],
            "wayto": { "1": "go town" }
        })),
        room(json!({
            "id": 4, "title": ["[Abandoned Shed]"], "description": ["Dust and cobwebs."],
            "tags": ["shed"], "location": "Wilds"
        })),
    ]
}

/// In-memory remote whose stamp and body can be taken offline independently.
pub struct FakeRemote {
    stamp: Mutex<String>,
    rooms: Mutex<Vec<Room>>,
    stamp_online: AtomicBool,
    body_online: AtomicBool,
    stamp_fetches: AtomicUsize,
    body_fetches: AtomicUsize,
}

impl FakeRemote {
    pub fn new(stamp: &str, rooms: Vec<Room>) -> Self {
        Self {
            stamp: Mutex::new(stamp.to_string()),
            rooms: Mutex::new(rooms),
            stamp_online: AtomicBool::new(true),
            body_online: AtomicBool::new(true),
            stamp_fetches: AtomicUsize::new(0),
            body_fetches: AtomicUsize::new(0),
        }
    }

    pub fn publish(&self, stamp: &str, rooms: Vec<Room>) {
        *self.stamp.lock().expect("stamp lock") = stamp.to_string();
        *self.rooms.lock().expect("rooms lock") = rooms;
    }

    pub fn set_stamp_online(&self, online: bool) {
        self.stamp_online.store(online, Ordering::SeqCst);
    }

    pub fn set_body_online(&self, online: bool) {
        self.body_online.store(online, Ordering::SeqCst);
    }

    pub fn go_offline(&self) {
        self.set_stamp_online(false);
        self.set_body_online(false);
    }

    pub fn stamp_fetches(&self) -> usize {
        self.stamp_fetches.load(Ordering::SeqCst)
    }

    pub fn body_fetches(&self) -> usize {
        self.body_fetches.load(Ordering::SeqCst)
    }
}

fn unreachable(path: &str) -> GatewayError {
    GatewayError::Status {
        url: format!("http://fake.invalid/{path}"),
        status: 503,
    }
}

#[async_trait]
impl RemoteSource for FakeRemote {
    async fn fetch_stamp(&self) -> Result<String, GatewayError> {
        self.stamp_fetches.fetch_add(1, Ordering::SeqCst);
        if !self.stamp_online.load(Ordering::SeqCst) {
            return Err(unreachable("data/updated_at"));
        }
        Ok(self.stamp.lock().expect("stamp lock").trim().to_string())
    }

    async fn fetch_rooms(&self) -> Result<Vec<Room>, GatewayError> {
        self.body_fetches.fetch_add(1, Ordering::SeqCst);
        if !self.body_online.load(Ordering::SeqCst) {
            return Err(unreachable("data/map.json"));
        }
        Ok(self.rooms.lock().expect("rooms lock").clone())
    }
}
