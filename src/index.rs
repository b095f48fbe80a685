use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::models::{Room, MAP_CATEGORY_TAG_PREFIX, MAP_NAME_TAG_PREFIX};

pub const DEFAULT_MAP_CATEGORY: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapLink {
    pub display_name: String,
    pub room_id: i64,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapCategory {
    pub category: String,
    pub maps: Vec<MapLink>,
}

#[derive(Debug)]
struct MapEntry {
    display_name: String,
    category: String,
    anchor_room: i64,
}

#[derive(Debug, Default)]
pub struct Indices {
    by_id: HashMap<i64, usize>,
    by_alt_id: HashMap<String, usize>,
    tags: Vec<String>,
    map_categories: Vec<MapCategory>,
    display_names: HashMap<String, String>,
    alt_id_collisions: usize,
}

impl Indices {
    pub fn build(rooms: &[Room]) -> Self {
        let mut by_id = HashMap::with_capacity(rooms.len());
        let mut by_alt_id = HashMap::new();
        let mut tags = BTreeSet::new();
        let mut map_entries: HashMap<String, MapEntry> = HashMap::new();
        let mut tagged_names: HashMap<String, String> = HashMap::new();
        let mut alt_id_collisions = 0;

        for (idx, room) in rooms.iter().enumerate() {
            by_id.insert(room.id, idx);

            for alt_id in &room.alt_ids {
                let key = alt_id.lookup_key();
                if let Some(previous) = by_alt_id.insert(key.clone(), idx) {
                    alt_id_collisions += 1;
                    debug!(
                        alt_id = %key,
                        previous_room = rooms[previous].id,
                        room = room.id,
                        "Alt id declared twice; later room wins"
                    );
                }
            }

            tags.extend(room.tags.iter().cloned());

            if let Some(image) = room.image() {
                if let Some(name) = room.map_name_tag() {
                    tagged_names
                        .entry(image.to_string())
                        .or_insert_with(|| name.to_string());
                }
            }

            if let Some(image) = room.image().filter(|_| room.is_placed()) {
                let entry = map_entries
                    .entry(image.to_string())
                    .or_insert_with(|| MapEntry {
                        display_name: image.to_string(),
                        category: DEFAULT_MAP_CATEGORY.to_string(),
                        anchor_room: room.id,
                    });

                for tag in &room.tags {
                    if let Some(name) = tag.strip_prefix(MAP_NAME_TAG_PREFIX) {
                        entry.display_name = name.to_string();
                        entry.anchor_room = room.id;
                    } else if let Some(category) = tag.strip_prefix(MAP_CATEGORY_TAG_PREFIX) {
                        entry.category = category.to_string();
                    }
                }
            }
        }

        let mut display_names = tagged_names;
        for (image, entry) in &map_entries {
            display_names.insert(image.clone(), entry.display_name.clone());
        }

        let mut grouped: BTreeMap<String, Vec<MapLink>> = BTreeMap::new();
        for (image, entry) in map_entries {
            grouped.entry(entry.category).or_default().push(MapLink {
                display_name: entry.display_name,
                room_id: entry.anchor_room,
                image,
            });
        }
        let map_categories = grouped
            .into_iter()
            .map(|(category, mut maps)| {
                maps.sort_by(|a, b| {
                    a.display_name
                        .cmp(&b.display_name)
                        .then(a.room_id.cmp(&b.room_id))
                        .then(a.image.cmp(&b.image))
                });
                MapCategory { category, maps }
            })
            .collect::<Vec<_>>();

        Self {
            by_id,
            by_alt_id,
            tags: tags.into_iter().collect(),
            map_categories,
            display_names,
            alt_id_collisions,
        }
    }

    pub fn position_by_id(&self, id: i64) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn position_by_alt_id(&self, key: &str) -> Option<usize> {
        self.by_alt_id.get(key).copied()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn map_categories(&self) -> &[MapCategory] {
        &self.map_categories
    }

    /// Category-map name when the image is placed, else its first `meta:mapname:` tag,
    /// else the raw identifier.
    pub fn display_name<'a>(&'a self, image: &'a str) -> &'a str {
        self.display_names
            .get(image)
            .map(String::as_str)
            .unwrap_or(image)
    }

    pub fn alt_id_collisions(&self) -> usize {
        self.alt_id_collisions
    }
}
