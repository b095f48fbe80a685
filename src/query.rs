use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::{
    engine::MapDb,
    models::{Room, META_TAG_PREFIX},
};

pub const UNMAPPED_SENTINEL: &str = "UNMAPPED";
pub const UNMAPPED_DISPLAY_NAME: &str = "Unmapped Rooms";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapFilter {
    Unmapped,
    Image(String),
}

impl MapFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        match trimmed {
            "" => None,
            UNMAPPED_SENTINEL => Some(Self::Unmapped),
            image => Some(Self::Image(image.to_string())),
        }
    }

    pub fn admits(&self, room: &Room) -> bool {
        match self {
            Self::Unmapped => room.image().is_none(),
            Self::Image(image) => room.on_image(image),
        }
    }

    pub fn as_param(&self) -> &str {
        match self {
            Self::Unmapped => UNMAPPED_SENTINEL,
            Self::Image(image) => image,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    PrimaryId,
    AltId,
    Tag,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapGroup {
    pub image: Option<String>,
    pub filter: String,
    pub display_name: String,
    pub count: usize,
    pub sample_room: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchOutcome<'a> {
    Redirect {
        room: &'a Room,
        matched_by: MatchKind,
    },
    OverflowByMap {
        total: usize,
        matched_by: MatchKind,
        groups: Vec<MapGroup>,
    },
    Results {
        rooms: Vec<&'a Room>,
        total: usize,
        truncated: bool,
        matched_by: Option<MatchKind>,
    },
}

impl SearchOutcome<'_> {
    pub fn empty() -> Self {
        Self::Results {
            rooms: Vec::new(),
            total: 0,
            truncated: false,
            matched_by: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageChoice {
    pub filename: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjacentMap {
    pub image: String,
    pub display_name: String,
    pub room_id: i64,
}

impl MapDb {
    /// Resolves a room by primary id, or by alt id when the key is not an integer.
    pub fn lookup(&self, key: &str) -> Option<&Room> {
        let key = key.trim();
        match key.parse::<i64>() {
            Ok(id) => self.room_by_id(id),
            Err(_) => self.room_by_alt_id(key),
        }
    }

    pub fn search(&self, term: &str, filter: Option<&MapFilter>) -> SearchOutcome<'_> {
        let term = term.trim();
        if term.is_empty() {
            return SearchOutcome::empty();
        }

        if let Some(room) = term.parse::<i64>().ok().and_then(|id| self.room_by_id(id)) {
            return SearchOutcome::Redirect {
                room,
                matched_by: MatchKind::PrimaryId,
            };
        }

        if let Some(room) = self.room_by_alt_id(term) {
            return SearchOutcome::Redirect {
                room,
                matched_by: MatchKind::AltId,
            };
        }

        let admitted = |room: &&Room| filter.map_or(true, |f| f.admits(room));

        let mut matched_by = MatchKind::Tag;
        let mut matches = self
            .rooms()
            .iter()
            .filter(|room| room.has_tag(term))
            .filter(admitted)
            .collect::<Vec<_>>();

        if matches.is_empty() {
            matched_by = MatchKind::Text;
            let needle = term.to_lowercase();
            matches = self
                .rooms()
                .iter()
                .filter(admitted)
                .filter(|room| text_matches(room, &needle))
                .collect();
        }

        self.size_outcome(matches, matched_by, filter)
    }

    fn size_outcome<'a>(
        &'a self,
        mut matches: Vec<&'a Room>,
        matched_by: MatchKind,
        filter: Option<&MapFilter>,
    ) -> SearchOutcome<'a> {
        let total = matches.len();
        let threshold = self.settings().overflow_threshold;

        if total == 1 {
            return SearchOutcome::Redirect {
                room: matches[0],
                matched_by,
            };
        }

        if total > threshold && filter.is_none() {
            return SearchOutcome::OverflowByMap {
                total,
                matched_by,
                groups: self.group_by_map(&matches),
            };
        }

        let truncated = total > threshold;
        matches.truncate(threshold);
        SearchOutcome::Results {
            rooms: matches,
            total,
            truncated,
            matched_by: (total > 0).then_some(matched_by),
        }
    }

    fn group_by_map(&self, matches: &[&Room]) -> Vec<MapGroup> {
        let mut by_image: HashMap<&str, MapGroup> = HashMap::new();
        let mut unmapped: Option<MapGroup> = None;

        for room in matches {
            match room.image() {
                Some(image) => {
                    by_image
                        .entry(image)
                        .or_insert_with(|| MapGroup {
                            image: Some(image.to_string()),
                            filter: image.to_string(),
                            display_name: self.indices().display_name(image).to_string(),
                            count: 0,
                            sample_room: room.id,
                        })
                        .count += 1;
                }
                None => {
                    unmapped
                        .get_or_insert_with(|| MapGroup {
                            image: None,
                            filter: UNMAPPED_SENTINEL.to_string(),
                            display_name: UNMAPPED_DISPLAY_NAME.to_string(),
                            count: 0,
                            sample_room: room.id,
                        })
                        .count += 1;
                }
            }
        }

        let mut groups = by_image.into_values().collect::<Vec<_>>();
        groups.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.image.cmp(&b.image))
        });
        groups.extend(unmapped);
        groups
    }

    pub fn suggest_tags(&self, fragment: &str) -> Vec<&str> {
        let needle = fragment.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.tags()
            .iter()
            .filter(|tag| tag.to_lowercase().contains(&needle))
            .take(self.settings().suggestion_limit)
            .map(String::as_str)
            .collect()
    }

    pub fn images_for_tag(&self, tag: &str) -> Vec<ImageChoice> {
        let images = self
            .rooms()
            .iter()
            .filter(|room| room.has_tag(tag))
            .filter_map(Room::image)
            .collect::<BTreeSet<_>>();

        let mut choices = images
            .into_iter()
            .map(|image| ImageChoice {
                filename: image.to_string(),
                display_name: self.indices().display_name(image).to_string(),
            })
            .collect::<Vec<_>>();
        choices.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.filename.cmp(&b.filename))
        });
        choices
    }

    pub fn locations_for_image(&self, image: &str, tag: Option<&str>) -> Vec<&str> {
        self.rooms()
            .iter()
            .filter(|room| room.on_image(image))
            .filter(|room| tag.map_or(true, |tag| room.has_tag(tag)))
            .filter_map(Room::location)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn first_tagged_room(
        &self,
        tag: &str,
        image: &str,
        location: Option<&str>,
    ) -> Option<&Room> {
        let location = location.filter(|l| !l.is_empty());
        self.rooms().iter().find(|room| {
            room.has_tag(tag)
                && room.on_image(image)
                && location.map_or(true, |l| room.location() == Some(l))
        })
    }

    pub fn rooms_on_map(&self, image: &str) -> Vec<&Room> {
        self.rooms()
            .iter()
            .filter(|room| room.is_placed() && room.on_image(image))
            .collect()
    }

    pub fn image_tags(&self, image: &str) -> Vec<&str> {
        self.rooms_on_map(image)
            .into_iter()
            .flat_map(|room| room.tags.iter())
            .filter(|tag| !tag.starts_with(META_TAG_PREFIX))
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn image_locations(&self, image: &str) -> Vec<&str> {
        self.rooms_on_map(image)
            .into_iter()
            .filter_map(Room::location)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn adjacent_maps(&self, room: &Room) -> Vec<AdjacentMap> {
        let Some(image) = room.image() else {
            return Vec::new();
        };

        let mut adjacent: HashMap<&str, AdjacentMap> = HashMap::new();
        for current in self.rooms_on_map(image) {
            for exit_id in current.exit_room_ids() {
                let Some(exit_room) = self.room_by_id(exit_id) else {
                    continue;
                };
                let Some(exit_image) = exit_room.image() else {
                    continue;
                };
                if exit_image == image {
                    continue;
                }
                adjacent.entry(exit_image).or_insert_with(|| AdjacentMap {
                    image: exit_image.to_string(),
                    display_name: self.indices().display_name(exit_image).to_string(),
                    room_id: exit_room.id,
                });
            }
        }

        let mut maps = adjacent.into_values().collect::<Vec<_>>();
        maps.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.image.cmp(&b.image))
        });
        maps
    }
}

fn text_matches(room: &Room, needle: &str) -> bool {
    room.primary_title()
        .is_some_and(|title| title.to_lowercase().contains(needle))
        || room
            .primary_description()
            .is_some_and(|description| description.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{MapFilter, MatchKind, SearchOutcome};
    use crate::{config::QuerySettings, engine::MapDb, models::Room};

    fn db(values: serde_json::Value) -> MapDb {
        let rooms: Vec<Room> = serde_json::from_value(values).expect("rooms");
        MapDb::from_rooms(rooms, Some("test".to_string()), QuerySettings::default())
    }

    fn result_ids(outcome: &SearchOutcome<'_>) -> Vec<i64> {
        match outcome {
            SearchOutcome::Results { rooms, .. } => rooms.iter().map(|room| room.id).collect(),
            other => panic!("expected result set, got {other:?}"),
        }
    }

    #[test]
    fn map_filter_parse() {
        assert_eq!(MapFilter::parse(""), None);
        assert_eq!(MapFilter::parse("UNMAPPED"), Some(MapFilter::Unmapped));
        assert_eq!(
            MapFilter::parse("wl.png"),
            Some(MapFilter::Image("wl.png".to_string()))
        );
    }

    #[test]
    fn lookup_uses_ids_for_integers_and_alt_ids_otherwise() {
        let db = db(json!([
            { "id": 7, "uid": [7] },
            { "id": 8, "uid": ["u7x"] },
        ]));
        assert_eq!(db.lookup("7").map(|r| r.id), Some(7));
        assert_eq!(db.lookup("u7").map(|r| r.id), Some(7));
        assert_eq!(db.lookup(" u7x ").map(|r| r.id), Some(8));
        assert!(db.lookup("9").is_none());
    }

    #[test]
    fn alt_id_redirects_case_sensitively() {
        let db = db(json!([
            { "id": 1, "uid": [42], "title": ["[A]"] },
            { "id": 2, "title": ["[U42 hall]"] },
            { "id": 3, "title": ["[u42 annex]"] },
        ]));
        assert!(matches!(
            db.search("u42", None),
            SearchOutcome::Redirect { room, matched_by: MatchKind::AltId } if room.id == 1
        ));
        // Not an alt id: falls through to text search, which is case-insensitive.
        assert_eq!(result_ids(&db.search("U42", None)), vec![2, 3]);
    }

    #[test]
    fn text_search_checks_title_then_description() {
        let db = db(json!([
            { "id": 1, "title": ["[Forest Path]"], "description": ["Tall pines."] },
            { "id": 2, "title": ["[Clearing]"], "description": ["A quiet FOREST glade."] },
            { "id": 3, "title": ["[Beach]"], "description": ["Sand.", "forest in the alternate text"] },
        ]));
        let outcome = db.search("forest", None);
        assert_eq!(result_ids(&outcome), vec![1, 2]);
        assert!(matches!(
            outcome,
            SearchOutcome::Results { matched_by: Some(MatchKind::Text), .. }
        ));
    }

    #[test]
    fn tag_match_is_exact_and_case_sensitive() {
        let db = db(json!([
            { "id": 1, "tags": ["bank"] },
            { "id": 2, "tags": ["Bank"] },
            { "id": 3, "tags": ["bank"] },
        ]));
        assert_eq!(result_ids(&db.search("bank", None)), vec![1, 3]);
    }

    #[test]
    fn map_filter_applies_to_tag_and_text_stages() {
        let db = db(json!([
            { "id": 1, "tags": ["inn"], "image": "a.png" },
            { "id": 2, "tags": ["inn"] },
            { "id": 3, "tags": ["inn"], "image": "b.png" },
            { "id": 4, "tags": ["inn"] },
        ]));
        assert_eq!(
            result_ids(&db.search("inn", MapFilter::parse("UNMAPPED").as_ref())),
            vec![2, 4]
        );
        assert!(matches!(
            db.search("inn", MapFilter::parse("b.png").as_ref()),
            SearchOutcome::Redirect { room, matched_by: MatchKind::Tag } if room.id == 3
        ));
    }

    #[test]
    fn empty_term_and_no_match_yield_empty_results() {
        let db = db(json!([{ "id": 1, "title": ["[Room]"] }]));
        assert_eq!(db.search("   ", None), SearchOutcome::empty());
        assert_eq!(db.search("nothing", None), SearchOutcome::empty());
    }

    #[test]
    fn suggestions_are_capped() {
        let rooms = (0..80)
            .map(|id| json!({ "id": id, "tags": [format!("shop-{id:02}")] }))
            .collect::<Vec<_>>();
        let db = db(serde_json::Value::Array(rooms));
        let suggestions = db.suggest_tags("SHOP");
        assert_eq!(suggestions.len(), 50);
        assert_eq!(suggestions[0], "shop-00");
        assert!(db.suggest_tags("").is_empty());
    }

    #[test]
    fn tag_image_location_cascade() {
        let db = db(json!([
            { "id": 1, "tags": ["node", "meta:mapname:Landing"], "image": "wl.png", "location": "Wehnimer's Landing" },
            { "id": 2, "tags": ["node"], "image": "wl.png", "location": "Graveyard" },
            { "id": 3, "tags": ["node"], "image": "ar.png", "location": "Abandoned Farm" },
            { "id": 4, "tags": ["bank"], "image": "wl.png", "location": "Town" },
        ]));

        let images = db.images_for_tag("node");
        let names = images
            .iter()
            .map(|choice| (choice.filename.as_str(), choice.display_name.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(names, vec![("wl.png", "Landing"), ("ar.png", "ar.png")]);

        assert_eq!(
            db.locations_for_image("wl.png", Some("node")),
            vec!["Graveyard", "Wehnimer's Landing"]
        );
        assert_eq!(
            db.locations_for_image("wl.png", None),
            vec!["Graveyard", "Town", "Wehnimer's Landing"]
        );

        assert_eq!(db.first_tagged_room("node", "wl.png", None).map(|r| r.id), Some(1));
        assert_eq!(
            db.first_tagged_room("node", "wl.png", Some("Graveyard")).map(|r| r.id),
            Some(2)
        );
        assert!(db.first_tagged_room("bank", "ar.png", None).is_none());
    }

    #[test]
    fn map_neighbourhood_queries() {
        let db = db(json!([
            { "id": 1, "image": "town.png", "image_coords": [0, 0, 5, 5],
              "tags": ["inn", "meta:mapname:Town"], "location": "Town", "wayto": { "2": "north", "3": "go gate" } },
            { "id": 2, "image": "town.png", "image_coords": [5, 5, 9, 9],
              "tags": ["bank"], "wayto": { "1": "south", "4": "climb wall" } },
            { "id": 3, "image": "woods.png", "image_coords": [1, 1, 2, 2],
              "tags": ["meta:mapname:Whispering Woods"] },
            { "id": 4, "image": "abyss.png", "image_coords": [1, 1, 2, 2] },
            { "id": 5, "image": "town.png", "tags": ["unplaced"] },
        ]));

        let on_map = db.rooms_on_map("town.png").iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(on_map, vec![1, 2]);
        assert_eq!(db.image_tags("town.png"), vec!["bank", "inn"]);
        assert_eq!(db.image_locations("town.png"), vec!["Town"]);

        let room = db.lookup("1").expect("room");
        let adjacent = db
            .adjacent_maps(room)
            .into_iter()
            .map(|m| (m.display_name, m.room_id))
            .collect::<Vec<_>>();
        assert_eq!(
            adjacent,
            vec![
                ("Whispering Woods".to_string(), 3),
                ("abyss.png".to_string(), 4)
            ]
        );
    }
}
