use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

pub const META_TAG_PREFIX: &str = "meta:";
pub const MAP_NAME_TAG_PREFIX: &str = "meta:mapname:";
pub const MAP_CATEGORY_TAG_PREFIX: &str = "meta:mapcategory:";

/// Secondary room key. Integer alt ids are addressed as `u<n>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AltId {
    Number(i64),
    Text(String),
}

impl AltId {
    pub fn lookup_key(&self) -> String {
        match self {
            Self::Number(value) => format!("u{value}"),
            Self::Text(value) => value.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageCoords(pub f64, pub f64, pub f64, pub f64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    #[serde(
        rename = "uid",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub alt_ids: Vec<AltId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub paths: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_coords: Option<ImageCoords>,
    #[serde(
        rename = "wayto",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub exits: IndexMap<String, String>,
}

impl Room {
    pub fn primary_title(&self) -> Option<&str> {
        self.title.first().map(String::as_str)
    }

    pub fn primary_description(&self) -> Option<&str> {
        self.description.first().map(String::as_str)
    }

    /// Map image identifier; an empty string counts as no image.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref().filter(|image| !image.is_empty())
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref().filter(|location| !location.is_empty())
    }

    pub fn is_placed(&self) -> bool {
        self.image().is_some() && self.image_coords.is_some()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
    }

    pub fn on_image(&self, image: &str) -> bool {
        self.image() == Some(image)
    }

    pub fn exit_room_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.exits
            .keys()
            .filter_map(|key| key.trim().parse::<i64>().ok())
    }

    pub fn map_name_tag(&self) -> Option<&str> {
        self.tags
            .iter()
            .find_map(|tag| tag.strip_prefix(MAP_NAME_TAG_PREFIX))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub rooms: Vec<Room>,
    pub stamp: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
