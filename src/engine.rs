use tracing::{info, warn};

use crate::{
    config::QuerySettings,
    error::SyncError,
    index::{Indices, MapCategory},
    models::{Dataset, Room},
    sync::{Freshness, LoadPhase, SyncReport, Synchronizer},
};

#[derive(Debug)]
pub struct MapDb {
    rooms: Vec<Room>,
    indices: Indices,
    stamp: Option<String>,
    settings: QuerySettings,
}

impl MapDb {
    pub fn from_rooms(rooms: Vec<Room>, stamp: Option<String>, settings: QuerySettings) -> Self {
        let indices = Indices::build(&rooms);
        if indices.alt_id_collisions() > 0 {
            warn!(
                collisions = indices.alt_id_collisions(),
                "Alt ids declared by more than one room"
            );
        }
        info!(
            rooms = rooms.len(),
            tags = indices.tags().len(),
            categories = indices.map_categories().len(),
            "Built room indices"
        );
        Self {
            rooms,
            indices,
            stamp,
            settings,
        }
    }

    pub fn from_dataset(dataset: Dataset, settings: QuerySettings) -> Self {
        Self::from_rooms(dataset.rooms, dataset.stamp, settings)
    }

    pub async fn load<F>(
        sync: &Synchronizer,
        settings: QuerySettings,
        mut progress: F,
    ) -> Result<(Self, SyncReport), SyncError>
    where
        F: FnMut(LoadPhase),
    {
        let (dataset, report) = sync.load(&mut progress).await?;
        progress(LoadPhase::BuildingIndices);
        Ok((Self::from_dataset(dataset, settings), report))
    }

    pub async fn check_freshness(&self, sync: &Synchronizer) -> Freshness {
        sync.check_freshness(self.stamp()).await
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn indices(&self) -> &Indices {
        &self.indices
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    pub fn stamp(&self) -> Option<&str> {
        self.stamp.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        self.indices.tags()
    }

    pub fn map_categories(&self) -> &[MapCategory] {
        self.indices.map_categories()
    }

    pub fn room_by_id(&self, id: i64) -> Option<&Room> {
        self.indices
            .position_by_id(id)
            .and_then(|idx| self.rooms.get(idx))
    }

    pub fn room_by_alt_id(&self, key: &str) -> Option<&Room> {
        self.indices
            .position_by_alt_id(key)
            .and_then(|idx| self.rooms.get(idx))
    }
}
