use std::sync::Arc;

use serde::Serialize;
use tokio::task;
use tracing::{debug, info, warn};

use crate::{
    error::{StoreError, SyncError},
    gateway::RemoteSource,
    models::{Dataset, Room},
    store::ReplicaStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    CheckingCache,
    LoadingFromCache,
    Downloading,
    Caching,
    BuildingIndices,
}

impl LoadPhase {
    pub fn message(&self) -> &'static str {
        match self {
            Self::CheckingCache => "Checking cache...",
            Self::LoadingFromCache => "Loading from cache...",
            Self::Downloading => "Downloading room data...",
            Self::Caching => "Caching data...",
            Self::BuildingIndices => "Building indices...",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    StampUnavailable { reason: String },
    StoreUnavailable,
    StoreReadFailed { reason: String },
    PersistFailed { quota_exceeded: bool, reason: String },
    ServedStaleReplica { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    CacheHit,
    Downloaded,
    StaleReplica,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub source: DataSource,
    pub effective_stamp: Option<String>,
    pub degradations: Vec<Degradation>,
}

impl SyncReport {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Freshness {
    pub stale: bool,
    pub effective_stamp: Option<String>,
    pub remote_stamp: Option<String>,
}

#[derive(Clone)]
pub struct Synchronizer {
    remote: Arc<dyn RemoteSource>,
    replica: Option<Arc<dyn ReplicaStore>>,
}

impl Synchronizer {
    pub fn new(remote: Arc<dyn RemoteSource>, replica: Option<Arc<dyn ReplicaStore>>) -> Self {
        Self { remote, replica }
    }

    /// Only a failed body download with no usable replica is fatal.
    pub async fn load<F>(&self, mut progress: F) -> Result<(Dataset, SyncReport), SyncError>
    where
        F: FnMut(LoadPhase),
    {
        let mut degradations = Vec::new();
        progress(LoadPhase::CheckingCache);

        let remote_stamp = match self.remote.fetch_stamp().await {
            Ok(stamp) if !stamp.is_empty() => Some(stamp),
            Ok(_) => {
                warn!("Remote version stamp is empty; treating as unknown");
                degradations.push(Degradation::StampUnavailable {
                    reason: "empty stamp".to_string(),
                });
                None
            }
            Err(err) => {
                warn!("Remote version stamp unavailable: {err}");
                degradations.push(Degradation::StampUnavailable {
                    reason: err.to_string(),
                });
                None
            }
        };

        let local_stamp = match &self.replica {
            Some(replica) => match run_blocking(replica, |store| store.read_stamp()).await {
                Ok(stamp) => stamp,
                Err(err) => {
                    warn!("Failed to read replica stamp: {err}");
                    degradations.push(Degradation::StoreReadFailed {
                        reason: err.to_string(),
                    });
                    None
                }
            },
            None => {
                debug!("Replica store disabled");
                degradations.push(Degradation::StoreUnavailable);
                None
            }
        };

        if let (Some(remote), Some(local), Some(replica)) =
            (&remote_stamp, &local_stamp, &self.replica)
        {
            if remote == local {
                progress(LoadPhase::LoadingFromCache);
                match run_blocking(replica, |store| store.read_rooms()).await {
                    Ok(rooms) => {
                        info!(rooms = rooms.len(), stamp = %local, "Loaded rooms from replica");
                        return Ok(finish(
                            rooms,
                            Some(local.clone()),
                            DataSource::CacheHit,
                            degradations,
                        ));
                    }
                    Err(err) => {
                        warn!("Replica read failed on cache hit, downloading instead: {err}");
                        degradations.push(Degradation::StoreReadFailed {
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }

        progress(LoadPhase::Downloading);
        let rooms = match self.remote.fetch_rooms().await {
            Ok(rooms) => rooms,
            Err(err) => {
                if let Some(rooms) = self.stale_replica().await {
                    warn!(
                        rooms = rooms.len(),
                        "Dataset download failed, serving replica copy: {err}"
                    );
                    degradations.push(Degradation::ServedStaleReplica {
                        reason: err.to_string(),
                    });
                    return Ok(finish(
                        rooms,
                        local_stamp,
                        DataSource::StaleReplica,
                        degradations,
                    ));
                }
                return Err(SyncError::DatasetUnavailable(err));
            }
        };
        info!(rooms = rooms.len(), stamp = ?remote_stamp, "Downloaded room dataset");

        if let Some(replica) = &self.replica {
            progress(LoadPhase::Caching);
            let to_persist = rooms.clone();
            let stamp = remote_stamp.clone();
            let persisted = run_blocking(replica, move |store| {
                store.replace_all(&to_persist, stamp.as_deref())
            })
            .await;
            if let Err(err) = persisted {
                let quota_exceeded = err.is_quota_exceeded();
                if quota_exceeded {
                    warn!("Replica quota exceeded, continuing without cache");
                } else {
                    warn!("Failed to cache data: {err}");
                }
                degradations.push(Degradation::PersistFailed {
                    quota_exceeded,
                    reason: err.to_string(),
                });
            }
        }

        Ok(finish(
            rooms,
            remote_stamp,
            DataSource::Downloaded,
            degradations,
        ))
    }

    // A failure here ends the load, so it is logged rather than reported.
    async fn stale_replica(&self) -> Option<Vec<Room>> {
        let replica = self.replica.as_ref()?;
        match run_blocking(replica, |store| store.read_rooms()).await {
            Ok(rooms) if !rooms.is_empty() => Some(rooms),
            Ok(_) => None,
            Err(err) => {
                warn!("Replica unreadable, no offline copy available: {err}");
                None
            }
        }
    }

    pub async fn check_freshness(&self, effective_stamp: Option<&str>) -> Freshness {
        let remote_stamp = match self.remote.fetch_stamp().await {
            Ok(stamp) if !stamp.is_empty() => Some(stamp),
            Ok(_) => None,
            Err(err) => {
                debug!("Freshness probe failed: {err}");
                None
            }
        };

        let stale = remote_stamp
            .as_deref()
            .is_some_and(|remote| effective_stamp != Some(remote));
        Freshness {
            stale,
            effective_stamp: effective_stamp.map(ToString::to_string),
            remote_stamp,
        }
    }
}

fn finish(
    rooms: Vec<Room>,
    stamp: Option<String>,
    source: DataSource,
    degradations: Vec<Degradation>,
) -> (Dataset, SyncReport) {
    let report = SyncReport {
        source,
        effective_stamp: stamp.clone(),
        degradations,
    };
    (Dataset { rooms, stamp }, report)
}

async fn run_blocking<T, F>(replica: &Arc<dyn ReplicaStore>, op: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&dyn ReplicaStore) -> Result<T, StoreError> + Send + 'static,
{
    let replica = Arc::clone(replica);
    task::spawn_blocking(move || op(replica.as_ref()))
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?
}
