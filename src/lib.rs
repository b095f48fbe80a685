pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod index;
pub mod models;
pub mod query;
pub mod router;
pub mod store;
pub mod sync;

pub use config::{Config, QuerySettings};
pub use engine::MapDb;
pub use error::{GatewayError, StoreError, SyncError};
pub use gateway::{HttpGateway, RemoteSource};
pub use models::{AltId, Dataset, ImageCoords, Room};
pub use query::{MapFilter, SearchOutcome};
pub use store::{ReplicaStore, SqliteReplica};
pub use sync::{DataSource, Degradation, Freshness, LoadPhase, SyncReport, Synchronizer};
