use std::{
    fs,
    path::{Path, PathBuf},
};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::{error::StoreError, models::Room};

pub const STAMP_KEY: &str = "updated_at";
const SQLITE_PAGE_SIZE: u64 = 4096;

/// Persistent local copy of the dataset plus the stamp it was written under.
///
/// `replace_all` must be atomic: a failed write leaves the previous copy readable.
pub trait ReplicaStore: Send + Sync {
    fn read_stamp(&self) -> Result<Option<String>, StoreError>;
    fn read_rooms(&self) -> Result<Vec<Room>, StoreError>;
    fn replace_all(&self, rooms: &[Room], stamp: Option<&str>) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct SqliteReplica {
    path: PathBuf,
    quota_bytes: Option<u64>,
}

impl SqliteReplica {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            quota_bytes: None,
        }
    }

    pub fn with_quota_bytes(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection, StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&self.path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            CREATE TABLE IF NOT EXISTS rooms (
                room_id INTEGER PRIMARY KEY,
                position INTEGER NOT NULL,
                record_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;

        if let Some(quota) = self.quota_bytes {
            let pages = (quota / SQLITE_PAGE_SIZE).max(1);
            conn.query_row(&format!("PRAGMA max_page_count = {pages}"), [], |_| Ok(()))?;
        }
        Ok(conn)
    }
}

impl ReplicaStore for SqliteReplica {
    fn read_stamp(&self) -> Result<Option<String>, StoreError> {
        let conn = self.open()?;
        let stamp = conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![STAMP_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(stamp)
    }

    fn read_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare("SELECT record_json FROM rooms ORDER BY position")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut rooms = Vec::new();
        for row in rows {
            let record_json = row?;
            rooms.push(serde_json::from_str::<Room>(&record_json)?);
        }
        debug!(rooms = rooms.len(), path = %self.path.display(), "Read replica rooms");
        Ok(rooms)
    }

    fn replace_all(&self, rooms: &[Room], stamp: Option<&str>) -> Result<(), StoreError> {
        let records = rooms
            .iter()
            .map(|room| serde_json::to_string(room).map(|json| (room.id, json)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM rooms", [])?;
        tx.execute("DELETE FROM meta WHERE key = ?1", params![STAMP_KEY])?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO rooms (room_id, position, record_json) VALUES (?1, ?2, ?3)",
            )?;
            for (position, (room_id, record_json)) in records.iter().enumerate() {
                stmt.execute(params![room_id, position as i64, record_json])?;
            }
        }
        if let Some(stamp) = stamp {
            tx.execute(
                "INSERT INTO meta (key, value) VALUES (?1, ?2)",
                params![STAMP_KEY, stamp],
            )?;
        }
        tx.commit()?;

        debug!(
            rooms = records.len(),
            stamp = stamp.unwrap_or(""),
            path = %self.path.display(),
            "Replaced replica contents"
        );
        Ok(())
    }
}
