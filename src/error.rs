use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("invalid remote url {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage quota exceeded")]
    QuotaExceeded,
    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),
    #[error("malformed room record: {0}")]
    Record(#[from] serde_json::Error),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage task failed: {0}")]
    Task(String),
}

impl StoreError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::DiskFull =>
            {
                Self::QuotaExceeded
            }
            _ => Self::Sqlite(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("room dataset unavailable: {0}")]
    DatasetUnavailable(#[source] GatewayError),
}

#[cfg(test)]
mod tests {
    use super::StoreError;

    #[test]
    fn disk_full_maps_to_quota_exceeded() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
            None,
        );
        assert!(StoreError::from(err).is_quota_exceeded());
    }

    #[test]
    fn other_sqlite_failures_stay_generic() {
        let err = rusqlite::Error::QueryReturnedNoRows;
        assert!(!StoreError::from(err).is_quota_exceeded());
    }
}
