use std::{env, net::SocketAddr, path::PathBuf};

use anyhow::{Context, Result};
use url::Url;

pub const DEFAULT_OVERFLOW_THRESHOLD: usize = 100;
pub const DEFAULT_SUGGESTION_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySettings {
    pub overflow_threshold: usize,
    pub suggestion_limit: usize,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            overflow_threshold: DEFAULT_OVERFLOW_THRESHOLD,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub remote_base_url: Url,
    pub dataset_path: String,
    pub stamp_path: String,
    pub store_path: PathBuf,
    pub store_quota_bytes: Option<u64>,
    pub disable_cache: bool,
    pub freshness_interval_seconds: u64,
    pub query: QuerySettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bind_raw = env::var("MAPDB_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_normalized = bind_raw
            .trim()
            .trim_matches('"')
            .trim_matches('\'')
            .to_string();
        let bind_addr = bind_normalized
            .parse::<SocketAddr>()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8080)));

        let base_raw = env::var("MAPDB_REMOTE_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000/".to_string());
        let remote_base_url = parse_base_url(&base_raw)?;

        let dataset_path =
            env::var("MAPDB_DATASET_PATH").unwrap_or_else(|_| "data/map.json".to_string());
        let stamp_path =
            env::var("MAPDB_STAMP_PATH").unwrap_or_else(|_| "data/updated_at".to_string());

        let store_path = PathBuf::from(
            env::var("MAPDB_STORE_PATH").unwrap_or_else(|_| "./mapdb-cache.sqlite".to_string()),
        );

        let store_quota_bytes = env::var("MAPDB_STORE_QUOTA_BYTES")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0);

        let disable_cache = env_flag("MAPDB_DISABLE_CACHE");

        let freshness_interval_seconds = env::var("MAPDB_FRESHNESS_INTERVAL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(300);

        let overflow_threshold = env::var("MAPDB_OVERFLOW_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_OVERFLOW_THRESHOLD);

        let suggestion_limit = env::var("MAPDB_SUGGESTION_LIMIT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_SUGGESTION_LIMIT);

        Ok(Self {
            bind_addr,
            remote_base_url,
            dataset_path,
            stamp_path,
            store_path,
            store_quota_bytes,
            disable_cache,
            freshness_interval_seconds,
            query: QuerySettings {
                overflow_threshold,
                suggestion_limit,
            },
        })
    }
}

/// Relative paths only resolve beneath the base when it ends with a slash.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&normalized).with_context(|| format!("Invalid MAPDB_REMOTE_BASE_URL: {raw}"))
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .ok()
        .map(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}
