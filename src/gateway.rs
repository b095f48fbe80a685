use async_trait::async_trait;
use reqwest::{
    header::{CACHE_CONTROL, PRAGMA},
    Client,
};
use tracing::debug;
use url::Url;

use crate::{error::GatewayError, models::Room};

#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Current version stamp, trimmed. Must bypass intermediate caches.
    async fn fetch_stamp(&self) -> Result<String, GatewayError>;

    async fn fetch_rooms(&self) -> Result<Vec<Room>, GatewayError>;
}

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    dataset_url: Url,
    stamp_url: Url,
}

impl HttpGateway {
    pub fn new(base_url: &Url, dataset_path: &str, stamp_path: &str) -> Result<Self, GatewayError> {
        let dataset_url = base_url
            .join(dataset_path)
            .map_err(|_| GatewayError::InvalidUrl(format!("{base_url}{dataset_path}")))?;
        let stamp_url = base_url
            .join(stamp_path)
            .map_err(|_| GatewayError::InvalidUrl(format!("{base_url}{stamp_path}")))?;
        Ok(Self {
            client: Client::new(),
            dataset_url,
            stamp_url,
        })
    }

    pub fn dataset_url(&self) -> &Url {
        &self.dataset_url
    }

    pub fn stamp_url(&self) -> &Url {
        &self.stamp_url
    }

    async fn get(&self, url: &Url, bypass_cache: bool) -> Result<reqwest::Response, GatewayError> {
        let mut request = self.client.get(url.clone());
        if bypass_cache {
            request = request
                .header(CACHE_CONTROL, "no-cache, no-store, max-age=0")
                .header(PRAGMA, "no-cache");
        }

        let response = request.send().await.map_err(|source| GatewayError::Request {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl RemoteSource for HttpGateway {
    async fn fetch_stamp(&self) -> Result<String, GatewayError> {
        let response = self.get(&self.stamp_url, true).await?;
        let text = response.text().await.map_err(|err| GatewayError::Decode {
            url: self.stamp_url.to_string(),
            message: err.to_string(),
        })?;
        let stamp = text.trim().to_string();
        debug!(stamp = %stamp, "Fetched remote version stamp");
        Ok(stamp)
    }

    async fn fetch_rooms(&self) -> Result<Vec<Room>, GatewayError> {
        let response = self.get(&self.dataset_url, false).await?;
        let rooms = response
            .json::<Vec<Room>>()
            .await
            .map_err(|err| GatewayError::Decode {
                url: self.dataset_url.to_string(),
                message: err.to_string(),
            })?;
        debug!(rooms = rooms.len(), "Fetched room dataset");
        Ok(rooms)
    }
}
