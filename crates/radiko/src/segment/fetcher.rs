// Segment fetcher: raw download of one timefree segment. Failures are not retried.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::debug;

use crate::auth::handshake::{HEADER_AREA_ID, HEADER_AUTH_TOKEN};
use crate::auth::manager::Credential;
use crate::error::SegmentFetchError;
use crate::playlist::SegmentRef;

#[async_trait]
pub trait SegmentDownloader: Send + Sync {
    async fn download_segment(
        &self,
        segment: &SegmentRef,
        credential: &Credential,
    ) -> Result<Bytes, SegmentFetchError>;
}

pub struct HttpSegmentFetcher {
    http_client: Client,
}

impl HttpSegmentFetcher {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl SegmentDownloader for HttpSegmentFetcher {
    async fn download_segment(
        &self,
        segment: &SegmentRef,
        credential: &Credential,
    ) -> Result<Bytes, SegmentFetchError> {
        let network = |source| SegmentFetchError::Network {
            url: segment.url.clone(),
            source,
        };

        let response = self
            .http_client
            .get(&segment.url)
            .header(HEADER_AUTH_TOKEN, &credential.token)
            .header(HEADER_AREA_ID, &credential.area_id)
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SegmentFetchError::Status {
                url: segment.url.clone(),
                status,
            });
        }

        let data = response.bytes().await.map_err(network)?;
        debug!(ordinal = segment.ordinal, len = data.len(), "Fetched segment");
        Ok(data)
    }
}
