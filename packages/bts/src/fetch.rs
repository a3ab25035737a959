//! Archive download.
//!
//! [`ArchiveFetcher`] is the HTTP collaborator of the pipeline. The only
//! production implementation is [`HttpFetcher`]; tests substitute a fake
//! that serves canned bytes.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt as _, TryStreamExt as _};

use crate::SyncError;

/// A streamed response body.
pub type ArchiveBody = BoxStream<'static, std::io::Result<Bytes>>;

/// A successful archive response.
pub struct ArchiveDownload {
    /// Length reported by the server, if any.
    pub content_length: Option<u64>,
    /// The body, not yet read.
    pub body: ArchiveBody,
}

impl std::fmt::Debug for ArchiveDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveDownload")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Fetches an archive by URL.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Starts the download of `url`.
    ///
    /// Returns `Ok(None)` when the server answered without a body.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Http`] if the request fails and
    /// [`SyncError::HttpStatus`] for a non-success status.
    async fn fetch(&self, url: &str) -> Result<Option<ArchiveDownload>, SyncError>;
}

/// [`ArchiveFetcher`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Builds a client with the given overall request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Http`] if the TLS backend cannot be
    /// initialised.
    pub fn new(timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("aviation-bts/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArchiveFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<ArchiveDownload>, SyncError> {
        log::info!("Downloading {url}");

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(SyncError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let content_length = response.content_length();
        if content_length == Some(0) {
            return Ok(None);
        }
        if let Some(size) = content_length {
            #[allow(clippy::cast_precision_loss)]
            let mb = size as f64 / 1_048_576.0;
            log::info!("  archive size: {mb:.1} MB");
        }

        let body = response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed();

        Ok(Some(ArchiveDownload {
            content_length,
            body,
        }))
    }
}
