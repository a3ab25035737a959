//! Amazon S3 backend.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::StalledStreamProtectionConfig;
use aws_sdk_s3::primitives::ByteStream;

use crate::{ObjectMeta, ObjectStore, StorageError};

/// Environment variable overriding the S3 endpoint.
const ENDPOINT_ENV: &str = "S3_ENDPOINT_URL";

/// [`ObjectStore`] backed by `aws-sdk-s3`.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    /// Wraps an already configured SDK client.
    #[must_use]
    pub const fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Creates a client from the standard AWS provider chain.
    ///
    /// If `S3_ENDPOINT_URL` is set (and non-empty) requests go to that
    /// endpoint with path-style addressing, which is what MinIO, R2 and
    /// `LocalStack` expect.
    pub async fn from_env() -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared)
            .stalled_stream_protection(StalledStreamProtectionConfig::disabled());

        if let Some(endpoint) = std::env::var(ENDPOINT_ENV).ok().filter(|e| !e.is_empty()) {
            log::info!("Using custom S3 endpoint {endpoint}");
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::new(aws_sdk_s3::Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>, StorageError> {
        log::info!("Listing s3://{bucket}/{prefix}*");

        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(bucket).prefix(prefix);

            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let output = request.send().await.map_err(|e| StorageError::List {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                source: Box::new(e),
            })?;

            for obj in output.contents() {
                if let Some(key) = obj.key() {
                    #[allow(clippy::cast_sign_loss)] // S3 sizes are non-negative
                    let size = obj.size().unwrap_or(0).max(0) as u64;
                    objects.push(ObjectMeta {
                        key: key.to_string(),
                        size,
                        e_tag: obj.e_tag().map(str::to_string),
                    });
                }
            }

            if output.is_truncated() == Some(true) {
                continuation_token = output.next_continuation_token().map(String::from);
                if continuation_token.is_none() {
                    log::warn!("  truncated listing without continuation token, stopping");
                    break;
                }
            } else {
                break;
            }
        }

        log::info!("  found {} objects", objects.len());
        Ok(objects)
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let size = body.len();
        #[allow(clippy::cast_precision_loss)] // display-only MB value
        let mb = size as f64 / 1_048_576.0;
        log::info!("Pushing s3://{bucket}/{key} ({mb:.1} MB)");

        #[allow(clippy::cast_possible_wrap)] // a single in-memory entry fits in i64
        let content_length = size as i64;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_length(content_length)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source: Box::new(e),
            })?;

        log::info!("  uploaded {key}");
        Ok(())
    }
}
