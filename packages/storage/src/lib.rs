#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Object storage abstraction for the BTS dataset bucket.
//!
//! The sync pipeline only needs two operations, listing a prefix and
//! putting an object, so they are captured by the [`ObjectStore`] trait.
//! Two backends are provided:
//!
//! - [`S3Store`]: Amazon S3 (or any S3-compatible store) via `aws-sdk-s3`.
//! - [`MemoryStore`]: an in-process map, for tests and local dry runs.
//!
//! # Environment Variables
//!
//! | Variable | Required | Description |
//! |---|---|---|
//! | `S3_ENDPOINT_URL` | No | Custom endpoint for S3-compatible stores (enables path-style addressing) |
//!
//! Credentials and region come from the standard AWS provider chain
//! (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_REGION`, profiles,
//! instance/task roles).

mod memory;
mod s3;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use s3::S3Store;

/// Errors that can occur during object storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// `ListObjectsV2` failed.
    #[error("Failed to list s3://{bucket}/{prefix}: {source}")]
    List {
        /// Bucket name.
        bucket: String,
        /// Key prefix.
        prefix: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// `PutObject` failed.
    #[error("Failed to upload s3://{bucket}/{key}: {source}")]
    Upload {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Raw metadata of a listed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Full object key (not stripped of the listing prefix).
    pub key: String,
    /// Content length in bytes.
    pub size: u64,
    /// `ETag` as reported by the store, quotes included.
    pub e_tag: Option<String>,
}

/// The storage operations the sync pipeline depends on.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists every object under `prefix` in `bucket`.
    ///
    /// Implementations must follow pagination to the end; callers rely on
    /// seeing the complete listing.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::List`] if the listing fails.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>, StorageError>;

    /// Uploads `body` to `key`, overwriting any existing object.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Upload`] if the upload fails. Failures are
    /// never swallowed.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Lists the keys under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::List`] if the listing fails.
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .list(bucket, prefix)
            .await?
            .into_iter()
            .map(|meta| meta.key)
            .collect())
    }
}
