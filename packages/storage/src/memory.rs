//! In-process backend.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::{ObjectMeta, ObjectStore, StorageError};

/// A stored object.
#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    content_type: String,
}

/// [`ObjectStore`] kept in memory, keyed by `(bucket, key)`.
///
/// Listing returns keys in lexicographic order, like S3.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    reject_uploads: bool,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with empty objects at `keys`.
    #[must_use]
    pub fn with_keys(bucket: &str, keys: &[&str]) -> Self {
        let store = Self::new();
        {
            let mut objects = store.lock();
            for key in keys {
                objects.insert(
                    (bucket.to_string(), (*key).to_string()),
                    StoredObject {
                        body: Vec::new(),
                        content_type: "application/octet-stream".to_string(),
                    },
                );
            }
        }
        store
    }

    /// Makes every subsequent [`ObjectStore::put`] fail.
    #[must_use]
    pub fn rejecting_uploads(mut self) -> Self {
        self.reject_uploads = true;
        self
    }

    /// Returns the body stored at `key`, if any.
    #[must_use]
    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.lock()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|obj| obj.body.clone())
    }

    /// Returns the content type stored at `key`, if any.
    #[must_use]
    pub fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.lock()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|obj| obj.content_type.clone())
    }

    /// Number of objects across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<(String, String), StoredObject>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>, StorageError> {
        Ok(self
            .lock()
            .iter()
            .filter(|((b, key), _)| b == bucket && key.starts_with(prefix))
            .map(|((_, key), obj)| ObjectMeta {
                key: key.clone(),
                size: obj.body.len() as u64,
                e_tag: None,
            })
            .collect())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        if self.reject_uploads {
            return Err(StorageError::Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source: "uploads rejected by memory store".into(),
            });
        }

        self.lock().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_only_matching_bucket_and_prefix() {
        let store = MemoryStore::new();
        store
            .put("a", "bts-data/2024/01/performance.csv", b"x".to_vec(), "text/csv")
            .await
            .unwrap();
        store
            .put("a", "other/file.txt", b"y".to_vec(), "text/plain")
            .await
            .unwrap();
        store
            .put("b", "bts-data/2024/02/performance.csv", b"z".to_vec(), "text/csv")
            .await
            .unwrap();

        let keys = store.list_keys("a", "bts-data/").await.unwrap();
        assert_eq!(keys, vec!["bts-data/2024/01/performance.csv".to_string()]);

        let meta = store.list("a", "bts-data/").await.unwrap();
        assert_eq!(meta[0].size, 1);
    }

    #[tokio::test]
    async fn put_overwrites_existing_object() {
        let store = MemoryStore::new();
        store.put("a", "k", b"old".to_vec(), "text/csv").await.unwrap();
        store.put("a", "k", b"new".to_vec(), "text/csv").await.unwrap();

        assert_eq!(store.get("a", "k").as_deref(), Some(&b"new"[..]));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn rejected_upload_is_reported() {
        let store = MemoryStore::new().rejecting_uploads();
        let err = store
            .put("a", "k", Vec::new(), "text/csv")
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Upload { ref key, .. } if key == "k"));
        assert!(store.is_empty());
    }
}
