//! Object store contract
//!
//! Channel implementations backed by a bucket read their catalog through
//! this trait. The hub engine never calls it directly; the catalog layer
//! resolves bucket content into Deployables first.

use crate::error::{ObjectResult, ObjectStoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Bucket/object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Succeeds when the bucket exists and is accessible
    async fn exists(&self, bucket: &str) -> ObjectResult<()>;

    async fn create(&self, bucket: &str) -> ObjectResult<()>;

    /// Names of every object in the bucket
    async fn list(&self, bucket: &str) -> ObjectResult<Vec<String>>;

    async fn put(&self, bucket: &str, name: &str, content: Vec<u8>) -> ObjectResult<()>;

    async fn get(&self, bucket: &str, name: &str) -> ObjectResult<Vec<u8>>;

    async fn delete(&self, bucket: &str, name: &str) -> ObjectResult<()>;
}

/// Access key pair presented to an object store
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

type Buckets = BTreeMap<String, BTreeMap<String, Vec<u8>>>;

/// In-memory object store
///
/// Handles created with [`connect`](Self::connect) share buckets with the
/// store they came from but present their own credentials.
#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    buckets: Arc<RwLock<Buckets>>,
    required: Option<Credentials>,
    presented: Option<Credentials>,
}

impl InMemoryObjectStore {
    /// Store that accepts every caller
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects callers not presenting `credentials`; the returned
    /// handle presents them
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            buckets: Arc::default(),
            required: Some(credentials.clone()),
            presented: Some(credentials),
        }
    }

    /// Another handle on the same buckets, presenting `credentials`
    pub fn connect(&self, credentials: Credentials) -> Self {
        Self {
            buckets: Arc::clone(&self.buckets),
            required: self.required.clone(),
            presented: Some(credentials),
        }
    }

    fn authorize(&self) -> ObjectResult<()> {
        match (&self.required, &self.presented) {
            (None, _) => Ok(()),
            (Some(required), Some(presented)) if required == presented => Ok(()),
            (Some(_), Some(presented)) => Err(ObjectStoreError::Credential(format!(
                "access key {} rejected",
                presented.access_key_id
            ))),
            (Some(_), None) => Err(ObjectStoreError::Credential(
                "no credentials presented".into(),
            )),
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn exists(&self, bucket: &str) -> ObjectResult<()> {
        self.authorize()?;
        if self.buckets.read().await.contains_key(bucket) {
            Ok(())
        } else {
            Err(ObjectStoreError::BucketNotFound(bucket.to_string()))
        }
    }

    async fn create(&self, bucket: &str) -> ObjectResult<()> {
        self.authorize()?;
        let mut buckets = self.buckets.write().await;
        if buckets.contains_key(bucket) {
            return Err(ObjectStoreError::BucketExists(bucket.to_string()));
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        debug!(bucket, "Bucket created");
        Ok(())
    }

    async fn list(&self, bucket: &str) -> ObjectResult<Vec<String>> {
        self.authorize()?;
        let buckets = self.buckets.read().await;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| ObjectStoreError::BucketNotFound(bucket.to_string()))?;
        Ok(objects.keys().cloned().collect())
    }

    async fn put(&self, bucket: &str, name: &str, content: Vec<u8>) -> ObjectResult<()> {
        self.authorize()?;
        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| ObjectStoreError::BucketNotFound(bucket.to_string()))?;
        objects.insert(name.to_string(), content);
        Ok(())
    }

    async fn get(&self, bucket: &str, name: &str) -> ObjectResult<Vec<u8>> {
        self.authorize()?;
        let buckets = self.buckets.read().await;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| ObjectStoreError::BucketNotFound(bucket.to_string()))?;
        objects
            .get(name)
            .cloned()
            .ok_or_else(|| ObjectStoreError::ObjectNotFound {
                bucket: bucket.to_string(),
                name: name.to_string(),
            })
    }

    async fn delete(&self, bucket: &str, name: &str) -> ObjectResult<()> {
        self.authorize()?;
        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| ObjectStoreError::BucketNotFound(bucket.to_string()))?;
        objects
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ObjectStoreError::ObjectNotFound {
                bucket: bucket.to_string(),
                name: name.to_string(),
            })
    }
}
