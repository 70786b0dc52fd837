//! `S3Backend` - Object Storage
//!
//! One object per record: `[<prefix>/]<type_name>/<id>.json`, body is the
//! JSON envelope with content-type `application/json`. The bucket comes
//! from the URL host, the key prefix from the URL path; credentials,
//! region and endpoint are taken from the environment the way the
//! `object_store` crate resolves them.

use async_trait::async_trait;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use url::Url;
use uuid::Uuid;

use super::backend::StorageBackend;
use super::envelope::StoredEnvelope;
use super::error::{StorageError, StorageResult};

/// S3-compatible object storage backend.
pub struct S3Backend {
    url: Url,
    bucket: String,
    key_prefix: String,
    store: Option<AmazonS3>,
}

// Manual impl so URL credentials never reach log output.
impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("url", &super::error::scrub_url(&self.url))
            .field("bucket", &self.bucket)
            .field("key_prefix", &self.key_prefix)
            .field("connected", &self.store.is_some())
            .finish()
    }
}

impl S3Backend {
    /// Create an unconnected backend for `url`.
    #[must_use]
    pub fn new(url: &Url) -> Self {
        Self {
            url: url.clone(),
            bucket: url.host_str().unwrap_or_default().to_string(),
            key_prefix: url.path().trim_matches('/').to_string(),
            store: None,
        }
    }

    fn store(&self) -> StorageResult<&AmazonS3> {
        self.store
            .as_ref()
            .ok_or_else(|| StorageError::connection("not connected to s3"))
    }

    fn make_key(&self, id: Uuid, type_name: &str) -> ObjectPath {
        if self.key_prefix.is_empty() {
            ObjectPath::from(format!("{type_name}/{id}.json"))
        } else {
            ObjectPath::from(format!("{}/{type_name}/{id}.json", self.key_prefix))
        }
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    async fn connect(&mut self) -> StorageResult<()> {
        if self.store.is_some() {
            return Ok(());
        }

        let store = AmazonS3Builder::from_env()
            .with_bucket_name(&self.bucket)
            .build()
            .map_err(|e| {
                StorageError::connection_with("failed to configure s3 client", &self.url, e)
            })?;

        // Probe access so a missing or unreachable bucket fails here, not
        // on the first save.
        let probe = ObjectPath::from(self.key_prefix.clone());
        store
            .list_with_delimiter(Some(&probe))
            .await
            .map_err(|e| {
                StorageError::connection_with(
                    format!("s3 bucket '{}' is not accessible", self.bucket),
                    &self.url,
                    e,
                )
            })?;

        self.store = Some(store);
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.store = None;
    }

    #[tracing::instrument(skip(self, envelope))]
    async fn save(
        &self,
        id: Uuid,
        type_name: &str,
        envelope: &StoredEnvelope,
    ) -> StorageResult<()> {
        assert!(!type_name.is_empty(), "type name cannot be empty");

        let store = self.store()?;
        let key = self.make_key(id, type_name);

        // Updates keep the record's original creation time.
        let mut entry = envelope.clone();
        match store.get(&key).await {
            Ok(existing) => {
                let body = existing
                    .bytes()
                    .await
                    .map_err(|e| StorageError::backend_with("failed to read prior record", e))?;
                if let Ok(prior) = serde_json::from_slice::<StoredEnvelope>(&body) {
                    entry.created_at = prior.created_at;
                }
            }
            Err(object_store::Error::NotFound { .. }) => {}
            Err(e) => {
                return Err(StorageError::backend_with("failed to read prior record", e));
            }
        }

        let body = serde_json::to_vec(&entry)
            .map_err(|e| StorageError::backend_with("failed to encode envelope", e))?;

        let options = PutOptions {
            attributes: Attributes::from_iter([(Attribute::ContentType, "application/json")]),
            ..Default::default()
        };

        store
            .put_opts(&key, PutPayload::from(body), options)
            .await
            .map_err(|e| StorageError::backend_with("failed to save record", e))?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn load(&self, id: Uuid, type_name: &str) -> StorageResult<Option<StoredEnvelope>> {
        assert!(!type_name.is_empty(), "type name cannot be empty");

        let store = self.store()?;
        let key = self.make_key(id, type_name);

        let result = match store.get(&key).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(StorageError::backend_with("failed to load record", e)),
        };

        let body = result
            .bytes()
            .await
            .map_err(|e| StorageError::backend_with("failed to read record body", e))?;

        let envelope = serde_json::from_slice(&body)
            .map_err(|e| StorageError::backend_with("failed to decode envelope", e))?;

        Ok(Some(envelope))
    }
}
