//! `RedisBackend` - Key-Value Storage
//!
//! Envelopes are stored as JSON strings under predictable keys:
//! `<prefix>:<type_name>:<id>`. Suited to caching and short-lived records.
//!
//! The key prefix can be overridden with a `?prefix=` query parameter on the
//! storage URL; the query is stripped before the URL reaches the client.

use async_trait::async_trait;
use redis::AsyncCommands;
use url::Url;
use uuid::Uuid;

use crate::constants::REDIS_KEY_PREFIX_DEFAULT;

use super::backend::StorageBackend;
use super::envelope::StoredEnvelope;
use super::error::{StorageError, StorageResult};

/// Redis storage backend.
pub struct RedisBackend {
    url: Url,
    key_prefix: String,
    connection: Option<redis::aio::MultiplexedConnection>,
}

// The multiplexed connection handle has no Debug impl.
impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("url", &super::error::scrub_url(&self.url))
            .field("key_prefix", &self.key_prefix)
            .field("connected", &self.connection.is_some())
            .finish()
    }
}

impl RedisBackend {
    /// Create an unconnected backend for `url`.
    #[must_use]
    pub fn new(url: &Url) -> Self {
        let key_prefix = url
            .query_pairs()
            .find(|(name, _)| name == "prefix")
            .map_or_else(
                || REDIS_KEY_PREFIX_DEFAULT.to_string(),
                |(_, value)| value.into_owned(),
            );

        let mut url = url.clone();
        url.set_query(None);

        Self {
            url,
            key_prefix,
            connection: None,
        }
    }

    fn connection(&self) -> StorageResult<redis::aio::MultiplexedConnection> {
        self.connection
            .clone()
            .ok_or_else(|| StorageError::connection("not connected to redis"))
    }

    fn make_key(&self, id: Uuid, type_name: &str) -> String {
        format!("{}:{type_name}:{id}", self.key_prefix)
    }
}

#[async_trait]
impl StorageBackend for RedisBackend {
    async fn connect(&mut self) -> StorageResult<()> {
        if self.connection.is_some() {
            return Ok(());
        }

        let client = redis::Client::open(self.url.as_str()).map_err(|e| {
            StorageError::connection_with("invalid redis URL", &self.url, e)
        })?;

        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                StorageError::connection_with("failed to connect to redis", &self.url, e)
            })?;

        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(|e| {
                StorageError::connection_with("redis did not answer ping", &self.url, e)
            })?;

        self.connection = Some(connection);
        Ok(())
    }

    async fn disconnect(&mut self) {
        // Dropping the multiplexed handle releases the connection.
        self.connection = None;
    }

    #[tracing::instrument(skip(self, envelope))]
    async fn save(
        &self,
        id: Uuid,
        type_name: &str,
        envelope: &StoredEnvelope,
    ) -> StorageResult<()> {
        assert!(!type_name.is_empty(), "type name cannot be empty");

        let mut connection = self.connection()?;
        let key = self.make_key(id, type_name);

        // Updates keep the record's original creation time.
        let mut entry = envelope.clone();
        let existing: Option<String> = connection
            .get(&key)
            .await
            .map_err(|e| StorageError::backend_with("failed to read prior record", e))?;
        if let Some(raw) = existing {
            if let Ok(prior) = serde_json::from_str::<StoredEnvelope>(&raw) {
                entry.created_at = prior.created_at;
            }
        }

        let value = serde_json::to_string(&entry)
            .map_err(|e| StorageError::backend_with("failed to encode envelope", e))?;

        connection
            .set::<_, _, ()>(&key, value)
            .await
            .map_err(|e| StorageError::backend_with("failed to save record", e))?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn load(&self, id: Uuid, type_name: &str) -> StorageResult<Option<StoredEnvelope>> {
        assert!(!type_name.is_empty(), "type name cannot be empty");

        let mut connection = self.connection()?;
        let key = self.make_key(id, type_name);

        let value: Option<String> = connection
            .get(&key)
            .await
            .map_err(|e| StorageError::backend_with("failed to load record", e))?;

        match value {
            Some(raw) => {
                let envelope = serde_json::from_str(&raw)
                    .map_err(|e| StorageError::backend_with("failed to decode envelope", e))?;
                Ok(Some(envelope))
            }
            None => Ok(None),
        }
    }
}

// =============================================================================
// Tests (require running Redis)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::env;

    fn test_redis_url() -> Option<String> {
        env::var("TEST_REDIS_URL").ok()
    }

    macro_rules! require_redis {
        () => {
            match test_redis_url() {
                Some(url) => Url::parse(&url).expect("TEST_REDIS_URL must be a valid URL"),
                None => {
                    eprintln!("Skipping test: TEST_REDIS_URL not set");
                    return;
                }
            }
        };
    }

    #[test]
    fn test_key_format() {
        let url = Url::parse("redis://localhost:6379/0").unwrap();
        let backend = RedisBackend::new(&url);
        let id = Uuid::nil();
        assert_eq!(
            backend.make_key(id, "User"),
            format!("{REDIS_KEY_PREFIX_DEFAULT}:User:{id}")
        );
    }

    #[test]
    fn test_prefix_from_query() {
        let url = Url::parse("redis://localhost:6379/0?prefix=myapp").unwrap();
        let backend = RedisBackend::new(&url);
        let id = Uuid::nil();
        assert_eq!(backend.make_key(id, "User"), format!("myapp:User:{id}"));
        // The query must not reach the client URL.
        assert!(backend.url.query().is_none());
    }

    #[tokio::test]
    async fn test_redis_operations_require_connect() {
        let url = Url::parse("redis://localhost:6379/0").unwrap();
        let backend = RedisBackend::new(&url);

        let result = backend.load(Uuid::new_v4(), "User").await;
        assert!(matches!(result, Err(StorageError::Connection { .. })));
    }

    #[tokio::test]
    async fn test_redis_save_load_roundtrip() {
        let url = require_redis!();
        let mut backend = RedisBackend::new(&url);
        backend.connect().await.unwrap();

        let id = Uuid::new_v4();
        let envelope = StoredEnvelope::new(json!({"name": "Alice", "age": 30}));
        backend.save(id, "User", &envelope).await.unwrap();

        let loaded = backend.load(id, "User").await.unwrap().unwrap();
        assert_eq!(loaded.data, envelope.data);

        assert!(backend.load(Uuid::new_v4(), "User").await.unwrap().is_none());

        backend.disconnect().await;
    }

    #[tokio::test]
    async fn test_redis_upsert_preserves_created_at() {
        let url = require_redis!();
        let mut backend = RedisBackend::new(&url);
        backend.connect().await.unwrap();

        let id = Uuid::new_v4();
        let first = StoredEnvelope::new(json!({"v": 1}));
        backend.save(id, "User", &first).await.unwrap();

        let second = StoredEnvelope::new(json!({"v": 2}));
        backend.save(id, "User", &second).await.unwrap();

        let loaded = backend.load(id, "User").await.unwrap().unwrap();
        assert_eq!(loaded.data, json!({"v": 2}));
        assert_eq!(loaded.created_at, first.created_at);

        backend.disconnect().await;
    }
}
