//! `MemoryBackend` - In-Memory Storage for Testing
//!
//! Registered under the `test` scheme. Stores envelopes in a process-shared
//! map keyed by URL, so the fresh instance the orchestrator creates for each
//! call still observes data written by earlier calls to the same URL (the
//! same allowance a production backend uses to share a pool across
//! instances).
//!
//! Faults are injected deterministically through the URL query:
//! `test://memory/db?fail=save` makes every save fail while connect and
//! load still succeed. Connect/disconnect counters are tracked per URL so
//! tests can assert scoped-resource release.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use super::backend::StorageBackend;
use super::envelope::StoredEnvelope;
use super::error::{StorageError, StorageResult};

/// Shared per-URL store state.
#[derive(Debug, Default)]
struct MemoryStore {
    /// Envelopes keyed by (type name, id)
    records: HashMap<(String, String), StoredEnvelope>,
    connect_count: u64,
    disconnect_count: u64,
}

fn stores() -> &'static Mutex<HashMap<String, Arc<Mutex<MemoryStore>>>> {
    static STORES: OnceLock<Mutex<HashMap<String, Arc<Mutex<MemoryStore>>>>> = OnceLock::new();
    STORES.get_or_init(|| Mutex::new(HashMap::new()))
}

fn store_for(key: &str) -> Arc<Mutex<MemoryStore>> {
    let mut stores = stores().lock().unwrap();
    Arc::clone(stores.entry(key.to_string()).or_default())
}

/// Which operations should fail, parsed from `?fail=` query parameters.
#[derive(Debug, Clone, Copy, Default)]
struct FaultSpec {
    connect: bool,
    save: bool,
    load: bool,
}

impl FaultSpec {
    fn from_url(url: &Url) -> Self {
        let mut spec = Self::default();
        for (name, value) in url.query_pairs() {
            if name != "fail" {
                continue;
            }
            match value.as_ref() {
                "connect" => spec.connect = true,
                "save" => spec.save = true,
                "load" => spec.load = true,
                _ => {}
            }
        }
        spec
    }
}

/// Counters and sizes for one memory store, for test assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    /// Number of stored records
    pub records: usize,
    /// Successful `connect` calls observed
    pub connects: u64,
    /// `disconnect` calls observed
    pub disconnects: u64,
}

/// In-memory storage backend for tests.
#[derive(Debug)]
pub struct MemoryBackend {
    store_key: String,
    faults: FaultSpec,
    /// Present while connected.
    store: Option<Arc<Mutex<MemoryStore>>>,
}

impl MemoryBackend {
    /// URL scheme this backend registers under.
    pub const SCHEME: &'static str = "test";

    /// Create an unconnected backend for `url`.
    ///
    /// The store identity is the URL's host and path; the query only
    /// carries fault configuration, so `test://memory/db` and
    /// `test://memory/db?fail=load` address the same data.
    #[must_use]
    pub fn new(url: &Url) -> Self {
        Self {
            store_key: Self::store_key(url),
            faults: FaultSpec::from_url(url),
            store: None,
        }
    }

    fn store_key(url: &Url) -> String {
        format!("{}{}", url.host_str().unwrap_or_default(), url.path())
    }

    /// Snapshot the counters for the store behind `url`.
    #[must_use]
    pub fn stats(url: &Url) -> MemoryStats {
        let store = store_for(&Self::store_key(url));
        let store = store.lock().unwrap();
        MemoryStats {
            records: store.records.len(),
            connects: store.connect_count,
            disconnects: store.disconnect_count,
        }
    }

    /// Drop all records and counters for the store behind `url`.
    pub fn reset(url: &Url) {
        let store = store_for(&Self::store_key(url));
        let mut store = store.lock().unwrap();
        *store = MemoryStore::default();
    }

    fn connected(&self) -> StorageResult<&Arc<Mutex<MemoryStore>>> {
        self.store
            .as_ref()
            .ok_or_else(|| StorageError::connection("memory backend is not connected"))
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn connect(&mut self) -> StorageResult<()> {
        if self.faults.connect {
            return Err(StorageError::connection(
                "injected fault: connect refused",
            ));
        }

        if self.store.is_none() {
            let store = store_for(&self.store_key);
            store.lock().unwrap().connect_count += 1;
            self.store = Some(store);
        }
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(store) = self.store.take() {
            store.lock().unwrap().disconnect_count += 1;
        }
    }

    #[tracing::instrument(skip(self, envelope), fields(store = %self.store_key))]
    async fn save(
        &self,
        id: Uuid,
        type_name: &str,
        envelope: &StoredEnvelope,
    ) -> StorageResult<()> {
        assert!(!type_name.is_empty(), "type name cannot be empty");

        let store = self.connected()?;
        if self.faults.save {
            return Err(StorageError::backend("injected fault: save failed"));
        }

        let mut store = store.lock().unwrap();
        let key = (type_name.to_string(), id.to_string());
        let mut entry = envelope.clone();
        // Upsert replaces the payload but keeps the original creation time.
        if let Some(existing) = store.records.get(&key) {
            entry.created_at = existing.created_at;
        }
        store.records.insert(key, entry);
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(store = %self.store_key))]
    async fn load(&self, id: Uuid, type_name: &str) -> StorageResult<Option<StoredEnvelope>> {
        assert!(!type_name.is_empty(), "type name cannot be empty");

        let store = self.connected()?;
        if self.faults.load {
            return Err(StorageError::backend("injected fault: load failed"));
        }

        let store = store.lock().unwrap();
        let key = (type_name.to_string(), id.to_string());
        Ok(store.records.get(&key).cloned())
    }
}
