//! Integration Tests for External Storage
//!
//! End-to-end validation of the save/load protocol over the in-memory
//! `test://` backend:
//! - the concrete User scenario (save, load, not-found, type mismatch)
//! - round-trips across primitive, nested and composite-generic payloads
//! - custom backend registration through a non-global registry
//! - resource release when an operation fails mid-flight

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;
use uuid::Uuid;

use exostore::storage::register_builtin_backends;
use exostore::{
    BackendRegistry, ExternalAdapter, ExternalRecord, MemoryBackend, StorageBackend,
    StorageError, StorageReference, StorageResult, StoreConfig, StoredEnvelope,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    name: String,
    age: u32,
}
exostore::impl_type_name!(User);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Team {
    name: String,
    members: Vec<User>,
    tags: HashMap<String, String>,
}
exostore::impl_type_name!(Team);

/// Route instrumentation through the test writer; `RUST_LOG` controls the
/// filter. Safe to call from every test, only the first call installs.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn memory_config(path: &str) -> StoreConfig {
    init_tracing();
    let config = StoreConfig::new(&format!("test://memory/e2e/{path}")).unwrap();
    MemoryBackend::reset(config.url());
    config
}

// =============================================================================
// The User Scenario
// =============================================================================

#[tokio::test]
async fn test_user_scenario_end_to_end() {
    let config = memory_config("user_scenario");
    let user = User {
        name: "Alice género".to_string(),
        age: 30,
    };

    // Save produces a {type_name, uuid} reference.
    let mut record = ExternalRecord::new(user.clone(), config.clone());
    let reference = record.save().await.unwrap();
    assert_eq!(reference.type_name, "User");
    assert!(Uuid::parse_str(&reference.id).is_ok());

    // Loading the reference restores an equal value.
    let restored = ExternalRecord::<User>::load(config.clone(), &reference)
        .await
        .unwrap();
    assert_eq!(restored.value(), &user);

    // A syntactically valid but absent id is not-found, carrying both fields.
    let absent = StorageReference::new("User", Uuid::nil());
    let err = ExternalRecord::<User>::load(config.clone(), &absent)
        .await
        .unwrap_err();
    match err {
        StorageError::NotFound { id, type_name } => {
            assert_eq!(id, Uuid::nil());
            assert_eq!(type_name, "User");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // The wrong declared type is a mismatch, never a silent coercion.
    let mismatched = StorageReference {
        type_name: "Product".to_string(),
        id: reference.id.clone(),
    };
    let err = ExternalRecord::<User>::load(config, &mismatched)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("expected 'User', got 'Product'"));
}

#[tokio::test]
async fn test_reference_wire_format() {
    let config = memory_config("wire_format");
    let mut record = ExternalRecord::new(
        User {
            name: "Alice".to_string(),
            age: 30,
        },
        config,
    );
    let reference = record.save().await.unwrap();

    let wire = serde_json::to_value(&reference).unwrap();
    let object = wire.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert_eq!(object["class_name"], json!("User"));
    assert_eq!(object["id"], json!(reference.id));
    assert!(StorageReference::is_reference(&wire));
}

// =============================================================================
// Round-Trips Across Payload Shapes
// =============================================================================

#[tokio::test]
async fn test_roundtrip_nested_and_composite() {
    let config = memory_config("roundtrip_shapes");

    let team = Team {
        name: "Storage".to_string(),
        members: vec![
            User {
                name: "Alice".to_string(),
                age: 30,
            },
            User {
                name: "Bob".to_string(),
                age: 41,
            },
        ],
        tags: HashMap::from([("tier".to_string(), "1".to_string())]),
    };

    let mut record = ExternalRecord::new(team.clone(), config.clone());
    let reference = record.save().await.unwrap();
    assert_eq!(reference.type_name, "Team");

    let restored = ExternalRecord::<Team>::load(config.clone(), &reference)
        .await
        .unwrap();
    assert_eq!(restored.value(), &team);

    // Composite generic through the adapter.
    let adapter: ExternalAdapter<Vec<User>> = ExternalAdapter::new(config.clone());
    assert_eq!(adapter.type_name(), "list[User]");
    let reference = adapter.save(&team.members).await.unwrap();
    assert_eq!(adapter.load(&reference).await.unwrap(), team.members);

    // Primitive payloads work too.
    let numbers: ExternalAdapter<Vec<i64>> = ExternalAdapter::new(config);
    let reference = numbers.save(&vec![1, 2, 3]).await.unwrap();
    assert_eq!(reference.type_name, "list[int]");
    assert_eq!(numbers.load(&reference).await.unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_record_identity_vs_adapter_identity() {
    let config = memory_config("identity");
    let user = User {
        name: "Alice".to_string(),
        age: 30,
    };

    // Record wrapper: same id across saves.
    let mut record = ExternalRecord::new(user.clone(), config.clone());
    let first = record.save().await.unwrap();
    let second = record.save().await.unwrap();
    assert_eq!(first.id, second.id);

    // Adapter: fresh id per save.
    let adapter: ExternalAdapter<User> = ExternalAdapter::new(config);
    let first = adapter.save(&user).await.unwrap();
    let second = adapter.save(&user).await.unwrap();
    assert_ne!(first.id, second.id);
}

// =============================================================================
// Custom Backends
// =============================================================================

/// Minimal conforming backend: one slot, counts its lifecycle calls.
#[derive(Debug, Default)]
struct CountingBackend {
    connected: bool,
    state: Arc<CountingState>,
}

#[derive(Debug, Default)]
struct CountingState {
    connects: AtomicU64,
    disconnects: AtomicU64,
    records: std::sync::Mutex<HashMap<(String, String), StoredEnvelope>>,
}

#[async_trait]
impl StorageBackend for CountingBackend {
    async fn connect(&mut self) -> StorageResult<()> {
        self.connected = true;
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            self.state.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn save(
        &self,
        id: Uuid,
        type_name: &str,
        envelope: &StoredEnvelope,
    ) -> StorageResult<()> {
        if !self.connected {
            return Err(StorageError::connection("not connected"));
        }
        let mut records = self.state.records.lock().unwrap();
        records.insert((type_name.to_string(), id.to_string()), envelope.clone());
        Ok(())
    }

    async fn load(&self, id: Uuid, type_name: &str) -> StorageResult<Option<StoredEnvelope>> {
        if !self.connected {
            return Err(StorageError::connection("not connected"));
        }
        let records = self.state.records.lock().unwrap();
        Ok(records.get(&(type_name.to_string(), id.to_string())).cloned())
    }
}

#[tokio::test]
async fn test_custom_backend_through_own_registry() {
    init_tracing();
    let state = Arc::new(CountingState::default());
    let registry = Arc::new(BackendRegistry::new());
    let backend_state = Arc::clone(&state);
    registry.register("counting", move |_| {
        Box::new(CountingBackend {
            connected: false,
            state: Arc::clone(&backend_state),
        })
    });

    let config = StoreConfig::with_registry("counting://store/app", registry).unwrap();

    let adapter: ExternalAdapter<User> = ExternalAdapter::new(config);
    let user = User {
        name: "Alice".to_string(),
        age: 30,
    };
    let reference = adapter.save(&user).await.unwrap();
    let restored = adapter.load(&reference).await.unwrap();
    assert_eq!(restored, user);

    // One connect/disconnect pair per orchestrated operation.
    assert_eq!(state.connects.load(Ordering::SeqCst), 2);
    assert_eq!(state.disconnects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unregistered_scheme_fails_at_construction() {
    init_tracing();
    let registry = Arc::new(BackendRegistry::new());
    register_builtin_backends(&registry);

    let err = StoreConfig::with_registry("nosuch://host/db", registry).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Unknown storage scheme 'nosuch'"));
    assert!(message.contains("test"));
}

// =============================================================================
// Resource Release
// =============================================================================

#[tokio::test]
async fn test_disconnect_released_when_save_fails() {
    init_tracing();
    let url = Url::parse("test://memory/e2e/release?fail=save").unwrap();
    MemoryBackend::reset(&url);
    let config = StoreConfig::new(url.as_str()).unwrap();

    let adapter: ExternalAdapter<User> = ExternalAdapter::new(config);
    let result = adapter
        .save(&User {
            name: "Alice".to_string(),
            age: 30,
        })
        .await;
    assert!(result.is_err());

    let stats = MemoryBackend::stats(&url);
    assert_eq!(stats.connects, 1);
    assert_eq!(stats.disconnects, 1);
}

#[tokio::test]
async fn test_concurrent_saves_do_not_interfere() {
    let config = memory_config("concurrent");

    let mut handles = Vec::new();
    for age in 0..16_u32 {
        let config = config.clone();
        handles.push(tokio::spawn(async move {
            let adapter: ExternalAdapter<User> = ExternalAdapter::new(config);
            let user = User {
                name: format!("user-{age}"),
                age,
            };
            let reference = adapter.save(&user).await.unwrap();
            let restored = adapter.load(&reference).await.unwrap();
            assert_eq!(restored, user);
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(MemoryBackend::stats(config.url()).records, 16);
}
