//! Persistence Orchestration
//!
//! The shared save/load protocol behind both calling conventions
//! ([`ExternalRecord`](crate::record::ExternalRecord) and
//! [`ExternalAdapter`](crate::adapter::ExternalAdapter)).
//!
//! Each operation resolves a fresh backend from the registry, connects,
//! operates, and disconnects on every exit path. There is no retrying, no
//! cross-call connection caching and no shared mutable state between
//! concurrent invocations; a backend that wants a pool keeps one internally,
//! keyed by URL.

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::constants::TYPE_NAME_BYTES_MAX;
use crate::reference::StorageReference;
use crate::storage::{StorageError, StorageResult, StoredEnvelope};

/// Build an envelope around `data` and write it under `(id, type_name)`.
///
/// Both timestamps are set to the same "now"; on a re-save the backend is
/// the one responsible for keeping the original creation time.
pub(crate) async fn save_envelope(
    config: &StoreConfig,
    id: Uuid,
    type_name: &str,
    data: Value,
) -> StorageResult<()> {
    assert!(!type_name.is_empty(), "type name cannot be empty");
    assert!(
        type_name.len() <= TYPE_NAME_BYTES_MAX,
        "type name exceeds {TYPE_NAME_BYTES_MAX} bytes"
    );

    let envelope = StoredEnvelope::new(data);

    let mut backend = config.registry().create(config.url())?;
    backend.connect().await?;
    // Scoped acquisition: disconnect runs whether or not save failed.
    let result = backend.save(id, type_name, &envelope).await;
    backend.disconnect().await;

    debug!(type_name, %id, ok = result.is_ok(), "saved record");
    result
}

/// Check a reference against the expected type, fetch its envelope and
/// escalate absence to [`StorageError::NotFound`].
///
/// Returns the parsed identifier alongside the envelope so record wrappers
/// can bind it onto the loaded instance.
pub(crate) async fn load_envelope(
    config: &StoreConfig,
    reference: &StorageReference,
    expected_type: &str,
) -> StorageResult<(Uuid, StoredEnvelope)> {
    assert!(!expected_type.is_empty(), "type name cannot be empty");

    if reference.type_name != expected_type {
        return Err(StorageError::validation_mismatch(
            format!(
                "Type mismatch: expected '{expected_type}', got '{}'",
                reference.type_name
            ),
            expected_type,
            reference.type_name.clone(),
        ));
    }

    let id = reference.parse_id()?;

    let mut backend = config.registry().create(config.url())?;
    backend.connect().await?;
    let result = backend.load(id, expected_type).await;
    backend.disconnect().await;

    let envelope = result?.ok_or_else(|| StorageError::not_found(id, expected_type))?;

    if envelope.data.is_null() {
        return Err(StorageError::validation(
            "stored record is missing the 'data' field",
        ));
    }

    debug!(type_name = expected_type, %id, "loaded record");
    Ok((id, envelope))
}
