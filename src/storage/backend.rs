//! Storage Backend Trait
//!
//! Abstract interface every storage implementation must satisfy. Kept to
//! four operations so a custom backend fits in little code.
//!
//! All implementations must satisfy the same contract:
//! - operations exchange only JSON-compatible envelopes; native-format
//!   serialization is the backend's business
//! - client-library errors never escape; they are re-wrapped into
//!   [`StorageError`](super::error::StorageError)

use async_trait::async_trait;
use uuid::Uuid;

use super::envelope::StoredEnvelope;
use super::error::StorageResult;

/// Abstract storage backend for externalized records.
///
/// Instances are created unconnected by the registry and exclusively owned
/// by the orchestration call that created them. Internal pooling across
/// instances (keyed by URL) is a backend's own business.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Establish the connection/pool and perform one-time setup, such as
    /// create-table-if-absent. Idempotent.
    ///
    /// # Errors
    /// `StorageError::Connection` if the store is unreachable or
    /// misconfigured.
    async fn connect(&mut self) -> StorageResult<()>;

    /// Release all held resources. Idempotent and best-effort: failures are
    /// logged, never surfaced to the caller.
    async fn disconnect(&mut self);

    /// Upsert a record: fully replace an existing record with this id, or
    /// create it. Persists `envelope.schema_version` and both timestamps
    /// verbatim, except that an update must preserve the record's original
    /// `created_at`.
    ///
    /// # Errors
    /// `StorageError::Connection` if not connected,
    /// `StorageError::Backend` on any other operational failure.
    async fn save(
        &self,
        id: Uuid,
        type_name: &str,
        envelope: &StoredEnvelope,
    ) -> StorageResult<()>;

    /// Fetch the envelope for `(id, type_name)`, or `None` if absent.
    /// Absence is not an error here; the caller decides.
    ///
    /// # Errors
    /// `StorageError::Connection` if not connected,
    /// `StorageError::Backend` on any other operational failure.
    async fn load(&self, id: Uuid, type_name: &str) -> StorageResult<Option<StoredEnvelope>>;
}
