//! Stored Envelope
//!
//! The metadata-wrapped form a payload takes on every backend: serialized
//! data plus schema version and timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::SCHEMA_VERSION_DEFAULT;

fn schema_version_default() -> u32 {
    SCHEMA_VERSION_DEFAULT
}

/// The on-backend record shape.
///
/// Built by the orchestrator on every save with both timestamps set to the
/// same instant. On an update the backend preserves the original
/// `created_at`; the orchestrator does not read back prior envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEnvelope {
    /// Serialized payload. Defaults to `Value::Null` when absent so the
    /// orchestrator can reject malformed stored records explicitly.
    #[serde(default)]
    pub data: Value,

    /// Payload schema version, for forward migration.
    #[serde(default = "schema_version_default")]
    pub schema_version: u32,

    /// When the record was first created.
    pub created_at: DateTime<Utc>,

    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

impl StoredEnvelope {
    /// Wrap a serialized payload with fresh metadata.
    #[must_use]
    pub fn new(data: Value) -> Self {
        let now = Utc::now();
        Self {
            data,
            schema_version: SCHEMA_VERSION_DEFAULT,
            created_at: now,
            updated_at: now,
        }
    }
}
