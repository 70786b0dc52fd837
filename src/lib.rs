//! # exostore
//!
//! External storage offloading for typed values: keep a lightweight
//! `{class_name, id}` reference in your application while the full payload
//! lives in PostgreSQL, Redis, S3 or any custom backend.
//!
//! ## Quick Start
//!
//! ```no_run
//! use exostore::{ExternalRecord, StoreConfig};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     name: String,
//!     email: String,
//! }
//! exostore::impl_type_name!(User);
//!
//! # async fn demo() -> exostore::StorageResult<()> {
//! let config = StoreConfig::new("postgresql://db.internal/app")?;
//!
//! let mut record = ExternalRecord::new(
//!     User { name: "Alice".into(), email: "alice@example.com".into() },
//!     config.clone(),
//! );
//! let reference = record.save().await?;
//!
//! // Elsewhere: only the reference travelled.
//! let restored = ExternalRecord::<User>::load(config, &reference).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │   ExternalRecord<T>            ExternalAdapter<T>       │
//! │   (stable identity)            (fresh id per save)      │
//! ├─────────────────────────────────────────────────────────┤
//! │   Persistence protocol: validate → envelope →           │
//! │   connect → save/load → disconnect (always)             │
//! ├─────────────────────────────────────────────────────────┤
//! │   BackendRegistry: scheme → constructor                 │
//! ├─────────────────────────────────────────────────────────┤
//! │   test://   postgresql://   redis://   s3://   custom   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! - [`ExternalRecord`] - wrapper with a per-instance identity that
//!   persists across saves
//! - [`ExternalAdapter`] - stateless adapter, re-identified on every save
//! - [`StorageBackend`] - the four-operation contract custom backends
//!   implement
//! - [`BackendRegistry`] / [`global_registry`] - scheme-to-backend routing
//! - [`StorageError`] - the complete public failure vocabulary
//!
//! ## Custom Backends
//!
//! Implement [`StorageBackend`] and register a constructor:
//!
//! ```no_run
//! use exostore::{global_registry, MemoryBackend};
//!
//! // MemoryBackend stands in for your own StorageBackend impl here.
//! global_registry().register("mydb", |url| Box::new(MemoryBackend::new(url)));
//! ```
//!
//! ## Feature Flags
//!
//! - `postgres` - PostgreSQL backend (sqlx, JSONB)
//! - `redis` - Redis backend
//! - `s3` - S3-compatible object storage backend (`object_store`)
//! - `all-backends` - everything above
//!
//! Backends whose feature is disabled are simply never registered; the
//! in-memory `test://` backend is always available.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod adapter;
pub mod config;
pub mod constants;
pub mod record;
pub mod reference;
pub mod storage;
pub mod type_name;

mod protocol;

pub use adapter::ExternalAdapter;
pub use config::StoreConfig;
pub use record::ExternalRecord;
pub use reference::StorageReference;
pub use storage::{
    global_registry, scrub_url, BackendRegistry, MemoryBackend, StorageBackend, StorageError,
    StorageResult, StoredEnvelope,
};
pub use type_name::TypeName;

#[cfg(feature = "postgres")]
pub use storage::PostgresBackend;

#[cfg(feature = "redis")]
pub use storage::RedisBackend;

#[cfg(feature = "s3")]
pub use storage::S3Backend;
