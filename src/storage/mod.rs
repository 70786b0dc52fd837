//! Storage - Backend Trait, Registry and Implementations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    StorageBackend Trait                      │
//! └─────────────────────────────────────────────────────────────┘
//!          ↑                 ↑                ↑             ↑
//!          │                 │                │             │
//! ┌────────┴──────┐ ┌────────┴───────┐ ┌──────┴─────┐ ┌─────┴────┐
//! │ MemoryBackend │ │PostgresBackend │ │RedisBackend│ │ S3Backend│
//! │   (testing)   │ │    (JSONB)     │ │(key-value) │ │ (objects)│
//! └───────────────┘ └────────────────┘ └────────────┘ └──────────┘
//! ```
//!
//! The registry maps URL schemes to constructors; the orchestrator asks it
//! for a fresh, unconnected instance per operation.

mod backend;
mod envelope;
mod error;
mod memory;
mod registry;

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "s3")]
mod s3;

pub use backend::StorageBackend;
pub use envelope::StoredEnvelope;
pub use error::{scrub_url, BoxedCause, StorageError, StorageResult};
pub use memory::{MemoryBackend, MemoryStats};
pub use registry::{
    global_registry, register_builtin_backends, BackendConstructor, BackendRegistry,
};

#[cfg(feature = "postgres")]
pub use postgres::PostgresBackend;

#[cfg(feature = "redis")]
pub use self::redis::RedisBackend;

#[cfg(feature = "s3")]
pub use s3::S3Backend;
