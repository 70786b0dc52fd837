//! Backend Registry
//!
//! Maps URL schemes to backend constructors. One process-global instance
//! holds the built-in registrations; tests construct their own.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use url::Url;

use super::backend::StorageBackend;
use super::error::{StorageError, StorageResult};
use super::memory::MemoryBackend;

/// Constructor producing a fresh, unconnected backend for a URL.
pub type BackendConstructor = Arc<dyn Fn(&Url) -> Box<dyn StorageBackend> + Send + Sync>;

/// Registry of storage backend constructors, keyed by URL scheme.
///
/// Registration and lookup can race in a multithreaded host, so the scheme
/// map is guarded. The last registration for a scheme wins silently.
#[derive(Default)]
pub struct BackendRegistry {
    constructors: RwLock<HashMap<String, BackendConstructor>>,
}

impl BackendRegistry {
    /// Create an empty registry with no schemes registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for a URL scheme, overwriting any prior
    /// registration for the same scheme.
    ///
    /// Contract conformance is enforced statically: the constructor must
    /// produce a [`StorageBackend`] trait object to compile at all.
    pub fn register<F>(&self, scheme: &str, constructor: F)
    where
        F: Fn(&Url) -> Box<dyn StorageBackend> + Send + Sync + 'static,
    {
        assert!(!scheme.is_empty(), "scheme cannot be empty");

        let mut constructors = self.constructors.write().unwrap();
        constructors.insert(scheme.to_string(), Arc::new(constructor));
    }

    /// Create a new, unconnected backend instance for `url`.
    ///
    /// # Errors
    /// `StorageError::Validation` if no backend is registered for the URL's
    /// scheme; the message lists the registered schemes, sorted.
    pub fn create(&self, url: &Url) -> StorageResult<Box<dyn StorageBackend>> {
        let constructor = {
            let constructors = self.constructors.read().unwrap();
            constructors.get(url.scheme()).cloned()
        };

        match constructor {
            Some(constructor) => Ok(constructor(url)),
            None => {
                let registered = self.schemes();
                let registered = if registered.is_empty() {
                    "(none)".to_string()
                } else {
                    registered.join(", ")
                };
                Err(StorageError::validation(format!(
                    "Unknown storage scheme: '{}'. Registered schemes: {registered}",
                    url.scheme()
                )))
            }
        }
    }

    /// Whether a constructor is registered for `scheme`.
    #[must_use]
    pub fn contains(&self, scheme: &str) -> bool {
        self.constructors.read().unwrap().contains_key(scheme)
    }

    /// Registered scheme names, sorted.
    #[must_use]
    pub fn schemes(&self) -> Vec<String> {
        let constructors = self.constructors.read().unwrap();
        let mut schemes: Vec<String> = constructors.keys().cloned().collect();
        schemes.sort();
        schemes
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

static GLOBAL_REGISTRY: OnceLock<BackendRegistry> = OnceLock::new();

/// The process-wide registry, created lazily on first access.
///
/// Built-in backends register here once at initialization; backends whose
/// client crate is not compiled in (feature disabled) are skipped rather
/// than failing.
pub fn global_registry() -> &'static BackendRegistry {
    GLOBAL_REGISTRY.get_or_init(|| {
        let registry = BackendRegistry::new();
        register_builtin_backends(&registry);
        registry
    })
}

/// Register every backend compiled into this build.
pub fn register_builtin_backends(registry: &BackendRegistry) {
    registry.register(MemoryBackend::SCHEME, |url| {
        Box::new(MemoryBackend::new(url))
    });

    #[cfg(feature = "postgres")]
    {
        use super::postgres::PostgresBackend;
        registry.register("postgresql", |url| Box::new(PostgresBackend::new(url)));
        registry.register("postgres", |url| Box::new(PostgresBackend::new(url)));
    }

    #[cfg(feature = "redis")]
    {
        use super::redis::RedisBackend;
        registry.register("redis", |url| Box::new(RedisBackend::new(url)));
    }

    #[cfg(feature = "s3")]
    {
        use super::s3::S3Backend;
        registry.register("s3", |url| Box::new(S3Backend::new(url)));
    }
}
