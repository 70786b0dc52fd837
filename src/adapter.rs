//! External Adapters
//!
//! The value-adapter calling convention: a stateless handle for a declared
//! type. No identity persists across saves - every save validates the
//! payload and mints a brand-new identifier, so saving the same value twice
//! produces two independent records.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::protocol::{load_envelope, save_envelope};
use crate::record::{deserialize_payload, serialize_payload};
use crate::reference::StorageReference;
use crate::storage::StorageResult;
use crate::type_name::TypeName;

/// Adapter for storing arbitrary values of a declared type.
///
/// Works for any `TypeName + Serialize + Deserialize` type, including
/// collections and composite generics:
///
/// ```no_run
/// use exostore::{ExternalAdapter, StoreConfig};
///
/// # async fn demo() -> exostore::StorageResult<()> {
/// let config = StoreConfig::new("redis://cache.internal:6379/0")?;
/// let adapter: ExternalAdapter<Vec<String>> = ExternalAdapter::new(config);
/// assert_eq!(adapter.type_name(), "list[str]");
///
/// let reference = adapter.save(&vec!["a".into(), "b".into()]).await?;
/// let restored = adapter.load(&reference).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ExternalAdapter<T> {
    config: StoreConfig,
    type_name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ExternalAdapter<T>
where
    T: TypeName + Serialize + DeserializeOwned,
{
    /// Create an adapter for `T` over an already-validated config.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            type_name: T::type_name(),
            _marker: PhantomData,
        }
    }

    /// Serialize and store `value` under a freshly minted identifier.
    ///
    /// # Errors
    /// `StorageError::Validation` if the value cannot be serialized, plus
    /// any backend connection/operation error.
    pub async fn save(&self, value: &T) -> StorageResult<StorageReference> {
        let data = serialize_payload(value, &self.type_name)?;
        let id = Uuid::new_v4();

        save_envelope(&self.config, id, &self.type_name, data).await?;
        Ok(StorageReference::new(self.type_name.clone(), id))
    }

    /// Validate raw JSON against `T`, then store it like [`save`].
    ///
    /// [`save`]: ExternalAdapter::save
    ///
    /// # Errors
    /// `StorageError::Validation` if `raw` does not validate as `T`.
    pub async fn save_raw(&self, raw: Value) -> StorageResult<StorageReference> {
        let value: T = deserialize_payload(raw, &self.type_name)?;
        self.save(&value).await
    }

    /// Load and validate the value behind a reference.
    ///
    /// # Errors
    /// `StorageError::Validation` on type mismatch, malformed identifier
    /// or undecodable payload; `StorageError::NotFound` if no record
    /// exists; backend errors otherwise.
    pub async fn load(&self, reference: &StorageReference) -> StorageResult<T> {
        let (_, envelope) = load_envelope(&self.config, reference, &self.type_name).await?;
        deserialize_payload(envelope.data, &self.type_name)
    }

    /// The canonical type name this adapter validates against.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}
