//! External Records
//!
//! The record-wrapper calling convention: a wrapper attached to one value
//! of a model type, owning a lazily minted identifier that persists across
//! repeated saves. Saving twice updates the same stored record; loading
//! binds the identifier so later saves keep updating it.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::protocol::{load_envelope, save_envelope};
use crate::reference::StorageReference;
use crate::storage::{StorageError, StorageResult};
use crate::type_name::TypeName;

/// A typed value offloaded to external storage under a stable identity.
///
/// ```no_run
/// use exostore::{ExternalRecord, StoreConfig, TypeName};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct User {
///     name: String,
///     age: u32,
/// }
/// exostore::impl_type_name!(User);
///
/// # async fn demo() -> exostore::StorageResult<()> {
/// let config = StoreConfig::new("postgresql://db.internal/app")?;
/// let mut record = ExternalRecord::new(
///     User { name: "Alice".into(), age: 30 },
///     config.clone(),
/// );
///
/// let reference = record.save().await?;          // creates
/// record.value_mut().age = 31;
/// record.save().await?;                          // updates the same record
///
/// let restored = ExternalRecord::<User>::load(config, &reference).await?;
/// assert_eq!(restored.value().age, 31);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ExternalRecord<T> {
    value: T,
    external_id: Option<Uuid>,
    config: StoreConfig,
}

impl<T> ExternalRecord<T>
where
    T: TypeName + Serialize + DeserializeOwned,
{
    /// Wrap a value. No identifier is assigned until the first save.
    #[must_use]
    pub fn new(value: T, config: StoreConfig) -> Self {
        Self {
            value,
            external_id: None,
            config,
        }
    }

    /// Serialize the value and upsert it, minting an identifier on the
    /// first call and reusing it afterwards.
    ///
    /// # Errors
    /// `StorageError::Validation` if the value cannot be serialized, plus
    /// any backend connection/operation error.
    pub async fn save(&mut self) -> StorageResult<StorageReference> {
        let type_name = T::type_name();

        let data = serialize_payload(&self.value, &type_name)?;
        let id = *self.external_id.get_or_insert_with(Uuid::new_v4);

        save_envelope(&self.config, id, &type_name, data).await?;
        Ok(StorageReference::new(type_name, id))
    }

    /// Load a record by reference and bind its identifier, so subsequent
    /// saves update rather than duplicate.
    ///
    /// # Errors
    /// `StorageError::Validation` on type mismatch, malformed identifier
    /// or undecodable payload; `StorageError::NotFound` if no record
    /// exists; backend errors otherwise.
    pub async fn load(config: StoreConfig, reference: &StorageReference) -> StorageResult<Self> {
        let type_name = T::type_name();
        let (id, envelope) = load_envelope(&config, reference, &type_name).await?;
        let value = deserialize_payload(envelope.data, &type_name)?;

        Ok(Self {
            value,
            external_id: Some(id),
            config,
        })
    }

    /// The wrapped value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Mutable access to the wrapped value.
    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Unwrap, discarding the storage identity.
    pub fn into_value(self) -> T {
        self.value
    }

    /// The assigned identifier, if this record has been saved or loaded.
    #[must_use]
    pub fn external_id(&self) -> Option<Uuid> {
        self.external_id
    }
}

/// Serialize a payload, wrapping serde diagnostics into the taxonomy.
pub(crate) fn serialize_payload<T: Serialize>(
    value: &T,
    type_name: &str,
) -> StorageResult<Value> {
    serde_json::to_value(value).map_err(|e| {
        StorageError::validation(format!("Serialization failed for type '{type_name}': {e}"))
    })
}

/// Validate and decode a payload, wrapping serde diagnostics.
pub(crate) fn deserialize_payload<T: DeserializeOwned>(
    data: Value,
    type_name: &str,
) -> StorageResult<T> {
    serde_json::from_value(data).map_err(|e| {
        StorageError::validation(format!(
            "Loaded data failed validation for type '{type_name}': {e}"
        ))
    })
}
