//! Storage References
//!
//! The lightweight handle that stands in for a stored payload. On the wire
//! it is exactly `{"class_name": "<TypeName>", "id": "<uuid>"}` - two keys,
//! no more, no less.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::storage::{StorageError, StorageResult};

/// Wire key holding the canonical type name.
const KEY_TYPE_NAME: &str = "class_name";
/// Wire key holding the record identifier.
const KEY_ID: &str = "id";

/// Immutable handle identifying one stored record.
///
/// Produced by every save, consumed by every load. The `type_name` field is
/// serialized as `class_name` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageReference {
    /// Canonical name of the type that produced this reference.
    #[serde(rename = "class_name")]
    pub type_name: String,

    /// Record identifier, UUID in textual form.
    pub id: String,
}

impl StorageReference {
    /// Build a reference from a type name and identifier.
    #[must_use]
    pub fn new(type_name: impl Into<String>, id: Uuid) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.to_string(),
        }
    }

    /// Whether `value` has the exact shape of a storage reference: a JSON
    /// object with precisely the keys `class_name` and `id`. An extra or
    /// missing key disqualifies it.
    ///
    /// Wrapper code uses this to decide whether an incoming value should
    /// trigger a load instead of plain validation.
    #[must_use]
    pub fn is_reference(value: &Value) -> bool {
        match value.as_object() {
            Some(map) => {
                map.len() == 2 && map.contains_key(KEY_TYPE_NAME) && map.contains_key(KEY_ID)
            }
            None => false,
        }
    }

    /// Parse a reference out of a JSON value.
    ///
    /// # Errors
    /// `StorageError::Validation` if the value is not shaped like a
    /// reference or its fields are not strings.
    pub fn from_value(value: &Value) -> StorageResult<Self> {
        if !Self::is_reference(value) {
            return Err(StorageError::validation(
                "value is not a storage reference: expected exactly the keys 'class_name' and 'id'",
            ));
        }
        serde_json::from_value(value.clone())
            .map_err(|e| StorageError::validation(format!("malformed storage reference: {e}")))
    }

    /// Parse the identifier as a UUID.
    ///
    /// # Errors
    /// `StorageError::Validation` if `id` is not a valid UUID.
    pub fn parse_id(&self) -> StorageResult<Uuid> {
        Uuid::parse_str(&self.id).map_err(|_| {
            StorageError::validation(format!("invalid UUID format: '{}'", self.id))
        })
    }
}

impl std::fmt::Display for StorageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.type_name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format_uses_class_name() {
        let id = Uuid::new_v4();
        let reference = StorageReference::new("User", id);
        let wire = serde_json::to_value(&reference).unwrap();
        assert_eq!(wire, json!({"class_name": "User", "id": id.to_string()}));
    }

    #[test]
    fn test_is_reference_exact_keys() {
        assert!(StorageReference::is_reference(
            &json!({"class_name": "User", "id": "abc"})
        ));

        // Extra key disqualifies.
        assert!(!StorageReference::is_reference(
            &json!({"class_name": "User", "id": "abc", "name": "Alice"})
        ));
        // Missing key disqualifies.
        assert!(!StorageReference::is_reference(&json!({"class_name": "User"})));
        // Wrong keys disqualify.
        assert!(!StorageReference::is_reference(
            &json!({"type_name": "User", "id": "abc"})
        ));
        // Non-objects disqualify.
        assert!(!StorageReference::is_reference(&json!("User")));
        assert!(!StorageReference::is_reference(&json!(null)));
        assert!(!StorageReference::is_reference(&json!(["class_name", "id"])));
    }

    #[test]
    fn test_from_value_roundtrip() {
        let id = Uuid::new_v4();
        let reference = StorageReference::new("User", id);
        let wire = serde_json::to_value(&reference).unwrap();
        let parsed = StorageReference::from_value(&wire).unwrap();
        assert_eq!(parsed, reference);
    }

    #[test]
    fn test_from_value_rejects_extra_keys() {
        let value = json!({"class_name": "User", "id": "abc", "extra": 1});
        assert!(matches!(
            StorageReference::from_value(&value),
            Err(StorageError::Validation { .. })
        ));
    }

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        let reference = StorageReference::new("User", id);
        assert_eq!(reference.parse_id().unwrap(), id);

        let bad = StorageReference {
            type_name: "User".to_string(),
            id: "not-a-uuid".to_string(),
        };
        let err = bad.parse_id().unwrap_err();
        assert!(err.to_string().contains("invalid UUID format"));
    }
}
