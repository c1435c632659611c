//! Document store client.
//!
//! Collections of JSON documents addressed by id and queried by top-level
//! field equality. Every write goes through [`DocumentStore::commit`], which
//! applies a batch of [`WriteOp`]s atomically; the single-document helpers
//! are one-element batches.

use async_trait::async_trait;
use derive_more::Display;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use strum::IntoStaticStr;
use uuid::Uuid;

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// Field map of a single document, without its id.
pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Collection {
    Users,
    Attendance,
    Holidays,
    /// Private to the auth provider.
    Credentials,
}

impl Collection {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// Decodes the document into a model, exposing the document id under `id_field`.
    pub fn into_model<T: DeserializeOwned>(self, id_field: &str) -> Result<T, StoreError> {
        let mut fields = self.fields;
        fields.insert(id_field.to_string(), Value::String(self.id));
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

/// Serializes a model into document fields, dropping `id_field` since the id
/// lives outside the body.
pub fn to_fields<T: Serialize>(value: &T, id_field: &str) -> Result<Fields, StoreError> {
    match serde_json::to_value(value).map_err(|e| StoreError::Serialization(e.to_string()))? {
        Value::Object(mut fields) => {
            fields.remove(id_field);
            Ok(fields)
        }
        other => Err(StoreError::Serialization(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// JSON merge patch (RFC 7396): `null` removes a key, objects merge
/// recursively, anything else replaces.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                merge_patch(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Insert or overwrite.
    Set {
        collection: Collection,
        id: String,
        fields: Fields,
    },
    /// Insert; fails with [`StoreError::AlreadyExists`] if the id is taken.
    Create {
        collection: Collection,
        id: String,
        fields: Fields,
    },
    /// Merge-patch an existing document; fails with [`StoreError::NotFound`].
    Update {
        collection: Collection,
        id: String,
        patch: Fields,
    },
    /// Remove if present.
    Delete { collection: Collection, id: String },
}

#[derive(Debug, Display, Clone, PartialEq)]
pub enum StoreError {
    #[display(fmt = "document {}/{} not found", collection, id)]
    NotFound {
        collection: &'static str,
        id: String,
    },
    #[display(fmt = "document {}/{} already exists", collection, id)]
    AlreadyExists {
        collection: &'static str,
        id: String,
    },
    #[display(fmt = "invalid document: {}", _0)]
    Serialization(String),
    #[display(fmt = "document store unavailable: {}", _0)]
    Unavailable(String),
}

impl std::error::Error for StoreError {}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError>;

    /// All documents of a collection in insertion order.
    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError>;

    /// Documents whose top-level `field` equals `value`, in insertion order.
    async fn query(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError>;

    /// Applies every op or none of them.
    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;

    /// Creates a document under a fresh random id and returns the id.
    async fn add(&self, collection: Collection, fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_simple().to_string();
        self.create(collection, &id, fields).await?;
        Ok(id)
    }

    async fn set(&self, collection: Collection, id: &str, fields: Fields) -> Result<(), StoreError> {
        self.commit(vec![WriteOp::Set {
            collection,
            id: id.to_string(),
            fields,
        }])
        .await
    }

    async fn create(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        self.commit(vec![WriteOp::Create {
            collection,
            id: id.to_string(),
            fields,
        }])
        .await
    }

    async fn update(&self, collection: Collection, id: &str, patch: Fields) -> Result<(), StoreError> {
        self.commit(vec![WriteOp::Update {
            collection,
            id: id.to_string(),
            patch,
        }])
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_patch_removes_nulls_and_merges_objects() {
        let mut doc = json!({
            "name": "Ada",
            "currentInTime": { "time": "09:00:00", "timestamp": 1 },
            "department": "R&D"
        });

        merge_patch(
            &mut doc,
            &json!({ "currentInTime": null, "department": "Ops", "extra": { "a": 1 } }),
        );

        assert_eq!(
            doc,
            json!({ "name": "Ada", "department": "Ops", "extra": { "a": 1 } })
        );
    }

    #[test]
    fn collection_names_are_lowercase() {
        assert_eq!(Collection::Users.name(), "users");
        assert_eq!(Collection::Attendance.name(), "attendance");
        assert_eq!(Collection::Holidays.name(), "holidays");
        assert_eq!(Collection::Credentials.name(), "credentials");
    }
}
