use super::{Collection, Document, DocumentStore, Fields, StoreError, WriteOp, merge_patch};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    fields: Fields,
}

#[derive(Debug, Clone, Default)]
struct Collections {
    next_seq: u64,
    docs: HashMap<Collection, HashMap<String, Entry>>,
}

impl Collections {
    fn apply(&mut self, op: WriteOp) -> Result<(), StoreError> {
        match op {
            WriteOp::Set {
                collection,
                id,
                fields,
            } => {
                let seq = self.next_seq;
                let docs = self.docs.entry(collection).or_default();
                match docs.get_mut(&id) {
                    Some(entry) => entry.fields = fields,
                    None => {
                        docs.insert(id, Entry { seq, fields });
                        self.next_seq += 1;
                    }
                }
            }
            WriteOp::Create {
                collection,
                id,
                fields,
            } => {
                let seq = self.next_seq;
                let docs = self.docs.entry(collection).or_default();
                if docs.contains_key(&id) {
                    return Err(StoreError::AlreadyExists {
                        collection: collection.name(),
                        id,
                    });
                }
                docs.insert(id, Entry { seq, fields });
                self.next_seq += 1;
            }
            WriteOp::Update {
                collection,
                id,
                patch,
            } => {
                let entry = self
                    .docs
                    .get_mut(&collection)
                    .and_then(|docs| docs.get_mut(&id))
                    .ok_or_else(|| StoreError::NotFound {
                        collection: collection.name(),
                        id: id.clone(),
                    })?;

                let mut body = Value::Object(std::mem::take(&mut entry.fields));
                merge_patch(&mut body, &Value::Object(patch));
                if let Value::Object(fields) = body {
                    entry.fields = fields;
                }
            }
            WriteOp::Delete { collection, id } => {
                if let Some(docs) = self.docs.get_mut(&collection) {
                    docs.remove(&id);
                }
            }
        }
        Ok(())
    }

    fn documents<'a>(
        &'a self,
        collection: Collection,
        filter: impl Fn(&Fields) -> bool,
    ) -> Vec<Document> {
        let mut found: Vec<(&'a String, &'a Entry)> = self
            .docs
            .get(&collection)
            .map(|docs| docs.iter().filter(|(_, e)| filter(&e.fields)).collect())
            .unwrap_or_default();

        found.sort_by_key(|(_, e)| e.seq);

        found
            .into_iter()
            .map(|(id, e)| Document {
                id: id.clone(),
                fields: e.fields.clone(),
            })
            .collect()
    }
}

/// Process-local document store. Backs tests and the `memory` backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let guard = self.inner.read().map_err(poisoned)?;
        Ok(guard
            .docs
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .map(|e| Document {
                id: id.to_string(),
                fields: e.fields.clone(),
            }))
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        let guard = self.inner.read().map_err(poisoned)?;
        Ok(guard.documents(collection, |_| true))
    }

    async fn query(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        let guard = self.inner.read().map_err(poisoned)?;
        Ok(guard.documents(collection, |fields| fields.get(field) == Some(value)))
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut guard = self.inner.write().map_err(poisoned)?;

        // stage on a copy so a failing op leaves nothing behind
        let mut staged = guard.clone();
        for op in ops {
            staged.apply(op)?;
        }
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[actix_web::test]
    async fn query_matches_field_equality_in_insertion_order() {
        let store = MemoryStore::new();
        store
            .set(Collection::Attendance, "b", fields(json!({"userId": "u1", "n": 1})))
            .await
            .unwrap();
        store
            .set(Collection::Attendance, "a", fields(json!({"userId": "u2", "n": 2})))
            .await
            .unwrap();
        store
            .set(Collection::Attendance, "c", fields(json!({"userId": "u1", "n": 3})))
            .await
            .unwrap();

        let docs = store
            .query(Collection::Attendance, "userId", &json!("u1"))
            .await
            .unwrap();

        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[actix_web::test]
    async fn create_rejects_existing_id() {
        let store = MemoryStore::new();
        store
            .create(Collection::Holidays, "h1", fields(json!({"description": "x"})))
            .await
            .unwrap();

        let err = store
            .create(Collection::Holidays, "h1", fields(json!({"description": "y"})))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            StoreError::AlreadyExists {
                collection: "holidays",
                id: "h1".to_string()
            }
        );
    }

    #[actix_web::test]
    async fn update_of_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update(Collection::Users, "ghost", fields(json!({"name": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[actix_web::test]
    async fn failing_batch_leaves_store_unchanged() {
        let store = MemoryStore::new();
        store
            .set(Collection::Users, "u1", fields(json!({"name": "Ada"})))
            .await
            .unwrap();

        let result = store
            .commit(vec![
                WriteOp::Delete {
                    collection: Collection::Users,
                    id: "u1".to_string(),
                },
                WriteOp::Update {
                    collection: Collection::Users,
                    id: "missing".to_string(),
                    patch: fields(json!({"name": "x"})),
                },
            ])
            .await;

        assert!(result.is_err());
        assert!(store.get(Collection::Users, "u1").await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn add_generates_distinct_ids() {
        let store = MemoryStore::new();
        let a = store
            .add(Collection::Holidays, fields(json!({"description": "a"})))
            .await
            .unwrap();
        let b = store
            .add(Collection::Holidays, fields(json!({"description": "b"})))
            .await
            .unwrap();

        assert_ne!(a, b);
        assert_eq!(store.list(Collection::Holidays).await.unwrap().len(), 2);
    }
}
