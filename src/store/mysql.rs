use super::{Collection, Document, DocumentStore, Fields, StoreError, WriteOp};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::error;

const CREATE_DOCUMENTS: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection VARCHAR(32) NOT NULL,
        id VARCHAR(128) NOT NULL,
        seq BIGINT UNSIGNED NOT NULL AUTO_INCREMENT UNIQUE,
        body LONGTEXT NOT NULL,
        PRIMARY KEY (collection, id)
    )
"#;

const SELECT_ONE: &str = "SELECT id, body FROM documents WHERE collection = ? AND id = ?";
const SELECT_ALL: &str = "SELECT id, body FROM documents WHERE collection = ? ORDER BY seq";
const SELECT_WHERE: &str = r#"
    SELECT id, body
    FROM documents
    WHERE collection = ?
    AND JSON_EXTRACT(body, ?) = CAST(? AS JSON)
    ORDER BY seq
"#;
const INSERT: &str = "INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)";
const UPSERT: &str = r#"
    INSERT INTO documents (collection, id, body)
    VALUES (?, ?, ?)
    ON DUPLICATE KEY UPDATE body = VALUES(body)
"#;
const LOCK_ONE: &str = "SELECT id FROM documents WHERE collection = ? AND id = ? FOR UPDATE";
const MERGE: &str = r#"
    UPDATE documents
    SET body = JSON_MERGE_PATCH(body, ?)
    WHERE collection = ? AND id = ?
"#;
const DELETE: &str = "DELETE FROM documents WHERE collection = ? AND id = ?";

/// Documents kept as JSON text in one MySQL table keyed by (collection, id).
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

fn unavailable(e: sqlx::Error) -> StoreError {
    error!(error = %e, "Document store query failed");
    StoreError::Unavailable(e.to_string())
}

fn decode(id: String, body: &str) -> Result<Document, StoreError> {
    let fields: Fields =
        serde_json::from_str(body).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(Document { id, fields })
}

fn encode(fields: &Fields) -> Result<String, StoreError> {
    serde_json::to_string(fields).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Only plain identifiers are turned into JSON paths.
fn json_path(field: &str) -> Result<String, StoreError> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StoreError::Serialization(format!(
            "unsupported query field '{}'",
            field
        )));
    }
    Ok(format!("$.{}", field))
}

impl MySqlStore {
    /// Wraps the pool and makes sure the documents table exists.
    pub async fn connect(pool: MySqlPool) -> Result<Self, StoreError> {
        sqlx::query(CREATE_DOCUMENTS)
            .execute(&pool)
            .await
            .map_err(unavailable)?;
        Ok(Self { pool })
    }

    async fn apply(tx: &mut Transaction<'_, MySql>, op: WriteOp) -> Result<(), StoreError> {
        match op {
            WriteOp::Set {
                collection,
                id,
                fields,
            } => {
                sqlx::query(UPSERT)
                    .bind(collection.name())
                    .bind(&id)
                    .bind(encode(&fields)?)
                    .execute(&mut **tx)
                    .await
                    .map_err(unavailable)?;
            }
            WriteOp::Create {
                collection,
                id,
                fields,
            } => {
                let result = sqlx::query(INSERT)
                    .bind(collection.name())
                    .bind(&id)
                    .bind(encode(&fields)?)
                    .execute(&mut **tx)
                    .await;

                if let Err(e) = result {
                    // duplicate primary key
                    if let sqlx::Error::Database(db_err) = &e {
                        if db_err.code().as_deref() == Some("23000") {
                            return Err(StoreError::AlreadyExists {
                                collection: collection.name(),
                                id,
                            });
                        }
                    }
                    return Err(unavailable(e));
                }
            }
            WriteOp::Update {
                collection,
                id,
                patch,
            } => {
                let locked = sqlx::query_scalar::<_, String>(LOCK_ONE)
                    .bind(collection.name())
                    .bind(&id)
                    .fetch_optional(&mut **tx)
                    .await
                    .map_err(unavailable)?;

                if locked.is_none() {
                    return Err(StoreError::NotFound {
                        collection: collection.name(),
                        id,
                    });
                }

                sqlx::query(MERGE)
                    .bind(encode(&patch)?)
                    .bind(collection.name())
                    .bind(&id)
                    .execute(&mut **tx)
                    .await
                    .map_err(unavailable)?;
            }
            WriteOp::Delete { collection, id } => {
                sqlx::query(DELETE)
                    .bind(collection.name())
                    .bind(&id)
                    .execute(&mut **tx)
                    .await
                    .map_err(unavailable)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MySqlStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, (String, String)>(SELECT_ONE)
            .bind(collection.name())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        row.map(|(id, body)| decode(id, &body)).transpose()
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        let mut stream = sqlx::query_as::<_, (String, String)>(SELECT_ALL)
            .bind(collection.name())
            .fetch(&self.pool);

        let mut docs = Vec::new();
        while let Some(row) = stream.next().await {
            let (id, body) = row.map_err(unavailable)?;
            docs.push(decode(id, &body)?);
        }
        Ok(docs)
    }

    async fn query(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        let path = json_path(field)?;
        let value = serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut stream = sqlx::query_as::<_, (String, String)>(SELECT_WHERE)
            .bind(collection.name())
            .bind(path)
            .bind(value)
            .fetch(&self.pool);

        let mut docs = Vec::new();
        while let Some(row) = stream.next().await {
            let (id, body) = row.map_err(unavailable)?;
            docs.push(decode(id, &body)?);
        }
        Ok(docs)
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        for op in ops {
            // dropping the transaction on error rolls it back
            Self::apply(&mut tx, op).await?;
        }

        tx.commit().await.map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_path_accepts_identifiers_only() {
        assert_eq!(json_path("userId").unwrap(), "$.userId");
        assert!(json_path("user.id").is_err());
        assert!(json_path("").is_err());
        assert!(json_path("a' OR 1=1").is_err());
    }
}
