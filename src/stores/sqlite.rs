//! SQLite-backed vector store using `sqlite-vec` for cosine KNN.
//!
//! Chunk rows live in a regular `chunks` table managed through `rig-sqlite`;
//! their embeddings live in the companion `chunks_embeddings` vec0 virtual
//! table, joined by rowid. The embedding model is invoked inside `upsert` and
//! `query`, so callers never handle vectors directly.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::Once;

use async_trait::async_trait;
use rig::OneOrMany;
use rig::embeddings::EmbeddingModel;
use rig_sqlite::{Column, ColumnValue, SqliteVectorStore, SqliteVectorStoreTable};
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{Connection, ffi};
use tracing::debug;

use super::{QueryResponse, StoredChunks, VectorStore, check_parallel_arrays};
use crate::types::RagError;

/// One persisted chunk row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkRow {
    pub id: String,
    /// Exact document identity, used for stale-chunk discovery on re-index.
    pub doc_id: String,
    pub content: String,
    #[serde(deserialize_with = "deserialize_metadata_field")]
    pub metadata: serde_json::Value,
}

impl SqliteVectorStoreTable for ChunkRow {
    fn name() -> &'static str {
        "chunks"
    }

    fn schema() -> Vec<Column> {
        vec![
            Column::new("id", "TEXT PRIMARY KEY"),
            Column::new("doc_id", "TEXT").indexed(),
            Column::new("content", "TEXT"),
            Column::new("metadata", "TEXT"),
        ]
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn column_values(&self) -> Vec<(&'static str, Box<dyn ColumnValue>)> {
        vec![
            ("id", Box::new(self.id.clone())),
            ("doc_id", Box::new(self.doc_id.clone())),
            ("content", Box::new(self.content.clone())),
            ("metadata", Box::new(self.metadata.to_string())),
        ]
    }
}

fn deserialize_metadata_field<'de, D>(deserializer: D) -> Result<serde_json::Value, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if let serde_json::Value::String(raw) = value {
        serde_json::from_str(&raw).map_or(Ok(serde_json::Value::String(raw)), Ok)
    } else {
        Ok(value)
    }
}

fn parse_metadata(raw: String) -> serde_json::Value {
    serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
}

/// Persistent [`VectorStore`] over SQLite + `sqlite-vec`.
#[derive(Clone)]
pub struct SqliteKnowledgeStore<E>
where
    E: EmbeddingModel + 'static,
{
    inner: SqliteVectorStore<E, ChunkRow>,
    /// Separate connection handle for direct queries not covered by
    /// rig-sqlite. A clone of the connection used by the inner store.
    conn: Connection,
    model: E,
}

impl<E> SqliteKnowledgeStore<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    /// Opens (or creates) the database at `path` and verifies the
    /// `sqlite-vec` extension is loadable.
    pub async fn open(path: impl AsRef<Path>, model: E) -> Result<Self, RagError> {
        Self::register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        conn.call(|conn| {
            let result = conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0));
            match result {
                Ok(_) => Ok(()),
                Err(err) => Err(tokio_rusqlite::Error::Rusqlite(err)),
            }
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))?;

        let conn_for_queries = conn.clone();
        let store = SqliteVectorStore::new(conn, &model)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Ok(Self {
            inner: store,
            conn: conn_for_queries,
            model,
        })
    }

    fn register_sqlite_vec() -> Result<(), RagError> {
        use std::sync::Mutex;

        static INIT: Once = Once::new();
        static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

        INIT.call_once(|| {
            let result = unsafe {
                type SqliteExtensionInit = unsafe extern "C" fn(
                    *mut ffi::sqlite3,
                    *mut *mut c_char,
                    *const ffi::sqlite3_api_routines,
                ) -> i32;

                let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
                let init_fn: SqliteExtensionInit =
                    transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
                let rc = ffi::sqlite3_auto_extension(Some(init_fn));
                if rc != 0 {
                    Err(format!(
                        "failed to register sqlite-vec extension (code {rc})"
                    ))
                } else {
                    Ok(())
                }
            };
            *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
        });

        INIT_RESULT
            .lock()
            .expect("init result mutex poisoned")
            .clone()
            .expect("init was called but result not set")
            .map_err(RagError::Storage)
    }

    async fn embed_documents(&self, documents: &[String]) -> Result<Vec<rig::embeddings::Embedding>, RagError> {
        let mut embeddings = Vec::with_capacity(documents.len());
        for batch in documents.chunks(E::MAX_DOCUMENTS.max(1)) {
            let embedded = self
                .model
                .embed_texts(batch.to_vec())
                .await
                .map_err(|err| RagError::Storage(err.to_string()))?;
            embeddings.extend(embedded);
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl<E> VectorStore for SqliteKnowledgeStore<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    async fn get(&self, limit: Option<usize>) -> Result<StoredChunks, RagError> {
        let limit_clause = match limit {
            Some(n) => format!(" LIMIT {n}"),
            None => String::new(),
        };
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT id, content, metadata FROM chunks ORDER BY rowid ASC{limit_clause}"
                ))?;
                let mapped = stmt.query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?;
                let mut rows = Vec::new();
                for row in mapped {
                    rows.push(row?);
                }
                Ok(rows)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;

        let mut page = StoredChunks::default();
        for (id, content, metadata) in rows {
            page.ids.push(id);
            page.documents.push(content);
            page.metadatas.push(parse_metadata(metadata));
        }
        Ok(page)
    }

    async fn upsert(
        &self,
        ids: Vec<String>,
        documents: Vec<String>,
        metadatas: Vec<serde_json::Value>,
    ) -> Result<(), RagError> {
        check_parallel_arrays(&ids, &documents, &metadatas)?;
        if ids.is_empty() {
            return Ok(());
        }

        // rig-sqlite inserts are append-only, so replace semantics need an
        // explicit delete of any existing rows first.
        self.delete(ids.clone()).await?;

        let embeddings = self.embed_documents(&documents).await?;
        let mut rows = Vec::with_capacity(ids.len());
        for (((id, content), metadata), embedding) in ids
            .into_iter()
            .zip(documents)
            .zip(metadatas)
            .zip(embeddings)
        {
            let doc_id = metadata
                .get("doc_id")
                .and_then(|value| value.as_str())
                .unwrap_or_default()
                .to_string();
            let row = ChunkRow {
                id,
                doc_id,
                content,
                metadata,
            };
            rows.push((row, OneOrMany::one(embedding)));
        }

        let inserted = rows.len();
        self.inner
            .add_rows(rows)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        debug!(inserted, "sqlite store upsert complete");
        Ok(())
    }

    async fn delete(&self, ids: Vec<String>) -> Result<(), RagError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for id in &ids {
                    tx.execute(
                        "DELETE FROM chunks_embeddings WHERE rowid IN \
                         (SELECT rowid FROM chunks WHERE id = ?1)",
                        [id],
                    )?;
                    tx.execute("DELETE FROM chunks WHERE id = ?1", [id])?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn query(
        &self,
        query_texts: Vec<String>,
        n_results: usize,
    ) -> Result<QueryResponse, RagError> {
        let mut response = QueryResponse::default();
        if query_texts.is_empty() {
            return Ok(response);
        }

        let embeddings = self.embed_documents(&query_texts).await?;
        for embedding in embeddings {
            let embedding_json = serde_json::to_string(&embedding.vec)
                .map_err(|err| RagError::Storage(err.to_string()))?;
            let hits = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT c.id, c.content, c.metadata, \
                         vec_distance_cosine(e.embedding, vec_f32(?1)) AS distance \
                         FROM chunks c \
                         JOIN chunks_embeddings e ON e.rowid = c.rowid \
                         ORDER BY distance ASC \
                         LIMIT {n_results}"
                    ))?;
                    let mapped = stmt.query_map([&embedding_json], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, f32>(3)?,
                        ))
                    })?;
                    let mut hits = Vec::new();
                    for hit in mapped {
                        hits.push(hit?);
                    }
                    Ok(hits)
                })
                .await
                .map_err(|err| RagError::Storage(err.to_string()))?;

            let mut ids = Vec::with_capacity(hits.len());
            let mut documents = Vec::with_capacity(hits.len());
            let mut metadatas = Vec::with_capacity(hits.len());
            let mut distances = Vec::with_capacity(hits.len());
            for (id, content, metadata, distance) in hits {
                ids.push(id);
                documents.push(content);
                metadatas.push(parse_metadata(metadata));
                distances.push(distance);
            }
            response.ids.push(ids);
            response.documents.push(documents);
            response.metadatas.push(metadatas);
            response.distances.push(distances);
        }
        Ok(response)
    }
}
