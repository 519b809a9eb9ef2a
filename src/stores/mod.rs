//! Vector storage for chunk documents.
//!
//! The pipeline only ever sees the opaque KNN contract in [`VectorStore`]:
//! parallel-array get/upsert/delete plus a batched multi-query nearest
//! neighbour search. Embeddings are computed inside store implementations;
//! callers never touch a vector.
//!
//! ```text
//!                  ┌──────────────────┐
//!                  │ VectorStore trait│
//!                  │   (async CRUD)   │
//!                  └────────┬─────────┘
//!                           │
//!              ┌────────────┴────────────┐
//!              ▼                         ▼
//!      ┌──────────────┐         ┌────────────────┐
//!      │   Memory     │         │    SQLite      │
//!      │ (tests/demo) │         │  sqlite-vec    │
//!      └──────────────┘         └────────────────┘
//! ```

pub mod memory;
pub mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteKnowledgeStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::RagError;

/// A page of stored chunks as parallel arrays.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredChunks {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<serde_json::Value>,
}

impl StoredChunks {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Nearest-neighbour results: one outer entry per submitted query text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub ids: Vec<Vec<String>>,
    pub documents: Vec<Vec<String>>,
    pub metadatas: Vec<Vec<serde_json::Value>>,
    pub distances: Vec<Vec<f32>>,
}

/// Opaque KNN store contract.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Returns stored chunks in insertion order, optionally limited.
    async fn get(&self, limit: Option<usize>) -> Result<StoredChunks, RagError>;

    /// Inserts or replaces chunks. The three arrays are parallel; a length
    /// mismatch is rejected before anything is written.
    async fn upsert(
        &self,
        ids: Vec<String>,
        documents: Vec<String>,
        metadatas: Vec<serde_json::Value>,
    ) -> Result<(), RagError>;

    /// Deletes the chunks with the given ids; unknown ids are ignored.
    async fn delete(&self, ids: Vec<String>) -> Result<(), RagError>;

    /// Batched nearest-neighbour search: one result group per query text,
    /// each holding at most `n_results` hits ordered by ascending distance.
    async fn query(
        &self,
        query_texts: Vec<String>,
        n_results: usize,
    ) -> Result<QueryResponse, RagError>;
}

pub(crate) fn check_parallel_arrays(
    ids: &[String],
    documents: &[String],
    metadatas: &[serde_json::Value],
) -> Result<(), RagError> {
    if ids.len() != documents.len() || ids.len() != metadatas.len() {
        return Err(RagError::Storage(format!(
            "parallel array length mismatch: {} ids, {} documents, {} metadatas",
            ids.len(),
            documents.len(),
            metadatas.len()
        )));
    }
    Ok(())
}
