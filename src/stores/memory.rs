//! In-process vector store backed by deterministic hashed embeddings.
//!
//! Embeds each document as a normalized bag of hashed words, so texts sharing
//! vocabulary land close together under cosine distance. Deterministic,
//! dependency-free, and fast — the store of choice for tests and demos.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::{QueryResponse, StoredChunks, VectorStore, check_parallel_arrays};
use crate::types::RagError;

const EMBEDDING_DIMS: usize = 32;

#[derive(Clone, Debug)]
struct Row {
    id: String,
    document: String,
    metadata: serde_json::Value,
    embedding: Vec<f32>,
}

/// Insertion-ordered in-memory KNN store.
#[derive(Default)]
pub struct MemoryVectorStore {
    rows: RwLock<Vec<Row>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn get(&self, limit: Option<usize>) -> Result<StoredChunks, RagError> {
        let rows = self.rows.read();
        let take = limit.unwrap_or(rows.len());
        let mut page = StoredChunks::default();
        for row in rows.iter().take(take) {
            page.ids.push(row.id.clone());
            page.documents.push(row.document.clone());
            page.metadatas.push(row.metadata.clone());
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
        let mut rows = self.rows.write();
        for ((id, document), metadata) in ids.into_iter().zip(documents).zip(metadatas) {
            let embedding = embed(&document);
            match rows.iter_mut().find(|row| row.id == id) {
                Some(existing) => {
                    existing.document = document;
                    existing.metadata = metadata;
                    existing.embedding = embedding;
                }
                None => rows.push(Row {
                    id,
                    document,
                    metadata,
                    embedding,
                }),
            }
        }
        Ok(())
    }

    async fn delete(&self, ids: Vec<String>) -> Result<(), RagError> {
        let mut rows = self.rows.write();
        rows.retain(|row| !ids.iter().any(|id| id == &row.id));
        Ok(())
    }

    async fn query(
        &self,
        query_texts: Vec<String>,
        n_results: usize,
    ) -> Result<QueryResponse, RagError> {
        let rows = self.rows.read();
        let mut response = QueryResponse::default();
        for text in &query_texts {
            let query_embedding = embed(text);
            let mut scored: Vec<(&Row, f32)> = rows
                .iter()
                .map(|row| (row, cosine_distance(&query_embedding, &row.embedding)))
                .collect();
            scored.sort_by(|a, b| {
                a.1.partial_cmp(&b.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.id.cmp(&b.0.id))
            });
            scored.truncate(n_results);

            response.ids.push(scored.iter().map(|(r, _)| r.id.clone()).collect());
            response
                .documents
                .push(scored.iter().map(|(r, _)| r.document.clone()).collect());
            response
                .metadatas
                .push(scored.iter().map(|(r, _)| r.metadata.clone()).collect());
            response
                .distances
                .push(scored.iter().map(|(_, d)| *d).collect());
        }
        debug!(
            queries = query_texts.len(),
            n_results, "memory store query complete"
        );
        Ok(response)
    }
}

/// Normalized bag-of-hashed-words embedding.
fn embed(text: &str) -> Vec<f32> {
    let mut accumulated = vec![0f32; EMBEDDING_DIMS];
    for word in text.split_whitespace() {
        let normalized: String = word
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        if normalized.is_empty() {
            continue;
        }
        let mut hasher = DefaultHasher::new();
        normalized.hash(&mut hasher);
        let seed = hasher.finish();
        for (i, slot) in accumulated.iter_mut().enumerate() {
            let bits = seed.rotate_left((i as u32).wrapping_mul(7)) ^ ((i as u64) << 17);
            *slot += ((bits as i32) as f32) / (i32::MAX as f32);
        }
    }
    let norm = accumulated.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut accumulated {
            *value /= norm;
        }
    }
    accumulated
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    1.0 - dot
}
