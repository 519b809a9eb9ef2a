//! Document ingestion: validate → fetch → convert → chunk → purge → upsert.

use std::sync::Arc;

use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use super::fetch::fetch_document;
use super::markdown::MarkdownConverter;
use crate::chunking::{Tokenizer, chunk_markdown};
use crate::config::RagConfig;
use crate::providers::GenerativeModel;
use crate::stores::{StoredChunks, VectorStore};
use crate::types::{ContentType, DocumentMetadata, RagError, generate_document_id};

/// Summary of one successful ingestion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestionReport {
    pub doc_id: String,
    pub title: String,
    pub source_url: String,
    pub content_type: ContentType,
    pub chunks_stored: usize,
    pub markdown_bytes: usize,
}

/// Ingestion front door. Holds explicit handles to its collaborators; no
/// hidden global state, so tests can swap in fakes freely.
pub struct DocumentIngestor {
    client: Client,
    converter: MarkdownConverter,
    store: Arc<dyn VectorStore>,
    tokenizer: Tokenizer,
    config: RagConfig,
}

impl DocumentIngestor {
    pub fn new(
        store: Arc<dyn VectorStore>,
        model: Arc<dyn GenerativeModel>,
        config: RagConfig,
    ) -> Self {
        Self {
            client: Client::new(),
            converter: MarkdownConverter::new(model),
            store,
            tokenizer: Tokenizer::new(),
            config,
        }
    }

    /// Custom HTTP client for fetching sources (timeouts, proxies, TLS).
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Ingests a brand-new document, minting a fresh document id.
    pub async fn add_document(&self, title: &str, url: &str) -> Result<IngestionReport, RagError> {
        let (title, url) = validate_input(title, url)?;
        let doc_id = generate_document_id(&title);
        self.ingest(doc_id, title, url).await
    }

    /// Re-indexes an existing document under its stable id. Stale chunks are
    /// purged by exact `doc_id` match before the new generation is written.
    pub async fn update_document(
        &self,
        doc_id: &str,
        title: &str,
        url: &str,
    ) -> Result<IngestionReport, RagError> {
        if doc_id.trim().is_empty() {
            return Err(RagError::InvalidDocument(
                "document id is required".to_string(),
            ));
        }
        let (title, url) = validate_input(title, url)?;
        self.ingest(doc_id.trim().to_string(), title, url).await
    }

    /// Deletes every chunk belonging to `doc_id`. Returns how many chunks
    /// were removed; storage failures propagate.
    pub async fn delete_document(&self, doc_id: &str) -> Result<usize, RagError> {
        let ids = self.chunk_ids_for(doc_id).await?;
        if ids.is_empty() {
            return Ok(0);
        }
        let removed = ids.len();
        self.store.delete(ids).await?;
        info!(doc_id, removed, "document deleted");
        Ok(removed)
    }

    /// Lists stored chunks, optionally limited.
    pub async fn documents(&self, limit: Option<usize>) -> Result<StoredChunks, RagError> {
        self.store.get(limit).await
    }

    async fn ingest(
        &self,
        doc_id: String,
        title: String,
        url: Url,
    ) -> Result<IngestionReport, RagError> {
        let fetched = fetch_document(&self.client, &url).await?;
        let markdown = self.converter.convert(&fetched).await?;

        let metadata = DocumentMetadata {
            doc_id: doc_id.clone(),
            title: title.clone(),
            source_url: fetched.resolved_url.to_string(),
            content_type: fetched.content_type,
            last_update: Utc::now(),
        };

        let chunks = chunk_markdown(
            &self.tokenizer,
            &markdown,
            &title,
            &metadata.source_url,
            self.config.max_chunk_tokens,
            self.config.chunk_overlap_tokens,
        );
        if chunks.is_empty() {
            return Err(RagError::Chunking(format!(
                "document '{title}' produced no chunks"
            )));
        }

        self.purge_stale_chunks(&doc_id).await;

        let mut ids = Vec::with_capacity(chunks.len());
        let mut documents = Vec::with_capacity(chunks.len());
        let mut metadatas = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            ids.push(chunk.id.clone());
            documents.push(chunk.content.clone());
            metadatas.push(json!({
                "doc_id": metadata.doc_id,
                "title": chunk.metadata.title,
                "source_url": metadata.source_url,
                "content_type": metadata.content_type,
                "last_update": metadata.last_update,
                "chunk_index": chunk.metadata.chunk_index,
                "total_chunks": chunk.metadata.total_chunks,
            }));
        }
        self.store.upsert(ids, documents, metadatas).await?;

        let report = IngestionReport {
            doc_id,
            title,
            source_url: metadata.source_url,
            content_type: metadata.content_type,
            chunks_stored: chunks.len(),
            markdown_bytes: markdown.len(),
        };
        info!(
            doc_id = %report.doc_id,
            chunks = report.chunks_stored,
            content_type = %report.content_type,
            "document ingested"
        );
        Ok(report)
    }

    /// Best-effort removal of a prior chunk generation. A failure here leaves
    /// stale orphans behind, which the next re-index retries; ingestion
    /// continues either way.
    async fn purge_stale_chunks(&self, doc_id: &str) {
        match self.chunk_ids_for(doc_id).await {
            Ok(ids) if ids.is_empty() => {}
            Ok(ids) => {
                let count = ids.len();
                if let Err(err) = self.store.delete(ids).await {
                    warn!(doc_id, count, error = %err, "stale chunk purge failed, orphans remain until next re-index");
                }
            }
            Err(err) => {
                warn!(doc_id, error = %err, "could not enumerate stale chunks, skipping purge");
            }
        }
    }

    /// Chunk ids whose metadata `doc_id` matches exactly.
    async fn chunk_ids_for(&self, doc_id: &str) -> Result<Vec<String>, RagError> {
        let stored = self.store.get(None).await?;
        Ok(stored
            .ids
            .into_iter()
            .zip(stored.metadatas)
            .filter(|(_, metadata)| {
                metadata.get("doc_id").and_then(|value| value.as_str()) == Some(doc_id)
            })
            .map(|(id, _)| id)
            .collect())
    }
}

fn validate_input(title: &str, url: &str) -> Result<(String, Url), RagError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(RagError::InvalidDocument("title is required".to_string()));
    }
    let url = url.trim();
    if url.is_empty() {
        return Err(RagError::InvalidDocument("URL is required".to_string()));
    }
    let url = Url::parse(url)
        .map_err(|err| RagError::InvalidDocument(format!("invalid URL '{url}': {err}")))?;
    Ok((title.to_string(), url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_title_is_rejected() {
        let result = validate_input("   ", "https://example.com");
        assert!(matches!(result, Err(RagError::InvalidDocument(message)) if message.contains("title")));
    }

    #[test]
    fn malformed_urls_are_rejected() {
        let result = validate_input("Doc", "not a url");
        assert!(matches!(result, Err(RagError::InvalidDocument(message)) if message.contains("invalid URL")));
    }

    #[test]
    fn valid_input_is_trimmed() {
        let (title, url) = validate_input("  Doc  ", " https://example.com/page ").unwrap();
        assert_eq!(title, "Doc");
        assert_eq!(url.as_str(), "https://example.com/page");
    }
}
