//! Shared types for the ragweave pipeline.
//!
//! This module defines the crate-wide error taxonomy and the document-level
//! metadata contract that every stored chunk carries. Component-local types
//! (sections, chunks, retrieval results) live next to the code that produces
//! them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the ragweave pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// The document input was rejected before any processing began
    /// (empty title, unparseable URL, unsupported payload).
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A network fetch of source material failed.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Chunking could not produce a usable result.
    #[error("chunking failed: {0}")]
    Chunking(String),

    /// A generative or embedding capability provider returned an error.
    #[error("provider error: {0}")]
    Provider(String),

    /// The vector store rejected or failed an operation.
    #[error("storage error: {0}")]
    Storage(String),

    /// Local I/O failure.
    #[error("io error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        RagError::Fetch(err.to_string())
    }
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        RagError::Io(err.to_string())
    }
}

/// Content categories the ingestion path knows how to normalize.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Html,
    Pdf,
    Json,
}

impl ContentType {
    /// Maps an HTTP `Content-Type` media type (without parameters) onto a
    /// supported category. Anything unrecognized is treated as HTML, which is
    /// the most forgiving conversion path.
    pub fn from_mime(mime: &str) -> Self {
        match mime.trim().to_ascii_lowercase().as_str() {
            "application/pdf" | "application/octet-stream" => ContentType::Pdf,
            "application/json" | "application/vnd.api+json" => ContentType::Json,
            _ => ContentType::Html,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Html => write!(f, "html"),
            ContentType::Pdf => write!(f, "pdf"),
            ContentType::Json => write!(f, "json"),
        }
    }
}

/// Document-level metadata persisted alongside every chunk.
///
/// `doc_id` is the stable identity used for re-indexing and deletion: stale
/// chunks are matched by exact `doc_id` equality, never by prefix-matching the
/// composite chunk id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub doc_id: String,
    pub title: String,
    pub source_url: String,
    pub content_type: ContentType,
    pub last_update: DateTime<Utc>,
}

/// Mints a document id from a human title: lowercased, non-alphanumerics
/// collapsed to dashes, truncated, and suffixed with a random discriminator so
/// two documents with the same title never collide.
pub fn generate_document_id(title: &str) -> String {
    let sanitized: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let sanitized = sanitized.trim_matches('-');
    let sanitized: String = sanitized.chars().take(50).collect();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("doc-{}-{}", sanitized, &suffix[..12])
}
