//! Token-budget chunking and multi-query retrieval for RAG knowledge bases.
//!
//! ```text
//! Source URL ──► ingestion::fetch ──► ingestion::markdown ──┐
//!                                                           │
//! Markdown ──► chunking::chunk_markdown ──► [Chunk] ──► stores::VectorStore
//!                   (sections → recursive split → assemble)
//!
//! User query ──► retrieval::RetrievalOrchestrator
//!                   (rewrite → multi-query search → dedup → prompt assembly)
//! ```
//!
//! Chunking is synchronous and side-effect-free; everything that touches the
//! network (fetching, embedding, storage, generation) is async and reached
//! through explicit capability handles, so every stage can run against fakes.

pub mod chunking;
pub mod config;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod stores;
pub mod types;

pub use chunking::{Chunk, ChunkMetadata, Section, Tokenizer, chunk_markdown, split_by_headings};
pub use config::RagConfig;
pub use ingestion::{DocumentIngestor, IngestionReport};
pub use providers::{GenerateRequest, GenerativeModel, HttpGenerativeModel, MockGenerativeModel};
pub use retrieval::{QueryOutcome, RetrievalOrchestrator, RetrievedEvidence};
pub use stores::{MemoryVectorStore, QueryResponse, SqliteKnowledgeStore, StoredChunks, VectorStore};
pub use types::{ContentType, DocumentMetadata, RagError};
